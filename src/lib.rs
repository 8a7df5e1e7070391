// Library exports for reelbase
// The binary and the integration tests both build on these modules

pub mod auth;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod policy;
pub mod routes;
pub mod state;
pub mod validation;
pub mod views;
