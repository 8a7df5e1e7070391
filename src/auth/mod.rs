pub mod identity;
pub mod mailer;
pub mod password;
pub mod tokens;

pub use identity::IdentityService;
pub use mailer::{Email, LogMailer, MailError, Mailer, SmtpMailer};
pub use password::PasswordHasher;
pub use tokens::{TokenPurpose, TokenSigner};
