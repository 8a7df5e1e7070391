//! Access rules, one function per guarded operation. Each takes the acting
//! user and the resource it acts on, and answers allow or deny. HTTP handlers
//! and services call these instead of comparing roles inline.

use crate::db::{Comment, DocId, Role, User};
use crate::error::{AppError, AppResult};

/// The authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: DocId,
    pub role: Role,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            role: user.role,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    fn from_bool(allowed: bool) -> Self {
        if allowed {
            Decision::Allow
        } else {
            Decision::Deny
        }
    }

    fn is_allowed(self) -> bool {
        self == Decision::Allow
    }

    /// Turns a denial into a `Forbidden` error.
    pub fn enforce(self, message: &str) -> AppResult<()> {
        if self.is_allowed() {
            Ok(())
        } else {
            Err(AppError::Forbidden(message.to_string()))
        }
    }
}

/// Creating, editing and deleting films, cast and genres.
pub fn manage_catalog(actor: &Actor) -> Decision {
    Decision::from_bool(actor.is_admin())
}

/// Listing users and creating further admins.
pub fn administer_users(actor: &Actor) -> Decision {
    Decision::from_bool(actor.is_admin())
}

/// Only the author may edit a comment, admins included.
pub fn edit_comment(actor: &Actor, comment: &Comment) -> Decision {
    Decision::from_bool(comment.owner == actor.id)
}

/// The author or any admin may delete a comment.
pub fn delete_comment(actor: &Actor, comment: &Comment) -> Decision {
    Decision::from_bool(comment.owner == actor.id || actor.is_admin())
}

/// Admins may delete regular users but never another admin.
pub fn delete_user(actor: &Actor, target: &User) -> Decision {
    Decision::from_bool(actor.is_admin() && target.role != Role::Admin)
}
