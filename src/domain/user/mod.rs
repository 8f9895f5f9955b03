//! User domain
//!
//! This module provides the user entity, its write payloads, validation and
//! the store traits the repository is built on.

mod entity;
mod repository;
mod validation;

pub use entity::{NewUser, User, UserChanges, UserId, UserView};
pub use repository::{UserStore, UserTransaction};
pub use validation::{
    validate_changes, validate_name, validate_new_user, UserValidationError,
};
