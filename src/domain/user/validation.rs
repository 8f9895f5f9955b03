//! User payload validation

use thiserror::Error;

use super::entity::{NewUser, UserChanges};
use crate::domain::DomainError;

/// Errors that can occur during user validation
#[derive(Debug, Error, Clone, PartialEq)]
pub enum UserValidationError {
    #[error("Name cannot be empty")]
    EmptyName,

    #[error("Name is too short. Minimum length is {0} characters")]
    NameTooShort(usize),

    #[error("Name exceeds maximum length of {0} characters")]
    NameTooLong(usize),

    #[error("Name contains a control character")]
    ControlCharacter,

    #[error("Update must change at least one field")]
    NothingToUpdate,
}

const MIN_NAME_LENGTH: usize = 3;
const MAX_NAME_LENGTH: usize = 100;

/// Validate a user name
///
/// Rules:
/// - Cannot be empty or whitespace only
/// - Between 3 and 100 characters (counted as chars, not bytes)
/// - No control characters
pub fn validate_name(name: &str) -> Result<(), UserValidationError> {
    if name.trim().is_empty() {
        return Err(UserValidationError::EmptyName);
    }

    let length = name.chars().count();

    if length < MIN_NAME_LENGTH {
        return Err(UserValidationError::NameTooShort(MIN_NAME_LENGTH));
    }

    if length > MAX_NAME_LENGTH {
        return Err(UserValidationError::NameTooLong(MAX_NAME_LENGTH));
    }

    if name.chars().any(char::is_control) {
        return Err(UserValidationError::ControlCharacter);
    }

    Ok(())
}

pub fn validate_new_user(user: &NewUser) -> Result<(), UserValidationError> {
    validate_name(&user.name)
}

pub fn validate_changes(changes: &UserChanges) -> Result<(), UserValidationError> {
    if changes.is_empty() {
        return Err(UserValidationError::NothingToUpdate);
    }

    if let Some(name) = &changes.name {
        validate_name(name)?;
    }

    Ok(())
}

impl From<UserValidationError> for DomainError {
    fn from(error: UserValidationError) -> Self {
        DomainError::validation(error.to_string())
    }
}
