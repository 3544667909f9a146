use std::fmt;

use model::Role;
use sea_orm::{DbErr, SqlErr};
use thiserror::Error;
use tracing::{debug, warn};

use crate::credentials::CredentialError;

/// The kind of record a lookup failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    User,
    Teacher,
    Student,
    Course,
    Enrollment,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::User => "user",
            EntityKind::Teacher => "teacher",
            EntityKind::Student => "student",
            EntityKind::Course => "course",
            EntityKind::Enrollment => "enrollment",
        };
        f.write_str(name)
    }
}

/// The identity column that collided during registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityField {
    Username,
    Email,
}

impl fmt::Display for IdentityField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityField::Username => f.write_str("username"),
            IdentityField::Email => f.write_str("email"),
        }
    }
}

/// Error types for the registry rules
#[derive(Error, Debug)]
pub enum RegistryError {
    /// A referenced record does not exist
    #[error("{entity} not found: {key}")]
    NotFound { entity: EntityKind, key: String },

    /// Username or email already taken
    #[error("{0} already exists")]
    DuplicateIdentity(IdentityField),

    /// Course code already taken
    #[error("course code '{0}' already exists")]
    DuplicateCode(String),

    /// The student already holds an enrollment for the course
    #[error("student {student_id} is already enrolled in course {course_id}")]
    DuplicateEnrollment { student_id: i32, course_id: i32 },

    /// A referenced user does not hold the role the operation requires
    #[error("user {user_id} is a {actual}, expected a {expected}")]
    RoleMismatch {
        user_id: i32,
        expected: Role,
        actual: Role,
    },

    /// Input rejected before reaching the store
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The store rejected a write on a constraint no pre-check accounts for
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// The credential hasher failed
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// Error from the database operations
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl RegistryError {
    pub(crate) fn not_found(entity: EntityKind, key: impl fmt::Display) -> Self {
        RegistryError::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    /// Stable machine-readable code for the failure kind.
    pub fn code(&self) -> &'static str {
        match self {
            RegistryError::NotFound { .. } => "NOT_FOUND",
            RegistryError::DuplicateIdentity(IdentityField::Username) => "USERNAME_ALREADY_EXISTS",
            RegistryError::DuplicateIdentity(IdentityField::Email) => "EMAIL_ALREADY_EXISTS",
            RegistryError::DuplicateCode(_) => "COURSE_CODE_ALREADY_EXISTS",
            RegistryError::DuplicateEnrollment { .. } => "ALREADY_ENROLLED",
            RegistryError::RoleMismatch { .. } => "ROLE_MISMATCH",
            RegistryError::InvalidInput(_) => "INVALID_INPUT",
            RegistryError::ConstraintViolation(_) => "DATABASE_CONSTRAINT_ERROR",
            RegistryError::Credential(_) => "CREDENTIAL_ERROR",
            RegistryError::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Classifies a failed write.
    ///
    /// A unique violation raised by the store means a concurrent writer won
    /// the race past our pre-check, so it is reported with the same kind the
    /// pre-check would have produced. `on_unique` receives the driver message
    /// and returns that kind when it recognises the constraint.
    pub(crate) fn from_write<F>(err: DbErr, on_unique: F) -> Self
    where
        F: FnOnce(&str) -> Option<RegistryError>,
    {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(message)) => {
                debug!("Store reported unique violation: {}", message);
                on_unique(&message).unwrap_or_else(|| {
                    warn!("Unrecognised unique constraint: {}", message);
                    RegistryError::ConstraintViolation(message)
                })
            }
            Some(SqlErr::ForeignKeyConstraintViolation(message)) => {
                warn!("Store reported foreign key violation: {}", message);
                RegistryError::ConstraintViolation(message)
            }
            _ => RegistryError::Database(err),
        }
    }
}

/// Type alias for Result with RegistryError
pub type Result<T> = std::result::Result<T, RegistryError>;

pub(crate) fn require_non_blank(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(RegistryError::InvalidInput(format!("{} must not be blank", field)));
    }
    Ok(())
}
