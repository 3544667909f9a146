//! Role-based access table.
//!
//! Callers consult [`Actor::authorize`] before invoking a rule operation. The
//! rule components never check roles of the caller themselves.

use std::fmt;

use model::Role;
use thiserror::Error;
use tracing::debug;

/// Every operation a caller can invoke on the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    RegisterUser,
    ViewUser,
    ListUsers,
    ToggleUserEnabled,
    DeleteUser,
    CreateCourse,
    UpdateCourse,
    DeleteCourse,
    ViewCourse,
    ListCourses,
    Enroll,
    DropEnrollment,
    UpdateGrade,
    UpdateStatus,
    ListStudentEnrollments,
    ListCourseEnrollments,
    ListTeacherEnrollments,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Whether `role` may invoke `operation`.
pub fn permits(role: Role, operation: Operation) -> bool {
    use Operation::*;

    match operation {
        RegisterUser | ViewUser | ViewCourse | ListCourses | ListStudentEnrollments => true,
        ListUsers | ToggleUserEnabled | DeleteUser => role == Role::Admin,
        CreateCourse | UpdateCourse | DeleteCourse => matches!(role, Role::Teacher | Role::Admin),
        ListCourseEnrollments | ListTeacherEnrollments | UpdateGrade | UpdateStatus => {
            matches!(role, Role::Teacher | Role::Admin)
        }
        Enroll | DropEnrollment => matches!(role, Role::Student | Role::Admin),
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AccessError {
    #[error("role {role} may not perform {operation}")]
    Forbidden { role: Role, operation: Operation },

    #[error("user {0} may not perform this action on their own account")]
    SelfAction(i32),
}

/// The authenticated caller on whose behalf an operation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: i32,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: i32, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn authorize(&self, operation: Operation) -> Result<(), AccessError> {
        if permits(self.role, operation) {
            Ok(())
        } else {
            debug!(
                "Denied {} to user {} with role {}",
                operation, self.user_id, self.role
            );
            Err(AccessError::Forbidden {
                role: self.role,
                operation,
            })
        }
    }

    /// Administrators may not delete their own account.
    pub fn guard_not_self(&self, target_user_id: i32) -> Result<(), AccessError> {
        if self.user_id == target_user_id {
            Err(AccessError::SelfAction(target_user_id))
        } else {
            Ok(())
        }
    }
}
