//! Repository helpers over the SeaORM connection.
//!
//! Every helper is generic over [`ConnectionTrait`] so the rules can run the
//! same lookups against the plain connection for reads and against an open
//! transaction for writes.

use model::entities::{course, enrollment, user};
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter};

use crate::error::{EntityKind, IdentityField, RegistryError, Result};

pub(crate) async fn username_taken<C: ConnectionTrait>(conn: &C, username: &str) -> Result<bool> {
    let found = user::Entity::find()
        .filter(user::Column::Username.eq(username))
        .one(conn)
        .await?;
    Ok(found.is_some())
}

pub(crate) async fn email_taken<C: ConnectionTrait>(conn: &C, email: &str) -> Result<bool> {
    let found = user::Entity::find()
        .filter(user::Column::Email.eq(email))
        .one(conn)
        .await?;
    Ok(found.is_some())
}

pub(crate) async fn course_code_taken<C: ConnectionTrait>(conn: &C, code: &str) -> Result<bool> {
    let found = course::Entity::find()
        .filter(course::Column::CourseCode.eq(code))
        .one(conn)
        .await?;
    Ok(found.is_some())
}

pub(crate) async fn enrollment_exists<C: ConnectionTrait>(
    conn: &C,
    student_id: i32,
    course_id: i32,
) -> Result<bool> {
    let found = enrollment::Entity::find()
        .filter(enrollment::Column::StudentId.eq(student_id))
        .filter(enrollment::Column::CourseId.eq(course_id))
        .one(conn)
        .await?;
    Ok(found.is_some())
}

/// Resolves a user, reporting absence as `entity` (user, teacher or student).
pub(crate) async fn require_user<C: ConnectionTrait>(
    conn: &C,
    id: i32,
    entity: EntityKind,
) -> Result<user::Model> {
    user::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| RegistryError::not_found(entity, id))
}

pub(crate) async fn require_course<C: ConnectionTrait>(conn: &C, id: i32) -> Result<course::Model> {
    course::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| RegistryError::not_found(EntityKind::Course, id))
}

pub(crate) async fn require_enrollment<C: ConnectionTrait>(
    conn: &C,
    id: i32,
) -> Result<enrollment::Model> {
    enrollment::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| RegistryError::not_found(EntityKind::Enrollment, id))
}

/// Resolves `id` and checks it holds `role`.
pub(crate) async fn require_user_with_role<C: ConnectionTrait>(
    conn: &C,
    id: i32,
    role: model::Role,
    entity: EntityKind,
) -> Result<user::Model> {
    let found = require_user(conn, id, entity).await?;
    if !found.has_role(role) {
        return Err(RegistryError::RoleMismatch {
            user_id: found.id,
            expected: role,
            actual: found.role,
        });
    }
    Ok(found)
}

pub(crate) async fn delete_enrollments_of_course<C: ConnectionTrait>(
    conn: &C,
    course_id: i32,
) -> std::result::Result<u64, DbErr> {
    let result = enrollment::Entity::delete_many()
        .filter(enrollment::Column::CourseId.eq(course_id))
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}

pub(crate) async fn delete_enrollments_of_student<C: ConnectionTrait>(
    conn: &C,
    student_id: i32,
) -> std::result::Result<u64, DbErr> {
    let result = enrollment::Entity::delete_many()
        .filter(enrollment::Column::StudentId.eq(student_id))
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}

/// Maps a unique violation on the users table to the colliding field.
pub(crate) fn identity_conflict(message: &str) -> Option<RegistryError> {
    let message = message.to_lowercase();
    if message.contains("username") {
        Some(RegistryError::DuplicateIdentity(IdentityField::Username))
    } else if message.contains("email") {
        Some(RegistryError::DuplicateIdentity(IdentityField::Email))
    } else {
        None
    }
}

/// Maps a unique violation on the courses table.
pub(crate) fn course_code_conflict(message: &str, code: &str) -> Option<RegistryError> {
    if message.to_lowercase().contains("course_code") {
        Some(RegistryError::DuplicateCode(code.to_string()))
    } else {
        None
    }
}

/// Name of the unique index on the enrollment pair, as created by the migrator.
const ENROLLMENT_PAIR_INDEX: &str = "uq_enrollments_student_course";

/// Maps a unique violation on the (student, course) pair.
///
/// SQLite names the columns in its message, Postgres only the index.
pub(crate) fn enrollment_conflict(
    message: &str,
    student_id: i32,
    course_id: i32,
) -> Option<RegistryError> {
    let message = message.to_lowercase();
    if message.contains(ENROLLMENT_PAIR_INDEX)
        || (message.contains("student_id") && message.contains("course_id"))
    {
        Some(RegistryError::DuplicateEnrollment {
            student_id,
            course_id,
        })
    } else {
        None
    }
}
