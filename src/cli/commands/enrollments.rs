use model::entities::enrollment;
use model::{EnrollmentStatus, Role};
use registry::{Actor, Operation, Registry};
use tracing::{debug, instrument};

use super::{authorize, CommandError};
use crate::schemas::ApiResponse;

/// Whose enrollments to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// The actor's own: as a student, or across the courses they teach.
    Own,
    Student(i32),
    Course(i32),
    Teacher(i32),
}

fn require_owner(actor: &Actor, student_id: i32) -> Result<(), CommandError> {
    if actor.role == Role::Student && actor.user_id != student_id {
        debug!(
            "Student {} tried to act on enrollments of {}",
            actor.user_id, student_id
        );
        return Err(CommandError::NotOwner);
    }
    Ok(())
}

#[instrument(skip(registry))]
pub async fn enroll(
    registry: &Registry,
    actor: &str,
    student_id: Option<i32>,
    course_id: i32,
) -> Result<ApiResponse<enrollment::Model>, CommandError> {
    let actor = authorize(registry, actor, Operation::Enroll).await?;
    let student_id = student_id.unwrap_or(actor.user_id);
    require_owner(&actor, student_id)?;

    let created = registry.enrollments.enroll(student_id, course_id).await?;
    Ok(ApiResponse::ok(created, "Enrolled successfully"))
}

#[instrument(skip(registry))]
pub async fn drop_enrollment(
    registry: &Registry,
    actor: &str,
    enrollment_id: i32,
) -> Result<ApiResponse<i32>, CommandError> {
    let actor = authorize(registry, actor, Operation::DropEnrollment).await?;
    let existing = registry.enrollments.get(enrollment_id).await?;
    require_owner(&actor, existing.student_id)?;

    registry.enrollments.drop_enrollment(enrollment_id).await?;
    Ok(ApiResponse::ok(enrollment_id, "Enrollment dropped successfully"))
}

#[instrument(skip(registry))]
pub async fn grade(
    registry: &Registry,
    actor: &str,
    enrollment_id: i32,
    value: f64,
) -> Result<ApiResponse<enrollment::Model>, CommandError> {
    authorize(registry, actor, Operation::UpdateGrade).await?;
    let updated = registry.enrollments.update_grade(enrollment_id, value).await?;
    Ok(ApiResponse::ok(updated, "Grade updated successfully"))
}

#[instrument(skip(registry))]
pub async fn status(
    registry: &Registry,
    actor: &str,
    enrollment_id: i32,
    status: EnrollmentStatus,
) -> Result<ApiResponse<enrollment::Model>, CommandError> {
    authorize(registry, actor, Operation::UpdateStatus).await?;
    let updated = registry
        .enrollments
        .update_status(enrollment_id, status)
        .await?;
    Ok(ApiResponse::ok(updated, "Status updated successfully"))
}

#[instrument(skip(registry))]
pub async fn list(
    registry: &Registry,
    actor: &str,
    scope: Scope,
) -> Result<ApiResponse<Vec<enrollment::Model>>, CommandError> {
    let found = match scope {
        Scope::Own => {
            let actor = authorize(registry, actor, Operation::ListStudentEnrollments).await?;
            match actor.role {
                Role::Student => registry.enrollments.list_by_student(actor.user_id).await?,
                Role::Teacher => {
                    actor.authorize(Operation::ListTeacherEnrollments)?;
                    registry.enrollments.list_by_teacher(actor.user_id).await?
                }
                Role::Admin => return Err(CommandError::MissingScope),
            }
        }
        Scope::Student(student_id) => {
            let actor = authorize(registry, actor, Operation::ListStudentEnrollments).await?;
            require_owner(&actor, student_id)?;
            registry.enrollments.list_by_student(student_id).await?
        }
        Scope::Course(course_id) => {
            authorize(registry, actor, Operation::ListCourseEnrollments).await?;
            registry.enrollments.list_by_course(course_id).await?
        }
        Scope::Teacher(teacher_id) => {
            authorize(registry, actor, Operation::ListTeacherEnrollments).await?;
            registry.enrollments.list_by_teacher(teacher_id).await?
        }
    };

    let message = format!("Retrieved {} enrollments", found.len());
    Ok(ApiResponse::ok(found, message))
}
