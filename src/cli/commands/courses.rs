use model::entities::course;
use registry::{CourseChanges, NewCourse, Operation, Registry};
use tracing::instrument;

use super::{authorize, CommandError};
use crate::schemas::{ApiResponse, CourseRemoval};

#[instrument(skip(registry))]
pub async fn create(
    registry: &Registry,
    actor: &str,
    new_course: NewCourse,
) -> Result<ApiResponse<course::Model>, CommandError> {
    authorize(registry, actor, Operation::CreateCourse).await?;
    let created = registry.courses.create(new_course).await?;
    Ok(ApiResponse::ok(created, "Course created successfully"))
}

#[instrument(skip(registry))]
pub async fn update(
    registry: &Registry,
    actor: &str,
    course_id: i32,
    changes: CourseChanges,
) -> Result<ApiResponse<course::Model>, CommandError> {
    authorize(registry, actor, Operation::UpdateCourse).await?;
    let updated = registry.courses.update(course_id, changes).await?;
    Ok(ApiResponse::ok(updated, "Course updated successfully"))
}

#[instrument(skip(registry))]
pub async fn delete(
    registry: &Registry,
    actor: &str,
    course_id: i32,
) -> Result<ApiResponse<CourseRemoval>, CommandError> {
    authorize(registry, actor, Operation::DeleteCourse).await?;
    let enrollments_removed = registry.courses.delete(course_id).await?;
    Ok(ApiResponse::ok(
        CourseRemoval {
            course_id,
            enrollments_removed,
        },
        "Course deleted successfully",
    ))
}

#[instrument(skip(registry))]
pub async fn list(
    registry: &Registry,
    actor: &str,
    teacher_id: Option<i32>,
) -> Result<ApiResponse<Vec<course::Model>>, CommandError> {
    authorize(registry, actor, Operation::ListCourses).await?;
    let courses = registry.courses.list(teacher_id).await?;
    let message = format!("Retrieved {} courses", courses.len());
    Ok(ApiResponse::ok(courses, message))
}
