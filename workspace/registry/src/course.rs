use model::entities::course::{self, DESCRIPTION_MAX_LEN};
use model::Role;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use tracing::{debug, info, instrument, trace, warn};

use crate::error::{require_non_blank, EntityKind, RegistryError, Result};
use crate::store;

/// Input for a new course.
#[derive(Debug, Clone)]
pub struct NewCourse {
    pub course_code: String,
    pub course_name: String,
    pub description: Option<String>,
    pub credits: i32,
    pub teacher_id: Option<i32>,
}

/// What to do with the course's teacher on update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TeacherAssignment {
    #[default]
    Keep,
    Assign(i32),
    Unassign,
}

/// Partial update. Absent fields keep their stored value; the course code
/// cannot be changed.
#[derive(Debug, Clone, Default)]
pub struct CourseChanges {
    pub course_name: Option<String>,
    /// `Some(None)` clears the description.
    pub description: Option<Option<String>>,
    pub credits: Option<i32>,
    pub teacher: TeacherAssignment,
}

fn validate_credits(credits: i32) -> Result<()> {
    if credits <= 0 {
        return Err(RegistryError::InvalidInput(format!(
            "credits must be positive, got {}",
            credits
        )));
    }
    Ok(())
}

fn validate_description(description: Option<&str>) -> Result<()> {
    match description {
        Some(text) if text.chars().count() > DESCRIPTION_MAX_LEN => {
            Err(RegistryError::InvalidInput(format!(
                "description exceeds {} characters",
                DESCRIPTION_MAX_LEN
            )))
        }
        _ => Ok(()),
    }
}

async fn require_teacher<C: ConnectionTrait>(conn: &C, teacher_id: i32) -> Result<()> {
    store::require_user_with_role(conn, teacher_id, Role::Teacher, EntityKind::Teacher).await?;
    Ok(())
}

/// Course catalogue rules.
#[derive(Debug, Clone)]
pub struct CourseRules {
    db: DatabaseConnection,
}

impl CourseRules {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, new_course), fields(course_code = %new_course.course_code))]
    pub async fn create(&self, new_course: NewCourse) -> Result<course::Model> {
        trace!("Entering create course");
        require_non_blank("course code", &new_course.course_code)?;
        require_non_blank("course name", &new_course.course_name)?;
        validate_credits(new_course.credits)?;
        validate_description(new_course.description.as_deref())?;

        let txn = self.db.begin().await?;

        if store::course_code_taken(&txn, &new_course.course_code).await? {
            warn!("Course code '{}' already exists", new_course.course_code);
            return Err(RegistryError::DuplicateCode(new_course.course_code));
        }
        if let Some(teacher_id) = new_course.teacher_id {
            require_teacher(&txn, teacher_id).await?;
        }

        let code = new_course.course_code.clone();
        let created = course::ActiveModel {
            course_code: Set(new_course.course_code),
            course_name: Set(new_course.course_name),
            description: Set(new_course.description),
            credits: Set(new_course.credits),
            teacher_id: Set(new_course.teacher_id),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| RegistryError::from_write(e, |m| store::course_code_conflict(m, &code)))?;

        txn.commit().await?;
        info!(
            "Course created with ID: {}, code: {}",
            created.id, created.course_code
        );
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn update(&self, course_id: i32, changes: CourseChanges) -> Result<course::Model> {
        if let Some(name) = &changes.course_name {
            require_non_blank("course name", name)?;
        }
        if let Some(credits) = changes.credits {
            validate_credits(credits)?;
        }
        if let Some(description) = &changes.description {
            validate_description(description.as_deref())?;
        }

        let txn = self.db.begin().await?;
        let existing = store::require_course(&txn, course_id).await?;
        let mut active: course::ActiveModel = existing.clone().into();
        let mut updated_fields = Vec::new();

        if let Some(name) = changes.course_name {
            updated_fields.push(format!("course_name: {}", name));
            active.course_name = Set(name);
        }
        if let Some(description) = changes.description {
            updated_fields.push("description".to_string());
            active.description = Set(description);
        }
        if let Some(credits) = changes.credits {
            updated_fields.push(format!("credits: {}", credits));
            active.credits = Set(credits);
        }
        match changes.teacher {
            TeacherAssignment::Keep => {}
            TeacherAssignment::Assign(teacher_id) => {
                require_teacher(&txn, teacher_id).await?;
                updated_fields.push(format!("teacher_id: {}", teacher_id));
                active.teacher_id = Set(Some(teacher_id));
            }
            TeacherAssignment::Unassign => {
                updated_fields.push("teacher_id: none".to_string());
                active.teacher_id = Set(None);
            }
        }

        if updated_fields.is_empty() {
            debug!("No fields to update for course ID: {}", course_id);
            txn.commit().await?;
            return Ok(existing);
        }
        debug!("Updating fields: {}", updated_fields.join(", "));

        let updated = active.update(&txn).await?;
        txn.commit().await?;
        info!("Course {} updated", updated.course_code);
        Ok(updated)
    }

    /// Removes the course and every enrollment in it. Returns how many
    /// enrollments went with it.
    #[instrument(skip(self))]
    pub async fn delete(&self, course_id: i32) -> Result<u64> {
        let txn = self.db.begin().await?;
        let existing = store::require_course(&txn, course_id).await?;

        let removed = store::delete_enrollments_of_course(&txn, course_id).await?;
        course::Entity::delete_by_id(course_id)
            .exec(&txn)
            .await
            .map_err(|e| RegistryError::from_write(e, |_| None))?;

        txn.commit().await?;
        info!(
            "Course {} deleted with {} enrollments",
            existing.course_code, removed
        );
        Ok(removed)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, course_id: i32) -> Result<course::Model> {
        store::require_course(&self.db, course_id).await
    }

    #[instrument(skip(self))]
    pub async fn get_by_code(&self, course_code: &str) -> Result<course::Model> {
        course::Entity::find()
            .filter(course::Column::CourseCode.eq(course_code))
            .one(&self.db)
            .await?
            .ok_or_else(|| RegistryError::not_found(EntityKind::Course, course_code))
    }

    /// All courses, or only those taught by `teacher_id`.
    #[instrument(skip(self))]
    pub async fn list(&self, teacher_id: Option<i32>) -> Result<Vec<course::Model>> {
        let mut query = course::Entity::find().order_by_asc(course::Column::Id);
        if let Some(teacher_id) = teacher_id {
            query = query.filter(course::Column::TeacherId.eq(teacher_id));
        }
        let courses = query.all(&self.db).await?;
        debug!("Retrieved {} courses", courses.len());
        Ok(courses)
    }
}
