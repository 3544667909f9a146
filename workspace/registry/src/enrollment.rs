use model::entities::{course, enrollment};
use model::{EnrollmentStatus, Role};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use tracing::{debug, info, instrument, warn};

use crate::error::{EntityKind, RegistryError, Result};
use crate::store;

/// Enrollment lifecycle rules.
///
/// Status changes are not checked against a transition table: an enrollment
/// that is `Completed` or `Dropped` can still be moved elsewhere. Such moves
/// are logged at warn level.
#[derive(Debug, Clone)]
pub struct EnrollmentRules {
    db: DatabaseConnection,
}

impl EnrollmentRules {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Enrolls a student in a course. The new enrollment is `Active`,
    /// ungraded and dated now.
    #[instrument(skip(self))]
    pub async fn enroll(&self, student_id: i32, course_id: i32) -> Result<enrollment::Model> {
        let txn = self.db.begin().await?;

        if store::enrollment_exists(&txn, student_id, course_id).await? {
            warn!(
                "Student {} is already enrolled in course {}",
                student_id, course_id
            );
            return Err(RegistryError::DuplicateEnrollment {
                student_id,
                course_id,
            });
        }
        store::require_user_with_role(&txn, student_id, Role::Student, EntityKind::Student)
            .await?;
        store::require_course(&txn, course_id).await?;

        let created = enrollment::ActiveModel {
            student_id: Set(student_id),
            course_id: Set(course_id),
            status: Set(EnrollmentStatus::Active),
            grade: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            RegistryError::from_write(e, |m| store::enrollment_conflict(m, student_id, course_id))
        })?;

        txn.commit().await?;
        info!(
            "Enrollment created with ID: {} for student {} in course {}",
            created.id, student_id, course_id
        );
        Ok(created)
    }

    /// Removes the enrollment outright.
    #[instrument(skip(self))]
    pub async fn drop_enrollment(&self, enrollment_id: i32) -> Result<()> {
        let txn = self.db.begin().await?;
        store::require_enrollment(&txn, enrollment_id).await?;
        enrollment::Entity::delete_by_id(enrollment_id)
            .exec(&txn)
            .await?;
        txn.commit().await?;
        info!("Enrollment {} dropped", enrollment_id);
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn update_grade(&self, enrollment_id: i32, grade: f64) -> Result<enrollment::Model> {
        if !grade.is_finite() {
            return Err(RegistryError::InvalidInput(format!(
                "grade must be a finite number, got {}",
                grade
            )));
        }

        let txn = self.db.begin().await?;
        let existing = store::require_enrollment(&txn, enrollment_id).await?;
        if existing.status != EnrollmentStatus::Active {
            debug!(
                "Grading enrollment {} in status {}",
                enrollment_id, existing.status
            );
        }

        let mut active: enrollment::ActiveModel = existing.into();
        active.grade = Set(Some(grade));
        let updated = active.update(&txn).await?;

        txn.commit().await?;
        info!("Enrollment {} graded {}", enrollment_id, grade);
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        enrollment_id: i32,
        status: EnrollmentStatus,
    ) -> Result<enrollment::Model> {
        let txn = self.db.begin().await?;
        let existing = store::require_enrollment(&txn, enrollment_id).await?;

        if existing.status.is_terminal() && existing.status != status {
            warn!(
                "Enrollment {} leaves terminal status {} for {}",
                enrollment_id, existing.status, status
            );
        }

        let mut active: enrollment::ActiveModel = existing.into();
        active.status = Set(status);
        let updated = active.update(&txn).await?;

        txn.commit().await?;
        info!("Enrollment {} is now {}", enrollment_id, status);
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, enrollment_id: i32) -> Result<enrollment::Model> {
        store::require_enrollment(&self.db, enrollment_id).await
    }

    #[instrument(skip(self))]
    pub async fn list_by_student(&self, student_id: i32) -> Result<Vec<enrollment::Model>> {
        Ok(enrollment::Entity::find()
            .filter(enrollment::Column::StudentId.eq(student_id))
            .order_by_asc(enrollment::Column::Id)
            .all(&self.db)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn list_by_course(&self, course_id: i32) -> Result<Vec<enrollment::Model>> {
        Ok(enrollment::Entity::find()
            .filter(enrollment::Column::CourseId.eq(course_id))
            .order_by_asc(enrollment::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// Enrollments across every course the teacher owns.
    #[instrument(skip(self))]
    pub async fn list_by_teacher(&self, teacher_id: i32) -> Result<Vec<enrollment::Model>> {
        let found = enrollment::Entity::find()
            .inner_join(course::Entity)
            .filter(course::Column::TeacherId.eq(teacher_id))
            .order_by_asc(enrollment::Column::Id)
            .all(&self.db)
            .await?;
        debug!("Teacher {} has {} enrollments", teacher_id, found.len());
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{admin, course as insert_course, setup_test_db, student, teacher};
    use chrono::Utc;

    #[tokio::test]
    async fn test_enroll_starts_active_and_ungraded() {
        let db = setup_test_db().await;
        let rules = EnrollmentRules::new(db.clone());
        let alice = student(&db, "alice").await;
        let cs101 = insert_course(&db, "CS101", None).await;

        let before = Utc::now();
        let created = rules.enroll(alice.id, cs101.id).await.unwrap();

        assert_eq!(created.status, EnrollmentStatus::Active);
        assert_eq!(created.grade, None);
        assert!(created.enrollment_date >= before - chrono::Duration::seconds(1));
        assert!(created.enrollment_date <= Utc::now());
        assert_eq!(rules.get(created.id).await.unwrap().id, created.id);
    }

    #[tokio::test]
    async fn test_second_enrollment_for_same_pair_is_rejected() {
        let db = setup_test_db().await;
        let rules = EnrollmentRules::new(db.clone());
        let alice = student(&db, "alice").await;
        let cs101 = insert_course(&db, "CS101", None).await;
        rules.enroll(alice.id, cs101.id).await.unwrap();

        let err = rules.enroll(alice.id, cs101.id).await.unwrap_err();
        assert!(matches!(
            err,
            RegistryError::DuplicateEnrollment { student_id, course_id }
                if student_id == alice.id && course_id == cs101.id
        ));
        assert_eq!(rules.list_by_student(alice.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_only_students_can_enroll() {
        let db = setup_test_db().await;
        let rules = EnrollmentRules::new(db.clone());
        let bob = teacher(&db, "bob").await;
        let root = admin(&db, "root").await;
        let cs101 = insert_course(&db, "CS101", Some(bob.id)).await;

        let err = rules.enroll(bob.id, cs101.id).await.unwrap_err();
        assert!(matches!(
            err,
            RegistryError::RoleMismatch { expected: Role::Student, actual: Role::Teacher, .. }
        ));
        assert!(rules.enroll(root.id, cs101.id).await.is_err());

        let err = rules.enroll(9999, cs101.id).await.unwrap_err();
        assert!(matches!(err, RegistryError::NotFound { entity: EntityKind::Student, .. }));

        let alice = student(&db, "alice").await;
        let err = rules.enroll(alice.id, 9999).await.unwrap_err();
        assert!(matches!(err, RegistryError::NotFound { entity: EntityKind::Course, .. }));

        assert!(rules.list_by_course(cs101.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_grade_and_status_updates() {
        let db = setup_test_db().await;
        let rules = EnrollmentRules::new(db.clone());
        let alice = student(&db, "alice").await;
        let cs101 = insert_course(&db, "CS101", None).await;
        let created = rules.enroll(alice.id, cs101.id).await.unwrap();

        let graded = rules.update_grade(created.id, 3.7).await.unwrap();
        assert_eq!(graded.grade, Some(3.7));
        assert_eq!(graded.status, EnrollmentStatus::Active);
        assert_eq!(graded.enrollment_date, created.enrollment_date);

        let completed = rules
            .update_status(created.id, EnrollmentStatus::Completed)
            .await
            .unwrap();
        assert_eq!(completed.status, EnrollmentStatus::Completed);
        assert_eq!(completed.grade, Some(3.7));

        let err = rules.update_grade(created.id, f64::NAN).await.unwrap_err();
        assert!(matches!(err, RegistryError::InvalidInput(_)));

        let err = rules.update_grade(9999, 2.0).await.unwrap_err();
        assert!(matches!(err, RegistryError::NotFound { entity: EntityKind::Enrollment, .. }));
        let err = rules
            .update_status(9999, EnrollmentStatus::Dropped)
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_terminal_statuses_can_still_be_left() {
        let db = setup_test_db().await;
        let rules = EnrollmentRules::new(db.clone());
        let alice = student(&db, "alice").await;
        let cs101 = insert_course(&db, "CS101", None).await;
        let created = rules.enroll(alice.id, cs101.id).await.unwrap();

        rules
            .update_status(created.id, EnrollmentStatus::Dropped)
            .await
            .unwrap();
        let reopened = rules
            .update_status(created.id, EnrollmentStatus::Active)
            .await
            .unwrap();
        assert_eq!(reopened.status, EnrollmentStatus::Active);

        rules
            .update_status(created.id, EnrollmentStatus::Completed)
            .await
            .unwrap();
        let dropped = rules
            .update_status(created.id, EnrollmentStatus::Dropped)
            .await
            .unwrap();
        assert_eq!(dropped.status, EnrollmentStatus::Dropped);

        // Grading a dropped enrollment is allowed too
        let graded = rules.update_grade(created.id, 1.0).await.unwrap();
        assert_eq!(graded.grade, Some(1.0));
    }

    #[tokio::test]
    async fn test_drop_deletes_enrollment() {
        let db = setup_test_db().await;
        let rules = EnrollmentRules::new(db.clone());
        let alice = student(&db, "alice").await;
        let cs101 = insert_course(&db, "CS101", None).await;
        let created = rules.enroll(alice.id, cs101.id).await.unwrap();

        rules.drop_enrollment(created.id).await.unwrap();
        assert!(rules.get(created.id).await.is_err());

        let err = rules.drop_enrollment(created.id).await.unwrap_err();
        assert!(matches!(err, RegistryError::NotFound { entity: EntityKind::Enrollment, .. }));

        // The pair is free again
        assert!(rules.enroll(alice.id, cs101.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_listing_by_student_course_and_teacher() {
        let db = setup_test_db().await;
        let rules = EnrollmentRules::new(db.clone());
        let bob = teacher(&db, "bob").await;
        let carol = teacher(&db, "carol").await;
        let alice = student(&db, "alice").await;
        let dave = student(&db, "dave").await;
        let cs101 = insert_course(&db, "CS101", Some(bob.id)).await;
        let cs102 = insert_course(&db, "CS102", Some(bob.id)).await;
        let ma101 = insert_course(&db, "MA101", Some(carol.id)).await;

        rules.enroll(alice.id, cs101.id).await.unwrap();
        rules.enroll(alice.id, ma101.id).await.unwrap();
        rules.enroll(dave.id, cs101.id).await.unwrap();
        rules.enroll(dave.id, cs102.id).await.unwrap();

        assert_eq!(rules.list_by_student(alice.id).await.unwrap().len(), 2);
        assert_eq!(rules.list_by_course(cs101.id).await.unwrap().len(), 2);

        let for_bob = rules.list_by_teacher(bob.id).await.unwrap();
        assert_eq!(for_bob.len(), 3);
        assert!(for_bob.iter().all(|e| e.course_id != ma101.id));
        assert_eq!(rules.list_by_teacher(carol.id).await.unwrap().len(), 1);
        assert!(rules.list_by_teacher(alice.id).await.unwrap().is_empty());
    }
}
