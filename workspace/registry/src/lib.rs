//! Business rules for the academic records registry.
//!
//! The rule components validate input, check references and uniqueness,
//! and run each write in its own transaction. Deciding whether a caller may
//! invoke an operation at all is the job of [`policy`].

use std::sync::Arc;

use sea_orm::DatabaseConnection;

pub mod course;
pub mod credentials;
pub mod enrollment;
pub mod error;
pub mod identity;
pub mod policy;
mod store;

#[cfg(test)]
mod testing;

pub use course::{CourseChanges, CourseRules, NewCourse, TeacherAssignment};
pub use credentials::{Argon2Hasher, CredentialError, CredentialHasher};
pub use enrollment::EnrollmentRules;
pub use error::{EntityKind, IdentityField, RegistryError, Result};
pub use identity::{IdentityRules, Registration, UserRemoval};
pub use policy::{permits, AccessError, Actor, Operation};

/// The three rule components over one connection.
#[derive(Clone)]
pub struct Registry {
    pub identity: IdentityRules,
    pub courses: CourseRules,
    pub enrollments: EnrollmentRules,
}

impl Registry {
    pub fn new(db: DatabaseConnection, hasher: Arc<dyn CredentialHasher>) -> Self {
        Self {
            identity: IdentityRules::new(db.clone(), hasher),
            courses: CourseRules::new(db.clone()),
            enrollments: EnrollmentRules::new(db),
        }
    }
}

/// Registry hashing credentials with [`Argon2Hasher`].
pub fn default_registry(db: DatabaseConnection) -> Registry {
    Registry::new(db, Arc::new(Argon2Hasher))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{admin, setup_test_db};
    use model::{EnrollmentStatus, Role};

    fn registration(username: &str, role: Option<Role>) -> Registration {
        Registration {
            username: username.to_string(),
            password: format!("{}-password", username),
            email: format!("{}@uni.test", username),
            full_name: format!("{} Example", username),
            role,
        }
    }

    /// A full term: register, open a course, enroll, grade, then remove the
    /// teacher and watch the cascade.
    #[tokio::test]
    async fn test_term_lifecycle() {
        let db = setup_test_db().await;
        let registry = default_registry(db.clone());
        let root = admin(&db, "root").await;
        let operator = Actor::new(root.id, root.role);

        let teacher = registry
            .identity
            .register(registration("turing", Some(Role::Teacher)))
            .await
            .unwrap();
        let alice = registry
            .identity
            .register(registration("alice", None))
            .await
            .unwrap();
        let bob = registry
            .identity
            .register(registration("bob", None))
            .await
            .unwrap();
        assert_eq!(alice.role, Role::Student);

        let teacher_actor = Actor::new(teacher.id, teacher.role);
        teacher_actor.authorize(Operation::CreateCourse).unwrap();
        let cs101 = registry
            .courses
            .create(NewCourse {
                course_code: "CS101".to_string(),
                course_name: "Computability".to_string(),
                description: None,
                credits: 5,
                teacher_id: Some(teacher.id),
            })
            .await
            .unwrap();

        let alice_actor = Actor::new(alice.id, alice.role);
        alice_actor.authorize(Operation::Enroll).unwrap();
        assert!(alice_actor.authorize(Operation::UpdateGrade).is_err());

        let enrolled = registry.enrollments.enroll(alice.id, cs101.id).await.unwrap();
        registry.enrollments.enroll(bob.id, cs101.id).await.unwrap();

        teacher_actor.authorize(Operation::UpdateGrade).unwrap();
        registry
            .enrollments
            .update_grade(enrolled.id, 4.0)
            .await
            .unwrap();
        let done = registry
            .enrollments
            .update_status(enrolled.id, EnrollmentStatus::Completed)
            .await
            .unwrap();
        assert_eq!(done.grade, Some(4.0));

        assert_eq!(
            registry.enrollments.list_by_teacher(teacher.id).await.unwrap().len(),
            2
        );

        operator.authorize(Operation::DeleteUser).unwrap();
        operator.guard_not_self(teacher.id).unwrap();
        assert!(operator.guard_not_self(root.id).is_err());

        let removal = registry.identity.delete(teacher.id).await.unwrap();
        assert_eq!(
            removal,
            UserRemoval {
                enrollments_removed: 2,
                courses_removed: 1
            }
        );
        assert!(registry.courses.list(None).await.unwrap().is_empty());
        assert!(registry.enrollments.list_by_student(alice.id).await.unwrap().is_empty());
        assert_eq!(registry.identity.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_registration_scenario() {
        let db = setup_test_db().await;
        let registry = default_registry(db);

        let alice = registry
            .identity
            .register(Registration {
                username: "alice".to_string(),
                password: "p1".to_string(),
                email: "a@x.com".to_string(),
                full_name: "Alice A".to_string(),
                role: None,
            })
            .await
            .unwrap();
        assert_eq!(alice.role, Role::Student);
        assert!(alice.enabled);

        let err = registry
            .identity
            .register(Registration {
                username: "alice".to_string(),
                password: "p2".to_string(),
                email: "b@x.com".to_string(),
                full_name: "Alice B".to_string(),
                role: Some(Role::Student),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateIdentity(IdentityField::Username)));
        assert_eq!(err.to_string(), "username already exists");
    }

    #[tokio::test]
    async fn test_failed_write_leaves_store_untouched() {
        let db = setup_test_db().await;
        let registry = default_registry(db);

        registry
            .identity
            .register(registration("alice", None))
            .await
            .unwrap();
        let err = registry
            .identity
            .register(registration("alice", Some(Role::Admin)))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "USERNAME_ALREADY_EXISTS");

        let users = registry.identity.list(None).await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].role, Role::Student);
    }
}
