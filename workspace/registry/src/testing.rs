//! Shared fixtures for the rule tests.

use migration::{Migrator, MigratorTrait};
use model::entities::{course, user};
use model::Role;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Database, DatabaseConnection, Set};

/// Fresh in-memory database with foreign keys enforced and the schema migrated.
pub(crate) async fn setup_test_db() -> DatabaseConnection {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to connect to test database");
    db.execute_unprepared("PRAGMA foreign_keys = ON;")
        .await
        .expect("Failed to enable foreign keys");
    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
    db
}

/// Inserts a user directly, bypassing the identity rules.
pub(crate) async fn user_with_role(
    db: &DatabaseConnection,
    username: &str,
    role: Role,
) -> user::Model {
    user::ActiveModel {
        username: Set(username.to_string()),
        password_hash: Set("$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string()),
        email: Set(format!("{}@school.test", username)),
        full_name: Set(format!("{} Tester", username)),
        role: Set(role),
        enabled: Set(true),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to insert user fixture")
}

pub(crate) async fn student(db: &DatabaseConnection, username: &str) -> user::Model {
    user_with_role(db, username, Role::Student).await
}

pub(crate) async fn teacher(db: &DatabaseConnection, username: &str) -> user::Model {
    user_with_role(db, username, Role::Teacher).await
}

pub(crate) async fn admin(db: &DatabaseConnection, username: &str) -> user::Model {
    user_with_role(db, username, Role::Admin).await
}

pub(crate) async fn course(
    db: &DatabaseConnection,
    code: &str,
    teacher_id: Option<i32>,
) -> course::Model {
    course::ActiveModel {
        course_code: Set(code.to_string()),
        course_name: Set(format!("Course {}", code)),
        description: Set(None),
        credits: Set(3),
        teacher_id: Set(teacher_id),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to insert course fixture")
}
