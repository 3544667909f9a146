use std::fmt;
use std::sync::Arc;

use model::entities::{course, user};
use model::Role;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::Serialize;
use tracing::{debug, info, instrument, trace, warn};

use crate::credentials::CredentialHasher;
use crate::error::{require_non_blank, EntityKind, IdentityField, RegistryError, Result};
use crate::store;

/// Input for a new account. The password arrives in plaintext and leaves
/// this module only as a hash.
#[derive(Clone)]
pub struct Registration {
    pub username: String,
    pub password: String,
    pub email: String,
    pub full_name: String,
    /// Students unless stated otherwise.
    pub role: Option<Role>,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("email", &self.email)
            .field("full_name", &self.full_name)
            .field("role", &self.role)
            .finish()
    }
}

/// What went away together with a deleted user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UserRemoval {
    pub enrollments_removed: u64,
    pub courses_removed: u64,
}

/// Account lifecycle: registration, enabling and removal.
#[derive(Clone)]
pub struct IdentityRules {
    db: DatabaseConnection,
    hasher: Arc<dyn CredentialHasher>,
}

impl IdentityRules {
    pub fn new(db: DatabaseConnection, hasher: Arc<dyn CredentialHasher>) -> Self {
        Self { db, hasher }
    }

    /// Creates an enabled account after checking username and email are free.
    #[instrument(skip(self, registration), fields(username = %registration.username))]
    pub async fn register(&self, registration: Registration) -> Result<user::Model> {
        trace!("Entering register");
        require_non_blank("username", &registration.username)?;
        require_non_blank("email", &registration.email)?;
        require_non_blank("full name", &registration.full_name)?;

        let txn = self.db.begin().await?;

        if store::username_taken(&txn, &registration.username).await? {
            warn!("Username '{}' already exists", registration.username);
            return Err(RegistryError::DuplicateIdentity(IdentityField::Username));
        }
        if store::email_taken(&txn, &registration.email).await? {
            warn!("Email '{}' already exists", registration.email);
            return Err(RegistryError::DuplicateIdentity(IdentityField::Email));
        }

        let role = registration.role.unwrap_or_default();
        debug!("Registering '{}' as {}", registration.username, role);
        let password_hash = self.hasher.hash(&registration.password)?;

        let created = user::ActiveModel {
            username: Set(registration.username),
            password_hash: Set(password_hash),
            email: Set(registration.email),
            full_name: Set(registration.full_name),
            role: Set(role),
            enabled: Set(true),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| RegistryError::from_write(e, store::identity_conflict))?;

        txn.commit().await?;
        info!(
            "User registered with ID: {}, username: {}, role: {}",
            created.id, created.username, created.role
        );
        Ok(created)
    }

    /// Flips the enabled flag and returns the updated user.
    #[instrument(skip(self))]
    pub async fn toggle_enabled(&self, user_id: i32) -> Result<user::Model> {
        let txn = self.db.begin().await?;
        let existing = store::require_user(&txn, user_id, EntityKind::User).await?;

        let enabled = !existing.enabled;
        let mut active: user::ActiveModel = existing.into();
        active.enabled = Set(enabled);
        let updated = active.update(&txn).await?;

        txn.commit().await?;
        info!("User {} is now {}", user_id, if enabled { "enabled" } else { "disabled" });
        Ok(updated)
    }

    /// Deletes the user along with their enrollments and the courses they
    /// teach, including the enrollments in those courses.
    #[instrument(skip(self))]
    pub async fn delete(&self, user_id: i32) -> Result<UserRemoval> {
        let txn = self.db.begin().await?;
        let existing = store::require_user(&txn, user_id, EntityKind::User).await?;

        let mut removal = UserRemoval {
            enrollments_removed: store::delete_enrollments_of_student(&txn, user_id).await?,
            ..Default::default()
        };

        let taught = course::Entity::find()
            .filter(course::Column::TeacherId.eq(user_id))
            .all(&txn)
            .await?;
        for taught_course in taught {
            debug!(
                "Removing course {} taught by user {}",
                taught_course.course_code, user_id
            );
            removal.enrollments_removed +=
                store::delete_enrollments_of_course(&txn, taught_course.id).await?;
            course::Entity::delete_by_id(taught_course.id)
                .exec(&txn)
                .await
                .map_err(|e| RegistryError::from_write(e, |_| None))?;
            removal.courses_removed += 1;
        }

        user::Entity::delete_by_id(user_id)
            .exec(&txn)
            .await
            .map_err(|e| RegistryError::from_write(e, |_| None))?;

        txn.commit().await?;
        info!(
            "User {} ('{}') deleted with {} enrollments and {} courses",
            user_id, existing.username, removal.enrollments_removed, removal.courses_removed
        );
        Ok(removal)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, user_id: i32) -> Result<user::Model> {
        store::require_user(&self.db, user_id, EntityKind::User).await
    }

    #[instrument(skip(self))]
    pub async fn get_by_username(&self, username: &str) -> Result<user::Model> {
        user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await?
            .ok_or_else(|| RegistryError::not_found(EntityKind::User, username))
    }

    /// All users, or only those holding `role`.
    #[instrument(skip(self))]
    pub async fn list(&self, role: Option<Role>) -> Result<Vec<user::Model>> {
        let mut query = user::Entity::find().order_by_asc(user::Column::Id);
        if let Some(role) = role {
            query = query.filter(user::Column::Role.eq(role));
        }
        let users = query.all(&self.db).await?;
        debug!("Retrieved {} users", users.len());
        Ok(users)
    }

    pub async fn count(&self) -> Result<u64> {
        Ok(user::Entity::find().count(&self.db).await?)
    }
}
