use model::entities::user;
use model::Role;
use registry::{Operation, Registration, Registry, UserRemoval};
use tracing::{info, instrument};

use super::{authorize, CommandError};
use crate::schemas::ApiResponse;

/// Public registration; no actor involved.
#[instrument(skip(registry))]
pub async fn register(
    registry: &Registry,
    registration: Registration,
) -> Result<ApiResponse<user::Model>, CommandError> {
    let created = registry.identity.register(registration).await?;
    Ok(ApiResponse::ok(created, "User registered successfully"))
}

#[instrument(skip(registry))]
pub async fn list(
    registry: &Registry,
    actor: &str,
    role: Option<Role>,
) -> Result<ApiResponse<Vec<user::Model>>, CommandError> {
    authorize(registry, actor, Operation::ListUsers).await?;
    let users = registry.identity.list(role).await?;
    let message = format!("Retrieved {} users", users.len());
    Ok(ApiResponse::ok(users, message))
}

#[instrument(skip(registry))]
pub async fn toggle(
    registry: &Registry,
    actor: &str,
    user_id: i32,
) -> Result<ApiResponse<user::Model>, CommandError> {
    authorize(registry, actor, Operation::ToggleUserEnabled).await?;
    let updated = registry.identity.toggle_enabled(user_id).await?;
    let message = if updated.enabled {
        "User enabled"
    } else {
        "User disabled"
    };
    Ok(ApiResponse::ok(updated, message))
}

#[instrument(skip(registry))]
pub async fn delete(
    registry: &Registry,
    actor: &str,
    user_id: i32,
) -> Result<ApiResponse<UserRemoval>, CommandError> {
    let admin = authorize(registry, actor, Operation::DeleteUser).await?;
    admin.guard_not_self(user_id)?;
    let removal = registry.identity.delete(user_id).await?;
    info!("Admin {} deleted user {}", admin.user_id, user_id);
    Ok(ApiResponse::ok(removal, "User deleted successfully"))
}
