pub mod courses;
pub mod enrollments;
pub mod initdb;
pub mod users;

pub use initdb::init_database;

use registry::{AccessError, Actor, Operation, Registry, RegistryError};
use thiserror::Error;
use tracing::{debug, warn};

use crate::schemas::ErrorResponse;

/// Failure of a CLI command, as reported to the caller.
#[derive(Error, Debug)]
pub enum CommandError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Access(#[from] AccessError),

    #[error("unknown actor '{0}'")]
    UnknownActor(String),

    #[error("actor '{0}' is disabled")]
    DisabledActor(String),

    /// Students act on their own enrollments only
    #[error("students may only act on their own enrollments")]
    NotOwner,

    #[error("a student, course or teacher must be given")]
    MissingScope,
}

impl CommandError {
    pub fn code(&self) -> &'static str {
        match self {
            CommandError::Registry(err) => err.code(),
            CommandError::Access(AccessError::Forbidden { .. }) => "FORBIDDEN",
            CommandError::Access(AccessError::SelfAction(_)) => "SELF_ACTION",
            CommandError::UnknownActor(_) | CommandError::DisabledActor(_) => "UNAUTHORIZED",
            CommandError::NotOwner => "FORBIDDEN",
            CommandError::MissingScope => "INVALID_INPUT",
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.to_string(),
            code: self.code().to_string(),
            success: false,
        }
    }
}

/// Looks up the acting user by username. Disabled accounts may not act.
pub async fn resolve_actor(registry: &Registry, username: &str) -> Result<Actor, CommandError> {
    let user = match registry.identity.get_by_username(username).await {
        Ok(user) => user,
        Err(RegistryError::NotFound { .. }) => {
            warn!("Unknown actor '{}'", username);
            return Err(CommandError::UnknownActor(username.to_string()));
        }
        Err(err) => return Err(err.into()),
    };
    if !user.enabled {
        warn!("Disabled actor '{}' attempted a command", username);
        return Err(CommandError::DisabledActor(username.to_string()));
    }
    debug!("Acting as {} ({})", user.username, user.role);
    Ok(Actor::new(user.id, user.role))
}

/// Resolves the actor and checks it may run `operation`.
pub async fn authorize(
    registry: &Registry,
    username: &str,
    operation: Operation,
) -> Result<Actor, CommandError> {
    let actor = resolve_actor(registry, username).await?;
    actor.authorize(operation)?;
    Ok(actor)
}
