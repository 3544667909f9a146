pub mod entities;

pub use entities::prelude::{EnrollmentStatus, Role};
