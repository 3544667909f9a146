//! This file serves as the root for all SeaORM entity modules.
//! Users, courses and the enrollments that link students to courses.

pub mod course;
pub mod enrollment;
pub mod user;

pub mod prelude {
    //! A prelude module for easy importing of all entities.
    pub use super::course::Entity as Course;
    pub use super::enrollment::Entity as Enrollment;
    pub use super::enrollment::EnrollmentStatus;
    pub use super::user::Entity as User;
    pub use super::user::Role;
}
