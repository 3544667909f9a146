use sea_orm::entity::prelude::*;
use serde::Serialize;
use tracing::warn;

/// Longest description a course may carry.
pub const DESCRIPTION_MAX_LEN: usize = 1000;

/// A teachable unit, optionally owned by one teacher.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "courses")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Catalogue code such as "CS101". Unique and fixed once created.
    #[sea_orm(unique)]
    pub course_code: String,
    pub course_name: String,
    pub description: Option<String>,
    /// Always positive.
    pub credits: i32,
    /// The teacher responsible for the course, if any.
    pub teacher_id: Option<i32>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::TeacherId",
        to = "super::user::Column::Id"
    )]
    Teacher,
    #[sea_orm(has_many = "super::enrollment::Entity")]
    Enrollment,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Teacher.def()
    }
}

impl Related<super::enrollment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Enrollment.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        if !insert && self.course_code.is_set() {
            warn!("Rejected course code change on existing course");
            return Err(DbErr::Custom("course code is immutable".to_string()));
        }
        Ok(self)
    }
}
