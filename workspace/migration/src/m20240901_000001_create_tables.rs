use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create users table
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(pk_auto(Users::Id))
                    .col(string(Users::Username).unique_key())
                    .col(string(Users::PasswordHash))
                    .col(string(Users::Email).unique_key())
                    .col(string(Users::FullName))
                    .col(string_len(Users::Role, 16))
                    .col(boolean(Users::Enabled).default(true))
                    .to_owned(),
            )
            .await?;

        // Create courses table.
        // Deleting a teacher with courses is refused; the application removes courses first.
        manager
            .create_table(
                Table::create()
                    .table(Courses::Table)
                    .if_not_exists()
                    .col(pk_auto(Courses::Id))
                    .col(string(Courses::CourseCode).unique_key())
                    .col(string(Courses::CourseName))
                    .col(string_len_null(Courses::Description, 1000))
                    .col(integer(Courses::Credits))
                    .col(integer_null(Courses::TeacherId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_course_teacher")
                            .from(Courses::Table, Courses::TeacherId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create enrollments table.
        // Both parents restrict deletion so every cascade is explicit application logic.
        manager
            .create_table(
                Table::create()
                    .table(Enrollments::Table)
                    .if_not_exists()
                    .col(pk_auto(Enrollments::Id))
                    .col(integer(Enrollments::StudentId))
                    .col(integer(Enrollments::CourseId))
                    .col(timestamp_with_time_zone(Enrollments::EnrollmentDate))
                    .col(string_len(Enrollments::Status, 16).default("ACTIVE"))
                    .col(double_null(Enrollments::Grade))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_enrollment_student")
                            .from(Enrollments::Table, Enrollments::StudentId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_enrollment_course")
                            .from(Enrollments::Table, Enrollments::CourseId)
                            .to(Courses::Table, Courses::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One enrollment per student and course
        manager
            .create_index(
                Index::create()
                    .name("uq_enrollments_student_course")
                    .table(Enrollments::Table)
                    .col(Enrollments::StudentId)
                    .col(Enrollments::CourseId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop tables in reverse order of creation
        manager
            .drop_table(Table::drop().table(Enrollments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Courses::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
pub(crate) enum Users {
    Table,
    Id,
    Username,
    PasswordHash,
    Email,
    FullName,
    Role,
    Enabled,
}

#[derive(DeriveIden)]
pub(crate) enum Courses {
    Table,
    Id,
    CourseCode,
    CourseName,
    Description,
    Credits,
    TeacherId,
}

#[derive(DeriveIden)]
pub(crate) enum Enrollments {
    Table,
    Id,
    StudentId,
    CourseId,
    EnrollmentDate,
    Status,
    Grade,
}
