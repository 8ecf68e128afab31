//! Database migrations for school service

use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_school_structure::Migration),
            Box::new(m20250301_000002_create_coursework::Migration),
            Box::new(m20250301_000003_create_attendance::Migration),
            Box::new(m20250301_000004_create_gamification::Migration),
        ]
    }
}

fn id_column<T: IntoIden + 'static>(column: T) -> ColumnDef {
    ColumnDef::new(column)
        .big_integer()
        .not_null()
        .auto_increment()
        .primary_key()
        .to_owned()
}

fn foreign_key<T, C, R, K>(
    name: &str,
    from: (T, C),
    to: (R, K),
    on_delete: ForeignKeyAction,
) -> ForeignKeyCreateStatement
where
    T: IntoIden + 'static,
    C: IntoIden + 'static,
    R: IntoIden + 'static,
    K: IntoIden + 'static,
{
    ForeignKey::create()
        .name(name)
        .from(from.0, from.1)
        .to(to.0, to.1)
        .on_delete(on_delete)
        .on_update(ForeignKeyAction::Cascade)
        .to_owned()
}

async fn drop_table<T: IntoIden + 'static>(manager: &SchemaManager<'_>, table: T) -> Result<(), DbErr> {
    manager
        .drop_table(Table::drop().table(table).if_exists().to_owned())
        .await
}

#[derive(DeriveIden)]
enum Schools {
    Table,
    Id,
    Name,
    Address,
    Phone,
    Email,
    Website,
    EstablishedDate,
    Latitude,
    Longitude,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Username,
    Email,
    FirstName,
    LastName,
    Role,
    SchoolId,
    IsStaff,
    IsActive,
    DateJoined,
    PasswordHash,
}

#[derive(DeriveIden)]
enum AuthTokens {
    Table,
    Key,
    UserId,
    Created,
}

#[derive(DeriveIden)]
enum Subjects {
    Table,
    Id,
    Name,
}

#[derive(DeriveIden)]
enum SchoolClasses {
    Table,
    Id,
    Name,
    SchoolId,
}

#[derive(DeriveIden)]
enum ClassStudents {
    Table,
    ClassId,
    StudentId,
}

#[derive(DeriveIden)]
enum ClassTeachers {
    Table,
    ClassId,
    TeacherId,
}

#[derive(DeriveIden)]
enum ClassSubjects {
    Table,
    ClassId,
    SubjectId,
}

#[derive(DeriveIden)]
enum ParentChildren {
    Table,
    Id,
    ParentId,
    ChildId,
    ClassId,
}

#[derive(DeriveIden)]
enum Schedules {
    Table,
    Id,
    ClassId,
    SubjectId,
    TeacherId,
    Weekday,
    StartTime,
    EndTime,
}

#[derive(DeriveIden)]
enum Homeworks {
    Table,
    Id,
    SubjectId,
    ClassId,
    Description,
    DueDate,
    CreatedAt,
}

#[derive(DeriveIden)]
enum SubmittedHomeworks {
    Table,
    Id,
    HomeworkId,
    StudentId,
    SubmissionFile,
    SubmittedAt,
    Status,
    Grade,
    Feedback,
}

#[derive(DeriveIden)]
enum Grades {
    Table,
    Id,
    StudentId,
    SubjectId,
    Value,
    Date,
    TeacherId,
    Comments,
}

#[derive(DeriveIden)]
enum Attendances {
    Table,
    Id,
    StudentId,
    ClassId,
    SchoolId,
    Date,
    Status,
    Notes,
    Latitude,
    Longitude,
}

#[derive(DeriveIden)]
enum Achievements {
    Table,
    Id,
    Name,
    Description,
    Icon,
    XpReward,
}

#[derive(DeriveIden)]
enum UserProfiles {
    Table,
    Id,
    UserId,
    Xp,
    Level,
    ClassId,
}

#[derive(DeriveIden)]
enum UserAchievements {
    Table,
    Id,
    ProfileId,
    AchievementId,
    AchievedAt,
}

#[derive(DeriveIden)]
enum Leaderboard {
    Table,
    Id,
    ProfileId,
    Rank,
}

#[derive(DeriveIden)]
enum Notifications {
    Table,
    Id,
    UserId,
    Message,
    CreatedAt,
    IsRead,
}

mod m20250301_000001_create_school_structure {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000001_create_school_structure"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Schools::Table)
                        .if_not_exists()
                        .col(id_column(Schools::Id))
                        .col(ColumnDef::new(Schools::Name).string().not_null().unique_key())
                        .col(ColumnDef::new(Schools::Address).string().not_null())
                        .col(ColumnDef::new(Schools::Phone).string())
                        .col(ColumnDef::new(Schools::Email).string().not_null())
                        .col(ColumnDef::new(Schools::Website).string())
                        .col(ColumnDef::new(Schools::EstablishedDate).date())
                        .col(ColumnDef::new(Schools::Latitude).double())
                        .col(ColumnDef::new(Schools::Longitude).double())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(id_column(Users::Id))
                        .col(ColumnDef::new(Users::Username).string().not_null().unique_key())
                        .col(ColumnDef::new(Users::Email).string().not_null())
                        .col(ColumnDef::new(Users::FirstName).string().not_null())
                        .col(ColumnDef::new(Users::LastName).string().not_null())
                        .col(ColumnDef::new(Users::Role).string().not_null())
                        .col(ColumnDef::new(Users::SchoolId).big_integer())
                        .col(ColumnDef::new(Users::IsStaff).boolean().not_null().default(false))
                        .col(ColumnDef::new(Users::IsActive).boolean().not_null().default(true))
                        .col(
                            ColumnDef::new(Users::DateJoined)
                                .timestamp_with_time_zone()
                                .not_null()
                                .default(Expr::current_timestamp()),
                        )
                        .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                        .foreign_key(&mut foreign_key(
                            "fk_users_school",
                            (Users::Table, Users::SchoolId),
                            (Schools::Table, Schools::Id),
                            ForeignKeyAction::SetNull,
                        ))
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(AuthTokens::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(AuthTokens::Key)
                                .string()
                                .not_null()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(AuthTokens::UserId)
                                .big_integer()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(AuthTokens::Created)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(&mut foreign_key(
                            "fk_auth_tokens_user",
                            (AuthTokens::Table, AuthTokens::UserId),
                            (Users::Table, Users::Id),
                            ForeignKeyAction::Cascade,
                        ))
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Subjects::Table)
                        .if_not_exists()
                        .col(id_column(Subjects::Id))
                        .col(ColumnDef::new(Subjects::Name).string().not_null().unique_key())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(SchoolClasses::Table)
                        .if_not_exists()
                        .col(id_column(SchoolClasses::Id))
                        .col(
                            ColumnDef::new(SchoolClasses::Name)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(SchoolClasses::SchoolId).big_integer().not_null())
                        .foreign_key(&mut foreign_key(
                            "fk_school_classes_school",
                            (SchoolClasses::Table, SchoolClasses::SchoolId),
                            (Schools::Table, Schools::Id),
                            ForeignKeyAction::Cascade,
                        ))
                        .to_owned(),
                )
                .await?;

            // Membership tables
            manager
                .create_table(
                    Table::create()
                        .table(ClassStudents::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(ClassStudents::ClassId).big_integer().not_null())
                        .col(ColumnDef::new(ClassStudents::StudentId).big_integer().not_null())
                        .primary_key(
                            Index::create()
                                .col(ClassStudents::ClassId)
                                .col(ClassStudents::StudentId),
                        )
                        .foreign_key(&mut foreign_key(
                            "fk_class_students_class",
                            (ClassStudents::Table, ClassStudents::ClassId),
                            (SchoolClasses::Table, SchoolClasses::Id),
                            ForeignKeyAction::Cascade,
                        ))
                        .foreign_key(&mut foreign_key(
                            "fk_class_students_student",
                            (ClassStudents::Table, ClassStudents::StudentId),
                            (Users::Table, Users::Id),
                            ForeignKeyAction::Cascade,
                        ))
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ClassTeachers::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(ClassTeachers::ClassId).big_integer().not_null())
                        .col(ColumnDef::new(ClassTeachers::TeacherId).big_integer().not_null())
                        .primary_key(
                            Index::create()
                                .col(ClassTeachers::ClassId)
                                .col(ClassTeachers::TeacherId),
                        )
                        .foreign_key(&mut foreign_key(
                            "fk_class_teachers_class",
                            (ClassTeachers::Table, ClassTeachers::ClassId),
                            (SchoolClasses::Table, SchoolClasses::Id),
                            ForeignKeyAction::Cascade,
                        ))
                        .foreign_key(&mut foreign_key(
                            "fk_class_teachers_teacher",
                            (ClassTeachers::Table, ClassTeachers::TeacherId),
                            (Users::Table, Users::Id),
                            ForeignKeyAction::Cascade,
                        ))
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ClassSubjects::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(ClassSubjects::ClassId).big_integer().not_null())
                        .col(ColumnDef::new(ClassSubjects::SubjectId).big_integer().not_null())
                        .primary_key(
                            Index::create()
                                .col(ClassSubjects::ClassId)
                                .col(ClassSubjects::SubjectId),
                        )
                        .foreign_key(&mut foreign_key(
                            "fk_class_subjects_class",
                            (ClassSubjects::Table, ClassSubjects::ClassId),
                            (SchoolClasses::Table, SchoolClasses::Id),
                            ForeignKeyAction::Cascade,
                        ))
                        .foreign_key(&mut foreign_key(
                            "fk_class_subjects_subject",
                            (ClassSubjects::Table, ClassSubjects::SubjectId),
                            (Subjects::Table, Subjects::Id),
                            ForeignKeyAction::Cascade,
                        ))
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ParentChildren::Table)
                        .if_not_exists()
                        .col(id_column(ParentChildren::Id))
                        .col(ColumnDef::new(ParentChildren::ParentId).big_integer().not_null())
                        .col(ColumnDef::new(ParentChildren::ChildId).big_integer().not_null())
                        .col(ColumnDef::new(ParentChildren::ClassId).big_integer().not_null())
                        .foreign_key(&mut foreign_key(
                            "fk_parent_children_parent",
                            (ParentChildren::Table, ParentChildren::ParentId),
                            (Users::Table, Users::Id),
                            ForeignKeyAction::Cascade,
                        ))
                        .foreign_key(&mut foreign_key(
                            "fk_parent_children_child",
                            (ParentChildren::Table, ParentChildren::ChildId),
                            (Users::Table, Users::Id),
                            ForeignKeyAction::Cascade,
                        ))
                        .foreign_key(&mut foreign_key(
                            "fk_parent_children_class",
                            (ParentChildren::Table, ParentChildren::ClassId),
                            (SchoolClasses::Table, SchoolClasses::Id),
                            ForeignKeyAction::Cascade,
                        ))
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_parent_children_pair")
                        .table(ParentChildren::Table)
                        .col(ParentChildren::ParentId)
                        .col(ParentChildren::ChildId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Schedules::Table)
                        .if_not_exists()
                        .col(id_column(Schedules::Id))
                        .col(ColumnDef::new(Schedules::ClassId).big_integer())
                        .col(ColumnDef::new(Schedules::SubjectId).big_integer().not_null())
                        .col(ColumnDef::new(Schedules::TeacherId).big_integer().not_null())
                        .col(ColumnDef::new(Schedules::Weekday).small_integer().not_null())
                        .col(ColumnDef::new(Schedules::StartTime).time().not_null())
                        .col(ColumnDef::new(Schedules::EndTime).time().not_null())
                        .foreign_key(&mut foreign_key(
                            "fk_schedules_class",
                            (Schedules::Table, Schedules::ClassId),
                            (SchoolClasses::Table, SchoolClasses::Id),
                            ForeignKeyAction::SetNull,
                        ))
                        .foreign_key(&mut foreign_key(
                            "fk_schedules_subject",
                            (Schedules::Table, Schedules::SubjectId),
                            (Subjects::Table, Subjects::Id),
                            ForeignKeyAction::Cascade,
                        ))
                        .foreign_key(&mut foreign_key(
                            "fk_schedules_teacher",
                            (Schedules::Table, Schedules::TeacherId),
                            (Users::Table, Users::Id),
                            ForeignKeyAction::Cascade,
                        ))
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_schedules_teacher")
                        .table(Schedules::Table)
                        .col(Schedules::TeacherId)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            drop_table(manager, Schedules::Table).await?;
            drop_table(manager, ParentChildren::Table).await?;
            drop_table(manager, ClassSubjects::Table).await?;
            drop_table(manager, ClassTeachers::Table).await?;
            drop_table(manager, ClassStudents::Table).await?;
            drop_table(manager, SchoolClasses::Table).await?;
            drop_table(manager, Subjects::Table).await?;
            drop_table(manager, AuthTokens::Table).await?;
            drop_table(manager, Users::Table).await?;
            drop_table(manager, Schools::Table).await
        }
    }
}

mod m20250301_000002_create_coursework {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000002_create_coursework"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Homeworks::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Homeworks::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(Homeworks::SubjectId).big_integer().not_null())
                        .col(ColumnDef::new(Homeworks::ClassId).big_integer().not_null())
                        .col(ColumnDef::new(Homeworks::Description).text().not_null())
                        .col(
                            ColumnDef::new(Homeworks::DueDate)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Homeworks::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null()
                                .default(Expr::current_timestamp()),
                        )
                        .foreign_key(&mut foreign_key(
                            "fk_homeworks_subject",
                            (Homeworks::Table, Homeworks::SubjectId),
                            (Subjects::Table, Subjects::Id),
                            ForeignKeyAction::Cascade,
                        ))
                        .foreign_key(&mut foreign_key(
                            "fk_homeworks_class",
                            (Homeworks::Table, Homeworks::ClassId),
                            (SchoolClasses::Table, SchoolClasses::Id),
                            ForeignKeyAction::Cascade,
                        ))
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(SubmittedHomeworks::Table)
                        .if_not_exists()
                        .col(id_column(SubmittedHomeworks::Id))
                        .col(ColumnDef::new(SubmittedHomeworks::HomeworkId).uuid().not_null())
                        .col(
                            ColumnDef::new(SubmittedHomeworks::StudentId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SubmittedHomeworks::SubmissionFile)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SubmittedHomeworks::SubmittedAt)
                                .timestamp_with_time_zone()
                                .not_null()
                                .default(Expr::current_timestamp()),
                        )
                        .col(
                            ColumnDef::new(SubmittedHomeworks::Status)
                                .string()
                                .not_null()
                                .default("submitted"),
                        )
                        .col(ColumnDef::new(SubmittedHomeworks::Grade).double())
                        .col(ColumnDef::new(SubmittedHomeworks::Feedback).text())
                        .foreign_key(&mut foreign_key(
                            "fk_submitted_homeworks_homework",
                            (SubmittedHomeworks::Table, SubmittedHomeworks::HomeworkId),
                            (Homeworks::Table, Homeworks::Id),
                            ForeignKeyAction::Cascade,
                        ))
                        .foreign_key(&mut foreign_key(
                            "fk_submitted_homeworks_student",
                            (SubmittedHomeworks::Table, SubmittedHomeworks::StudentId),
                            (Users::Table, Users::Id),
                            ForeignKeyAction::Cascade,
                        ))
                        .to_owned(),
                )
                .await?;

            // One submission per student and homework
            manager
                .create_index(
                    Index::create()
                        .name("idx_submitted_homeworks_pair")
                        .table(SubmittedHomeworks::Table)
                        .col(SubmittedHomeworks::HomeworkId)
                        .col(SubmittedHomeworks::StudentId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Grades::Table)
                        .if_not_exists()
                        .col(id_column(Grades::Id))
                        .col(ColumnDef::new(Grades::StudentId).big_integer().not_null())
                        .col(ColumnDef::new(Grades::SubjectId).big_integer().not_null())
                        .col(ColumnDef::new(Grades::Value).double().not_null())
                        .col(ColumnDef::new(Grades::Date).date().not_null())
                        .col(ColumnDef::new(Grades::TeacherId).big_integer())
                        .col(ColumnDef::new(Grades::Comments).text())
                        .foreign_key(&mut foreign_key(
                            "fk_grades_student",
                            (Grades::Table, Grades::StudentId),
                            (Users::Table, Users::Id),
                            ForeignKeyAction::Cascade,
                        ))
                        .foreign_key(&mut foreign_key(
                            "fk_grades_subject",
                            (Grades::Table, Grades::SubjectId),
                            (Subjects::Table, Subjects::Id),
                            ForeignKeyAction::Cascade,
                        ))
                        .foreign_key(&mut foreign_key(
                            "fk_grades_teacher",
                            (Grades::Table, Grades::TeacherId),
                            (Users::Table, Users::Id),
                            ForeignKeyAction::SetNull,
                        ))
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_grades_student")
                        .table(Grades::Table)
                        .col(Grades::StudentId)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            drop_table(manager, Grades::Table).await?;
            drop_table(manager, SubmittedHomeworks::Table).await?;
            drop_table(manager, Homeworks::Table).await
        }
    }
}

mod m20250301_000003_create_attendance {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000003_create_attendance"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Attendances::Table)
                        .if_not_exists()
                        .col(id_column(Attendances::Id))
                        .col(ColumnDef::new(Attendances::StudentId).big_integer().not_null())
                        .col(ColumnDef::new(Attendances::ClassId).big_integer().not_null())
                        .col(ColumnDef::new(Attendances::SchoolId).big_integer())
                        .col(ColumnDef::new(Attendances::Date).date().not_null())
                        .col(ColumnDef::new(Attendances::Status).string().not_null())
                        .col(ColumnDef::new(Attendances::Notes).text())
                        .col(ColumnDef::new(Attendances::Latitude).double())
                        .col(ColumnDef::new(Attendances::Longitude).double())
                        .foreign_key(&mut foreign_key(
                            "fk_attendances_student",
                            (Attendances::Table, Attendances::StudentId),
                            (Users::Table, Users::Id),
                            ForeignKeyAction::Cascade,
                        ))
                        .foreign_key(&mut foreign_key(
                            "fk_attendances_class",
                            (Attendances::Table, Attendances::ClassId),
                            (SchoolClasses::Table, SchoolClasses::Id),
                            ForeignKeyAction::Cascade,
                        ))
                        .foreign_key(&mut foreign_key(
                            "fk_attendances_school",
                            (Attendances::Table, Attendances::SchoolId),
                            (Schools::Table, Schools::Id),
                            ForeignKeyAction::SetNull,
                        ))
                        .to_owned(),
                )
                .await?;

            // One row per student per day
            manager
                .create_index(
                    Index::create()
                        .name("idx_attendances_student_date")
                        .table(Attendances::Table)
                        .col(Attendances::StudentId)
                        .col(Attendances::Date)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_attendances_class_date")
                        .table(Attendances::Table)
                        .col(Attendances::ClassId)
                        .col(Attendances::Date)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            drop_table(manager, Attendances::Table).await
        }
    }
}

mod m20250301_000004_create_gamification {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000004_create_gamification"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Achievements::Table)
                        .if_not_exists()
                        .col(id_column(Achievements::Id))
                        .col(
                            ColumnDef::new(Achievements::Name)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Achievements::Description).text().not_null())
                        .col(ColumnDef::new(Achievements::Icon).string())
                        .col(
                            ColumnDef::new(Achievements::XpReward)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(UserProfiles::Table)
                        .if_not_exists()
                        .col(id_column(UserProfiles::Id))
                        .col(
                            ColumnDef::new(UserProfiles::UserId)
                                .big_integer()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(UserProfiles::Xp)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(UserProfiles::Level)
                                .big_integer()
                                .not_null()
                                .default(1),
                        )
                        .col(ColumnDef::new(UserProfiles::ClassId).big_integer())
                        .foreign_key(&mut foreign_key(
                            "fk_user_profiles_user",
                            (UserProfiles::Table, UserProfiles::UserId),
                            (Users::Table, Users::Id),
                            ForeignKeyAction::Cascade,
                        ))
                        .foreign_key(&mut foreign_key(
                            "fk_user_profiles_class",
                            (UserProfiles::Table, UserProfiles::ClassId),
                            (SchoolClasses::Table, SchoolClasses::Id),
                            ForeignKeyAction::SetNull,
                        ))
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(UserAchievements::Table)
                        .if_not_exists()
                        .col(id_column(UserAchievements::Id))
                        .col(
                            ColumnDef::new(UserAchievements::ProfileId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(UserAchievements::AchievementId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(UserAchievements::AchievedAt)
                                .timestamp_with_time_zone()
                                .not_null()
                                .default(Expr::current_timestamp()),
                        )
                        .foreign_key(&mut foreign_key(
                            "fk_user_achievements_profile",
                            (UserAchievements::Table, UserAchievements::ProfileId),
                            (UserProfiles::Table, UserProfiles::Id),
                            ForeignKeyAction::Cascade,
                        ))
                        .foreign_key(&mut foreign_key(
                            "fk_user_achievements_achievement",
                            (UserAchievements::Table, UserAchievements::AchievementId),
                            (Achievements::Table, Achievements::Id),
                            ForeignKeyAction::Cascade,
                        ))
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_user_achievements_pair")
                        .table(UserAchievements::Table)
                        .col(UserAchievements::ProfileId)
                        .col(UserAchievements::AchievementId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Leaderboard::Table)
                        .if_not_exists()
                        .col(id_column(Leaderboard::Id))
                        .col(
                            ColumnDef::new(Leaderboard::ProfileId)
                                .big_integer()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(Leaderboard::Rank)
                                .integer()
                                .not_null()
                                .unique_key(),
                        )
                        .foreign_key(&mut foreign_key(
                            "fk_leaderboard_profile",
                            (Leaderboard::Table, Leaderboard::ProfileId),
                            (UserProfiles::Table, UserProfiles::Id),
                            ForeignKeyAction::Cascade,
                        ))
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Notifications::Table)
                        .if_not_exists()
                        .col(id_column(Notifications::Id))
                        .col(ColumnDef::new(Notifications::UserId).big_integer().not_null())
                        .col(ColumnDef::new(Notifications::Message).text().not_null())
                        .col(
                            ColumnDef::new(Notifications::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null()
                                .default(Expr::current_timestamp()),
                        )
                        .col(
                            ColumnDef::new(Notifications::IsRead)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .foreign_key(&mut foreign_key(
                            "fk_notifications_user",
                            (Notifications::Table, Notifications::UserId),
                            (Users::Table, Users::Id),
                            ForeignKeyAction::Cascade,
                        ))
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            drop_table(manager, Notifications::Table).await?;
            drop_table(manager, Leaderboard::Table).await?;
            drop_table(manager, UserAchievements::Table).await?;
            drop_table(manager, UserProfiles::Table).await?;
            drop_table(manager, Achievements::Table).await
        }
    }
}
