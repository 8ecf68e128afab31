//! SeaORM repository implementations

use crate::contract::{
    Achievement, Attendance, AuthToken, Grade, Homework, LeaderboardRank, NewAttendance,
    Notification, ParentChild, Schedule, School, SchoolClass, Subject, SubmittedHomework, User,
    UserAchievement, UserProfile,
};
use crate::domain::repository::{
    AchievementRepository, AttendanceFilter, AttendanceRepository, AwardFilter, ClassFilter,
    ClassRepository, FamilyRepository, GradeFilter, GradeRepository, HomeworkFilter,
    HomeworkRepository, NotificationFilter, NotificationRepository, ParentChildFilter,
    ProfileFilter, ProfileRepository, Repositories, ScheduleFilter, ScheduleRepository,
    SchoolRepository, SubjectFilter, SubjectRepository, SubmissionFilter, SubmissionRepository,
    TokenRepository, UserFilter, UserRepository,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use sea_orm::{
    prelude::Expr,
    sea_query::OnConflict,
    ActiveValue::{NotSet, Set}, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use super::entity::attendance as attendance_entity;
use super::entity::coursework::{grade, homework, submitted_homework};
use super::entity::gamification::{achievement, leaderboard, user_achievement, user_profile};
use super::entity::identity::{auth_token, parent_child, user};
use super::entity::notification as notification_entity;
use super::entity::school::{
    class_student, class_subject, class_teacher, schedule, school, school_class, subject,
};
use super::mapper::class_from_parts;

/// Build every SeaORM repository over one connection
pub fn sea_orm_repositories(db: Arc<DatabaseConnection>) -> Repositories {
    Repositories {
        users: Arc::new(SeaOrmUserRepository::new(db.clone())),
        tokens: Arc::new(SeaOrmTokenRepository::new(db.clone())),
        families: Arc::new(SeaOrmFamilyRepository::new(db.clone())),
        schools: Arc::new(SeaOrmSchoolRepository::new(db.clone())),
        classes: Arc::new(SeaOrmClassRepository::new(db.clone())),
        subjects: Arc::new(SeaOrmSubjectRepository::new(db.clone())),
        schedules: Arc::new(SeaOrmScheduleRepository::new(db.clone())),
        homework: Arc::new(SeaOrmHomeworkRepository::new(db.clone())),
        submissions: Arc::new(SeaOrmSubmissionRepository::new(db.clone())),
        grades: Arc::new(SeaOrmGradeRepository::new(db.clone())),
        attendance: Arc::new(SeaOrmAttendanceRepository::new(db.clone())),
        achievements: Arc::new(SeaOrmAchievementRepository::new(db.clone())),
        profiles: Arc::new(SeaOrmProfileRepository::new(db.clone())),
        notifications: Arc::new(SeaOrmNotificationRepository::new(db)),
    }
}

fn convert_all<M, T>(rows: Vec<M>) -> Result<Vec<T>>
where
    T: TryFrom<M, Error = anyhow::Error>,
{
    rows.into_iter().map(T::try_from).collect()
}

macro_rules! sea_orm_repository {
    ($name:ident) => {
        pub struct $name {
            db: Arc<DatabaseConnection>,
        }

        impl $name {
            pub fn new(db: Arc<DatabaseConnection>) -> Self {
                Self { db }
            }
        }
    };
}

sea_orm_repository!(SeaOrmUserRepository);
sea_orm_repository!(SeaOrmTokenRepository);
sea_orm_repository!(SeaOrmFamilyRepository);
sea_orm_repository!(SeaOrmSchoolRepository);
sea_orm_repository!(SeaOrmClassRepository);
sea_orm_repository!(SeaOrmSubjectRepository);
sea_orm_repository!(SeaOrmScheduleRepository);
sea_orm_repository!(SeaOrmHomeworkRepository);
sea_orm_repository!(SeaOrmSubmissionRepository);
sea_orm_repository!(SeaOrmGradeRepository);
sea_orm_repository!(SeaOrmAttendanceRepository);
sea_orm_repository!(SeaOrmAchievementRepository);
sea_orm_repository!(SeaOrmProfileRepository);
sea_orm_repository!(SeaOrmNotificationRepository);

// ===== Identity =====

#[async_trait]
impl UserRepository for SeaOrmUserRepository {
    async fn create(&self, user: &User, password_hash: &str) -> Result<(User, UserProfile)> {
        let txn = self.db.begin().await?;
        let mut active: user::ActiveModel = user.into();
        active.password_hash = Set(password_hash.to_string());
        let stored = user::Entity::insert(active).exec_with_returning(&txn).await?;

        let profile = UserProfile {
            id: 0,
            user_id: stored.id,
            xp: 0,
            level: 1,
            class_id: None,
        };
        let active: user_profile::ActiveModel = (&profile).into();
        let profile = user_profile::Entity::insert(active)
            .exec_with_returning(&txn)
            .await?;
        txn.commit().await?;

        Ok((stored.try_into()?, profile.try_into()?))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        let result = user::Entity::find_by_id(id).one(&*self.db).await?;
        result.map(User::try_from).transpose()
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let result = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&*self.db)
            .await?;
        result.map(User::try_from).transpose()
    }

    async fn password_hash(&self, user_id: i64) -> Result<Option<String>> {
        let result = user::Entity::find_by_id(user_id).one(&*self.db).await?;
        Ok(result.map(|e| e.password_hash))
    }

    async fn set_password_hash(&self, user_id: i64, password_hash: &str) -> Result<()> {
        user::Entity::update_many()
            .col_expr(user::Column::PasswordHash, Expr::value(password_hash))
            .filter(user::Column::Id.eq(user_id))
            .exec(&*self.db)
            .await?;
        Ok(())
    }

    async fn list(&self, filter: &UserFilter) -> Result<Vec<User>> {
        let mut query = user::Entity::find();
        if let Some(ids) = &filter.ids {
            query = query.filter(user::Column::Id.is_in(ids.clone()));
        }
        if let Some(role) = filter.role {
            query = query.filter(user::Column::Role.eq(role.as_str()));
        }
        let results = query.order_by_asc(user::Column::Id).all(&*self.db).await?;
        convert_all(results)
    }

    async fn update(&self, user: &User) -> Result<User> {
        let active: user::ActiveModel = user.into();
        let result = user::Entity::update(active).exec(&*self.db).await?;
        result.try_into()
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = user::Entity::delete_by_id(id).exec(&*self.db).await?;
        Ok(result.rows_affected > 0)
    }
}

#[async_trait]
impl TokenRepository for SeaOrmTokenRepository {
    async fn find(&self, key: &str) -> Result<Option<AuthToken>> {
        let result = auth_token::Entity::find_by_id(key.to_string())
            .one(&*self.db)
            .await?;
        Ok(result.map(Into::into))
    }

    async fn find_by_user(&self, user_id: i64) -> Result<Option<AuthToken>> {
        let result = auth_token::Entity::find()
            .filter(auth_token::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?;
        Ok(result.map(Into::into))
    }

    async fn create(&self, token: &AuthToken) -> Result<AuthToken> {
        let active: auth_token::ActiveModel = token.into();
        let result = auth_token::Entity::insert(active)
            .exec_with_returning(&*self.db)
            .await?;
        Ok(result.into())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let result = auth_token::Entity::delete_by_id(key.to_string())
            .exec(&*self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }
}

#[async_trait]
impl FamilyRepository for SeaOrmFamilyRepository {
    async fn create(&self, link: &ParentChild) -> Result<ParentChild> {
        let active: parent_child::ActiveModel = link.into();
        let result = parent_child::Entity::insert(active)
            .exec_with_returning(&*self.db)
            .await?;
        Ok(result.into())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<ParentChild>> {
        let result = parent_child::Entity::find_by_id(id).one(&*self.db).await?;
        Ok(result.map(Into::into))
    }

    async fn list(&self, filter: &ParentChildFilter) -> Result<Vec<ParentChild>> {
        let mut query = parent_child::Entity::find();
        if let Some(parent_id) = filter.parent_id {
            query = query.filter(parent_child::Column::ParentId.eq(parent_id));
        }
        if let Some(child_id) = filter.child_id {
            query = query.filter(parent_child::Column::ChildId.eq(child_id));
        }
        let results = query
            .order_by_asc(parent_child::Column::Id)
            .all(&*self.db)
            .await?;
        Ok(results.into_iter().map(Into::into).collect())
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = parent_child::Entity::delete_by_id(id).exec(&*self.db).await?;
        Ok(result.rows_affected > 0)
    }
}

// ===== School structure =====

#[async_trait]
impl SchoolRepository for SeaOrmSchoolRepository {
    async fn create(&self, school: &School) -> Result<School> {
        let active: school::ActiveModel = school.into();
        let result = school::Entity::insert(active)
            .exec_with_returning(&*self.db)
            .await?;
        Ok(result.into())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<School>> {
        let result = school::Entity::find_by_id(id).one(&*self.db).await?;
        Ok(result.map(Into::into))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<School>> {
        let result = school::Entity::find()
            .filter(school::Column::Name.eq(name))
            .one(&*self.db)
            .await?;
        Ok(result.map(Into::into))
    }

    async fn list(&self) -> Result<Vec<School>> {
        let results = school::Entity::find()
            .order_by_asc(school::Column::Id)
            .all(&*self.db)
            .await?;
        Ok(results.into_iter().map(Into::into).collect())
    }

    async fn update(&self, school: &School) -> Result<School> {
        let active: school::ActiveModel = school.into();
        let result = school::Entity::update(active).exec(&*self.db).await?;
        Ok(result.into())
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = school::Entity::delete_by_id(id).exec(&*self.db).await?;
        Ok(result.rows_affected > 0)
    }
}

/// Attach membership ids to class rows
async fn load_memberships<C: ConnectionTrait>(
    db: &C,
    rows: Vec<school_class::Model>,
) -> Result<Vec<SchoolClass>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<i64> = rows.iter().map(|row| row.id).collect();

    let students = class_student::Entity::find()
        .filter(class_student::Column::ClassId.is_in(ids.clone()))
        .order_by_asc(class_student::Column::StudentId)
        .all(db)
        .await?;
    let teachers = class_teacher::Entity::find()
        .filter(class_teacher::Column::ClassId.is_in(ids.clone()))
        .order_by_asc(class_teacher::Column::TeacherId)
        .all(db)
        .await?;
    let subjects = class_subject::Entity::find()
        .filter(class_subject::Column::ClassId.is_in(ids))
        .order_by_asc(class_subject::Column::SubjectId)
        .all(db)
        .await?;

    let mut members: HashMap<i64, (Vec<i64>, Vec<i64>, Vec<i64>)> = HashMap::new();
    for row in students {
        members.entry(row.class_id).or_default().0.push(row.student_id);
    }
    for row in teachers {
        members.entry(row.class_id).or_default().1.push(row.teacher_id);
    }
    for row in subjects {
        members.entry(row.class_id).or_default().2.push(row.subject_id);
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let (students, teachers, subjects) = members.remove(&row.id).unwrap_or_default();
            class_from_parts(row, students, teachers, subjects)
        })
        .collect())
}

async fn write_memberships<C: ConnectionTrait>(db: &C, class: &SchoolClass) -> Result<()> {
    if !class.student_ids.is_empty() {
        class_student::Entity::insert_many(class.student_ids.iter().map(|&student_id| {
            class_student::ActiveModel {
                class_id: Set(class.id),
                student_id: Set(student_id),
            }
        }))
        .exec(db)
        .await?;
    }
    if !class.teacher_ids.is_empty() {
        class_teacher::Entity::insert_many(class.teacher_ids.iter().map(|&teacher_id| {
            class_teacher::ActiveModel {
                class_id: Set(class.id),
                teacher_id: Set(teacher_id),
            }
        }))
        .exec(db)
        .await?;
    }
    if !class.subject_ids.is_empty() {
        class_subject::Entity::insert_many(class.subject_ids.iter().map(|&subject_id| {
            class_subject::ActiveModel {
                class_id: Set(class.id),
                subject_id: Set(subject_id),
            }
        }))
        .exec(db)
        .await?;
    }
    Ok(())
}

async fn clear_memberships<C: ConnectionTrait>(db: &C, class_id: i64) -> Result<()> {
    class_student::Entity::delete_many()
        .filter(class_student::Column::ClassId.eq(class_id))
        .exec(db)
        .await?;
    class_teacher::Entity::delete_many()
        .filter(class_teacher::Column::ClassId.eq(class_id))
        .exec(db)
        .await?;
    class_subject::Entity::delete_many()
        .filter(class_subject::Column::ClassId.eq(class_id))
        .exec(db)
        .await?;
    Ok(())
}

impl SeaOrmClassRepository {
    async fn reload(&self, id: i64) -> Result<SchoolClass> {
        self.find_by_id(id)
            .await?
            .with_context(|| format!("class {id} vanished after write"))
    }
}

#[async_trait]
impl ClassRepository for SeaOrmClassRepository {
    async fn create(&self, class: &SchoolClass) -> Result<SchoolClass> {
        let txn = self.db.begin().await?;
        let active: school_class::ActiveModel = class.into();
        let row = school_class::Entity::insert(active)
            .exec_with_returning(&txn)
            .await?;
        let stored = SchoolClass {
            id: row.id,
            ..class.clone()
        };
        write_memberships(&txn, &stored).await?;
        txn.commit().await?;

        self.reload(row.id).await
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<SchoolClass>> {
        let Some(row) = school_class::Entity::find_by_id(id).one(&*self.db).await? else {
            return Ok(None);
        };
        Ok(load_memberships(&*self.db, vec![row]).await?.pop())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<SchoolClass>> {
        let Some(row) = school_class::Entity::find()
            .filter(school_class::Column::Name.eq(name))
            .one(&*self.db)
            .await?
        else {
            return Ok(None);
        };
        Ok(load_memberships(&*self.db, vec![row]).await?.pop())
    }

    async fn list(&self, filter: &ClassFilter) -> Result<Vec<SchoolClass>> {
        let mut query = school_class::Entity::find();
        if let Some(ids) = &filter.ids {
            query = query.filter(school_class::Column::Id.is_in(ids.clone()));
        }
        if let Some(student_ids) = &filter.student_ids {
            let class_ids: Vec<i64> = class_student::Entity::find()
                .filter(class_student::Column::StudentId.is_in(student_ids.clone()))
                .all(&*self.db)
                .await?
                .into_iter()
                .map(|row| row.class_id)
                .collect();
            query = query.filter(school_class::Column::Id.is_in(class_ids));
        }
        if let Some(teacher_id) = filter.teacher_id {
            let class_ids: Vec<i64> = class_teacher::Entity::find()
                .filter(class_teacher::Column::TeacherId.eq(teacher_id))
                .all(&*self.db)
                .await?
                .into_iter()
                .map(|row| row.class_id)
                .collect();
            query = query.filter(school_class::Column::Id.is_in(class_ids));
        }

        let rows = query
            .order_by_asc(school_class::Column::Id)
            .all(&*self.db)
            .await?;
        load_memberships(&*self.db, rows).await
    }

    async fn update(&self, class: &SchoolClass) -> Result<SchoolClass> {
        let txn = self.db.begin().await?;
        let active: school_class::ActiveModel = class.into();
        school_class::Entity::update(active).exec(&txn).await?;
        clear_memberships(&txn, class.id).await?;
        write_memberships(&txn, class).await?;
        txn.commit().await?;

        self.reload(class.id).await
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = school_class::Entity::delete_by_id(id).exec(&*self.db).await?;
        Ok(result.rows_affected > 0)
    }
}

#[async_trait]
impl SubjectRepository for SeaOrmSubjectRepository {
    async fn create(&self, subject: &Subject) -> Result<Subject> {
        let active: subject::ActiveModel = subject.into();
        let result = subject::Entity::insert(active)
            .exec_with_returning(&*self.db)
            .await?;
        Ok(result.into())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Subject>> {
        let result = subject::Entity::find_by_id(id).one(&*self.db).await?;
        Ok(result.map(Into::into))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Subject>> {
        let result = subject::Entity::find()
            .filter(subject::Column::Name.eq(name))
            .one(&*self.db)
            .await?;
        Ok(result.map(Into::into))
    }

    async fn list(&self, filter: &SubjectFilter) -> Result<Vec<Subject>> {
        let mut query = subject::Entity::find();
        if let Some(ids) = &filter.ids {
            query = query.filter(subject::Column::Id.is_in(ids.clone()));
        }
        let results = query.order_by_asc(subject::Column::Id).all(&*self.db).await?;
        Ok(results.into_iter().map(Into::into).collect())
    }

    async fn update(&self, subject: &Subject) -> Result<Subject> {
        let active: subject::ActiveModel = subject.into();
        let result = subject::Entity::update(active).exec(&*self.db).await?;
        Ok(result.into())
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = subject::Entity::delete_by_id(id).exec(&*self.db).await?;
        Ok(result.rows_affected > 0)
    }
}

#[async_trait]
impl ScheduleRepository for SeaOrmScheduleRepository {
    async fn create(&self, schedule: &Schedule) -> Result<Schedule> {
        let active: schedule::ActiveModel = schedule.into();
        let result = schedule::Entity::insert(active)
            .exec_with_returning(&*self.db)
            .await?;
        result.try_into()
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Schedule>> {
        let result = schedule::Entity::find_by_id(id).one(&*self.db).await?;
        result.map(Schedule::try_from).transpose()
    }

    async fn find_slot(
        &self,
        class_id: Option<i64>,
        subject_id: i64,
        weekday: u8,
        start_time: NaiveTime,
    ) -> Result<Option<Schedule>> {
        let class_condition = match class_id {
            Some(class_id) => schedule::Column::ClassId.eq(class_id),
            None => schedule::Column::ClassId.is_null(),
        };
        let result = schedule::Entity::find()
            .filter(class_condition)
            .filter(schedule::Column::SubjectId.eq(subject_id))
            .filter(schedule::Column::Weekday.eq(i16::from(weekday)))
            .filter(schedule::Column::StartTime.eq(start_time))
            .one(&*self.db)
            .await?;
        result.map(Schedule::try_from).transpose()
    }

    async fn list(&self, filter: &ScheduleFilter) -> Result<Vec<Schedule>> {
        let mut query = schedule::Entity::find();
        if let Some(teacher_id) = filter.teacher_id {
            query = query.filter(schedule::Column::TeacherId.eq(teacher_id));
        }
        if let Some(class_ids) = &filter.class_ids {
            query = query.filter(schedule::Column::ClassId.is_in(class_ids.clone()));
        }
        let results = query
            .order_by_asc(schedule::Column::Weekday)
            .order_by_asc(schedule::Column::StartTime)
            .all(&*self.db)
            .await?;
        convert_all(results)
    }

    async fn update(&self, schedule: &Schedule) -> Result<Schedule> {
        let active: schedule::ActiveModel = schedule.into();
        let result = schedule::Entity::update(active).exec(&*self.db).await?;
        result.try_into()
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = schedule::Entity::delete_by_id(id).exec(&*self.db).await?;
        Ok(result.rows_affected > 0)
    }
}

// ===== Coursework =====

#[async_trait]
impl HomeworkRepository for SeaOrmHomeworkRepository {
    async fn create(&self, homework: &Homework) -> Result<Homework> {
        let active: homework::ActiveModel = homework.into();
        let result = homework::Entity::insert(active)
            .exec_with_returning(&*self.db)
            .await?;
        Ok(result.into())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Homework>> {
        let result = homework::Entity::find_by_id(id).one(&*self.db).await?;
        Ok(result.map(Into::into))
    }

    async fn list(&self, filter: &HomeworkFilter) -> Result<Vec<Homework>> {
        let mut query = homework::Entity::find();
        if let Some(class_ids) = &filter.class_ids {
            query = query.filter(homework::Column::ClassId.is_in(class_ids.clone()));
        }
        let results = query
            .order_by_asc(homework::Column::DueDate)
            .all(&*self.db)
            .await?;
        Ok(results.into_iter().map(Into::into).collect())
    }

    async fn update(&self, homework: &Homework) -> Result<Homework> {
        let active: homework::ActiveModel = homework.into();
        let result = homework::Entity::update(active).exec(&*self.db).await?;
        Ok(result.into())
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = homework::Entity::delete_by_id(id).exec(&*self.db).await?;
        Ok(result.rows_affected > 0)
    }
}

#[async_trait]
impl SubmissionRepository for SeaOrmSubmissionRepository {
    async fn create(&self, submission: &SubmittedHomework) -> Result<SubmittedHomework> {
        let active: submitted_homework::ActiveModel = submission.into();
        let result = submitted_homework::Entity::insert(active)
            .exec_with_returning(&*self.db)
            .await?;
        result.try_into()
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<SubmittedHomework>> {
        let result = submitted_homework::Entity::find_by_id(id)
            .one(&*self.db)
            .await?;
        result.map(SubmittedHomework::try_from).transpose()
    }

    async fn find_for(
        &self,
        homework_id: Uuid,
        student_id: i64,
    ) -> Result<Option<SubmittedHomework>> {
        let result = submitted_homework::Entity::find()
            .filter(submitted_homework::Column::HomeworkId.eq(homework_id))
            .filter(submitted_homework::Column::StudentId.eq(student_id))
            .one(&*self.db)
            .await?;
        result.map(SubmittedHomework::try_from).transpose()
    }

    async fn list(&self, filter: &SubmissionFilter) -> Result<Vec<SubmittedHomework>> {
        let mut query = submitted_homework::Entity::find();
        if let Some(student_ids) = &filter.student_ids {
            query = query.filter(submitted_homework::Column::StudentId.is_in(student_ids.clone()));
        }
        if let Some(homework_ids) = &filter.homework_ids {
            query =
                query.filter(submitted_homework::Column::HomeworkId.is_in(homework_ids.clone()));
        }
        let results = query
            .order_by_desc(submitted_homework::Column::SubmittedAt)
            .all(&*self.db)
            .await?;
        convert_all(results)
    }

    async fn update(&self, submission: &SubmittedHomework) -> Result<SubmittedHomework> {
        let active: submitted_homework::ActiveModel = submission.into();
        let result = submitted_homework::Entity::update(active)
            .exec(&*self.db)
            .await?;
        result.try_into()
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = submitted_homework::Entity::delete_by_id(id)
            .exec(&*self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }
}

#[async_trait]
impl GradeRepository for SeaOrmGradeRepository {
    async fn create(&self, grade: &Grade) -> Result<Grade> {
        let active: grade::ActiveModel = grade.into();
        let result = grade::Entity::insert(active)
            .exec_with_returning(&*self.db)
            .await?;
        Ok(result.into())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Grade>> {
        let result = grade::Entity::find_by_id(id).one(&*self.db).await?;
        Ok(result.map(Into::into))
    }

    async fn list(&self, filter: &GradeFilter) -> Result<Vec<Grade>> {
        let mut query = grade::Entity::find();
        if let Some(student_ids) = &filter.student_ids {
            query = query.filter(grade::Column::StudentId.is_in(student_ids.clone()));
        }
        if let Some(teacher_id) = filter.teacher_id {
            query = query.filter(grade::Column::TeacherId.eq(teacher_id));
        }
        let results = query
            .order_by_desc(grade::Column::Date)
            .order_by_asc(grade::Column::Id)
            .all(&*self.db)
            .await?;
        Ok(results.into_iter().map(Into::into).collect())
    }

    async fn update(&self, grade: &Grade) -> Result<Grade> {
        let active: grade::ActiveModel = grade.into();
        let result = grade::Entity::update(active).exec(&*self.db).await?;
        Ok(result.into())
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = grade::Entity::delete_by_id(id).exec(&*self.db).await?;
        Ok(result.rows_affected > 0)
    }
}

// ===== Attendance =====

#[async_trait]
impl AttendanceRepository for SeaOrmAttendanceRepository {
    async fn create(&self, attendance: &Attendance) -> Result<Attendance> {
        let active: attendance_entity::ActiveModel = attendance.into();
        let result = attendance_entity::Entity::insert(active)
            .exec_with_returning(&*self.db)
            .await?;
        result.try_into()
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Attendance>> {
        let result = attendance_entity::Entity::find_by_id(id)
            .one(&*self.db)
            .await?;
        result.map(Attendance::try_from).transpose()
    }

    async fn find_for_day(&self, student_id: i64, date: NaiveDate) -> Result<Option<Attendance>> {
        let result = attendance_entity::Entity::find()
            .filter(attendance_entity::Column::StudentId.eq(student_id))
            .filter(attendance_entity::Column::Date.eq(date))
            .one(&*self.db)
            .await?;
        result.map(Attendance::try_from).transpose()
    }

    async fn list(&self, filter: &AttendanceFilter) -> Result<Vec<Attendance>> {
        let mut query = attendance_entity::Entity::find();
        if let Some(student_ids) = &filter.student_ids {
            query = query.filter(attendance_entity::Column::StudentId.is_in(student_ids.clone()));
        }
        if let Some(class_ids) = &filter.class_ids {
            query = query.filter(attendance_entity::Column::ClassId.is_in(class_ids.clone()));
        }
        if let Some(date) = filter.date {
            query = query.filter(attendance_entity::Column::Date.eq(date));
        }
        if let Some(status) = filter.status {
            query = query.filter(attendance_entity::Column::Status.eq(status.as_str()));
        }
        let results = query
            .order_by_desc(attendance_entity::Column::Date)
            .order_by_asc(attendance_entity::Column::StudentId)
            .all(&*self.db)
            .await?;
        convert_all(results)
    }

    async fn update(&self, attendance: &Attendance) -> Result<Attendance> {
        let active: attendance_entity::ActiveModel = attendance.into();
        let result = attendance_entity::Entity::update(active)
            .exec(&*self.db)
            .await?;
        result.try_into()
    }

    async fn upsert(&self, attendance: &NewAttendance) -> Result<(Attendance, bool)> {
        // Only decides 201 vs 200; the row itself is written by one statement
        let existed = attendance_entity::Entity::find()
            .filter(attendance_entity::Column::StudentId.eq(attendance.student_id))
            .filter(attendance_entity::Column::Date.eq(attendance.date))
            .one(&*self.db)
            .await?
            .is_some();

        let record = Attendance {
            id: 0,
            student_id: attendance.student_id,
            class_id: attendance.class_id,
            school_id: attendance.school_id,
            date: attendance.date,
            status: attendance.status,
            notes: attendance.notes.clone(),
            location: attendance.location,
        };
        let active: attendance_entity::ActiveModel = (&record).into();

        // Existing notes survive an overwrite that carries none
        let on_conflict = OnConflict::columns([
            attendance_entity::Column::StudentId,
            attendance_entity::Column::Date,
        ])
        .update_columns([
            attendance_entity::Column::ClassId,
            attendance_entity::Column::SchoolId,
            attendance_entity::Column::Status,
            attendance_entity::Column::Latitude,
            attendance_entity::Column::Longitude,
        ])
        .value(
            attendance_entity::Column::Notes,
            Expr::cust("COALESCE(excluded.notes, attendances.notes)"),
        )
        .to_owned();

        let stored = attendance_entity::Entity::insert(active)
            .on_conflict(on_conflict)
            .exec_with_returning(&*self.db)
            .await
            .context("attendance upsert failed")?;

        Ok((stored.try_into()?, !existed))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = attendance_entity::Entity::delete_by_id(id)
            .exec(&*self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }
}

// ===== Gamification =====

#[async_trait]
impl AchievementRepository for SeaOrmAchievementRepository {
    async fn create(&self, achievement: &Achievement) -> Result<Achievement> {
        let active: achievement::ActiveModel = achievement.into();
        let result = achievement::Entity::insert(active)
            .exec_with_returning(&*self.db)
            .await?;
        result.try_into()
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Achievement>> {
        let result = achievement::Entity::find_by_id(id).one(&*self.db).await?;
        result.map(Achievement::try_from).transpose()
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Achievement>> {
        let result = achievement::Entity::find()
            .filter(achievement::Column::Name.eq(name))
            .one(&*self.db)
            .await?;
        result.map(Achievement::try_from).transpose()
    }

    async fn list(&self) -> Result<Vec<Achievement>> {
        let results = achievement::Entity::find()
            .order_by_asc(achievement::Column::Id)
            .all(&*self.db)
            .await?;
        convert_all(results)
    }

    async fn update(&self, achievement: &Achievement) -> Result<Achievement> {
        let active: achievement::ActiveModel = achievement.into();
        let result = achievement::Entity::update(active).exec(&*self.db).await?;
        result.try_into()
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = achievement::Entity::delete_by_id(id).exec(&*self.db).await?;
        Ok(result.rows_affected > 0)
    }

    async fn award(
        &self,
        award: &UserAchievement,
        profile: &UserProfile,
    ) -> Result<UserAchievement> {
        let txn = self.db.begin().await?;
        let active: user_achievement::ActiveModel = award.into();
        let result = user_achievement::Entity::insert(active)
            .exec_with_returning(&txn)
            .await?;
        let active: user_profile::ActiveModel = profile.into();
        user_profile::Entity::update(active).exec(&txn).await?;
        txn.commit().await?;
        Ok(result.into())
    }

    async fn find_award(&self, id: i64) -> Result<Option<UserAchievement>> {
        let result = user_achievement::Entity::find_by_id(id)
            .one(&*self.db)
            .await?;
        Ok(result.map(Into::into))
    }

    async fn find_award_for(
        &self,
        profile_id: i64,
        achievement_id: i64,
    ) -> Result<Option<UserAchievement>> {
        let result = user_achievement::Entity::find()
            .filter(user_achievement::Column::ProfileId.eq(profile_id))
            .filter(user_achievement::Column::AchievementId.eq(achievement_id))
            .one(&*self.db)
            .await?;
        Ok(result.map(Into::into))
    }

    async fn list_awards(&self, filter: &AwardFilter) -> Result<Vec<UserAchievement>> {
        let mut query = user_achievement::Entity::find();
        if let Some(profile_ids) = &filter.profile_ids {
            query = query.filter(user_achievement::Column::ProfileId.is_in(profile_ids.clone()));
        }
        if let Some(achievement_id) = filter.achievement_id {
            query = query.filter(user_achievement::Column::AchievementId.eq(achievement_id));
        }
        let results = query
            .order_by_desc(user_achievement::Column::AchievedAt)
            .all(&*self.db)
            .await?;
        Ok(results.into_iter().map(Into::into).collect())
    }

    async fn revoke(&self, id: i64, profile: Option<&UserProfile>) -> Result<bool> {
        let txn = self.db.begin().await?;
        let result = user_achievement::Entity::delete_by_id(id).exec(&txn).await?;
        if let Some(profile) = profile {
            let active: user_profile::ActiveModel = profile.into();
            user_profile::Entity::update(active).exec(&txn).await?;
        }
        txn.commit().await?;
        Ok(result.rows_affected > 0)
    }
}

#[async_trait]
impl ProfileRepository for SeaOrmProfileRepository {
    async fn create(&self, profile: &UserProfile) -> Result<UserProfile> {
        let active: user_profile::ActiveModel = profile.into();
        let result = user_profile::Entity::insert(active)
            .exec_with_returning(&*self.db)
            .await?;
        result.try_into()
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<UserProfile>> {
        let result = user_profile::Entity::find_by_id(id).one(&*self.db).await?;
        result.map(UserProfile::try_from).transpose()
    }

    async fn find_by_user(&self, user_id: i64) -> Result<Option<UserProfile>> {
        let result = user_profile::Entity::find()
            .filter(user_profile::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?;
        result.map(UserProfile::try_from).transpose()
    }

    async fn list(&self, filter: &ProfileFilter) -> Result<Vec<UserProfile>> {
        let mut query = user_profile::Entity::find();
        if let Some(user_ids) = &filter.user_ids {
            query = query.filter(user_profile::Column::UserId.is_in(user_ids.clone()));
        }
        let results = query
            .order_by_asc(user_profile::Column::Id)
            .all(&*self.db)
            .await?;
        convert_all(results)
    }

    async fn update(&self, profile: &UserProfile) -> Result<UserProfile> {
        let active: user_profile::ActiveModel = profile.into();
        let result = user_profile::Entity::update(active).exec(&*self.db).await?;
        result.try_into()
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = user_profile::Entity::delete_by_id(id).exec(&*self.db).await?;
        Ok(result.rows_affected > 0)
    }

    async fn replace_ranks(&self, ranks: &[LeaderboardRank]) -> Result<()> {
        let txn = self.db.begin().await?;
        leaderboard::Entity::delete_many().exec(&txn).await?;
        if !ranks.is_empty() {
            let rows = ranks
                .iter()
                .map(|standing| -> Result<leaderboard::ActiveModel> {
                    Ok(leaderboard::ActiveModel {
                        id: NotSet,
                        profile_id: Set(standing.profile_id),
                        rank: Set(i32::try_from(standing.rank)?),
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            leaderboard::Entity::insert_many(rows).exec(&txn).await?;
        }
        txn.commit().await?;
        Ok(())
    }

    async fn find_rank(&self, profile_id: i64) -> Result<Option<LeaderboardRank>> {
        let result = leaderboard::Entity::find()
            .filter(leaderboard::Column::ProfileId.eq(profile_id))
            .one(&*self.db)
            .await?;
        result
            .map(|row| -> Result<LeaderboardRank> {
                Ok(LeaderboardRank {
                    profile_id: row.profile_id,
                    rank: u32::try_from(row.rank)
                        .with_context(|| format!("rank out of range: {}", row.rank))?,
                })
            })
            .transpose()
    }
}

// ===== Notifications =====

#[async_trait]
impl NotificationRepository for SeaOrmNotificationRepository {
    async fn create(&self, notification: &Notification) -> Result<Notification> {
        let active: notification_entity::ActiveModel = notification.into();
        let result = notification_entity::Entity::insert(active)
            .exec_with_returning(&*self.db)
            .await?;
        Ok(result.into())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Notification>> {
        let result = notification_entity::Entity::find_by_id(id)
            .one(&*self.db)
            .await?;
        Ok(result.map(Into::into))
    }

    async fn list(&self, filter: &NotificationFilter) -> Result<Vec<Notification>> {
        let mut query = notification_entity::Entity::find();
        if let Some(user_id) = filter.user_id {
            query = query.filter(notification_entity::Column::UserId.eq(user_id));
        }
        let results = query
            .order_by_desc(notification_entity::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        Ok(results.into_iter().map(Into::into).collect())
    }

    async fn update(&self, notification: &Notification) -> Result<Notification> {
        let active: notification_entity::ActiveModel = notification.into();
        let result = notification_entity::Entity::update(active)
            .exec(&*self.db)
            .await?;
        Ok(result.into())
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = notification_entity::Entity::delete_by_id(id)
            .exec(&*self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }
}
