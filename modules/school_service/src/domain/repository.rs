//! Repository traits for data access
//!
//! These traits define the interface for data access operations.
//! Implementations are in infra/storage/repositories.rs.
//!
//! `create` methods take a full model and ignore its `id` when the table
//! assigns one; the stored record is returned. Filters combine with AND;
//! a `None` field does not constrain the query.

use crate::contract::{
    Achievement, Attendance, AttendanceStatus, AuthToken, Grade, Homework, LeaderboardRank,
    NewAttendance, Notification, ParentChild, Role, Schedule, School, SchoolClass, Subject,
    SubmittedHomework, User, UserAchievement, UserProfile,
};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use std::sync::Arc;
use uuid::Uuid;

// ===== Filters =====

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    pub ids: Option<Vec<i64>>,
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassFilter {
    pub ids: Option<Vec<i64>>,
    /// Classes containing any of these students
    pub student_ids: Option<Vec<i64>>,
    /// Classes taught by this teacher
    pub teacher_id: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectFilter {
    pub ids: Option<Vec<i64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParentChildFilter {
    pub parent_id: Option<i64>,
    pub child_id: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleFilter {
    pub teacher_id: Option<i64>,
    pub class_ids: Option<Vec<i64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HomeworkFilter {
    pub class_ids: Option<Vec<i64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionFilter {
    pub student_ids: Option<Vec<i64>>,
    pub homework_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GradeFilter {
    pub student_ids: Option<Vec<i64>>,
    pub teacher_id: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttendanceFilter {
    pub student_ids: Option<Vec<i64>>,
    pub class_ids: Option<Vec<i64>>,
    pub date: Option<NaiveDate>,
    pub status: Option<AttendanceStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AwardFilter {
    pub profile_ids: Option<Vec<i64>>,
    pub achievement_id: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileFilter {
    pub user_ids: Option<Vec<i64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationFilter {
    pub user_id: Option<i64>,
}

// ===== Identity =====

/// Repository for accounts and their password hashes
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a user with an already hashed password together with their
    /// empty profile; neither row is stored if either insert fails
    async fn create(&self, user: &User, password_hash: &str) -> Result<(User, UserProfile)>;

    async fn find_by_id(&self, id: i64) -> Result<Option<User>>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Stored password hash of a user
    async fn password_hash(&self, user_id: i64) -> Result<Option<String>>;

    async fn set_password_hash(&self, user_id: i64, password_hash: &str) -> Result<()>;

    async fn list(&self, filter: &UserFilter) -> Result<Vec<User>>;

    async fn update(&self, user: &User) -> Result<User>;

    /// Returns false when nothing was deleted
    async fn delete(&self, id: i64) -> Result<bool>;
}

/// Repository for API tokens (at most one per user)
#[async_trait]
pub trait TokenRepository: Send + Sync {
    async fn find(&self, key: &str) -> Result<Option<AuthToken>>;

    async fn find_by_user(&self, user_id: i64) -> Result<Option<AuthToken>>;

    async fn create(&self, token: &AuthToken) -> Result<AuthToken>;

    async fn delete(&self, key: &str) -> Result<bool>;
}

/// Repository for parent to child links
#[async_trait]
pub trait FamilyRepository: Send + Sync {
    async fn create(&self, link: &ParentChild) -> Result<ParentChild>;

    async fn find_by_id(&self, id: i64) -> Result<Option<ParentChild>>;

    async fn list(&self, filter: &ParentChildFilter) -> Result<Vec<ParentChild>>;

    async fn delete(&self, id: i64) -> Result<bool>;
}

// ===== School structure =====

#[async_trait]
pub trait SchoolRepository: Send + Sync {
    async fn create(&self, school: &School) -> Result<School>;

    async fn find_by_id(&self, id: i64) -> Result<Option<School>>;

    async fn find_by_name(&self, name: &str) -> Result<Option<School>>;

    async fn list(&self) -> Result<Vec<School>>;

    async fn update(&self, school: &School) -> Result<School>;

    async fn delete(&self, id: i64) -> Result<bool>;
}

/// Repository for classes and their memberships
#[async_trait]
pub trait ClassRepository: Send + Sync {
    /// Create a class together with its student, teacher and subject links
    async fn create(&self, class: &SchoolClass) -> Result<SchoolClass>;

    async fn find_by_id(&self, id: i64) -> Result<Option<SchoolClass>>;

    async fn find_by_name(&self, name: &str) -> Result<Option<SchoolClass>>;

    async fn list(&self, filter: &ClassFilter) -> Result<Vec<SchoolClass>>;

    /// Update a class, replacing all membership links
    async fn update(&self, class: &SchoolClass) -> Result<SchoolClass>;

    async fn delete(&self, id: i64) -> Result<bool>;
}

#[async_trait]
pub trait SubjectRepository: Send + Sync {
    async fn create(&self, subject: &Subject) -> Result<Subject>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Subject>>;

    async fn find_by_name(&self, name: &str) -> Result<Option<Subject>>;

    async fn list(&self, filter: &SubjectFilter) -> Result<Vec<Subject>>;

    async fn update(&self, subject: &Subject) -> Result<Subject>;

    async fn delete(&self, id: i64) -> Result<bool>;
}

#[async_trait]
pub trait ScheduleRepository: Send + Sync {
    async fn create(&self, schedule: &Schedule) -> Result<Schedule>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Schedule>>;

    /// Lesson occupying the (class, subject, weekday, start) slot
    async fn find_slot(
        &self,
        class_id: Option<i64>,
        subject_id: i64,
        weekday: u8,
        start_time: NaiveTime,
    ) -> Result<Option<Schedule>>;

    async fn list(&self, filter: &ScheduleFilter) -> Result<Vec<Schedule>>;

    async fn update(&self, schedule: &Schedule) -> Result<Schedule>;

    async fn delete(&self, id: i64) -> Result<bool>;
}

// ===== Coursework =====

#[async_trait]
pub trait HomeworkRepository: Send + Sync {
    async fn create(&self, homework: &Homework) -> Result<Homework>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Homework>>;

    async fn list(&self, filter: &HomeworkFilter) -> Result<Vec<Homework>>;

    async fn update(&self, homework: &Homework) -> Result<Homework>;

    async fn delete(&self, id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait SubmissionRepository: Send + Sync {
    async fn create(&self, submission: &SubmittedHomework) -> Result<SubmittedHomework>;

    async fn find_by_id(&self, id: i64) -> Result<Option<SubmittedHomework>>;

    /// A student's submission for a homework
    async fn find_for(&self, homework_id: Uuid, student_id: i64)
        -> Result<Option<SubmittedHomework>>;

    async fn list(&self, filter: &SubmissionFilter) -> Result<Vec<SubmittedHomework>>;

    async fn update(&self, submission: &SubmittedHomework) -> Result<SubmittedHomework>;

    async fn delete(&self, id: i64) -> Result<bool>;
}

#[async_trait]
pub trait GradeRepository: Send + Sync {
    async fn create(&self, grade: &Grade) -> Result<Grade>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Grade>>;

    async fn list(&self, filter: &GradeFilter) -> Result<Vec<Grade>>;

    async fn update(&self, grade: &Grade) -> Result<Grade>;

    async fn delete(&self, id: i64) -> Result<bool>;
}

// ===== Attendance =====

#[async_trait]
pub trait AttendanceRepository: Send + Sync {
    async fn create(&self, attendance: &Attendance) -> Result<Attendance>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Attendance>>;

    /// Row for a student on a calendar day
    async fn find_for_day(&self, student_id: i64, date: NaiveDate) -> Result<Option<Attendance>>;

    async fn list(&self, filter: &AttendanceFilter) -> Result<Vec<Attendance>>;

    async fn update(&self, attendance: &Attendance) -> Result<Attendance>;

    /// Insert or overwrite the row keyed by (student, date).
    /// Returns the stored row and whether it was inserted.
    async fn upsert(&self, attendance: &NewAttendance) -> Result<(Attendance, bool)>;

    async fn delete(&self, id: i64) -> Result<bool>;
}

// ===== Gamification =====

/// Repository for achievements and their awards
#[async_trait]
pub trait AchievementRepository: Send + Sync {
    async fn create(&self, achievement: &Achievement) -> Result<Achievement>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Achievement>>;

    async fn find_by_name(&self, name: &str) -> Result<Option<Achievement>>;

    async fn list(&self) -> Result<Vec<Achievement>>;

    async fn update(&self, achievement: &Achievement) -> Result<Achievement>;

    async fn delete(&self, id: i64) -> Result<bool>;

    /// Store an award and the recipient's recomputed profile in one transaction
    async fn award(&self, award: &UserAchievement, profile: &UserProfile)
        -> Result<UserAchievement>;

    async fn find_award(&self, id: i64) -> Result<Option<UserAchievement>>;

    async fn find_award_for(
        &self,
        profile_id: i64,
        achievement_id: i64,
    ) -> Result<Option<UserAchievement>>;

    async fn list_awards(&self, filter: &AwardFilter) -> Result<Vec<UserAchievement>>;

    /// Delete an award and store the recomputed profile in one transaction
    async fn revoke(&self, id: i64, profile: Option<&UserProfile>) -> Result<bool>;
}

/// Repository for profiles and persisted leaderboard ranks
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn create(&self, profile: &UserProfile) -> Result<UserProfile>;

    async fn find_by_id(&self, id: i64) -> Result<Option<UserProfile>>;

    async fn find_by_user(&self, user_id: i64) -> Result<Option<UserProfile>>;

    async fn list(&self, filter: &ProfileFilter) -> Result<Vec<UserProfile>>;

    async fn update(&self, profile: &UserProfile) -> Result<UserProfile>;

    async fn delete(&self, id: i64) -> Result<bool>;

    /// Replace every stored rank with the given standings
    async fn replace_ranks(&self, ranks: &[LeaderboardRank]) -> Result<()>;

    async fn find_rank(&self, profile_id: i64) -> Result<Option<LeaderboardRank>>;
}

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn create(&self, notification: &Notification) -> Result<Notification>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Notification>>;

    async fn list(&self, filter: &NotificationFilter) -> Result<Vec<Notification>>;

    async fn update(&self, notification: &Notification) -> Result<Notification>;

    async fn delete(&self, id: i64) -> Result<bool>;
}

/// Every repository the service depends on
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub tokens: Arc<dyn TokenRepository>,
    pub families: Arc<dyn FamilyRepository>,
    pub schools: Arc<dyn SchoolRepository>,
    pub classes: Arc<dyn ClassRepository>,
    pub subjects: Arc<dyn SubjectRepository>,
    pub schedules: Arc<dyn ScheduleRepository>,
    pub homework: Arc<dyn HomeworkRepository>,
    pub submissions: Arc<dyn SubmissionRepository>,
    pub grades: Arc<dyn GradeRepository>,
    pub attendance: Arc<dyn AttendanceRepository>,
    pub achievements: Arc<dyn AchievementRepository>,
    pub profiles: Arc<dyn ProfileRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
}
