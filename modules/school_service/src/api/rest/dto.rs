//! REST DTOs with serde derives for HTTP API
//!
//! Update requests are partial: absent fields are left alone. Nullable
//! columns distinguish an absent field from an explicit `null`.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Present-and-null deserializes to `Some(None)`, absent to `None`
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// ===== Listing =====

/// Query string shared by every collection endpoint; unknown keys are ignored
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub search: Option<String>,
    pub ordering: Option<String>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

/// One page of results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageDto<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: u64,
    pub page_size: u64,
}

// ===== Enums =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleDto {
    Student,
    Teacher,
    Parent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatusDto {
    Present,
    Absent,
    Excused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatusDto {
    Submitted,
    Graded,
}

// ===== Accounts =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDto {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: RoleDto,
    pub school_id: Option<i64>,
    pub is_staff: bool,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
}

/// Public sign-up
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub role: RoleDto,
    #[serde(default)]
    pub school_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub token: String,
    pub user: UserDto,
}

/// Staff-created account
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub role: RoleDto,
    #[serde(default)]
    pub school_id: Option<i64>,
    #[serde(default)]
    pub is_staff: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<RoleDto>,
    #[serde(default, deserialize_with = "double_option")]
    pub school_id: Option<Option<i64>>,
    pub is_staff: Option<bool>,
    pub is_active: Option<bool>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenDto {
    pub token: String,
}

/// `/me`: the caller's account merged with their profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeDto {
    #[serde(flatten)]
    pub user: UserDto,
    pub profile: Option<ProfileDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParentLinkDto {
    pub id: i64,
    pub parent_id: i64,
    pub child_id: i64,
    pub class_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateParentLinkRequest {
    pub parent_id: i64,
    pub child_id: i64,
    pub class_id: i64,
}

// ===== Schools =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchoolDto {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub phone: Option<String>,
    pub email: String,
    pub website: Option<String>,
    pub established_date: Option<NaiveDate>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateSchoolRequest {
    pub name: String,
    pub address: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub email: String,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub established_date: Option<NaiveDate>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateSchoolRequest {
    pub name: Option<String>,
    pub address: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub phone: Option<Option<String>>,
    pub email: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub website: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub established_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option")]
    pub latitude: Option<Option<f64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub longitude: Option<Option<f64>>,
}

// ===== Classes, subjects, schedules =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassDto {
    pub id: i64,
    pub name: String,
    pub school_id: i64,
    pub students: Vec<i64>,
    pub teachers: Vec<i64>,
    pub subjects: Vec<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateClassRequest {
    pub name: String,
    pub school_id: i64,
    #[serde(default)]
    pub students: Vec<i64>,
    #[serde(default)]
    pub teachers: Vec<i64>,
    #[serde(default)]
    pub subjects: Vec<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateClassRequest {
    pub name: Option<String>,
    pub school_id: Option<i64>,
    pub students: Option<Vec<i64>>,
    pub teachers: Option<Vec<i64>>,
    pub subjects: Option<Vec<i64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectDto {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateSubjectRequest {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateSubjectRequest {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleDto {
    pub id: i64,
    pub class_id: Option<i64>,
    pub subject_id: i64,
    pub teacher_id: i64,
    /// 1 = Monday .. 7 = Sunday
    pub weekday: u8,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateScheduleRequest {
    #[serde(default)]
    pub class_id: Option<i64>,
    pub subject_id: i64,
    pub teacher_id: i64,
    pub weekday: u8,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateScheduleRequest {
    #[serde(default, deserialize_with = "double_option")]
    pub class_id: Option<Option<i64>>,
    pub subject_id: Option<i64>,
    pub teacher_id: Option<i64>,
    pub weekday: Option<u8>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
}

// ===== Coursework =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomeworkDto {
    pub id: Uuid,
    pub subject_id: i64,
    pub class_id: i64,
    pub description: String,
    pub due_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateHomeworkRequest {
    pub subject_id: i64,
    pub class_id: i64,
    pub description: String,
    pub due_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateHomeworkRequest {
    pub subject_id: Option<i64>,
    pub class_id: Option<i64>,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionDto {
    pub id: i64,
    pub homework_id: Uuid,
    pub student_id: i64,
    pub submission_file: String,
    pub submitted_at: DateTime<Utc>,
    pub status: SubmissionStatusDto,
    pub grade: Option<f64>,
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateSubmissionRequest {
    pub homework_id: Uuid,
    pub submission_file: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateSubmissionRequest {
    pub submission_file: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GradeSubmissionRequest {
    pub grade: f64,
    #[serde(default)]
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeDto {
    pub id: i64,
    pub student_id: i64,
    pub subject_id: i64,
    pub grade: f64,
    pub date: NaiveDate,
    pub teacher_id: Option<i64>,
    pub comments: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateGradeRequest {
    pub student_id: i64,
    pub subject_id: i64,
    pub grade: f64,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub comments: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateGradeRequest {
    pub subject_id: Option<i64>,
    pub grade: Option<f64>,
    pub date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "double_option")]
    pub comments: Option<Option<String>>,
}

// ===== Attendance =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceDto {
    pub id: i64,
    pub student_id: i64,
    pub class_id: i64,
    pub school_id: Option<i64>,
    pub date: NaiveDate,
    pub status: AttendanceStatusDto,
    pub notes: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateAttendanceRequest {
    pub student_id: i64,
    pub class_id: i64,
    #[serde(default)]
    pub school_id: Option<i64>,
    /// Defaults to today
    #[serde(default)]
    pub date: Option<NaiveDate>,
    pub status: AttendanceStatusDto,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateAttendanceRequest {
    pub status: Option<AttendanceStatusDto>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
}

/// Outcome of a GPS check-in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckInDto {
    #[serde(flatten)]
    pub attendance: AttendanceDto,
    pub distance_km: f64,
}

// ===== Gamification =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AchievementDto {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub icon: Option<String>,
    pub xp_reward: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateAchievementRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub xp_reward: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateAchievementRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub icon: Option<Option<String>>,
    pub xp_reward: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwardDto {
    pub id: i64,
    pub profile_id: i64,
    pub achievement_id: i64,
    pub achieved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateAwardRequest {
    pub profile_id: i64,
    pub achievement_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileDto {
    pub id: i64,
    pub user_id: i64,
    pub xp: u32,
    pub level: u32,
    pub class_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub xp: Option<u32>,
    pub level: Option<u32>,
    #[serde(default, deserialize_with = "double_option")]
    pub class_id: Option<Option<i64>>,
}

/// Listing keys plus the board to read; unknown keys are ignored
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeaderboardParams {
    /// xp (default), attendance or grades
    pub metric: Option<String>,
    pub search: Option<String>,
    pub ordering: Option<String>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntryDto {
    pub rank: u32,
    pub profile_id: i64,
    pub user_id: i64,
    pub username: String,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardDto {
    pub metric: String,
    pub entries: Vec<LeaderboardEntryDto>,
    pub total: usize,
    pub page: u64,
    pub page_size: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardRankDto {
    pub profile_id: i64,
    pub rank: u32,
}

// ===== Notifications =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationDto {
    pub id: i64,
    pub user_id: i64,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub is_read: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateNotificationRequest {
    pub message: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateNotificationRequest {
    pub message: Option<String>,
    pub is_read: Option<bool>,
}
