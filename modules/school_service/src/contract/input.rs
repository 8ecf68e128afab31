//! Create and partial-update inputs
//!
//! `Patch` types carry only the fields a caller wants to change. Nullable
//! columns use `Option<Option<T>>`: outer `None` leaves the value alone,
//! `Some(None)` clears it.

use super::model::{AttendanceStatus, GeoPoint, Role};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub school_id: Option<i64>,
    pub is_staff: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPatch {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<Role>,
    pub school_id: Option<Option<i64>>,
    pub is_staff: Option<bool>,
    pub is_active: Option<bool>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewSchool {
    pub name: String,
    pub address: String,
    pub phone: Option<String>,
    pub email: String,
    pub website: Option<String>,
    pub established_date: Option<NaiveDate>,
    pub location: Option<GeoPoint>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchoolPatch {
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<Option<String>>,
    pub email: Option<String>,
    pub website: Option<Option<String>>,
    pub established_date: Option<Option<NaiveDate>>,
    pub location: Option<Option<GeoPoint>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewClass {
    pub name: String,
    pub school_id: i64,
    pub student_ids: Vec<i64>,
    pub teacher_ids: Vec<i64>,
    pub subject_ids: Vec<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassPatch {
    pub name: Option<String>,
    pub school_id: Option<i64>,
    pub student_ids: Option<Vec<i64>>,
    pub teacher_ids: Option<Vec<i64>>,
    pub subject_ids: Option<Vec<i64>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubject {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectPatch {
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewParentChild {
    pub parent_id: i64,
    pub child_id: i64,
    pub class_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSchedule {
    pub class_id: Option<i64>,
    pub subject_id: i64,
    pub teacher_id: i64,
    pub weekday: u8,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulePatch {
    pub class_id: Option<Option<i64>>,
    pub subject_id: Option<i64>,
    pub teacher_id: Option<i64>,
    pub weekday: Option<u8>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewHomework {
    pub subject_id: i64,
    pub class_id: i64,
    pub description: String,
    pub due_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HomeworkPatch {
    pub subject_id: Option<i64>,
    pub class_id: Option<i64>,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubmission {
    pub homework_id: Uuid,
    pub submission_file: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionPatch {
    pub submission_file: Option<String>,
}

/// Teacher verdict on a submission
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionReview {
    pub grade: f64,
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewGrade {
    pub student_id: i64,
    pub subject_id: i64,
    pub value: f64,
    /// Defaults to today
    pub date: Option<NaiveDate>,
    pub comments: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GradePatch {
    pub subject_id: Option<i64>,
    pub value: Option<f64>,
    pub date: Option<NaiveDate>,
    pub comments: Option<Option<String>>,
}

/// Attendance row to insert, or to upsert by (student, date)
#[derive(Debug, Clone, PartialEq)]
pub struct NewAttendance {
    pub student_id: i64,
    pub class_id: i64,
    pub school_id: Option<i64>,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub notes: Option<String>,
    pub location: Option<GeoPoint>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttendancePatch {
    pub status: Option<AttendanceStatus>,
    pub notes: Option<Option<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAchievement {
    pub name: String,
    pub description: String,
    pub icon: Option<String>,
    pub xp_reward: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AchievementPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub icon: Option<Option<String>>,
    pub xp_reward: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfilePatch {
    pub xp: Option<u32>,
    pub level: Option<u32>,
    pub class_id: Option<Option<i64>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationPatch {
    pub message: Option<String>,
    pub is_read: Option<bool>,
}

/// Class roster for the bulk student import
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentRoster {
    /// School to attach the class to; created when missing
    pub school_name: String,
    /// Class to enrol the students in; created when missing
    pub class_name: String,
    /// One "LastName FirstName [Patronymic]" entry per student
    pub full_names: Vec<String>,
    /// Domain of the generated email addresses
    pub email_domain: String,
}
