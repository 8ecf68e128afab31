//! Contract models for school service
//!
//! These models are transport-agnostic and shared by the domain, storage
//! and REST layers. NO serde derives - the REST layer owns its DTOs.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

/// User role, determines query visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Student,
    Teacher,
    Parent,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
            Role::Parent => "parent",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "student" => Some(Role::Student),
            "teacher" => Some(Role::Teacher),
            "parent" => Some(Role::Parent),
            _ => None,
        }
    }
}

/// Account record (password hash stays in storage)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    /// Only meaningful for students and teachers
    pub school_id: Option<i64>,
    /// Staff users bypass role scoping and may perform administrative writes
    pub is_staff: bool,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Opaque API token bound to a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthToken {
    pub key: String,
    pub user_id: i64,
    pub created: DateTime<Utc>,
}

impl AuthToken {
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now > self.created + ttl
    }
}

/// WGS-84 coordinate pair in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct School {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub phone: Option<String>,
    pub email: String,
    pub website: Option<String>,
    pub established_date: Option<NaiveDate>,
    /// Reference point for proximity check-in
    pub location: Option<GeoPoint>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchoolClass {
    pub id: i64,
    pub name: String,
    pub school_id: i64,
    pub student_ids: Vec<i64>,
    pub teacher_ids: Vec<i64>,
    pub subject_ids: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub id: i64,
    pub name: String,
}

/// Parent to child relation, scoped to the child's class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentChild {
    pub id: i64,
    pub parent_id: i64,
    pub child_id: i64,
    pub class_id: i64,
}

/// One weekly lesson slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    pub id: i64,
    pub class_id: Option<i64>,
    pub subject_id: i64,
    pub teacher_id: i64,
    /// ISO weekday, 1 = Monday .. 7 = Sunday
    pub weekday: u8,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Homework {
    pub id: Uuid,
    pub subject_id: i64,
    pub class_id: i64,
    pub description: String,
    pub due_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionStatus {
    Submitted,
    Graded,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Submitted => "submitted",
            SubmissionStatus::Graded => "graded",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "submitted" => Some(SubmissionStatus::Submitted),
            "graded" => Some(SubmissionStatus::Graded),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedHomework {
    pub id: i64,
    pub homework_id: Uuid,
    pub student_id: i64,
    /// Reference to the uploaded file (storage is external)
    pub submission_file: String,
    pub submitted_at: DateTime<Utc>,
    pub status: SubmissionStatus,
    pub grade: Option<f64>,
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Grade {
    pub id: i64,
    pub student_id: i64,
    pub subject_id: i64,
    pub value: f64,
    pub date: NaiveDate,
    /// Grader; cleared when the teacher account is removed
    pub teacher_id: Option<i64>,
    pub comments: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttendanceStatus {
    Present,
    Absent,
    Excused,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::Excused => "excused",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "present" => Some(AttendanceStatus::Present),
            "absent" => Some(AttendanceStatus::Absent),
            "excused" => Some(AttendanceStatus::Excused),
            _ => None,
        }
    }
}

/// One attendance row per student per calendar day
#[derive(Debug, Clone, PartialEq)]
pub struct Attendance {
    pub id: i64,
    pub student_id: i64,
    pub class_id: i64,
    pub school_id: Option<i64>,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub notes: Option<String>,
    pub location: Option<GeoPoint>,
}

/// Result of a proximity check-in
#[derive(Debug, Clone, PartialEq)]
pub struct CheckIn {
    pub attendance: Attendance,
    /// false when today's row already existed and was overwritten
    pub created: bool,
    pub distance_km: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Achievement {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub icon: Option<String>,
    pub xp_reward: u32,
}

/// Achievement awarded to a profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAchievement {
    pub id: i64,
    pub profile_id: i64,
    pub achievement_id: i64,
    pub achieved_at: DateTime<Utc>,
}

/// Gamification profile, one per user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub id: i64,
    pub user_id: i64,
    pub xp: u32,
    pub level: u32,
    pub class_id: Option<i64>,
}

/// User together with their profile, as returned by `/me`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserOverview {
    pub user: User,
    pub profile: Option<UserProfile>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeaderboardMetric {
    /// Sum of XP rewards over awarded achievements
    Xp,
    /// Number of days marked present
    Attendance,
    /// Average grade value
    Grades,
}

impl LeaderboardMetric {
    pub const ALL: [LeaderboardMetric; 3] = [
        LeaderboardMetric::Xp,
        LeaderboardMetric::Attendance,
        LeaderboardMetric::Grades,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LeaderboardMetric::Xp => "xp",
            LeaderboardMetric::Attendance => "attendance",
            LeaderboardMetric::Grades => "grades",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "xp" => Some(LeaderboardMetric::Xp),
            "attendance" => Some(LeaderboardMetric::Attendance),
            "grades" => Some(LeaderboardMetric::Grades),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardEntry {
    /// 1-based position
    pub rank: u32,
    pub profile_id: i64,
    pub user_id: i64,
    pub username: String,
    pub score: f64,
}

/// Persisted XP standing of a profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardRank {
    pub profile_id: i64,
    pub rank: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub is_read: bool,
}

/// Login issued by the bulk student import
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCredential {
    pub username: String,
    pub password: String,
    pub full_name: String,
    pub class_name: String,
}

/// List parameters shared by every collection endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    /// Case-insensitive substring over the resource's search fields
    pub search: Option<String>,
    /// Comma-separated field names, `-` prefix for descending
    pub ordering: Option<String>,
    /// 1-based page number
    pub page: u64,
    pub page_size: u64,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            search: None,
            ordering: None,
            page: 1,
            page_size: 10,
        }
    }
}

/// One page of a collection
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: u64,
    pub page_size: u64,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
        }
    }
}
