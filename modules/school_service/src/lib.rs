//! School Service Module
//!
//! Backend of a school management system: schools, classes, schedules,
//! homework and grades, GPS-checked attendance, achievements with a cached
//! leaderboard, and notifications. Every read is scoped by the caller's
//! role (student, teacher, parent or staff).

// Public exports
pub mod contract;
pub use contract::{
    Attendance, AttendanceStatus, GeoPoint, LeaderboardMetric, ListQuery, Page, Role,
    SchoolError, StudentRoster, User,
};

pub mod module;
pub use module::SchoolServiceModule;

pub use config::Config;
pub use domain::{AttendanceCheck, CheckReport, Service};

// Internal modules (hidden from public API)
#[doc(hidden)]
pub mod api;
#[doc(hidden)]
pub mod config;
#[doc(hidden)]
pub mod domain;
#[doc(hidden)]
pub mod infra;
