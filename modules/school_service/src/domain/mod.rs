//! Domain layer - business logic and services

pub mod access;
pub mod attendance_check;
pub mod clock;
pub mod credentials;
pub mod events;
pub mod geo;
pub mod leaderboard;
pub mod listing;
pub mod repository;
pub mod service;
pub mod validation;

pub use attendance_check::{AttendanceCheck, CheckReport, LocationProvider, NoLiveLocation};
pub use clock::{Clock, SystemClock};
pub use events::{AuditLogPublisher, EventPublisher, SchoolEvent};
pub use repository::Repositories;
pub use service::Service;
