//! SeaORM entities for database tables
//!
//! Foreign keys live in the migrations; entities only describe columns.

pub mod attendance;
pub mod coursework;
pub mod gamification;
pub mod identity;
pub mod notification;
pub mod school;
