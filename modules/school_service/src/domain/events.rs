//! Domain events for school service
//!
//! The service publishes an event after every write that can change a
//! derived view. Subscribers include the leaderboard cache (invalidation)
//! and the audit log.

use crate::contract::{AttendanceStatus, LeaderboardMetric};
use chrono::NaiveDate;

/// Domain event types for school records
#[derive(Debug, Clone, PartialEq)]
pub enum SchoolEvent {
    UserCreated { user_id: i64 },
    UserUpdated { user_id: i64 },
    UserDeleted { user_id: i64 },
    ProfileUpdated { profile_id: i64 },
    ProfileDeleted { profile_id: i64 },
    /// Achievement created, edited or removed
    AchievementChanged { achievement_id: i64 },
    AchievementAwarded { profile_id: i64, achievement_id: i64 },
    AchievementRevoked { profile_id: i64, achievement_id: i64 },
    AttendanceRecorded {
        student_id: i64,
        date: NaiveDate,
        status: AttendanceStatus,
    },
    AttendanceDeleted { attendance_id: i64 },
    GradeRecorded { grade_id: i64, student_id: i64 },
    GradeDeleted { grade_id: i64 },
    SubmissionGraded { submission_id: i64, student_id: i64 },
}

impl SchoolEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SchoolEvent::UserCreated { .. } => "user_created",
            SchoolEvent::UserUpdated { .. } => "user_updated",
            SchoolEvent::UserDeleted { .. } => "user_deleted",
            SchoolEvent::ProfileUpdated { .. } => "profile_updated",
            SchoolEvent::ProfileDeleted { .. } => "profile_deleted",
            SchoolEvent::AchievementChanged { .. } => "achievement_changed",
            SchoolEvent::AchievementAwarded { .. } => "achievement_awarded",
            SchoolEvent::AchievementRevoked { .. } => "achievement_revoked",
            SchoolEvent::AttendanceRecorded { .. } => "attendance_recorded",
            SchoolEvent::AttendanceDeleted { .. } => "attendance_deleted",
            SchoolEvent::GradeRecorded { .. } => "grade_recorded",
            SchoolEvent::GradeDeleted { .. } => "grade_deleted",
            SchoolEvent::SubmissionGraded { .. } => "submission_graded",
        }
    }

    /// Leaderboards whose rows may be stale after this event
    pub fn affected_metrics(&self) -> &'static [LeaderboardMetric] {
        match self {
            // membership or usernames of every board may change
            SchoolEvent::UserCreated { .. }
            | SchoolEvent::UserUpdated { .. }
            | SchoolEvent::UserDeleted { .. }
            | SchoolEvent::ProfileDeleted { .. } => &LeaderboardMetric::ALL,
            SchoolEvent::AchievementChanged { .. }
            | SchoolEvent::AchievementAwarded { .. }
            | SchoolEvent::AchievementRevoked { .. } => &[LeaderboardMetric::Xp],
            SchoolEvent::AttendanceRecorded { .. } | SchoolEvent::AttendanceDeleted { .. } => {
                &[LeaderboardMetric::Attendance]
            }
            SchoolEvent::GradeRecorded { .. } | SchoolEvent::GradeDeleted { .. } => {
                &[LeaderboardMetric::Grades]
            }
            SchoolEvent::ProfileUpdated { .. } | SchoolEvent::SubmissionGraded { .. } => &[],
        }
    }
}

/// Event publisher trait for publishing domain events
#[async_trait::async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &SchoolEvent) -> anyhow::Result<()>;
}

/// Writes every event to the `audit` tracing target
pub struct AuditLogPublisher;

#[async_trait::async_trait]
impl EventPublisher for AuditLogPublisher {
    async fn publish(&self, event: &SchoolEvent) -> anyhow::Result<()> {
        tracing::info!(target: "audit", event = event.name(), details = ?event, "school event");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn award_touches_only_xp_board() {
        let event = SchoolEvent::AchievementAwarded {
            profile_id: 1,
            achievement_id: 2,
        };
        assert_eq!(event.affected_metrics(), &[LeaderboardMetric::Xp]);
        assert_eq!(event.name(), "achievement_awarded");
    }

    #[test]
    fn user_removal_touches_every_board() {
        let event = SchoolEvent::UserDeleted { user_id: 7 };
        assert_eq!(event.affected_metrics(), &LeaderboardMetric::ALL);
    }

    #[tokio::test]
    async fn audit_publisher_accepts_events() {
        let result = AuditLogPublisher
            .publish(&SchoolEvent::GradeDeleted { grade_id: 3 })
            .await;
        assert!(result.is_ok());
    }
}
