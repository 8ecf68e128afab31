//! Periodic proximity re-check for every student

use super::service::Service;
use crate::contract::{AttendanceStatus, GeoPoint, SchoolError, User};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Source of students' current positions
#[async_trait::async_trait]
pub trait LocationProvider: Send + Sync {
    async fn current_location(&self, student: &User) -> Option<GeoPoint>;
}

/// No live positions; the job falls back to the configured placeholder
pub struct NoLiveLocation;

#[async_trait::async_trait]
impl LocationProvider for NoLiveLocation {
    async fn current_location(&self, _student: &User) -> Option<GeoPoint> {
        None
    }
}

/// Outcome of one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckReport {
    /// false when the run fell outside the daily window and did nothing
    pub in_window: bool,
    pub checked: usize,
    pub present: usize,
    pub absent: usize,
    /// Students without school, school coordinates or class
    pub skipped: usize,
    /// Unexpected errors; the run carries on with the next student
    pub failed: usize,
}

pub struct AttendanceCheck {
    service: Arc<Service>,
    locations: Arc<dyn LocationProvider>,
}

impl AttendanceCheck {
    pub fn new(service: Arc<Service>, locations: Arc<dyn LocationProvider>) -> Self {
        Self { service, locations }
    }

    /// Inclusive daily window, compared in UTC
    pub fn in_window(&self, now: DateTime<Utc>) -> bool {
        let cfg = &self.service.config().attendance_check;
        let time = now.time();
        time >= cfg.window_start && time <= cfg.window_end
    }

    /// Check every active student once; `force` ignores the window
    pub async fn run_once(&self, force: bool) -> Result<CheckReport, SchoolError> {
        if !force && !self.in_window(self.service.now()) {
            tracing::debug!("attendance check outside its window, nothing to do");
            return Ok(CheckReport::default());
        }

        let placeholder = self.service.config().attendance_check.placeholder_location();
        let mut report = CheckReport {
            in_window: true,
            ..Default::default()
        };

        for student in self.service.active_students().await? {
            let position = self
                .locations
                .current_location(&student)
                .await
                .unwrap_or(placeholder);

            match self.service.check_in(&student, position).await {
                Ok(check_in) => {
                    report.checked += 1;
                    match check_in.attendance.status {
                        AttendanceStatus::Present => report.present += 1,
                        _ => report.absent += 1,
                    }
                }
                Err(SchoolError::Validation { message }) => {
                    tracing::debug!(student_id = student.id, reason = %message, "student skipped");
                    report.skipped += 1;
                }
                Err(e) => {
                    tracing::warn!(student_id = student.id, error = %e, "attendance check failed for student");
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            checked = report.checked,
            present = report.present,
            absent = report.absent,
            skipped = report.skipped,
            failed = report.failed,
            "attendance check finished"
        );
        Ok(report)
    }

    /// Run on the configured interval until cancelled
    pub async fn run(self, cancel: CancellationToken) {
        let interval = self.service.config().attendance_check.interval;
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::info!(interval = ?interval, "attendance check scheduled");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("attendance check stopped");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.run_once(false).await {
                        tracing::error!(error = %e, "attendance check failed");
                    }
                }
            }
        }
    }
}
