//! Leaderboard ranking and the per-metric cache

use super::events::{EventPublisher, SchoolEvent};
use crate::contract::{LeaderboardEntry, LeaderboardMetric};
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

/// Aggregate score of one student profile before ranking
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredProfile {
    pub profile_id: i64,
    pub user_id: i64,
    pub username: String,
    pub score: f64,
}

/// Order by score descending, ties by username ascending, keep `limit` rows
/// and number them from 1
pub fn rank_profiles(mut scored: Vec<ScoredProfile>, limit: usize) -> Vec<LeaderboardEntry> {
    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.username.cmp(&b.username))
    });
    scored
        .into_iter()
        .take(limit)
        .zip(1u32..)
        .map(|(row, rank)| LeaderboardEntry {
            rank,
            profile_id: row.profile_id,
            user_id: row.user_id,
            username: row.username,
            score: row.score,
        })
        .collect()
}

struct CachedBoard {
    rows: Arc<Vec<LeaderboardEntry>>,
    computed_at: DateTime<Utc>,
}

#[derive(Default)]
struct Boards {
    rows: HashMap<LeaderboardMetric, CachedBoard>,
    /// Bumped by every invalidation; a board scored under an older
    /// generation is never stored
    generations: HashMap<LeaderboardMetric, u64>,
}

/// Precomputed leaderboards keyed by metric
pub struct LeaderboardCache {
    ttl: Duration,
    boards: RwLock<Boards>,
}

impl LeaderboardCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            boards: RwLock::new(Boards::default()),
        }
    }

    /// Rows for a metric unless missing or older than the TTL
    pub fn get(
        &self,
        metric: LeaderboardMetric,
        now: DateTime<Utc>,
    ) -> Option<Arc<Vec<LeaderboardEntry>>> {
        let boards = self.boards.read();
        boards
            .rows
            .get(&metric)
            .filter(|board| now - board.computed_at < self.ttl)
            .map(|board| Arc::clone(&board.rows))
    }

    /// Read before scoring and hand back to [`put`](Self::put)
    pub fn generation(&self, metric: LeaderboardMetric) -> u64 {
        self.boards
            .read()
            .generations
            .get(&metric)
            .copied()
            .unwrap_or(0)
    }

    /// Store a freshly scored board unless the metric was invalidated since
    /// `generation` was read. The rows are returned either way.
    pub fn put(
        &self,
        metric: LeaderboardMetric,
        rows: Vec<LeaderboardEntry>,
        now: DateTime<Utc>,
        generation: u64,
    ) -> Arc<Vec<LeaderboardEntry>> {
        let rows = Arc::new(rows);
        let mut boards = self.boards.write();
        let current = boards.generations.get(&metric).copied().unwrap_or(0);
        if current == generation {
            boards.rows.insert(
                metric,
                CachedBoard {
                    rows: Arc::clone(&rows),
                    computed_at: now,
                },
            );
        } else {
            tracing::debug!(
                metric = metric.as_str(),
                "leaderboard changed while scoring, not cached"
            );
        }
        rows
    }

    pub fn invalidate(&self, metric: LeaderboardMetric) {
        let mut boards = self.boards.write();
        *boards.generations.entry(metric).or_insert(0) += 1;
        if boards.rows.remove(&metric).is_some() {
            tracing::debug!(metric = metric.as_str(), "leaderboard cache invalidated");
        }
    }

    pub fn is_cached(&self, metric: LeaderboardMetric, now: DateTime<Utc>) -> bool {
        self.get(metric, now).is_some()
    }
}

#[async_trait::async_trait]
impl EventPublisher for LeaderboardCache {
    async fn publish(&self, event: &SchoolEvent) -> anyhow::Result<()> {
        for metric in event.affected_metrics() {
            self.invalidate(*metric);
        }
        Ok(())
    }
}
