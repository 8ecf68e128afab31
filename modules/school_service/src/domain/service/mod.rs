//! Domain service - business logic orchestration
//!
//! Every public operation takes the authenticated caller, checks the role
//! rules, resolves the caller's scope and talks to the repositories. All
//! failures surface as `SchoolError`.

mod academics;
mod attendance;
mod auth;
mod coursework;
mod gamification;
mod import;
mod notifications;
mod schools;
mod users;

use super::access::Scope;
use super::clock::Clock;
use super::events::{AuditLogPublisher, EventPublisher, SchoolEvent};
use super::leaderboard::LeaderboardCache;
use super::listing::{paginate, Listable};
use super::repository::{ClassFilter, ParentChildFilter, Repositories};
use crate::config::Config;
use crate::contract::{ListQuery, Page, Role, SchoolError, User};
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;

/// Domain service for the school backend
pub struct Service {
    repos: Repositories,
    config: Config,
    clock: Arc<dyn Clock>,
    leaderboard: Arc<LeaderboardCache>,
    publishers: Vec<Arc<dyn EventPublisher>>,
}

impl Service {
    /// Create a service; the leaderboard cache and the audit log are
    /// subscribed to domain events from the start
    pub fn new(repos: Repositories, config: Config, clock: Arc<dyn Clock>) -> Self {
        let leaderboard = Arc::new(LeaderboardCache::new(config.leaderboard_ttl()));
        let publishers: Vec<Arc<dyn EventPublisher>> =
            vec![leaderboard.clone(), Arc::new(AuditLogPublisher)];
        Self {
            repos,
            config,
            clock,
            leaderboard,
            publishers,
        }
    }

    /// Subscribe another publisher to domain events
    pub fn with_publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.publishers.push(publisher);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn leaderboard_cache(&self) -> &LeaderboardCache {
        &self.leaderboard
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    async fn emit(&self, event: SchoolEvent) {
        for publisher in &self.publishers {
            if let Err(e) = publisher.publish(&event).await {
                tracing::warn!(event = event.name(), error = %e, "event publisher failed");
            }
        }
    }

    fn page<T: Listable>(&self, items: Vec<T>, query: &ListQuery) -> Result<Page<T>, SchoolError> {
        paginate(items, query, self.config.max_page_size)
    }

    /// Resolve what the caller may see
    pub async fn scope_for(&self, actor: &User) -> Result<Scope, SchoolError> {
        if actor.is_staff {
            return Ok(Scope::All);
        }

        let scope = match actor.role {
            Role::Teacher => Scope::Teacher {
                user_id: actor.id,
                class_ids: self
                    .class_ids(ClassFilter {
                        teacher_id: Some(actor.id),
                        ..Default::default()
                    })
                    .await?,
            },
            Role::Student => Scope::Student {
                user_id: actor.id,
                class_ids: self
                    .class_ids(ClassFilter {
                        student_ids: Some(vec![actor.id]),
                        ..Default::default()
                    })
                    .await?,
            },
            Role::Parent => {
                let mut child_ids: Vec<i64> = self
                    .repos
                    .families
                    .list(&ParentChildFilter {
                        parent_id: Some(actor.id),
                        ..Default::default()
                    })
                    .await
                    .map_err(internal)?
                    .into_iter()
                    .map(|link| link.child_id)
                    .collect();
                child_ids.sort_unstable();
                child_ids.dedup();

                let class_ids = if child_ids.is_empty() {
                    Vec::new()
                } else {
                    self.class_ids(ClassFilter {
                        student_ids: Some(child_ids.clone()),
                        ..Default::default()
                    })
                    .await?
                };
                Scope::Parent {
                    user_id: actor.id,
                    child_ids,
                    class_ids,
                }
            }
        };

        tracing::debug!(user_id = actor.id, ?scope, "resolved caller scope");
        Ok(scope)
    }

    async fn class_ids(&self, filter: ClassFilter) -> Result<Vec<i64>, SchoolError> {
        Ok(self
            .repos
            .classes
            .list(&filter)
            .await
            .map_err(internal)?
            .into_iter()
            .map(|class| class.id)
            .collect())
    }

    /// Look up a user referenced by an input field and check their role
    async fn referenced_user(&self, id: i64, role: Role, field: &str) -> Result<User, SchoolError> {
        let user = self
            .repos
            .users
            .find_by_id(id)
            .await
            .map_err(internal)?
            .ok_or_else(|| SchoolError::validation(format!("{field}: unknown user {id}")))?;
        if user.role != role {
            return Err(SchoolError::validation(format!(
                "{field}: user {id} is not a {}",
                role.as_str()
            )));
        }
        Ok(user)
    }
}

/// Log a storage failure and hide its details from the caller
pub(crate) fn internal(err: anyhow::Error) -> SchoolError {
    tracing::error!(error = ?err, "storage operation failed");
    SchoolError::Internal
}

/// Sort and deduplicate an id list from user input
fn normalized(mut ids: Vec<i64>) -> Vec<i64> {
    ids.sort_unstable();
    ids.dedup();
    ids
}
