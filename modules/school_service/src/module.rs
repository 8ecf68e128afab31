//! Module declaration and lifecycle implementation

use crate::config::Config;
use crate::domain::{AttendanceCheck, NoLiveLocation, Service, SystemClock};
use anyhow::Result;
use parking_lot::RwLock;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

/// School service module
///
/// Lifecycle: `migrate` (optional) -> `init` -> `register_rest` -> `serve`.
pub struct SchoolServiceModule {
    config: RwLock<Config>,
    service: RwLock<Option<Arc<Service>>>,
}

impl Default for SchoolServiceModule {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl SchoolServiceModule {
    pub fn new(config: Config) -> Self {
        Self {
            config: RwLock::new(config),
            service: RwLock::new(None),
        }
    }

    /// Apply pending schema migrations
    pub async fn migrate(&self, db: &DatabaseConnection) -> Result<()> {
        use crate::infra::storage::migrations::Migrator;
        use sea_orm_migration::MigratorTrait;

        Migrator::up(db, None).await?;
        tracing::info!("School service migrations completed");
        Ok(())
    }

    /// Build repositories and the domain service on top of `db`
    pub fn init(&self, db: Arc<DatabaseConnection>) -> Arc<Service> {
        let repos = crate::infra::storage::sea_orm_repositories(db);
        let config = self.config.read().clone();
        let service = Arc::new(Service::new(repos, config, Arc::new(SystemClock)));
        *self.service.write() = Some(service.clone());

        tracing::info!("School service initialized");
        service
    }

    /// Initialized domain service
    pub fn service(&self) -> Result<Arc<Service>> {
        self.service
            .read()
            .as_ref()
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Service not initialized"))
    }

    pub fn register_rest(&self, router: axum::Router) -> Result<axum::Router> {
        let service = self.service()?;

        tracing::info!("Registering school service REST routes");
        Ok(crate::api::rest::routes::register_routes(router, service))
    }

    /// Background work: the periodic attendance check, until `cancel` fires
    pub async fn serve(
        self: Arc<Self>,
        cancel: tokio_util::sync::CancellationToken,
    ) -> Result<()> {
        let service = self.service()?;
        if !self.config.read().attendance_check.enabled {
            tracing::info!("Attendance check disabled");
            return Ok(());
        }

        AttendanceCheck::new(service, Arc::new(NoLiveLocation))
            .run(cancel)
            .await;
        Ok(())
    }
}
