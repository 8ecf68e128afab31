//! Layered application configuration
//!
//! Defaults, then the YAML file, then `ORGO__`-prefixed environment
//! variables (`ORGO__SERVER__BIND=0.0.0.0:9000`).

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::value::Dict;
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const ENV_PREFIX: &str = "ORGO__";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Passed through to the school service module
    #[serde(default)]
    pub school: ModuleSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub bind: String,
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8087".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    /// Apply pending migrations before serving
    pub migrate_on_start: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://orgo.db?mode=rwc".to_string(),
            max_connections: 10,
            migrate_on_start: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` wins when set
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

/// Raw module section; extracted separately so the module keeps its own
/// defaults and unknown-key checks
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleSection(pub Dict);

impl AppConfig {
    /// Load defaults, then `path` when it exists, then the environment
    pub fn load(path: &Path) -> Result<Self> {
        Self::figment(path)
            .extract()
            .with_context(|| format!("invalid configuration (file {})", path.display()))
    }

    fn figment(path: &Path) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));
        if path.exists() {
            figment = figment.merge(Yaml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Typed module configuration from the `school` section
    pub fn school_config(&self) -> Result<school_service::Config> {
        let school: school_service::Config = Figment::from(Serialized::defaults(&self.school))
            .extract()
            .context("invalid `school` configuration section")?;
        school
            .validate()
            .context("invalid `school` configuration section")?;
        Ok(school)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_apply_without_file() {
        Jail::expect_with(|_jail| {
            let cfg = AppConfig::load(Path::new("missing.yaml")).map_err(|e| e.to_string())?;
            assert_eq!(cfg.server.bind, "127.0.0.1:8087");
            assert_eq!(cfg.logging.format, LogFormat::Text);
            assert!(cfg.database.migrate_on_start);
            let school = cfg.school_config().map_err(|e| e.to_string())?;
            assert_eq!(school.leaderboard_size, 100);
            Ok(())
        });
    }

    #[test]
    fn environment_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "orgo.yaml",
                r#"
server:
  bind: "0.0.0.0:9000"
  request_timeout: 10s
logging:
  format: json
school:
  token_ttl: 1h
"#,
            )?;
            jail.set_env("ORGO__SERVER__BIND", "0.0.0.0:9100");

            let cfg = AppConfig::load(Path::new("orgo.yaml")).map_err(|e| e.to_string())?;
            assert_eq!(cfg.server.bind, "0.0.0.0:9100");
            assert_eq!(cfg.server.request_timeout, Duration::from_secs(10));
            assert_eq!(cfg.logging.format, LogFormat::Json);
            let school = cfg.school_config().map_err(|e| e.to_string())?;
            assert_eq!(school.token_ttl, Duration::from_secs(3600));
            Ok(())
        });
    }

    #[test]
    fn unknown_module_key_is_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("orgo.yaml", "school:\n  leaderbord_size: 5\n")?;
            let cfg = AppConfig::load(Path::new("orgo.yaml")).map_err(|e| e.to_string())?;
            assert!(cfg.school_config().is_err());
            Ok(())
        });
    }

    #[test]
    fn zero_check_interval_is_rejected_at_load() {
        Jail::expect_with(|jail| {
            jail.create_file("orgo.yaml", "school: {}\n")?;
            jail.set_env("ORGO__SCHOOL__ATTENDANCE_CHECK__INTERVAL", "0s");
            let cfg = AppConfig::load(Path::new("orgo.yaml")).map_err(|e| e.to_string())?;
            assert!(cfg.school_config().is_err());
            Ok(())
        });
    }
}
