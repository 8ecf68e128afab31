//! Configuration for school service module

use anyhow::{bail, Result};
use chrono::NaiveTime;
use serde::Deserialize;
use std::time::Duration;

use crate::contract::GeoPoint;

/// School service configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Lifetime of an API token, counted from its creation
    #[serde(default = "default_token_ttl", with = "humantime_serde")]
    pub token_ttl: Duration,

    /// How long a computed leaderboard is served from cache
    #[serde(default = "default_leaderboard_ttl", with = "humantime_serde")]
    pub leaderboard_ttl: Duration,

    /// Number of rows kept per leaderboard
    #[serde(default = "default_leaderboard_size")]
    pub leaderboard_size: usize,

    /// Check-in radius around the school, kilometres
    #[serde(default = "default_proximity_radius_km")]
    pub proximity_radius_km: f64,

    /// XP needed per profile level
    #[serde(default = "default_xp_per_level")]
    pub xp_per_level: u32,

    /// Upper bound for the `page_size` list parameter
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u64,

    /// Periodic attendance re-check
    #[serde(default)]
    pub attendance_check: AttendanceCheckConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            token_ttl: default_token_ttl(),
            leaderboard_ttl: default_leaderboard_ttl(),
            leaderboard_size: default_leaderboard_size(),
            proximity_radius_km: default_proximity_radius_km(),
            xp_per_level: default_xp_per_level(),
            max_page_size: default_max_page_size(),
            attendance_check: AttendanceCheckConfig::default(),
        }
    }
}

impl Config {
    pub fn token_ttl(&self) -> chrono::Duration {
        to_chrono(self.token_ttl)
    }

    pub fn leaderboard_ttl(&self) -> chrono::Duration {
        to_chrono(self.leaderboard_ttl)
    }

    /// Reject values the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.xp_per_level == 0 {
            bail!("xp_per_level must be positive");
        }
        if self.max_page_size == 0 {
            bail!("max_page_size must be positive");
        }
        if self.leaderboard_size == 0 {
            bail!("leaderboard_size must be positive");
        }
        if !(self.proximity_radius_km.is_finite() && self.proximity_radius_km > 0.0) {
            bail!("proximity_radius_km must be a positive number");
        }
        self.attendance_check.validate()
    }
}

/// Settings of the background attendance job
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttendanceCheckConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Delay between two runs
    #[serde(default = "default_check_interval", with = "humantime_serde")]
    pub interval: Duration,

    /// First time of day (UTC) at which the job writes attendance
    #[serde(default = "default_window_start")]
    pub window_start: NaiveTime,

    /// Last time of day (UTC) at which the job writes attendance, inclusive
    #[serde(default = "default_window_end")]
    pub window_end: NaiveTime,

    /// Location assumed when no live location is available
    #[serde(default = "default_placeholder_latitude")]
    pub placeholder_latitude: f64,

    #[serde(default = "default_placeholder_longitude")]
    pub placeholder_longitude: f64,
}

impl Default for AttendanceCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: default_check_interval(),
            window_start: default_window_start(),
            window_end: default_window_end(),
            placeholder_latitude: default_placeholder_latitude(),
            placeholder_longitude: default_placeholder_longitude(),
        }
    }
}

impl AttendanceCheckConfig {
    pub fn placeholder_location(&self) -> GeoPoint {
        GeoPoint::new(self.placeholder_latitude, self.placeholder_longitude)
    }

    fn validate(&self) -> Result<()> {
        if self.interval.is_zero() {
            bail!("attendance_check.interval must be longer than zero");
        }
        if self.window_start > self.window_end {
            bail!(
                "attendance_check.window_start ({}) is after window_end ({})",
                self.window_start,
                self.window_end
            );
        }
        if !(-90.0..=90.0).contains(&self.placeholder_latitude)
            || !(-180.0..=180.0).contains(&self.placeholder_longitude)
        {
            bail!("attendance_check placeholder location is out of range");
        }
        Ok(())
    }
}

fn to_chrono(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::weeks(520))
}

fn default_token_ttl() -> Duration {
    Duration::from_secs(24 * 60 * 60)
}

fn default_leaderboard_ttl() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_leaderboard_size() -> usize {
    100
}

fn default_proximity_radius_km() -> f64 {
    0.1
}

fn default_xp_per_level() -> u32 {
    100
}

fn default_max_page_size() -> u64 {
    100
}

fn default_true() -> bool {
    true
}

fn default_check_interval() -> Duration {
    Duration::from_secs(30 * 60)
}

fn default_window_start() -> NaiveTime {
    NaiveTime::from_hms_opt(10, 0, 0).unwrap_or(NaiveTime::MIN)
}

fn default_window_end() -> NaiveTime {
    NaiveTime::from_hms_opt(17, 0, 0).unwrap_or(NaiveTime::MIN)
}

fn default_placeholder_latitude() -> f64 {
    42.8746
}

fn default_placeholder_longitude() -> f64 {
    74.6122
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let cfg: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(cfg.token_ttl, Duration::from_secs(86_400));
        assert_eq!(cfg.leaderboard_size, 100);
        assert_eq!(cfg.proximity_radius_km, 0.1);
        assert!(cfg.attendance_check.enabled);
        assert_eq!(
            cfg.attendance_check.window_start,
            NaiveTime::from_hms_opt(10, 0, 0).unwrap()
        );
    }

    #[test]
    fn durations_and_times_parse_from_yaml() {
        let yaml = r#"
token_ttl: 2h
leaderboard_ttl: 30s
attendance_check:
  interval: 5m
  window_start: "08:30:00"
  window_end: "15:45:00"
"#;
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.token_ttl, Duration::from_secs(7_200));
        assert_eq!(cfg.leaderboard_ttl(), chrono::Duration::seconds(30));
        assert_eq!(cfg.attendance_check.interval, Duration::from_secs(300));
        assert_eq!(
            cfg.attendance_check.window_end,
            NaiveTime::from_hms_opt(15, 45, 0).unwrap()
        );
    }

    #[test]
    fn defaults_are_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn zero_interval_is_rejected() {
        let yaml = "attendance_check:\n  interval: 0s\n";
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("interval"));
    }

    #[test]
    fn inverted_window_is_rejected() {
        let yaml = r#"
attendance_check:
  window_start: "17:00:00"
  window_end: "10:00:00"
"#;
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("window_start"));
    }

    #[test]
    fn zero_xp_per_level_is_rejected() {
        let cfg: Config = serde_yaml::from_str("xp_per_level: 0").unwrap();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result: Result<Config, _> = serde_yaml::from_str("token_lifetime: 1h");
        assert!(result.is_err());
    }
}
