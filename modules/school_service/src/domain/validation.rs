//! Field rules shared by the service operations

use crate::contract::{GeoPoint, SchoolError};
use chrono::NaiveTime;
use serde_json::Value;

pub const USERNAME_MAX_LEN: usize = 150;
pub const NAME_MAX_LEN: usize = 150;
pub const PASSWORD_MIN_LEN: usize = 8;
pub const MAX_GRADE: f64 = 100.0;

/// Letters, digits and `@.+-_`, at most 150 characters
pub fn validate_username(username: &str) -> Result<(), SchoolError> {
    if username.is_empty() {
        return Err(SchoolError::validation("username cannot be empty"));
    }
    if username.chars().count() > USERNAME_MAX_LEN {
        return Err(SchoolError::validation(format!(
            "username must be at most {USERNAME_MAX_LEN} characters"
        )));
    }
    let allowed = |c: char| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_');
    if !username.chars().all(allowed) {
        return Err(SchoolError::validation(format!(
            "username '{username}' may only contain letters, digits and @/./+/-/_"
        )));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), SchoolError> {
    let invalid = || SchoolError::validation(format!("'{email}' is not a valid email address"));

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty()
        || domain.contains('@')
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
        || email.chars().any(char::is_whitespace)
    {
        return Err(invalid());
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), SchoolError> {
    if password.chars().count() < PASSWORD_MIN_LEN {
        return Err(SchoolError::validation(format!(
            "password must be at least {PASSWORD_MIN_LEN} characters"
        )));
    }
    Ok(())
}

/// Non-blank text no longer than `max` characters
pub fn validate_text(field: &str, value: &str, max: usize) -> Result<(), SchoolError> {
    if value.trim().is_empty() {
        return Err(SchoolError::validation(format!("{field} cannot be blank")));
    }
    if value.chars().count() > max {
        return Err(SchoolError::validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}

pub fn validate_point(point: GeoPoint) -> Result<(), SchoolError> {
    if !point.latitude.is_finite() || !(-90.0..=90.0).contains(&point.latitude) {
        return Err(SchoolError::validation(
            "latitude must be between -90 and 90",
        ));
    }
    if !point.longitude.is_finite() || !(-180.0..=180.0).contains(&point.longitude) {
        return Err(SchoolError::validation(
            "longitude must be between -180 and 180",
        ));
    }
    Ok(())
}

/// Read one coordinate from a request body; numbers and numeric strings are
/// accepted, anything else is rejected
pub fn parse_coordinate(field: &str, value: Option<&Value>) -> Result<f64, SchoolError> {
    let parsed = match value {
        None | Some(Value::Null) => {
            return Err(SchoolError::validation(
                "latitude and longitude are required",
            ))
        }
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };
    parsed
        .filter(|v| v.is_finite())
        .ok_or_else(|| SchoolError::validation(format!("{field} must be a number")))
}

/// Parse and range-check a coordinate pair from a request body
pub fn parse_point(latitude: Option<&Value>, longitude: Option<&Value>) -> Result<GeoPoint, SchoolError> {
    let point = GeoPoint::new(
        parse_coordinate("latitude", latitude)?,
        parse_coordinate("longitude", longitude)?,
    );
    validate_point(point)?;
    Ok(point)
}

pub fn validate_grade(value: f64) -> Result<(), SchoolError> {
    if !value.is_finite() || !(0.0..=MAX_GRADE).contains(&value) {
        return Err(SchoolError::validation(format!(
            "grade must be between 0 and {MAX_GRADE}"
        )));
    }
    Ok(())
}

pub fn validate_lesson_slot(
    weekday: u8,
    start_time: NaiveTime,
    end_time: NaiveTime,
) -> Result<(), SchoolError> {
    if !(1..=7).contains(&weekday) {
        return Err(SchoolError::validation(
            "weekday must be between 1 (Monday) and 7 (Sunday)",
        ));
    }
    if start_time >= end_time {
        return Err(SchoolError::validation(
            "start_time must be before end_time",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn usernames() {
        assert!(validate_username("aibek.asanov").is_ok());
        assert!(validate_username("t+1@school_x-y").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("with space").is_err());
        assert!(validate_username(&"a".repeat(151)).is_err());
    }

    #[test]
    fn emails() {
        assert!(validate_email("admin@school.com").is_ok());
        assert!(validate_email("admin@school").is_err());
        assert!(validate_email("@school.com").is_err());
        assert!(validate_email("a@@school.com").is_err());
        assert!(validate_email("a b@school.com").is_err());
    }

    #[test]
    fn passwords_need_eight_chars() {
        assert!(validate_password("1234567").is_err());
        assert!(validate_password("12345678").is_ok());
    }

    #[test]
    fn coordinates_accept_numbers_and_numeric_strings() {
        assert_eq!(parse_coordinate("latitude", Some(&json!(42.5))).unwrap(), 42.5);
        assert_eq!(parse_coordinate("latitude", Some(&json!(" 42.5 "))).unwrap(), 42.5);
        assert_eq!(parse_coordinate("latitude", Some(&json!(42))).unwrap(), 42.0);
    }

    #[test]
    fn coordinates_reject_missing_and_garbage() {
        let missing = parse_coordinate("latitude", None).unwrap_err();
        assert_eq!(
            missing,
            SchoolError::validation("latitude and longitude are required")
        );
        assert!(parse_coordinate("latitude", Some(&Value::Null)).is_err());
        assert!(parse_coordinate("latitude", Some(&json!("north"))).is_err());
        assert!(parse_coordinate("latitude", Some(&json!(true))).is_err());
        assert!(parse_coordinate("latitude", Some(&json!("NaN"))).is_err());
    }

    #[test]
    fn points_are_range_checked() {
        assert!(parse_point(Some(&json!(42.87)), Some(&json!(74.61))).is_ok());
        assert!(parse_point(Some(&json!(91)), Some(&json!(0))).is_err());
        assert!(parse_point(Some(&json!(0)), Some(&json!(-180.5))).is_err());
    }

    #[test]
    fn grades_are_bounded() {
        assert!(validate_grade(0.0).is_ok());
        assert!(validate_grade(100.0).is_ok());
        assert!(validate_grade(-0.5).is_err());
        assert!(validate_grade(100.5).is_err());
        assert!(validate_grade(f64::NAN).is_err());
    }

    #[test]
    fn lesson_slots() {
        let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        let ten = NaiveTime::from_hms_opt(10, 0, 0).unwrap();
        assert!(validate_lesson_slot(1, nine, ten).is_ok());
        assert!(validate_lesson_slot(0, nine, ten).is_err());
        assert!(validate_lesson_slot(8, nine, ten).is_err());
        assert!(validate_lesson_slot(3, ten, nine).is_err());
        assert!(validate_lesson_slot(3, ten, ten).is_err());
    }
}
