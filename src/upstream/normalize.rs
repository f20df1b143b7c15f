//! Mapping of raw SpaceX launch records onto mission payloads.
//!
//! Both the v3 field names (`mission_name`, `launch_success`,
//! `launch_date_utc`) and their v4 counterparts (`name`, `success`,
//! `date_utc`) are understood.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::api::mission_store::NewMission;

pub const STATUS_SUCCESS: &str = "Success";
pub const STATUS_FAILURE: &str = "Failure";

/// Normalize a raw launch list, preserving order.
///
/// Entries without a string name or a boolean-like success flag are
/// dropped without logging; callers compare lengths to report them.
pub fn normalize_launches(raw: &[Value]) -> Vec<NewMission> {
    raw.iter().filter_map(normalize_launch).collect()
}

/// Normalize a single launch record.
pub fn normalize_launch(raw: &Value) -> Option<NewMission> {
    let name = field(raw, &["mission_name", "name"])?.as_str()?;
    let success = field(raw, &["launch_success", "success"]).and_then(as_success)?;

    let status = if success {
        STATUS_SUCCESS
    } else {
        STATUS_FAILURE
    };
    let mut mission = NewMission::new(name, status);

    if let Some(details) = raw.get("details").and_then(Value::as_str) {
        mission = mission.with_description(details);
    }
    if let Some(launched) = field(raw, &["launch_date_utc", "date_utc"])
        .and_then(Value::as_str)
        .and_then(parse_launch_date)
    {
        mission = mission.with_launch_date(launched);
    }

    Some(mission)
}

/// First non-null value among `keys`.
fn field<'a>(raw: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| raw.get(*k))
        .find(|v| !v.is_null())
}

fn as_success(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn parse_launch_date(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}
