//! Field lookups over untyped JSON.

use serde_json::Value;

use super::JOB_ID_KEYS;
use crate::job::JobPhase;

/// String at `key` unless it is blank. The value is returned as sent.
pub(super) fn non_empty_str(obj: &Value, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

/// First non-empty string among `keys`, in order.
pub(super) fn first_string(obj: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| non_empty_str(obj, k))
}

/// Map a backend code by suffix (`*_SUCCESS`, `*_PENDING`, `*_FAILED`).
///
/// Error codes such as `ASSET_NOT_SUCCESS` describe a precondition, not a
/// job phase, and are skipped.
pub(super) fn phase_from_code(code: &str) -> Option<JobPhase> {
    if code.contains("_NOT_") {
        return None;
    }
    if code.ends_with("_SUCCESS") {
        Some(JobPhase::Success)
    } else if code.ends_with("_PENDING") {
        Some(JobPhase::Pending)
    } else if code.ends_with("_FAILED") {
        Some(JobPhase::Failed)
    } else {
        None
    }
}

/// Literal `status` string, exactly one of the canonical phase names.
/// Numeric `status` (the HTTP code echoed in the envelope) is ignored.
pub(super) fn literal_status(obj: &Value) -> Option<JobPhase> {
    obj.get("status")
        .and_then(Value::as_str)
        .and_then(JobPhase::from_literal)
}

fn positive_id(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64().filter(|id| *id > 0),
        Value::String(s) => s.trim().parse::<i64>().ok().filter(|id| *id > 0),
        _ => None,
    }
}

/// Job id assigned by the backend: the first positive integer under one of
/// the id keys, looking under `data` first, then at the top level.
/// Numeric strings are accepted; zero, negatives, and fractions are not.
pub fn extract_job_id(payload: &Value) -> Option<i64> {
    let lookup = |obj: &Value| JOB_ID_KEYS.iter().find_map(|k| obj.get(k).and_then(positive_id));
    payload.get("data").and_then(lookup).or_else(|| lookup(payload))
}
