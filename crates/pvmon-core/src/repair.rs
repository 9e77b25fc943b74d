// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of PVMon.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

//! Best-effort recovery of truncated or hand-edited JSON lists.
//!
//! Some backends stream the device list and occasionally cut it short, or emit
//! trailing commas and back-to-back objects. Strict parsing is always tried
//! first; the repair pass only runs when that fails.

use serde::de::{DeserializeOwned, IgnoredAny};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

/// Keys under which list endpoints wrap their payload.
const ENVELOPE_KEYS: [&str; 5] = ["data", "items", "results", "devices", "records"];

#[derive(Debug, Error)]
pub enum RepairError {
    #[error("response is not valid JSON even after repair: {0}")]
    Unrecoverable(serde_json::Error),

    #[error("response JSON does not contain a list")]
    NotAList,
}

/// Parsed list plus what it took to get there.
#[derive(Debug)]
pub struct RepairedList<T> {
    pub items: Vec<T>,
    /// The raw text needed repair before it parsed.
    pub repaired: bool,
    /// Entries that parsed as JSON but not as `T`.
    pub skipped: usize,
}

/// An open container in the output: where its opener sits and where its
/// current (possibly incomplete) member starts.
#[derive(Debug)]
struct Frame {
    closer: char,
    open_at: usize,
    member_at: usize,
}

/// Rewrites common JSON damage:
///
/// * trailing commas before `]` / `}`,
/// * adjacent objects with no comma between them,
/// * unterminated strings and unclosed brackets at end of input,
/// * a member cut off inside a key, after a `:` or inside a literal, which is
///   dropped together with any container it leaves empty,
/// * stray or mismatched closing brackets,
/// * several top-level values, which get wrapped into one array.
#[must_use]
pub fn repair_json(input: &str) -> String {
    let input = input.trim_start_matches('\u{feff}').trim();
    let mut out = String::with_capacity(input.len() + 8);
    let mut frames: Vec<Frame> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    let mut top_level_values = 0_usize;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => {
                if frames.is_empty() {
                    top_level_values += 1;
                }
                in_string = true;
                out.push(c);
            }
            '{' | '[' => {
                if let Some(parent) = frames.last_mut() {
                    if ends_value(&out) {
                        out.push(',');
                        parent.member_at = out.len();
                    }
                } else {
                    if top_level_values > 0 {
                        out.push(',');
                    }
                    top_level_values += 1;
                }
                let open_at = out.len();
                out.push(c);
                frames.push(Frame {
                    closer: if c == '{' { '}' } else { ']' },
                    open_at,
                    member_at: out.len(),
                });
            }
            '}' | ']' => {
                if !frames.iter().any(|frame| frame.closer == c) {
                    // Closer with no matching opener
                    continue;
                }
                while let Some(frame) = frames.pop() {
                    trim_trailing_comma(&mut out);
                    out.push(frame.closer);
                    if frame.closer == c {
                        break;
                    }
                }
            }
            ',' => {
                let next = chars.clone().find(|ch| !ch.is_whitespace());
                if matches!(next, None | Some(']' | '}')) {
                    continue;
                }
                let Some(frame) = frames.last_mut() else {
                    continue;
                };
                out.push(c);
                frame.member_at = out.len();
            }
            _ => out.push(c),
        }
    }

    if !frames.is_empty() {
        prune_empty_tail(&mut out, &mut frames, &mut top_level_values);

        let mut closed = out.clone();
        if in_string {
            if escaped {
                closed.pop();
            }
            closed.push('"');
        }
        close_frames(&mut closed, &frames);

        if is_valid_json(&closed, top_level_values) {
            out = closed;
        } else {
            // Cut off mid-member: fall back to the last complete member
            if let Some(frame) = frames.last() {
                out.truncate(frame.member_at);
            }
            prune_empty_tail(&mut out, &mut frames, &mut top_level_values);
            close_frames(&mut out, &frames);
        }
    } else if in_string {
        if escaped {
            out.pop();
        }
        out.push('"');
    }

    wrap_top_level(out, top_level_values)
}

fn wrap_top_level(out: String, top_level_values: usize) -> String {
    if top_level_values > 1 {
        format!("[{out}]")
    } else {
        out
    }
}

fn is_valid_json(out: &str, top_level_values: usize) -> bool {
    let candidate = if top_level_values > 1 {
        format!("[{out}]")
    } else {
        out.to_owned()
    };
    serde_json::from_str::<IgnoredAny>(&candidate).is_ok()
}

/// Drops innermost open containers that have no members yet, along with the
/// parent member they started. The outermost container is kept unless other
/// top-level values remain.
fn prune_empty_tail(out: &mut String, frames: &mut Vec<Frame>, top_level_values: &mut usize) {
    while let Some(frame) = frames.last() {
        let empty = out
            .get(frame.open_at..)
            .is_some_and(|rest| rest.trim_end().len() == 1);
        if !empty || (frames.len() == 1 && *top_level_values <= 1) {
            break;
        }

        out.truncate(frame.open_at);
        frames.pop();
        if let Some(parent) = frames.last() {
            out.truncate(parent.member_at);
        } else {
            trim_trailing_comma(out);
            *top_level_values -= 1;
        }
    }
}

fn close_frames(out: &mut String, frames: &[Frame]) {
    for frame in frames.iter().rev() {
        trim_trailing_comma(out);
        out.push(frame.closer);
    }
}

/// Whether the output currently ends with a complete value inside a
/// container, so a following `{`/`[` needs a separating comma.
fn ends_value(out: &str) -> bool {
    matches!(out.trim_end().chars().last(), Some('}' | ']'))
}

fn trim_trailing_comma(out: &mut String) {
    let trimmed = out.trim_end();
    if trimmed.ends_with(',') {
        let len = trimmed.len() - 1;
        out.truncate(len);
    }
}

fn parse_value(body: &str) -> Result<(Value, bool), RepairError> {
    match serde_json::from_str::<Value>(body) {
        Ok(value) => Ok((value, false)),
        Err(strict_err) => {
            debug!(error = %strict_err, "Strict JSON parse failed, attempting repair");
            serde_json::from_str::<Value>(&repair_json(body))
                .map(|value| (value, true))
                .map_err(RepairError::Unrecoverable)
        }
    }
}

fn into_list(value: Value) -> Result<Vec<Value>, RepairError> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(mut obj) => {
            if let Some(key) = ENVELOPE_KEYS.iter().find(|k| obj.get(**k).is_some_and(Value::is_array)) {
                match obj.remove(*key) {
                    Some(Value::Array(items)) => Ok(items),
                    _ => Err(RepairError::NotAList),
                }
            } else {
                // A lone record
                Ok(vec![Value::Object(obj)])
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {
            Err(RepairError::NotAList)
        }
    }
}

/// Parses a list endpoint body into records, repairing the JSON if needed.
/// Individual entries that do not deserialize are skipped and counted.
pub fn parse_lenient_list<T: DeserializeOwned>(body: &str) -> Result<RepairedList<T>, RepairError> {
    let (value, repaired) = parse_value(body)?;
    let raw_items = into_list(value)?;
    let total = raw_items.len();

    let items: Vec<T> = raw_items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!(error = %e, "Skipping unparseable list entry");
                None
            }
        })
        .collect();

    let skipped = total - items.len();
    if repaired {
        warn!(items = items.len(), skipped, "Recovered malformed JSON list");
    }
    Ok(RepairedList {
        items,
        repaired,
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pvmon_types::Device;

    fn parses(s: &str) -> Value {
        serde_json::from_str(s).unwrap_or_else(|e| panic!("{s:?} did not parse: {e}"))
    }

    #[test]
    fn test_valid_json_untouched() {
        let body = r#"[{"id": "1", "tags": ["a", "b"]}]"#;
        assert_eq!(parses(&repair_json(body)), parses(body));
    }

    #[test]
    fn test_trailing_commas() {
        let fixed = repair_json(r#"[{"id": 1, "name": "a",}, {"id": 2},]"#);
        assert_eq!(parses(&fixed), serde_json::json!([{"id": 1, "name": "a"}, {"id": 2}]));
    }

    #[test]
    fn test_missing_commas_between_objects() {
        let fixed = repair_json(r#"[{"id": 1} {"id": 2}{"id": 3}]"#);
        assert_eq!(parses(&fixed).as_array().map(Vec::len), Some(3));
    }

    #[test]
    fn test_truncated_stream() {
        let fixed = repair_json(r#"[{"id": 1, "name": "INV-A"}, {"id": 2, "name": "INV"#);
        let value = parses(&fixed);
        assert_eq!(value[1]["name"], "INV");
    }

    #[test]
    fn test_truncated_after_comma() {
        let fixed = repair_json(r#"[{"id": 1}, {"id": 2},"#);
        assert_eq!(parses(&fixed).as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn test_truncated_after_key() {
        let fixed = repair_json(r#"[{"id": 1, "name": "A"}, {"id":"#);
        assert_eq!(parses(&fixed), serde_json::json!([{"id": 1, "name": "A"}]));
    }

    #[test]
    fn test_truncated_inside_key_keeps_earlier_members() {
        let fixed = repair_json(r#"[{"id": 1, "na"#);
        assert_eq!(parses(&fixed), serde_json::json!([{"id": 1}]));
    }

    #[test]
    fn test_truncated_inside_literal() {
        let fixed = repair_json(r#"{"data": [{"id": 1, "online": tru"#);
        assert_eq!(parses(&fixed), serde_json::json!({"data": [{"id": 1}]}));
    }

    #[test]
    fn test_truncated_nested_object_is_dropped() {
        let fixed = repair_json(r#"[{"id": 1}, {"id": 2, "plant": {"#);
        assert_eq!(parses(&fixed), serde_json::json!([{"id": 1}, {"id": 2}]));
    }

    #[test]
    fn test_every_truncation_keeps_complete_records() {
        let body = r#"[{"id": "d1", "name": "A"}, {"id": "d2", "name": "B"}]"#;
        let first_end = body.find('}').unwrap() + 1;
        let second_end = body.rfind('}').unwrap() + 1;

        for cut in 1..=body.len() {
            let partial = &body[..cut];
            let list = parse_lenient_list::<Device>(partial)
                .unwrap_or_else(|e| panic!("{partial:?} lost the whole list: {e}"));

            let ids: Vec<&str> = list.items.iter().map(|d| d.id.as_str()).collect();
            if cut >= first_end {
                assert_eq!(ids.first(), Some(&"d1"), "{partial:?}");
                assert_eq!(list.items[0].name, "A", "{partial:?}");
            }
            if cut >= second_end {
                assert_eq!(ids, ["d1", "d2"], "{partial:?}");
            }
            assert!(list.items.len() <= 2, "{partial:?}");
        }
    }

    #[test]
    fn test_bare_object_sequence_is_wrapped() {
        let fixed = repair_json("{\"id\": 1}\n{\"id\": 2}\n");
        assert_eq!(parses(&fixed).as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn test_brackets_inside_strings_are_ignored() {
        let body = r#"[{"name": "rack [A], row {3},"}]"#;
        assert_eq!(parses(&repair_json(body)), parses(body));
    }

    #[test]
    fn test_mismatched_closer() {
        let fixed = repair_json(r#"[{"id": 1]"#);
        assert_eq!(parses(&fixed), serde_json::json!([{"id": 1}]));
    }

    #[test]
    fn test_parse_lenient_list_devices() {
        let body = r#"{"data": [{"id": 1, "sn": "A"}, {"id": 2, "sn": "B"},]}"#;
        let list: RepairedList<Device> = parse_lenient_list(body).unwrap();
        assert!(list.repaired);
        assert_eq!(list.items.len(), 2);
        assert_eq!(list.items[1].serial_number.as_deref(), Some("B"));
    }

    #[test]
    fn test_unparseable_entries_are_skipped() {
        let body = r#"[{"id": 1}, 42, {"id": 3}]"#;
        let list: RepairedList<Device> = parse_lenient_list(body).unwrap();
        assert!(!list.repaired);
        assert_eq!(list.items.len(), 2);
        assert_eq!(list.skipped, 1);
    }

    #[test]
    fn test_garbage_is_unrecoverable() {
        let result = parse_lenient_list::<Device>("<html>502 Bad Gateway</html>");
        assert!(matches!(result, Err(RepairError::Unrecoverable(_))));
    }

    #[test]
    fn test_scalar_is_not_a_list() {
        assert!(matches!(
            parse_lenient_list::<Device>("\"ok\""),
            Err(RepairError::NotAList)
        ));
    }
}
