//! ONU status-detail parser.
//!
//! Turns a captured `show onu detail-info` block into an [`OnuStatusTable`].
//! The dump is a sequence of `OLT : <n>, ONU : <m>` headers, each followed
//! by `Field Name: value` lines until the next header. Field names vary
//! between firmware revisions, so everything is captured as-is under a
//! normalized camelCase key; only the two uptime counters get a derived
//! `_seconds` companion field.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::{FieldValue, OnuStatusTable};

static HEADER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"OLT : (?P<olt>\d+), ONU : (?P<onu>\d+)").expect("valid header regex")
});

static SEPARATOR_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"-+").expect("valid regex"));

/// Fields holding a `days:hours:minutes:seconds` duration.
const DURATION_FIELDS: &[&str] = &["activatedTime", "inactiveTime"];

/// Normalizes a raw field name into a camelCase key.
///
/// Trims the input, deletes `-`, `/`, `(`, `)` and spaces, folds an
/// underscore followed by a letter into that letter uppercased, and
/// lowercases the first character of the result.
fn normalize_field_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.trim().chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '-' | '/' | '(' | ')' | ' ' => {}
            '_' => {
                if chars.peek().is_some_and(|next| next.is_ascii_alphabetic()) {
                    if let Some(next) = chars.next() {
                        out.push(next.to_ascii_uppercase());
                    }
                } else {
                    out.push('_');
                }
            }
            other => out.push(other),
        }
    }
    if let Some(first) = out.chars().next() {
        let mut lowered = first.to_ascii_lowercase().to_string();
        lowered.push_str(&out[first.len_utf8()..]);
        lowered
    } else {
        out
    }
}

/// Parses a `days:hours:minutes:seconds` value into total seconds.
fn duration_seconds(value: &str) -> Option<u64> {
    let parts = value
        .split(':')
        .map(|part| part.trim().parse::<u64>())
        .collect::<Result<Vec<_>, _>>()
        .ok()?;
    match parts.as_slice() {
        [days, hours, minutes, seconds] => {
            Some(days * 86_400 + hours * 3_600 + minutes * 60 + seconds)
        }
        _ => None,
    }
}

/// True for lines that are only a hyphen-run separator or whitespace.
fn is_separator(line: &str) -> bool {
    SEPARATOR_RUN_RE.replace(line, "").trim().is_empty()
}

/// Parses a captured status-detail block into an [`OnuStatusTable`].
///
/// Data lines that arrive before any header, or that contain no `": "`
/// split point, are skipped silently.
pub fn parse_onu_detail(text: &str) -> OnuStatusTable {
    let mut table = OnuStatusTable::default();
    let mut current: Option<(u32, u32)> = None;

    for line in text.lines() {
        if is_separator(line) {
            continue;
        }

        if let Some(caps) = HEADER_RE.captures(line) {
            let (Ok(olt), Ok(onu)) = (caps["olt"].parse::<u32>(), caps["onu"].parse::<u32>())
            else {
                continue;
            };
            table.units.entry(olt).or_default().entry(onu).or_default();
            current = Some((olt, onu));
            continue;
        }

        let Some((olt, onu)) = current else { continue };
        let Some((raw_name, raw_value)) = line.split_once(": ") else {
            continue;
        };

        let name = normalize_field_name(raw_name);
        let value = raw_value.trim().to_string();

        let record = table
            .units
            .entry(olt)
            .or_default()
            .entry(onu)
            .or_default();

        if DURATION_FIELDS.contains(&name.as_str())
            && let Some(total) = duration_seconds(&value)
        {
            record
                .fields
                .insert(format!("{name}_seconds"), FieldValue::Seconds(total));
        }
        record.fields.insert(name, FieldValue::Text(value));
    }

    table
}
