//! Compact integer-list expansion.
//!
//! Device configuration directives name VLANs and ports in a compact
//! comma/hyphen notation such as `1-3,7`. This module expands that notation
//! into the explicit list of integers it denotes, preserving left-to-right
//! source order with ranges exploded in ascending order.

use log::warn;

/// Expands a comma-separated list of integers and inclusive `a-b` ranges.
///
/// Elements that do not parse are skipped; device output is not expected to
/// contain them, but a stray token must not abort the whole parse.
pub fn expand_ranges(input: &str) -> Vec<u32> {
    let mut result = Vec::new();
    for element in input.split(',') {
        let element = element.trim();
        if element.is_empty() {
            continue;
        }
        if let Some((start, end)) = element.split_once('-') {
            match (start.trim().parse::<u32>(), end.trim().parse::<u32>()) {
                (Ok(start), Ok(end)) => result.extend(start..=end),
                _ => warn!("skipping malformed range element '{element}'"),
            }
        } else {
            match element.parse::<u32>() {
                Ok(value) => result.push(value),
                Err(_) => warn!("skipping malformed list element '{element}'"),
            }
        }
    }
    result
}

/// Expands a VLAN list, applying the device's list aliases first.
///
/// A literal `br` element names the bridge itself and expands to nothing;
/// a literal `default` element names the default bridge VLAN, id 1.
pub fn expand_vlan_list(input: &str) -> Vec<u32> {
    let aliased = input
        .split(',')
        .filter_map(|element| match element.trim() {
            "br" => None,
            "default" => Some("1".to_string()),
            other => Some(other.to_string()),
        })
        .collect::<Vec<_>>()
        .join(",");
    expand_ranges(&aliased)
}
