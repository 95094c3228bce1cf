//! Text parsers for captured command output.
//!
//! Command output captured by the session layer is plain prompt-delimited
//! text; these parsers turn the two dumps the bootstrap sequence captures
//! into typed models. Both parsers are best-effort: lines they do not
//! recognize are skipped, never treated as errors, because device firmware
//! varies in what it prints around the sections we care about.

pub mod onu_status;
pub mod ranges;
pub mod running_config;

pub use onu_status::parse_onu_detail;
pub use ranges::{expand_ranges, expand_vlan_list};
pub use running_config::{Directive, classify, parse_running_config};
