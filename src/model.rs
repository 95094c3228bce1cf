//! Typed models produced by the output parsers.
//!
//! [`ConfigModel`] is the VLAN/port view of a running-configuration dump and
//! [`OnuStatusTable`] holds per-ONU status records. Both are plain data:
//! they are built once by a parser and never mutated afterwards by the
//! session layer.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// VLAN identifier as printed by the device.
pub type VlanId = u32;

/// Bridge port identifier as printed by the device.
pub type PortId = u32;

/// Default bridge VLAN that pre-exists in every model instance.
pub const DEFAULT_VLAN: VlanId = 1;

/// Membership kind of a VLAN/port association.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TagType {
    Untagged,
    Tagged,
}

impl TagType {
    /// Parses the tag-type token of a `vlan add` directive.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "untagged" => Some(Self::Untagged),
            "tagged" => Some(Self::Tagged),
            _ => None,
        }
    }
}

/// Per-VLAN membership entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct VlanEntry {
    /// Ports carrying this VLAN untagged, in configuration order.
    pub untagged: Vec<PortId>,
    /// Ports carrying this VLAN tagged, in configuration order.
    pub tagged: Vec<PortId>,
    /// Description assigned via `vlan description`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Per-port membership entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PortEntry {
    /// VLANs this port carries untagged, in configuration order.
    pub untagged: Vec<VlanId>,
    /// VLANs this port carries tagged, in configuration order.
    pub tagged: Vec<VlanId>,
    /// Port VLAN id assigned via `vlan pvid`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pvid: Option<VlanId>,
    /// Description assigned via `port description`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// VLAN table indexed both by id and by description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct VlanTable {
    /// VLAN id to membership entry.
    pub by_vid: BTreeMap<VlanId, VlanEntry>,
    /// Description to the VLAN ids sharing it, in insertion order.
    pub by_name: BTreeMap<String, Vec<VlanId>>,
}

/// Structured view of a running-configuration dump.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ConfigModel {
    /// Device hostname from the `hostname` directive.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    /// VLAN membership tables.
    pub vlan: VlanTable,
    /// Port membership table.
    pub ports: BTreeMap<PortId, PortEntry>,
}

impl Default for ConfigModel {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigModel {
    /// Creates an empty model with the implicit default VLAN pre-created.
    pub fn new() -> Self {
        let mut vlan = VlanTable::default();
        vlan.by_vid.insert(DEFAULT_VLAN, VlanEntry::default());
        Self {
            hostname: None,
            vlan,
            ports: BTreeMap::new(),
        }
    }

    /// Creates an empty VLAN entry if one does not exist yet.
    pub fn create_vlan(&mut self, vid: VlanId) {
        self.vlan.by_vid.entry(vid).or_default();
    }

    /// Adds a VLAN/port membership on both sides of the model.
    ///
    /// The VLAN-side and port-side lists are updated together; callers never
    /// touch either list directly, which is what keeps the membership
    /// bidirectional.
    pub fn add_membership(&mut self, vid: VlanId, port: PortId, tag: TagType) {
        let vlan = self.vlan.by_vid.entry(vid).or_default();
        let port_entry = self.ports.entry(port).or_default();
        match tag {
            TagType::Untagged => {
                vlan.untagged.push(port);
                port_entry.untagged.push(vid);
            }
            TagType::Tagged => {
                vlan.tagged.push(port);
                port_entry.tagged.push(vid);
            }
        }
    }

    /// Sets the port VLAN id, creating the port entry if absent.
    pub fn set_pvid(&mut self, port: PortId, vid: VlanId) {
        self.ports.entry(port).or_default().pvid = Some(vid);
    }

    /// Sets a VLAN description and records it in the by-name index.
    pub fn set_vlan_description(&mut self, vid: VlanId, name: &str) {
        self.vlan.by_vid.entry(vid).or_default().description = Some(name.to_string());
        self.vlan
            .by_name
            .entry(name.to_string())
            .or_default()
            .push(vid);
    }

    /// Sets a port description, creating the port entry if absent.
    pub fn set_port_description(&mut self, port: PortId, text: &str) {
        self.ports.entry(port).or_default().description = Some(text.to_string());
    }
}

/// A single parsed status field value.
///
/// Values are stored as the raw text the device printed; duration fields
/// derived by the parser are stored as whole seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum FieldValue {
    Seconds(u64),
    Text(String),
}

impl FieldValue {
    /// Returns the textual value, if this field holds one.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s.as_str()),
            Self::Seconds(_) => None,
        }
    }

    /// Returns the duration in seconds, if this field holds one.
    pub fn as_seconds(&self) -> Option<u64> {
        match self {
            Self::Seconds(s) => Some(*s),
            Self::Text(_) => None,
        }
    }
}

/// Status fields of a single ONU, keyed by normalized camelCase field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StatusRecord {
    #[serde(flatten)]
    pub fields: BTreeMap<String, FieldValue>,
}

impl StatusRecord {
    /// Returns a textual field by normalized name.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(FieldValue::as_text)
    }

    /// Returns a derived duration field (`<name>_seconds`) by full name.
    pub fn seconds(&self, name: &str) -> Option<u64> {
        self.fields.get(name).and_then(FieldValue::as_seconds)
    }
}

/// Status records for every ONU, keyed by OLT unit id then ONU id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct OnuStatusTable {
    /// OLT unit id to (ONU id to record).
    pub units: BTreeMap<u32, BTreeMap<u32, StatusRecord>>,
}

impl OnuStatusTable {
    /// Returns the record for one (OLT, ONU) pair.
    pub fn get(&self, olt: u32, onu: u32) -> Option<&StatusRecord> {
        self.units.get(&olt).and_then(|unit| unit.get(&onu))
    }

    /// Number of ONU records across all units.
    pub fn len(&self) -> usize {
        self.units.values().map(BTreeMap::len).sum()
    }

    /// Returns true if no record has been parsed.
    pub fn is_empty(&self) -> bool {
        self.units.values().all(BTreeMap::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_vlan_pre_exists_and_is_empty() {
        let model = ConfigModel::new();
        let vlan1 = model.vlan.by_vid.get(&DEFAULT_VLAN).expect("vlan 1");
        assert!(vlan1.untagged.is_empty());
        assert!(vlan1.tagged.is_empty());
        assert_eq!(vlan1.description, None);
    }

    #[test]
    fn add_membership_updates_both_sides() {
        let mut model = ConfigModel::new();
        model.add_membership(10, 3, TagType::Tagged);

        assert_eq!(model.vlan.by_vid[&10].tagged, vec![3]);
        assert_eq!(model.ports[&3].tagged, vec![10]);
        assert!(model.vlan.by_vid[&10].untagged.is_empty());
        assert!(model.ports[&3].untagged.is_empty());
    }

    #[test]
    fn vlan_description_is_indexed_by_name() {
        let mut model = ConfigModel::new();
        model.set_vlan_description(10, "Guest");
        model.set_vlan_description(11, "Guest");

        assert_eq!(model.vlan.by_vid[&10].description.as_deref(), Some("Guest"));
        assert_eq!(model.vlan.by_name["Guest"], vec![10, 11]);
    }

    #[test]
    fn status_table_counts_records_across_units() {
        let mut table = OnuStatusTable::default();
        table.units.entry(1).or_default().insert(1, StatusRecord::default());
        table.units.entry(1).or_default().insert(2, StatusRecord::default());
        table.units.entry(2).or_default().insert(1, StatusRecord::default());

        assert_eq!(table.len(), 3);
        assert!(!table.is_empty());
        assert!(table.get(2, 1).is_some());
        assert!(table.get(2, 9).is_none());
    }
}
