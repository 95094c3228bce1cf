//! Running-configuration parser.
//!
//! Turns a captured `show running-config` block into a [`ConfigModel`].
//! Each line is classified into a [`Directive`] which is then folded into
//! the model; lines matching no directive are skipped silently, since
//! firmware revisions print plenty of sections this model does not track.

use once_cell::sync::Lazy;
use regex::Regex;

use log::trace;

use crate::model::{ConfigModel, PortId, TagType, VlanId};
use crate::parse::ranges::{expand_ranges, expand_vlan_list};

static HOSTNAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^hostname\s+(?P<hostname>\S+)").expect("valid hostname regex")
});

static VLAN_CREATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^vlan create\s+(?P<vlans>\S+)").expect("valid vlan create regex")
});

static VLAN_ADD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^vlan add\s+(?P<vlans>\S+)\s+(?P<ports>\S+)\s+(?P<tag>\S+)$")
        .expect("valid vlan add regex")
});

static VLAN_PVID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^vlan pvid\s+(?P<ports>\S+)\s+(?P<vid>\d+)$").expect("valid vlan pvid regex")
});

static VLAN_DESC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^vlan description\s+(?P<vlans>\S+)\s+(?P<name>.+)$")
        .expect("valid vlan description regex")
});

static PORT_DESC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^port description\s+(?P<ports>[0-9,-]+)\s+(?P<text>.+)$")
        .expect("valid port description regex")
});

/// One recognized configuration line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// `hostname <token>`, recognized in any mode.
    SetHostname(String),
    /// Bare `bridge`, enters bridge-configuration mode until end of input.
    EnterBridgeMode,
    /// `vlan create <list>`.
    CreateVlan(Vec<VlanId>),
    /// `vlan add <vlanList> <portList> <untagged|tagged>`.
    AddVlanMembership {
        vlans: Vec<VlanId>,
        ports: Vec<PortId>,
        tag: TagType,
    },
    /// `vlan pvid <portList> <vid>`.
    SetPvid { ports: Vec<PortId>, vid: VlanId },
    /// `vlan description <vlanList> <name>`.
    SetVlanDescription { vlans: Vec<VlanId>, name: String },
    /// `port description <portList> <text>`.
    SetPortDescription { ports: Vec<PortId>, text: String },
    /// Anything else; skipped without error.
    Unrecognized,
}

/// Classifies one trimmed configuration line.
///
/// The `vlan`/`port` directives only exist inside bridge-configuration mode;
/// outside it they fall through to [`Directive::Unrecognized`].
pub fn classify(line: &str, bridge_mode: bool) -> Directive {
    if let Some(caps) = HOSTNAME_RE.captures(line) {
        return Directive::SetHostname(caps["hostname"].to_string());
    }
    if line == "bridge" {
        return Directive::EnterBridgeMode;
    }
    if !bridge_mode {
        return Directive::Unrecognized;
    }

    if let Some(caps) = VLAN_CREATE_RE.captures(line) {
        return Directive::CreateVlan(expand_vlan_list(&caps["vlans"]));
    }
    if let Some(caps) = VLAN_ADD_RE.captures(line) {
        let Some(tag) = TagType::from_token(&caps["tag"]) else {
            return Directive::Unrecognized;
        };
        return Directive::AddVlanMembership {
            vlans: expand_vlan_list(&caps["vlans"]),
            ports: expand_ranges(&caps["ports"]),
            tag,
        };
    }
    if let Some(caps) = VLAN_PVID_RE.captures(line) {
        let Ok(vid) = caps["vid"].parse::<VlanId>() else {
            return Directive::Unrecognized;
        };
        return Directive::SetPvid {
            ports: expand_ranges(&caps["ports"]),
            vid,
        };
    }
    if let Some(caps) = VLAN_DESC_RE.captures(line) {
        return Directive::SetVlanDescription {
            vlans: expand_vlan_list(&caps["vlans"]),
            name: caps["name"].trim().to_string(),
        };
    }
    if let Some(caps) = PORT_DESC_RE.captures(line) {
        return Directive::SetPortDescription {
            ports: expand_ranges(&caps["ports"]),
            text: caps["text"].trim().to_string(),
        };
    }
    Directive::Unrecognized
}

struct ParseState {
    model: ConfigModel,
    bridge_mode: bool,
}

impl ParseState {
    fn apply(&mut self, directive: Directive) {
        match directive {
            Directive::SetHostname(hostname) => self.model.hostname = Some(hostname),
            Directive::EnterBridgeMode => self.bridge_mode = true,
            Directive::CreateVlan(vlans) => {
                for vid in vlans {
                    self.model.create_vlan(vid);
                }
            }
            Directive::AddVlanMembership { vlans, ports, tag } => {
                for &vid in &vlans {
                    for &port in &ports {
                        self.model.add_membership(vid, port, tag);
                    }
                }
            }
            Directive::SetPvid { ports, vid } => {
                for port in ports {
                    self.model.set_pvid(port, vid);
                }
            }
            Directive::SetVlanDescription { vlans, name } => {
                for vid in vlans {
                    self.model.set_vlan_description(vid, &name);
                }
            }
            Directive::SetPortDescription { ports, text } => {
                for port in ports {
                    self.model.set_port_description(port, &text);
                }
            }
            Directive::Unrecognized => {}
        }
    }
}

/// Parses a captured running-configuration block into a [`ConfigModel`].
pub fn parse_running_config(text: &str) -> ConfigModel {
    let mut state = ParseState {
        model: ConfigModel::new(),
        bridge_mode: false,
    };

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line == "!" {
            continue;
        }
        let directive = classify(line, state.bridge_mode);
        if directive == Directive::Unrecognized {
            trace!("skipping unrecognized config line: '{line}'");
        }
        state.apply(directive);
    }

    state.model
}
