//! Circuit identifiers and the per-circuit field set fed to templates.
//!
//! Identifiers are a pure function of `(start, count)`, so a deprovision run
//! with the same arguments regenerates exactly the blocks a provision run
//! produced.

use std::fmt;
use std::net::Ipv4Addr;

use serde::Serialize;

use crate::error::ArgumentError;

/// Highest usable identifier (identifiers double as 802.1Q VLAN / EFP ids).
pub const MAX_CIRCUIT_ID: u32 = 4094;

/// Highest IP SLA operation number IOS-XE accepts.
pub const MAX_IP_SLA_ID: u64 = 2_147_483_647;

/// Every field a template may reference.
pub const FIELD_NAMES: &[&str] = &[
    "circuit_id",
    "vcid",
    "vlan",
    "interface",
    "peer_router_loopback_ip_address",
    "source_mpid",
    "target_mpid",
    "slm_ip_sla_id",
    "dmm_ip_sla_id",
    "ccm_interval",
    "cfm_domain",
    "cfm_level",
    "enable_cfm_hw_offload",
];

/// Fields whose value differs between circuits of one run.
pub const IDENTIFIER_FIELDS: &[&str] = &[
    "circuit_id",
    "vcid",
    "vlan",
    "slm_ip_sla_id",
    "dmm_ip_sla_id",
];

/// A circuit identifier inside `1..=4094`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CircuitId(u32);

impl CircuitId {
    /// An identifier, if `id` is a usable VLAN id.
    pub fn new(id: u32) -> Option<Self> {
        (1..=MAX_CIRCUIT_ID).contains(&id).then_some(Self(id))
    }

    /// The raw identifier.
    pub fn get(self) -> u32 {
        self.0
    }

    /// Zero-padded four digit form used in names (`7` -> `"0007"`).
    pub fn padded(self) -> String {
        format!("{:04}", self.0)
    }

    /// Pseudowire VC id (`7` -> `"5000007"`).
    pub fn vcid(self) -> String {
        format!("500{}", self.padded())
    }
}

impl fmt::Display for CircuitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated, contiguous run of identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitRange {
    start: u32,
    count: u32,
}

impl CircuitRange {
    /// Validate `start..start + count` against `1..=4094`.
    ///
    /// `count == 0` is an empty range, not an error.
    pub fn new(start: u32, count: u32) -> Result<Self, ArgumentError> {
        let end = u64::from(start) + u64::from(count.saturating_sub(1));
        if start == 0 || end > u64::from(MAX_CIRCUIT_ID) {
            return Err(ArgumentError::RangeOutOfBounds { start, end });
        }
        Ok(Self { start, count })
    }

    /// First identifier of the range.
    pub fn start(&self) -> u32 {
        self.start
    }

    /// Number of circuits.
    pub fn len(&self) -> usize {
        self.count as usize
    }

    /// Whether the range is empty.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Identifiers in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = CircuitId> + use<> {
        (self.start..self.start + self.count).map(CircuitId)
    }

    /// Whether `id` falls inside this range.
    pub fn contains(&self, id: CircuitId) -> bool {
        id.0 >= self.start && id.0 < self.start + self.count
    }

    /// Zero-based position of `id` in the range.
    fn offset(&self, id: CircuitId) -> u32 {
        id.0 - self.start
    }
}

/// Ordered identifiers for `(start, count)`.
pub fn identifiers(start: u32, count: u32) -> Result<Vec<CircuitId>, ArgumentError> {
    Ok(CircuitRange::new(start, count)?.iter().collect())
}

/// One end of the circuit pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    A,
    Z,
}

impl Side {
    /// Lower-case name used in file names and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Side::A => "a",
            Side::Z => "z",
        }
    }

    /// `(source, target)` CFM MEP ids; the two ends mirror each other.
    pub fn mpids(self) -> (u32, u32) {
        match self {
            Side::A => (1, 2),
            Side::Z => (2, 1),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-device inputs for one end.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub side: Side,
    pub interface: String,
    pub loopback: Ipv4Addr,
}

/// Run-wide values shared by every circuit.
#[derive(Debug, Clone)]
pub struct CircuitParams {
    pub ccm_interval_secs: u32,
    pub hw_offload: bool,
    pub cfm_domain: String,
    pub cfm_level: u8,
    pub sla_base: u32,
}

impl Default for CircuitParams {
    fn default() -> Self {
        Self {
            ccm_interval_secs: 10,
            hw_offload: false,
            cfm_domain: "OPERATOR".to_string(),
            cfm_level: 1,
            sla_base: 1,
        }
    }
}

/// Identifier range plus shared parameters; derives fields for either end.
#[derive(Debug, Clone)]
pub struct CircuitPlan {
    range: CircuitRange,
    params: CircuitParams,
}

impl CircuitPlan {
    /// Build a plan, checking that the IP SLA ids it derives stay in range.
    pub fn new(range: CircuitRange, params: CircuitParams) -> Result<Self, ArgumentError> {
        if params.sla_base == 0 {
            return Err(ArgumentError::SlaOutOfBounds {
                base: params.sla_base,
                last: 0,
            });
        }
        let last = u64::from(params.sla_base) + 2 * range.len() as u64;
        if !range.is_empty() && last - 1 > MAX_IP_SLA_ID {
            return Err(ArgumentError::SlaOutOfBounds {
                base: params.sla_base,
                last: last - 1,
            });
        }
        Ok(Self { range, params })
    }

    /// The identifier range.
    pub fn range(&self) -> &CircuitRange {
        &self.range
    }

    /// Shared parameters.
    pub fn params(&self) -> &CircuitParams {
        &self.params
    }

    /// `(slm, dmm)` IP SLA operation ids for `id`.
    pub fn sla_ids(&self, id: CircuitId) -> (u32, u32) {
        let slm = self.params.sla_base + 2 * self.range.offset(id);
        (slm, slm + 1)
    }

    /// Fields for circuit `id` on `local`, peering with `remote`.
    pub fn fields(&self, id: CircuitId, local: &Endpoint, remote: &Endpoint) -> CircuitFields {
        let (source_mpid, target_mpid) = local.side.mpids();
        let (slm_ip_sla_id, dmm_ip_sla_id) = self.sla_ids(id);

        CircuitFields {
            circuit_id: id.padded(),
            vcid: id.vcid(),
            vlan: id.get(),
            interface: local.interface.clone(),
            peer_router_loopback_ip_address: remote.loopback,
            source_mpid,
            target_mpid,
            slm_ip_sla_id,
            dmm_ip_sla_id,
            ccm_interval: format!("{}s", self.params.ccm_interval_secs),
            cfm_domain: self.params.cfm_domain.clone(),
            cfm_level: self.params.cfm_level,
            enable_cfm_hw_offload: self.params.hw_offload,
        }
    }
}

/// Substitution values for one circuit on one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CircuitFields {
    pub circuit_id: String,
    pub vcid: String,
    pub vlan: u32,
    pub interface: String,
    pub peer_router_loopback_ip_address: Ipv4Addr,
    pub source_mpid: u32,
    pub target_mpid: u32,
    pub slm_ip_sla_id: u32,
    pub dmm_ip_sla_id: u32,
    pub ccm_interval: String,
    pub cfm_domain: String,
    pub cfm_level: u8,
    pub enable_cfm_hw_offload: bool,
}
