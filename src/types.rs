//! Type definitions and aliases

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// Re-export commonly used types
pub use crate::error::{AppError, Result};

/// Transport implementations whose benchmark runs are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProtocolVariant {
    MrtpRedundancy,
    MrtpReliable,
    MrtpRedundancyNoack,
    MrtpUnsequenced,
    Tcp,
    Kcp,
    Enet,
}

impl ProtocolVariant {
    /// Every known variant, in catalogue order
    pub const ALL: [ProtocolVariant; 7] = [
        ProtocolVariant::MrtpRedundancy,
        ProtocolVariant::MrtpReliable,
        ProtocolVariant::MrtpRedundancyNoack,
        ProtocolVariant::MrtpUnsequenced,
        ProtocolVariant::Tcp,
        ProtocolVariant::Kcp,
        ProtocolVariant::Enet,
    ];

    /// Canonical identifier used by callers
    pub fn id(&self) -> &'static str {
        match self {
            Self::MrtpRedundancy => "mrtp-redundancy",
            Self::MrtpReliable => "mrtp-reliable",
            Self::MrtpRedundancyNoack => "mrtp-redundancy-noack",
            Self::MrtpUnsequenced => "mrtp-unsequenced",
            Self::Tcp => "tcp",
            Self::Kcp => "kcp",
            Self::Enet => "enet",
        }
    }

    /// Storage partition backing this variant
    pub fn partition(&self) -> &'static str {
        match self {
            Self::MrtpRedundancy => "mrtp_redundancy_test",
            Self::MrtpReliable => "mrtp_reliable_test",
            Self::MrtpRedundancyNoack => "mrtp_redundancy_noack_test",
            Self::MrtpUnsequenced => "mrtp_unsequenced_test",
            Self::Tcp => "tcp_test",
            Self::Kcp => "kcp_test",
            Self::Enet => "enet_test",
        }
    }

    /// Dashboard title for this variant's data
    pub fn title(&self) -> &'static str {
        match self {
            Self::MrtpRedundancy => "MRtp Redundancy Test Data",
            Self::MrtpReliable => "MRtp Reliable Test Data",
            Self::MrtpRedundancyNoack => "MRtp Redundancy No Ack Test Data",
            Self::MrtpUnsequenced => "MRtp Unsequenced Test Data",
            Self::Tcp => "TCP Test Data",
            Self::Kcp => "KCP Test Data",
            Self::Enet => "ENet Test Data",
        }
    }

    /// Whether the record schema carries `packetStyle`
    pub fn carries_packet_style(&self) -> bool {
        matches!(self, Self::MrtpRedundancy)
    }

    /// Partition a harness result belongs to, from its `library` and `packetStyle` fields
    pub fn from_harness(library: &str, packet_style: Option<&str>) -> Option<Self> {
        match (library, packet_style) {
            ("mrtp", Some("redundancy")) => Some(Self::MrtpRedundancy),
            ("mrtp", Some("reliable")) => Some(Self::MrtpReliable),
            ("mrtp", Some("unsequenced")) => Some(Self::MrtpUnsequenced),
            ("mrtp", Some("redundancynoack")) => Some(Self::MrtpRedundancyNoack),
            ("enet", _) => Some(Self::Enet),
            ("kcp", _) => Some(Self::Kcp),
            ("tcp", _) => Some(Self::Tcp),
            _ => None,
        }
    }
}

impl fmt::Display for ProtocolVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ProtocolVariant {
    type Err = AppError;

    /// Accepts the canonical id as well as the compact form without
    /// separators (`mrtpredundancy`), case-insensitively
    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();

        Self::ALL
            .iter()
            .copied()
            .find(|variant| variant.id() == wanted || variant.id().replace('-', "") == wanted)
            .ok_or_else(|| AppError::unknown_variant(s))
    }
}

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable tables and charts
    Table,
    /// JSON documents for other tools
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table => f.write_str("table"),
            Self::Json => f.write_str("json"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            other => Err(AppError::parse(format!("Invalid output format: {}", other))),
        }
    }
}
