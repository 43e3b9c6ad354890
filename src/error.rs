use thiserror::Error;

// ── Admission ───────────────────────────────────────────────────────

/// Reasons a packet is refused at admission. A refused packet never reaches
/// a qdisc and never touches the flow ledger.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidPacketError {
    #[error("packet size must be positive")]
    NonPositiveSize,
    #[error("packet weight must be finite and positive, got {0}")]
    InvalidWeight(f64),
    #[error("arrival time must not be negative, got {0}")]
    NegativeArrival(i64),
}

// ── Configuration ───────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read scenario: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid scenario TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("flow {flow} has invalid weight {weight}")]
    InvalidFlowWeight { flow: String, weight: f64 },
    #[error("flow {0} configured more than once")]
    DuplicateFlow(String),
    #[error("unknown {field} value {value:?}")]
    UnknownOption { field: &'static str, value: String },
}

pub(crate) fn valid_weight(weight: f64) -> bool {
    weight.is_finite() && weight > 0.0
}
