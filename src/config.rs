use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;

use lazy_static::lazy_static;
use serde::Deserialize;

use crate::error::{ConfigError, valid_weight};
use crate::qdisc::{DrainPolicy, IdlePolicy};

pub type FlowId = u64;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Discipline {
    #[default]
    Wfq,
    Fifo,
}

impl FromStr for Discipline {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "wfq" => Ok(Discipline::Wfq),
            "fifo" => Ok(Discipline::Fifo),
            other => Err(unknown("discipline", other)),
        }
    }
}

impl FromStr for DrainPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "batch" => Ok(DrainPolicy::Batch),
            "per-packet" => Ok(DrainPolicy::PerPacket),
            other => Err(unknown("drain", other)),
        }
    }
}

impl FromStr for IdlePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tick" => Ok(IdlePolicy::Tick),
            "next-arrival" => Ok(IdlePolicy::NextArrival),
            other => Err(unknown("idle", other)),
        }
    }
}

fn unknown(field: &'static str, value: &str) -> ConfigError {
    ConfigError::UnknownOption {
        field,
        value: value.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub discipline: Discipline,
    pub drain: DrainPolicy,
    pub idle: IdlePolicy,
    /// Weight given to flows that show up without being configured.
    pub default_weight: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            discipline: Discipline::Wfq,
            drain: DrainPolicy::Batch,
            idle: IdlePolicy::Tick,
            default_weight: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FlowConfig {
    pub id: FlowId,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PacketConfig {
    pub flow: FlowId,
    pub size: u64,
    #[serde(default)]
    pub weight: Option<f64>,
    pub arrival: i64,
}

/// A full run: scheduler knobs, flow weights and the packet stream.
/// Packets are not validated here; that is admission's job.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub scheduler: SchedulerConfig,
    pub flows: Vec<FlowConfig>,
    pub packets: Vec<PacketConfig>,
}

lazy_static! {
    static ref SAMPLE: Scenario = Scenario {
        scheduler: SchedulerConfig::default(),
        flows: [(1, 3.0), (2, 2.0), (3, 3.0), (4, 2.0)]
            .into_iter()
            .map(|(id, weight)| FlowConfig { id, weight })
            .collect(),
        packets: [
            (1, 500, 3.0, 0),
            (2, 300, 2.0, 1),
            (3, 1000, 3.0, 2),
            (1, 200, 1.0, 3),
            (4, 400, 2.0, 4),
            (2, 4000, 1.0, 5),
            (3, 3500, 2.0, 6),
        ]
        .into_iter()
        .map(|(flow, size, weight, arrival)| PacketConfig {
            flow,
            size,
            weight: Some(weight),
            arrival,
        })
        .collect(),
    };
}

impl Scenario {
    /// Four flows, seven packets, used when no scenario file is given.
    pub fn sample() -> Scenario {
        SAMPLE.clone()
    }

    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        if input.trim().is_empty() {
            return Ok(Scenario::default());
        }
        let scenario: Scenario = toml::from_str(input)?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let input = std::fs::read_to_string(path)?;
        Self::from_toml_str(&input)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !valid_weight(self.scheduler.default_weight) {
            return Err(ConfigError::InvalidFlowWeight {
                flow: "<default>".to_string(),
                weight: self.scheduler.default_weight,
            });
        }

        let mut seen = HashSet::new();
        for flow in &self.flows {
            if !valid_weight(flow.weight) {
                return Err(ConfigError::InvalidFlowWeight {
                    flow: flow.id.to_string(),
                    weight: flow.weight,
                });
            }
            if !seen.insert(flow.id) {
                return Err(ConfigError::DuplicateFlow(flow.id.to_string()));
            }
        }
        Ok(())
    }

    pub fn flow_weights(&self) -> impl Iterator<Item = (FlowId, f64)> + '_ {
        self.flows.iter().map(|f| (f.id, f.weight))
    }
}
