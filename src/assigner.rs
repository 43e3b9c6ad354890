use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use tracing::{debug, warn};

use crate::error::{ConfigError, InvalidPacketError, valid_weight};
use crate::packet::{Packet, StampedPacket};

/// Per-flow ledger entry.
#[derive(Debug, Clone)]
pub struct FlowState {
    /// Configured weight. Never changed by per-packet overrides.
    pub weight: f64,
    /// Finish time of the most recently admitted packet of this flow.
    pub last_finish: f64,
    pub admitted: u64,
    pub admitted_bytes: u64,
}

impl FlowState {
    fn new(weight: f64) -> Self {
        Self {
            weight,
            last_finish: 0.0,
            admitted: 0,
            admitted_bytes: 0,
        }
    }
}

/// Stamps packets with their WFQ virtual finish time:
///
/// `finish = max(last_finish(flow), arrival) + size / weight`
///
/// The ledger is private to one instance; two simulations never share it.
#[derive(Debug)]
pub struct VirtualTimeAssigner<K> {
    flows: HashMap<K, FlowState>,
    default_weight: f64,
}

impl<K> VirtualTimeAssigner<K>
where
    K: Hash + Eq + Clone + Debug,
{
    pub fn new<I>(weights: I, default_weight: f64) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, f64)>,
    {
        if !valid_weight(default_weight) {
            return Err(ConfigError::InvalidFlowWeight {
                flow: "<default>".to_string(),
                weight: default_weight,
            });
        }

        let mut flows = HashMap::new();
        for (flow, weight) in weights {
            if !valid_weight(weight) {
                return Err(ConfigError::InvalidFlowWeight {
                    flow: format!("{flow:?}"),
                    weight,
                });
            }
            if flows.insert(flow.clone(), FlowState::new(weight)).is_some() {
                return Err(ConfigError::DuplicateFlow(format!("{flow:?}")));
            }
        }

        Ok(Self {
            flows,
            default_weight,
        })
    }

    pub fn admit<T>(
        &mut self,
        packet: Packet<T, K>,
    ) -> Result<StampedPacket<T, K>, InvalidPacketError> {
        // Everything is checked before the ledger is touched.
        if packet.size == 0 {
            warn!(flow = ?packet.flow, "rejecting zero-sized packet");
            return Err(InvalidPacketError::NonPositiveSize);
        }
        if packet.arrival_time < 0 {
            warn!(flow = ?packet.flow, arrival = packet.arrival_time, "rejecting negative arrival");
            return Err(InvalidPacketError::NegativeArrival(packet.arrival_time));
        }
        if let Some(weight) = packet.weight {
            if !valid_weight(weight) {
                warn!(flow = ?packet.flow, weight, "rejecting packet weight");
                return Err(InvalidPacketError::InvalidWeight(weight));
            }
        }

        let default_weight = self.default_weight;
        let flow = self.flows.entry(packet.flow.clone()).or_insert_with(|| {
            debug!(flow = ?packet.flow, weight = default_weight, "auto-registering flow");
            FlowState::new(default_weight)
        });

        let weight = packet.weight.unwrap_or(flow.weight);
        let arrival = packet.arrival_time as u64;
        let start = flow.last_finish.max(arrival as f64);
        let finish = start + packet.size as f64 / weight;

        flow.last_finish = finish;
        flow.admitted += 1;
        flow.admitted_bytes = flow.admitted_bytes.saturating_add(packet.size);

        debug!(
            flow = ?packet.flow,
            size = packet.size,
            weight,
            arrival,
            start,
            finish,
            "admitted packet"
        );

        Ok(StampedPacket::new(
            packet.msg,
            packet.flow,
            packet.size,
            weight,
            arrival,
            finish,
        ))
    }

    pub fn last_finish(&self, flow: &K) -> Option<f64> {
        self.flows.get(flow).map(|f| f.last_finish)
    }

    pub fn weight(&self, flow: &K) -> Option<f64> {
        self.flows.get(flow).map(|f| f.weight)
    }

    pub fn flow(&self, flow: &K) -> Option<&FlowState> {
        self.flows.get(flow)
    }

    pub fn flow_count(&self) -> usize {
        self.flows.len()
    }

    pub fn default_weight(&self) -> f64 {
        self.default_weight
    }

    /// Zeroes every ledger entry so the assigner can drive a fresh run.
    pub fn reset(&mut self) {
        for flow in self.flows.values_mut() {
            flow.last_finish = 0.0;
            flow.admitted = 0;
            flow.admitted_bytes = 0;
        }
    }
}
