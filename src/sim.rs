use std::fmt::Debug;
use std::hash::Hash;

use tracing::{info, warn};

use crate::assigner::VirtualTimeAssigner;
use crate::config::{Discipline, FlowId, Scenario};
use crate::error::{ConfigError, InvalidPacketError};
use crate::packet::{Departure, Packet, PacketId, PacketState, SimTime};
use crate::qdisc::{FifoQdisc, FlowStats, MonitorQdisc, Qdisc, Step, WfqQdisc};

/// A scenario packet that admission refused, with its position in the file.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejected {
    pub index: usize,
    pub error: InvalidPacketError,
}

/// One assigner feeding one monitored qdisc. Not `Sync`-shared: a host that
/// needs concurrent access wraps the whole thing in a single lock or task.
pub struct Simulation<T, K> {
    assigner: VirtualTimeAssigner<K>,
    qdisc: MonitorQdisc<T, K>,
}

impl<T, K> Simulation<T, K>
where
    K: Hash + Eq + Clone + Debug,
{
    pub fn new(assigner: VirtualTimeAssigner<K>, qdisc: MonitorQdisc<T, K>) -> Self {
        Self { assigner, qdisc }
    }

    /// Admission then enqueue. A rejected packet changes nothing.
    pub fn submit(&mut self, packet: Packet<T, K>) -> Result<PacketId, InvalidPacketError> {
        let stamped = self.assigner.admit(packet)?;
        Ok(self.qdisc.enqueue(stamped))
    }

    pub fn step(&mut self) -> Step<T, K> {
        self.qdisc.step()
    }

    pub fn run(&mut self) -> Vec<Departure<T, K>> {
        let log = self.qdisc.run();
        info!(
            qdisc = self.qdisc.name(),
            departures = log.len(),
            busy_steps = self.qdisc.busy_steps(),
            idle_steps = self.qdisc.idle_steps(),
            end = self.qdisc.now(),
            "run complete"
        );
        log
    }

    pub fn now(&self) -> SimTime {
        self.qdisc.now()
    }

    pub fn len(&self) -> usize {
        self.qdisc.len()
    }

    pub fn is_empty(&self) -> bool {
        self.qdisc.is_empty()
    }

    pub fn state(&self, id: PacketId) -> Option<PacketState> {
        self.qdisc.state(id)
    }

    pub fn flow_stats(&self, flow: &K) -> Option<&FlowStats> {
        self.qdisc.flow_stats(flow)
    }

    pub fn assigner(&self) -> &VirtualTimeAssigner<K> {
        &self.assigner
    }

    pub fn monitor(&self) -> &MonitorQdisc<T, K> {
        &self.qdisc
    }
}

impl Simulation<usize, FlowId> {
    /// Builds a simulation from a scenario and submits every packet in file
    /// order. The payload of each packet is its index in the scenario.
    pub fn from_scenario(scenario: &Scenario) -> Result<(Self, Vec<Rejected>), ConfigError> {
        scenario.validate()?;

        let cfg = &scenario.scheduler;
        let assigner = VirtualTimeAssigner::new(scenario.flow_weights(), cfg.default_weight)?;
        let (name, inner): (&str, Box<dyn Qdisc<usize, FlowId>>) = match cfg.discipline {
            Discipline::Wfq => ("wfq", Box::new(WfqQdisc::new(cfg.drain, cfg.idle))),
            Discipline::Fifo => ("fifo", Box::new(FifoQdisc::new(cfg.drain, cfg.idle))),
        };
        let mut sim = Simulation::new(assigner, MonitorQdisc::new(name, inner));

        let mut rejected = Vec::new();
        for (index, p) in scenario.packets.iter().enumerate() {
            let mut packet = Packet::new(index, p.flow, p.size, p.arrival);
            packet.weight = p.weight;
            if let Err(error) = sim.submit(packet) {
                warn!(index, flow = p.flow, %error, "dropping scenario packet");
                rejected.push(Rejected { index, error });
            }
        }

        Ok((sim, rejected))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PacketConfig;
    use crate::qdisc::{DrainPolicy, IdlePolicy};

    #[test]
    fn submit_rejects_without_enqueueing() {
        let assigner = VirtualTimeAssigner::new([(1u32, 1.0)], 1.0).unwrap();
        let qdisc = MonitorQdisc::new("t", Box::new(WfqQdisc::<(), u32>::default()));
        let mut sim = Simulation::new(assigner, qdisc);

        assert!(sim.submit(Packet::new((), 1, 0, 0)).is_err());
        assert!(sim.is_empty());

        let id = sim.submit(Packet::new((), 1, 10, 0)).unwrap();
        assert_eq!(sim.state(id), Some(PacketState::Admitted));
        assert_eq!(sim.len(), 1);

        let log = sim.run();
        assert_eq!(log.len(), 1);
        assert_eq!(sim.state(id), Some(PacketState::Departed));
        assert_eq!(sim.flow_stats(&1).map(|s| s.departed), Some(1));
    }

    #[test]
    fn huge_packets_do_not_overflow_counters() {
        let assigner = VirtualTimeAssigner::new([(1u32, 1.0)], 1.0).unwrap();
        let qdisc = MonitorQdisc::new("t", Box::new(WfqQdisc::<(), u32>::default()));
        let mut sim = Simulation::new(assigner, qdisc);

        let half = u64::MAX / 2 + 1;
        sim.submit(Packet::new((), 1, half, 0)).unwrap();
        sim.submit(Packet::new((), 1, half, 0)).unwrap();

        assert_eq!(sim.run().len(), 2);
        assert_eq!(sim.flow_stats(&1).map(|s| s.served_bytes), Some(u64::MAX));
    }

    #[test]
    fn scenario_collects_rejections() {
        let mut scenario = Scenario::sample();
        scenario.packets.push(PacketConfig {
            flow: 2,
            size: 0,
            weight: None,
            arrival: 1,
        });
        scenario.packets.push(PacketConfig {
            flow: 5,
            size: 10,
            weight: None,
            arrival: -3,
        });

        let (mut sim, rejected) = Simulation::from_scenario(&scenario).unwrap();
        assert_eq!(
            rejected,
            vec![
                Rejected {
                    index: 7,
                    error: InvalidPacketError::NonPositiveSize,
                },
                Rejected {
                    index: 8,
                    error: InvalidPacketError::NegativeArrival(-3),
                },
            ]
        );
        assert_eq!(sim.len(), 7);
        assert_eq!(sim.run().len(), 7);
        assert_eq!(sim.assigner().weight(&5), None);
    }

    #[test]
    fn scenario_picks_discipline() {
        let mut scenario = Scenario::sample();
        scenario.scheduler.discipline = Discipline::Fifo;
        scenario.scheduler.drain = DrainPolicy::Batch;
        scenario.scheduler.idle = IdlePolicy::Tick;

        let (mut sim, _) = Simulation::from_scenario(&scenario).unwrap();
        assert_eq!(sim.monitor().name(), "fifo");
        let order: Vec<_> = sim.run().into_iter().map(|d| d.msg).collect();
        assert_eq!(order, vec![0, 1, 2, 3, 4, 5, 6]);
    }
}
