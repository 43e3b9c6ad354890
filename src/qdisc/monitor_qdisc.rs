use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use tracing::trace;

use super::{Qdisc, Step};
use crate::packet::{PacketId, PacketState, SimTime, StampedPacket};

// ==========================================
// 1. Per-flow counters
// ==========================================
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowStats {
    pub enqueued: u64,
    pub departed: u64,
    pub served_bytes: u64,

    // backlog never resets, it is the live holding-set content
    pub backlog_pkts: u64,
    pub backlog_bytes: u64,

    /// Sum of (departure time - arrival time) over departed packets.
    pub total_wait: f64,
}

impl FlowStats {
    pub fn mean_wait(&self) -> f64 {
        if self.departed == 0 {
            0.0
        } else {
            self.total_wait / self.departed as f64
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlowReport<K> {
    pub flow: K,
    pub stats: FlowStats,
    /// Fraction of all served bytes that belonged to this flow.
    pub share: f64,
}

// ==========================================
// 2. Monitor wrapper, can sit on top of any qdisc
// ==========================================
pub struct MonitorQdisc<T, K> {
    name: String,
    inner: Box<dyn Qdisc<T, K>>,
    stats: HashMap<K, FlowStats>,
    idle_steps: u64,
    busy_steps: u64,
}

impl<T, K> MonitorQdisc<T, K>
where
    K: Hash + Eq + Clone + Debug,
{
    pub fn new(name: &str, inner: Box<dyn Qdisc<T, K>>) -> Self {
        Self {
            name: name.to_string(),
            inner,
            stats: HashMap::new(),
            idle_steps: 0,
            busy_steps: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn flow_stats(&self, flow: &K) -> Option<&FlowStats> {
        self.stats.get(flow)
    }

    pub fn idle_steps(&self) -> u64 {
        self.idle_steps
    }

    pub fn busy_steps(&self) -> u64 {
        self.busy_steps
    }

    pub fn total_served_bytes(&self) -> u64 {
        self.stats
            .values()
            .fold(0u64, |acc, s| acc.saturating_add(s.served_bytes))
    }

    /// Per-flow snapshot sorted by flow key.
    pub fn report(&self) -> Vec<FlowReport<K>>
    where
        K: Ord,
    {
        let total = self.total_served_bytes();
        let mut flows: Vec<_> = self
            .stats
            .iter()
            .map(|(flow, stats)| FlowReport {
                flow: flow.clone(),
                stats: stats.clone(),
                share: if total == 0 {
                    0.0
                } else {
                    stats.served_bytes as f64 / total as f64
                },
            })
            .collect();
        flows.sort_unstable_by(|a, b| a.flow.cmp(&b.flow));
        flows
    }
}

impl<T, K> Qdisc<T, K> for MonitorQdisc<T, K>
where
    K: Hash + Eq + Clone + Debug,
{
    fn enqueue(&mut self, pkt: StampedPacket<T, K>) -> PacketId {
        let stat = self.stats.entry(pkt.flow().clone()).or_default();
        stat.enqueued += 1;
        stat.backlog_pkts += 1;
        stat.backlog_bytes = stat.backlog_bytes.saturating_add(pkt.size());

        self.inner.enqueue(pkt)
    }

    fn step(&mut self) -> Step<T, K> {
        let step = self.inner.step();

        match &step {
            Step::Idle { at } => {
                self.idle_steps += 1;
                trace!(monitor = %self.name, at, "link idle");
            }
            Step::Served(batch) => {
                self.busy_steps += 1;
                for dep in batch {
                    let stat = self.stats.entry(dep.flow.clone()).or_default();
                    stat.departed += 1;
                    stat.served_bytes = stat.served_bytes.saturating_add(dep.size);
                    stat.backlog_pkts = stat.backlog_pkts.saturating_sub(1);
                    stat.backlog_bytes = stat.backlog_bytes.saturating_sub(dep.size);
                    stat.total_wait += dep.time - dep.arrival_time as f64;
                }
                trace!(
                    monitor = %self.name,
                    served = batch.len(),
                    now = self.inner.now(),
                    "batch served"
                );
            }
        }

        step
    }

    fn now(&self) -> SimTime {
        self.inner.now()
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn state(&self, id: PacketId) -> Option<PacketState> {
        self.inner.state(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qdisc::WfqQdisc;

    #[test]
    fn counts_backlog_and_service() {
        let mut q = MonitorQdisc::new("test", Box::new(WfqQdisc::<(), u32>::default()));
        q.enqueue(StampedPacket::new((), 1u32, 300, 2.0, 0, 150.0));
        q.enqueue(StampedPacket::new((), 1u32, 100, 2.0, 0, 200.0));
        q.enqueue(StampedPacket::new((), 2u32, 100, 1.0, 4, 104.0));

        let s1 = q.flow_stats(&1).unwrap();
        assert_eq!((s1.backlog_pkts, s1.backlog_bytes), (2, 400));

        q.step();
        let s1 = q.flow_stats(&1).unwrap();
        assert_eq!(s1.departed, 2);
        assert_eq!(s1.backlog_pkts, 0);
        assert_eq!(s1.served_bytes, 400);
        // departed at 0 and 2, both arrived at 0
        assert_eq!(s1.mean_wait(), 1.0);

        let log = q.run();
        assert_eq!(log.len(), 1);
        assert_eq!(q.busy_steps(), 2);
        assert_eq!(q.idle_steps(), 0);
    }

    #[test]
    fn report_is_sorted_with_shares() {
        let mut q = MonitorQdisc::new("test", Box::new(WfqQdisc::<(), u32>::default()));
        q.enqueue(StampedPacket::new((), 3u32, 100, 1.0, 0, 100.0));
        q.enqueue(StampedPacket::new((), 1u32, 300, 1.0, 0, 300.0));
        q.run();

        let report = q.report();
        assert_eq!(report.len(), 2);
        assert_eq!(report[0].flow, 1);
        assert_eq!(report[0].share, 0.75);
        assert_eq!(report[1].flow, 3);
        assert_eq!(report[1].share, 0.25);
    }

    #[test]
    fn byte_counters_saturate() {
        let half = u64::MAX / 2 + 1;
        let mut q = MonitorQdisc::new("test", Box::new(WfqQdisc::<(), u32>::default()));
        q.enqueue(StampedPacket::new((), 1u32, half, 1.0, 0, 1e19));
        q.enqueue(StampedPacket::new((), 1u32, half, 1.0, 0, 2e19));
        assert_eq!(q.flow_stats(&1).unwrap().backlog_bytes, u64::MAX);

        q.run();
        let s1 = q.flow_stats(&1).unwrap();
        assert_eq!(s1.served_bytes, u64::MAX);
        assert_eq!(s1.departed, 2);
        assert_eq!(q.total_served_bytes(), u64::MAX);
    }

    #[test]
    fn idle_steps_are_counted() {
        let mut q = MonitorQdisc::new("test", Box::new(WfqQdisc::<(), u32>::default()));
        q.enqueue(StampedPacket::new((), 1u32, 10, 1.0, 3, 13.0));
        q.run();
        assert_eq!(q.idle_steps(), 3);
        assert_eq!(q.flow_stats(&1).unwrap().total_wait, 0.0);
    }
}
