use serde::Deserialize;

use crate::packet::{Departure, PacketId, PacketState, SimTime, StampedPacket, Ticks};

mod fifo_qdisc;
mod holding;
mod monitor_qdisc;
mod wfq_qdisc;

pub use fifo_qdisc::FifoQdisc;
pub use monitor_qdisc::{FlowReport, FlowStats, MonitorQdisc};
pub use wfq_qdisc::WfqQdisc;

/// Outcome of one scheduling step.
#[derive(Debug, Clone, PartialEq)]
pub enum Step<T, K> {
    /// Nothing was eligible at `at`; the clock moved on.
    Idle { at: SimTime },
    /// Departures in service order. Never empty.
    Served(Vec<Departure<T, K>>),
}

impl<T, K> Step<T, K> {
    pub fn is_idle(&self) -> bool {
        matches!(self, Step::Idle { .. })
    }

    pub fn departures(self) -> Vec<Departure<T, K>> {
        match self {
            Step::Idle { .. } => Vec::new(),
            Step::Served(batch) => batch,
        }
    }
}

/// How much leaves the queue per step once something is eligible.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DrainPolicy {
    /// Snapshot everything eligible now and serve all of it before looking
    /// at new arrivals.
    #[default]
    Batch,
    /// Serve one packet, then re-derive eligibility.
    PerPacket,
}

/// What the clock does when nothing is eligible.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdlePolicy {
    /// Advance by one tick.
    #[default]
    Tick,
    /// Jump to the earliest pending arrival.
    NextArrival,
}

impl IdlePolicy {
    pub(crate) fn advance(self, now: SimTime, next_arrival: Option<Ticks>) -> SimTime {
        match (self, next_arrival) {
            (IdlePolicy::NextArrival, Some(arrival)) if arrival as f64 > now => arrival as f64,
            _ => now + 1.0,
        }
    }
}

pub trait Qdisc<T, K> {
    /// Hands an admitted packet to the discipline. Ordering is resolved at
    /// step time, not here.
    fn enqueue(&mut self, pkt: StampedPacket<T, K>) -> PacketId;

    fn step(&mut self) -> Step<T, K>;

    fn now(&self) -> SimTime;

    /// Packets held, eligible or not.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `None` for ids this qdisc never handed out.
    fn state(&self, id: PacketId) -> Option<PacketState>;

    /// Steps until nothing is held and returns the full departure log.
    fn run(&mut self) -> Vec<Departure<T, K>> {
        let mut log = Vec::with_capacity(self.len());
        while !self.is_empty() {
            log.extend(self.step().departures());
        }
        log
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_advances_by_one() {
        assert_eq!(IdlePolicy::Tick.advance(0.0, Some(5)), 1.0);
        assert_eq!(IdlePolicy::Tick.advance(2.5, None), 3.5);
    }

    #[test]
    fn next_arrival_jumps_forward_only() {
        assert_eq!(IdlePolicy::NextArrival.advance(0.0, Some(5)), 5.0);
        assert_eq!(IdlePolicy::NextArrival.advance(6.0, Some(5)), 7.0);
        assert_eq!(IdlePolicy::NextArrival.advance(1.0, None), 2.0);
    }

    #[test]
    fn idle_step_has_no_departures() {
        let step: Step<(), u32> = Step::Idle { at: 3.0 };
        assert!(step.is_idle());
        assert!(step.departures().is_empty());
    }
}
