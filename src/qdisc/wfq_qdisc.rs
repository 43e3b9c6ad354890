use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt::Debug;

use super::holding::{Holding, ReadyQueue};
use super::{DrainPolicy, IdlePolicy, Qdisc, Step};
use crate::packet::{PacketId, PacketState, SimTime, StampedPacket, Ticks};

// ==========================================
// Weighted fair queuing: eligible packets leave in ascending virtual finish
// time, ties broken by arrival time and then insertion order.
// ==========================================

struct Ready<T, K> {
    id: PacketId,
    pkt: StampedPacket<T, K>,
}

impl<T, K> Ready<T, K> {
    fn cmp_key(&self, other: &Self) -> Ordering {
        self.pkt
            .finish_time()
            .total_cmp(&other.pkt.finish_time())
            .then_with(|| self.arrival().cmp(&other.arrival()))
            .then_with(|| self.id.cmp(&other.id))
    }

    fn arrival(&self) -> Ticks {
        self.pkt.arrival_time()
    }
}

impl<T, K> PartialEq for Ready<T, K> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp_key(other) == Ordering::Equal
    }
}

impl<T, K> Eq for Ready<T, K> {}

impl<T, K> PartialOrd for Ready<T, K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Reversed: lowest finish time on top
impl<T, K> Ord for Ready<T, K> {
    fn cmp(&self, other: &Self) -> Ordering {
        other.cmp_key(self)
    }
}

struct FinishOrder<T, K>(BinaryHeap<Ready<T, K>>);

impl<T, K> ReadyQueue<T, K> for FinishOrder<T, K> {
    fn push(&mut self, id: PacketId, pkt: StampedPacket<T, K>) {
        self.0.push(Ready { id, pkt });
    }

    fn pop(&mut self) -> Option<(PacketId, StampedPacket<T, K>)> {
        self.0.pop().map(|r| (r.id, r.pkt))
    }

    fn len(&self) -> usize {
        self.0.len()
    }
}

pub struct WfqQdisc<T, K> {
    holding: Holding<T, K, FinishOrder<T, K>>,
}

impl<T, K: Debug> WfqQdisc<T, K> {
    pub fn new(drain: DrainPolicy, idle: IdlePolicy) -> Self {
        Self {
            holding: Holding::new(FinishOrder(BinaryHeap::new()), drain, idle),
        }
    }
}

impl<T, K: Debug> Default for WfqQdisc<T, K> {
    fn default() -> Self {
        Self::new(DrainPolicy::default(), IdlePolicy::default())
    }
}

impl<T, K: Debug> Qdisc<T, K> for WfqQdisc<T, K> {
    fn enqueue(&mut self, pkt: StampedPacket<T, K>) -> PacketId {
        self.holding.enqueue(pkt)
    }

    fn step(&mut self) -> Step<T, K> {
        self.holding.step()
    }

    fn now(&self) -> SimTime {
        self.holding.now()
    }

    fn len(&self) -> usize {
        self.holding.len()
    }

    fn state(&self, id: PacketId) -> Option<PacketState> {
        self.holding.state(id)
    }
}
