use std::collections::VecDeque;
use std::fmt::Debug;

use super::holding::{Holding, ReadyQueue};
use super::{DrainPolicy, IdlePolicy, Qdisc, Step};
use crate::packet::{PacketId, PacketState, SimTime, StampedPacket};

// ==========================================
// Arrival-order baseline. Same clock and step rules as WfqQdisc, but finish
// times are ignored, which is what an unweighted link would do.
// ==========================================

// The admission buffer already releases in (arrival, insertion) order.
struct ArrivalOrder<T, K>(VecDeque<(PacketId, StampedPacket<T, K>)>);

impl<T, K> ReadyQueue<T, K> for ArrivalOrder<T, K> {
    fn push(&mut self, id: PacketId, pkt: StampedPacket<T, K>) {
        self.0.push_back((id, pkt));
    }

    fn pop(&mut self) -> Option<(PacketId, StampedPacket<T, K>)> {
        self.0.pop_front()
    }

    fn len(&self) -> usize {
        self.0.len()
    }
}

pub struct FifoQdisc<T, K> {
    holding: Holding<T, K, ArrivalOrder<T, K>>,
}

impl<T, K: Debug> FifoQdisc<T, K> {
    pub fn new(drain: DrainPolicy, idle: IdlePolicy) -> Self {
        Self {
            holding: Holding::new(ArrivalOrder(VecDeque::new()), drain, idle),
        }
    }
}

impl<T, K: Debug> Default for FifoQdisc<T, K> {
    fn default() -> Self {
        Self::new(DrainPolicy::default(), IdlePolicy::default())
    }
}

impl<T, K: Debug> Qdisc<T, K> for FifoQdisc<T, K> {
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
