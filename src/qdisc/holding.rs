use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::fmt::Debug;

use tracing::trace;

use super::{DrainPolicy, IdlePolicy, Step};
use crate::packet::{PacketId, PacketState, SimTime, StampedPacket, Ticks};

/// Service order among eligible packets. Implemented once per discipline.
pub(crate) trait ReadyQueue<T, K> {
    fn push(&mut self, id: PacketId, pkt: StampedPacket<T, K>);
    fn pop(&mut self) -> Option<(PacketId, StampedPacket<T, K>)>;
    fn len(&self) -> usize;
}

// Min-heap entry ordered by (arrival, insertion).
struct Pending<T, K> {
    id: PacketId,
    pkt: StampedPacket<T, K>,
}

impl<T, K> Pending<T, K> {
    fn key(&self) -> (Ticks, PacketId) {
        (self.pkt.arrival_time(), self.id)
    }
}

impl<T, K> PartialEq for Pending<T, K> {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl<T, K> Eq for Pending<T, K> {}

impl<T, K> PartialOrd for Pending<T, K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// BinaryHeap is a max-heap, flip it
impl<T, K> Ord for Pending<T, K> {
    fn cmp(&self, other: &Self) -> Ordering {
        other.key().cmp(&self.key())
    }
}

/// Clock, arrival-ordered admission buffer and per-packet state table shared
/// by every discipline. `R` decides who goes first among eligible packets.
pub(crate) struct Holding<T, K, R> {
    pending: BinaryHeap<Pending<T, K>>,
    ready: R,
    // arrival kept so a held packet reads Eligible once the clock passes it
    states: HashMap<PacketId, (PacketState, Ticks)>,
    next_id: u64,
    now: SimTime,
    drain: DrainPolicy,
    idle: IdlePolicy,
}

impl<T, K, R> Holding<T, K, R>
where
    K: Debug,
    R: ReadyQueue<T, K>,
{
    pub(crate) fn new(ready: R, drain: DrainPolicy, idle: IdlePolicy) -> Self {
        Self {
            pending: BinaryHeap::new(),
            ready,
            states: HashMap::new(),
            next_id: 0,
            now: 0.0,
            drain,
            idle,
        }
    }

    pub(crate) fn enqueue(&mut self, pkt: StampedPacket<T, K>) -> PacketId {
        let id = PacketId(self.next_id);
        self.next_id += 1;
        self.states.insert(id, (PacketState::Admitted, pkt.arrival_time()));
        self.pending.push(Pending { id, pkt });
        id
    }

    pub(crate) fn step(&mut self) -> Step<T, K> {
        self.release_arrivals();

        if self.ready.len() == 0 {
            let at = self.now;
            let next_arrival = self.pending.peek().map(|p| p.pkt.arrival_time());
            self.now = self.idle.advance(self.now, next_arrival);
            trace!(at, next = self.now, "idle");
            return Step::Idle { at };
        }

        let quota = match self.drain {
            DrainPolicy::Batch => self.ready.len(),
            DrainPolicy::PerPacket => 1,
        };

        let mut served = Vec::with_capacity(quota);
        for _ in 0..quota {
            let Some((id, pkt)) = self.ready.pop() else {
                break;
            };
            let time = self.now;
            self.now += pkt.weight();
            self.states.remove(&id);
            trace!(
                %id,
                flow = ?pkt.flow(),
                time,
                finish = pkt.finish_time(),
                "departed"
            );
            served.push(pkt.depart(id, time));
        }

        Step::Served(served)
    }

    // Arrivals are only pulled in here, so a batch never grows while it is
    // being drained.
    fn release_arrivals(&mut self) {
        while let Some(top) = self.pending.peek() {
            if !top.pkt.is_eligible_at(self.now) {
                break;
            }
            if let Some(Pending { id, pkt }) = self.pending.pop() {
                self.states.insert(id, (PacketState::Eligible, pkt.arrival_time()));
                self.ready.push(id, pkt);
            }
        }
    }

    pub(crate) fn now(&self) -> SimTime {
        self.now
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len() + self.ready.len()
    }

    pub(crate) fn state(&self, id: PacketId) -> Option<PacketState> {
        match self.states.get(&id) {
            Some((PacketState::Admitted, arrival)) if *arrival as f64 <= self.now => {
                Some(PacketState::Eligible)
            }
            Some((state, _)) => Some(*state),
            None if id.0 < self.next_id => Some(PacketState::Departed),
            None => None,
        }
    }
}
