use std::fmt;

/// Simulated time, in ticks. Arrivals are whole ticks; the service clock can
/// land between ticks because each departure costs its (fractional) weight.
pub type Ticks = u64;
pub type SimTime = f64;

/// Insertion sequence number handed out by a qdisc at `enqueue`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PacketId(pub u64);

impl fmt::Display for PacketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketState {
    /// Held, arrival time still in the future.
    Admitted,
    /// Arrived, waiting for service.
    Eligible,
    Departed,
}

/// Submission as built by the caller, before admission.
#[derive(Debug, Clone)]
pub struct Packet<T, K> {
    pub msg: T,
    pub flow: K,
    pub size: u64,
    /// Per-packet override. `None` uses the flow's configured weight.
    pub weight: Option<f64>,
    pub arrival_time: i64,
}

impl<T, K> Packet<T, K> {
    pub fn new(msg: T, flow: K, size: u64, arrival_time: i64) -> Self {
        Self {
            msg,
            flow,
            size,
            weight: None,
            arrival_time,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }
}

/// A packet that went through admission. The virtual finish time is fixed
/// here and cannot be changed afterwards.
#[derive(Debug, Clone)]
pub struct StampedPacket<T, K> {
    msg: T,
    flow: K,
    size: u64,
    weight: f64,
    arrival_time: Ticks,
    finish_time: f64,
}

impl<T, K> StampedPacket<T, K> {
    pub(crate) fn new(
        msg: T,
        flow: K,
        size: u64,
        weight: f64,
        arrival_time: Ticks,
        finish_time: f64,
    ) -> Self {
        Self {
            msg,
            flow,
            size,
            weight,
            arrival_time,
            finish_time,
        }
    }

    pub fn msg(&self) -> &T {
        &self.msg
    }

    pub fn flow(&self) -> &K {
        &self.flow
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Effective weight used for the virtual time math and the service slice.
    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn arrival_time(&self) -> Ticks {
        self.arrival_time
    }

    pub fn finish_time(&self) -> f64 {
        self.finish_time
    }

    pub fn priority(&self) -> PriorityClass {
        PriorityClass::from_weight(self.weight)
    }

    pub(crate) fn is_eligible_at(&self, now: SimTime) -> bool {
        self.arrival_time as f64 <= now
    }

    pub(crate) fn depart(self, id: PacketId, time: SimTime) -> Departure<T, K> {
        Departure {
            id,
            time,
            flow: self.flow,
            size: self.size,
            weight: self.weight,
            arrival_time: self.arrival_time,
            finish_time: self.finish_time,
            scheduled: true,
            msg: self.msg,
        }
    }
}

/// Coarse label derived from the effective weight, for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PriorityClass {
    Low,
    Medium,
    High,
}

impl PriorityClass {
    pub fn from_weight(weight: f64) -> Self {
        if weight >= 3.0 {
            PriorityClass::High
        } else if weight >= 2.0 {
            PriorityClass::Medium
        } else {
            PriorityClass::Low
        }
    }
}

impl fmt::Display for PriorityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PriorityClass::Low => "Low",
            PriorityClass::Medium => "Medium",
            PriorityClass::High => "High",
        };
        f.pad(s)
    }
}

/// One row of the departure log.
#[derive(Debug, Clone, PartialEq)]
pub struct Departure<T, K> {
    pub id: PacketId,
    /// Clock value at the moment the packet was marked served.
    pub time: SimTime,
    pub flow: K,
    pub size: u64,
    pub weight: f64,
    pub arrival_time: Ticks,
    pub finish_time: f64,
    pub scheduled: bool,
    pub msg: T,
}

impl<T, K> Departure<T, K> {
    pub fn priority(&self) -> PriorityClass {
        PriorityClass::from_weight(self.weight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_follows_weight_thresholds() {
        assert_eq!(PriorityClass::from_weight(3.0), PriorityClass::High);
        assert_eq!(PriorityClass::from_weight(7.5), PriorityClass::High);
        assert_eq!(PriorityClass::from_weight(2.0), PriorityClass::Medium);
        assert_eq!(PriorityClass::from_weight(2.9), PriorityClass::Medium);
        assert_eq!(PriorityClass::from_weight(1.0), PriorityClass::Low);
        assert_eq!(PriorityClass::from_weight(0.5), PriorityClass::Low);
    }

    #[test]
    fn depart_carries_stamp_through() {
        let pkt = StampedPacket::new("payload", 7u32, 300, 2.0, 4, 154.0);
        assert!(!pkt.is_eligible_at(3.0));
        assert!(pkt.is_eligible_at(4.0));

        let dep = pkt.depart(PacketId(9), 12.5);
        assert_eq!(dep.id, PacketId(9));
        assert_eq!(dep.time, 12.5);
        assert_eq!(dep.flow, 7);
        assert_eq!(dep.size, 300);
        assert_eq!(dep.arrival_time, 4);
        assert_eq!(dep.finish_time, 154.0);
        assert!(dep.scheduled);
        assert_eq!(dep.msg, "payload");
        assert_eq!(dep.priority(), PriorityClass::Medium);
    }

    #[test]
    fn weight_override_is_optional() {
        let pkt = Packet::new((), "video", 100, 0);
        assert_eq!(pkt.weight, None);
        let pkt = pkt.with_weight(2.5);
        assert_eq!(pkt.weight, Some(2.5));
    }
}
