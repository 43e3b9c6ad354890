//! Weighted fair queuing over a single simulated link.
//!
//! Packets are stamped with a virtual finish time by [`VirtualTimeAssigner`]
//! and handed to a [`Qdisc`], which departs eligible packets in
//! finish-time order while the simulated clock advances.

pub mod assigner;
pub mod config;
pub mod error;
pub mod packet;
pub mod qdisc;
pub mod sim;

pub use assigner::VirtualTimeAssigner;
pub use config::Scenario;
pub use error::{ConfigError, InvalidPacketError};
pub use packet::{Departure, Packet, PacketId, PacketState, PriorityClass, StampedPacket};
pub use qdisc::{DrainPolicy, FifoQdisc, IdlePolicy, MonitorQdisc, Qdisc, Step, WfqQdisc};
pub use sim::Simulation;
