//! Domain layer: lead records, the reminder escalation policy, and the ports
//! through which the engine reaches its store, mail gateway and clock.

pub mod credential;
pub mod lead;
pub mod message;
pub mod policy;
pub mod ports;
