//! Core messaging substrate: session registry, prompt ingress, stream
//! broker, approval rendezvous, notification fan-out, and the gateway
//! orchestrator composing them.

pub mod approvals;
pub mod broker;
pub mod gateway;
pub mod ingress;
pub mod notify;
pub mod registry;
