//! Use cases (application services)
//!
//! - [`timeline_store`]: per-room merge of history and live messages
//! - [`order_sync`]: adopted order state and role-gated order actions
//! - [`session`]: the orchestrator that wires transport, timelines and
//!   orders together for one session

pub mod order_sync;
pub mod session;
pub mod timeline_store;

#[cfg(test)]
pub(crate) mod test_support;
