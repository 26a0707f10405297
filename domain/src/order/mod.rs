//! Order domain.
//!
//! - [`summary::OrderSummary`]: the client's copy of a room's order
//! - [`status::OrderStatus`]: lifecycle status with a monotonic rank
//! - [`lifecycle`]: transition edges and the snapshot adoption guard
//! - [`gating`]: which actions a role may take right now
//! - [`review::Review`]: post-session course review

pub mod gating;
pub mod lifecycle;
pub mod review;
pub mod status;
pub mod summary;
