//! Application-level configuration.
//!
//! - [`SessionParams`]: local user identity, role and reconnect policy
//! - [`ReconnectPolicy`]: what to do after the stream drops

pub mod reconnect;
pub mod session_params;

pub use reconnect::ReconnectPolicy;
pub use session_params::SessionParams;
