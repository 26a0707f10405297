//! Identifier value objects.
//!
//! Every identifier the backend hands out is an opaque string (Mongo object
//! ids for rooms and messages, UUIDs for orders and payments, Firebase uids
//! for users). Wrapping them keeps a room id from being passed where an order
//! id is expected.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(
    /// Chat room identifier.
    RoomId
);
string_id!(
    /// Chat message identifier, unique across a room's timeline.
    MessageId
);
string_id!(
    /// Customer or prophet user id.
    UserId
);
string_id!(
    /// Course identifier.
    CourseId
);
string_id!(
    /// Order identifier. Stable for the life of an order.
    OrderId
);
string_id!(
    /// Payment identifier bound to an order.
    PaymentId
);

/// Counter for locally minted message ids.
static SYNTHETIC_MESSAGE_ID: AtomicU64 = AtomicU64::new(1);

/// Prefix of locally minted message ids.
pub const SYNTHETIC_ID_PREFIX: &str = "local-";

impl MessageId {
    /// Mint a process-unique id for a frame that arrived without one.
    ///
    /// Synthetic ids never collide with each other, so such frames are never
    /// mistaken for duplicates of one another.
    pub fn synthetic() -> Self {
        let n = SYNTHETIC_MESSAGE_ID.fetch_add(1, Ordering::SeqCst);
        Self(format!("{SYNTHETIC_ID_PREFIX}{n}"))
    }

    /// Whether this id was minted locally by [`MessageId::synthetic`].
    pub fn is_synthetic(&self) -> bool {
        self.0.starts_with(SYNTHETIC_ID_PREFIX)
    }
}
