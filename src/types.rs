//! NewType wrappers for strong typing across the auth and session layers.
//!
//! These types keep semantically different strings apart (e.g. a session id
//! can never be passed where an anti-forgery state token is expected).

use serde::{Deserialize, Serialize};
use std::fmt;

/// String newtype with serde transparency, conversions and `Display`.
macro_rules! newtype_string {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new instance.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Get the inner value as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

newtype_string!(
    /// Opaque server-side session identifier carried in the session cookie.
    ///
    /// Freshly minted ids are UUID v4 strings; ids read back from a cookie are
    /// only trusted as lookup keys into the store.
    SessionId
);

newtype_string!(
    /// One-time anti-forgery value binding a login initiation to its callback.
    StateToken
);

newtype_string!(
    /// Normalized directory group identifier (e.g. `GGD_PASI_ADMIN_GROUP`).
    GroupName
);

impl SessionId {
    /// Mint a new random session id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}
