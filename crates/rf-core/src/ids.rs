//! Typed ID wrappers for the entities the feed core touches.
//!
//! Each ID type is a newtype over `Uuid`, so a `UserId` can never be
//! passed where a `VideoId` is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Declare `Uuid` newtypes for entity identifiers.
///
/// Each type gets a random `new()`, transparent serde, and `Display`/`FromStr`
/// through the inner UUID so ids round-trip through URLs and JSON rows.
macro_rules! typed_id {
    ($($(#[$meta:meta])* $name:ident),+ $(,)?) => {$(
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                s.trim().parse().map(Self)
            }
        }
    )+};
}

typed_id! {
    /// Unique identifier for a video record.
    VideoId,
    /// Unique identifier for a signed-in user.
    UserId,
    /// Anonymous per-device identity token.
    DeviceId,
}

/// Who a view is attributed to: the signed-in user, or the anonymous device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ViewerId {
    User(UserId),
    Device(DeviceId),
}

impl fmt::Display for ViewerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(id) => write!(f, "{id}"),
            Self::Device(id) => write!(f, "{id}"),
        }
    }
}
