//! Strongly-typed identifiers for termtally

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
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
    };
}

string_id!(
    /// Identifier of a monitored host, as written in the config
    HostId
);

string_id!(
    /// Session identifier as reported by the remote host.
    ///
    /// Only unique within one host.
    RemoteSessionId
);

string_id!(
    /// Account name owning a session
    Username
);

/// Unique identifier for a finalized duration delta.
///
/// Assigned once when a session is finalized and carried through every
/// commit attempt, so the store can recognize a delta it already applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeltaId(Uuid);

impl DeltaId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for DeltaId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DeltaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for DeltaId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Key of a tracked session: session ids are only unique per host
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    pub host: HostId,
    pub session_id: RemoteSessionId,
}

impl SessionKey {
    pub fn new(host: HostId, session_id: RemoteSessionId) -> Self {
        Self { host, session_id }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.host, self.session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_id_equality() {
        let id1 = HostId::new("server1");
        let id2 = HostId::from("server1");
        let id3 = HostId::new("server2");

        assert_eq!(id1, id2);
        assert_ne!(id1, id3);
    }

    #[test]
    fn delta_id_uniqueness() {
        let d1 = DeltaId::new();
        let d2 = DeltaId::new();
        assert_ne!(d1, d2);
    }

    #[test]
    fn delta_id_parses_its_display() {
        let id = DeltaId::new();
        let parsed: DeltaId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn string_ids_serialize_transparently() {
        let user = Username::new("alice");
        let json = serde_json::to_string(&user).unwrap();
        assert_eq!(json, "\"alice\"");
    }

    #[test]
    fn session_key_display() {
        let key = SessionKey::new(HostId::new("h1"), RemoteSessionId::new("3"));
        assert_eq!(key.to_string(), "h1/3");
    }
}
