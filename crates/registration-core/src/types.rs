//! Core types for registrations and their MAM channels.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a registration (caller-assigned string).
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegistrationId(pub String);

impl RegistrationId {
    /// Creates a registration ID from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Returns the registration ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for RegistrationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RegistrationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The root/key pair identifying and authorizing access to one MAM channel.
///
/// A handle whose `side_key` is cleared while `initial_root` is still
/// populated signals that the peer has reset the channel and it must be
/// torn down.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelHandle {
    /// Anchors the channel's origin on the ledger.
    pub initial_root: String,
    /// Shared secret required to read or write the channel.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub side_key: Option<String>,
}

impl ChannelHandle {
    /// Creates a handle from a root and side key.
    pub fn new(initial_root: impl Into<String>, side_key: impl Into<String>) -> Self {
        Self {
            initial_root: initial_root.into(),
            side_key: Some(side_key.into()),
        }
    }

    /// Returns true when the peer has invalidated the side key, leaving
    /// only the root.
    pub fn is_reset(&self) -> bool {
        self.side_key.is_none() && !self.initial_root.is_empty()
    }
}

/// An opaque payload unit exchanged over a MAM channel.
///
/// The engine batches and orders commands but never interprets them; the
/// `command` tag belongs to the wire protocol and the dispatch layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MamCommand {
    /// Wire-level command tag (e.g. `hello`, `goodbye`, or a domain command).
    pub command: String,
    /// Optional command body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl MamCommand {
    /// Creates a command with no payload.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            payload: None,
        }
    }

    /// Creates a command carrying a JSON payload.
    pub fn with_payload(command: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            command: command.into(),
            payload: Some(payload),
        }
    }
}

/// A durable record tracking one registering entity and its channels.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    /// Caller-assigned, immutable identity.
    pub id: RegistrationId,
    /// Set once at creation, never mutated.
    pub created: DateTime<Utc>,
    /// Descriptive name of the registered item.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_name: Option<String>,
    /// Descriptive type of the registered item.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,
    /// Inbound channel this registration is subscribed to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_mam_channel: Option<ChannelHandle>,
    /// Outbound channel created for this registration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_mam_channel: Option<ChannelHandle>,
    /// Outbound commands accepted but not yet confirmed sent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unsent_return_commands: Option<Vec<MamCommand>>,
}

impl Registration {
    /// Creates a fresh registration with no channels.
    pub fn new(id: impl Into<RegistrationId>) -> Self {
        Self {
            id: id.into(),
            created: Utc::now(),
            item_name: None,
            item_type: None,
            item_mam_channel: None,
            return_mam_channel: None,
            unsent_return_commands: None,
        }
    }

    /// Creates a fresh registration with descriptive metadata.
    pub fn with_item(
        id: impl Into<RegistrationId>,
        item_name: Option<String>,
        item_type: Option<String>,
    ) -> Self {
        Self {
            item_name,
            item_type,
            ..Self::new(id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_reset_requires_root_without_key() {
        let live = ChannelHandle::new("ROOT", "KEY");
        assert!(!live.is_reset());

        let reset = ChannelHandle {
            initial_root: "ROOT".to_string(),
            side_key: None,
        };
        assert!(reset.is_reset());

        // An empty handle is merely unopened, not reset.
        assert!(!ChannelHandle::default().is_reset());
    }

    #[test]
    fn registration_serde_skips_absent_fields() {
        let registration = Registration::new("reg-1");
        let json = serde_json::to_string(&registration).unwrap();
        assert!(!json.contains("item_mam_channel"));
        assert!(!json.contains("unsent_return_commands"));

        let back: Registration = serde_json::from_str(&json).unwrap();
        assert_eq!(back, registration);
    }

    #[test]
    fn registration_roundtrips_with_channels_and_queue() {
        let mut registration = Registration::with_item(
            "reg-2",
            Some("solar-panel".to_string()),
            Some("producer".to_string()),
        );
        registration.item_mam_channel = Some(ChannelHandle::new("ITEMROOT", "ITEMKEY"));
        registration.return_mam_channel = Some(ChannelHandle::new("RETROOT", "RETKEY"));
        registration.unsent_return_commands = Some(vec![MamCommand::with_payload(
            "output",
            serde_json::json!({ "value": 42 }),
        )]);

        let json = serde_json::to_string(&registration).unwrap();
        let back: Registration = serde_json::from_str(&json).unwrap();
        assert_eq!(back, registration);
    }

    #[test]
    fn registration_id_display_and_from() {
        let id = RegistrationId::from("reg-3");
        assert_eq!(id.as_str(), "reg-3");
        assert_eq!(id.to_string(), "reg-3");
        assert_eq!(RegistrationId::from_string("reg-3"), id);
    }
}
