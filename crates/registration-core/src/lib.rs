//! Domain types shared across the registration sync workspace.
//!
//! A [`Registration`] is a durable record tracking one peer's subscription
//! and up to two MAM channels: an inbound item channel supplied by the peer
//! and an outbound return channel created by the service. Commands crossing
//! those channels are opaque [`MamCommand`] units.
//!
//! Re-registration uses the field-level merge policy in [`merge`]: incoming
//! descriptive fields win only when non-empty, and channel state always
//! carries forward from the existing record.

mod merge;
mod types;

pub use merge::{merge_field, merge_registration};
pub use types::{ChannelHandle, MamCommand, Registration, RegistrationId};
