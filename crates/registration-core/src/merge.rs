//! Field-level merge policy for re-registrations.
//!
//! When a peer registers with an id that already exists, the incoming
//! record is merged over the stored one rather than replacing it wholesale.

use crate::types::Registration;

/// Merges one optional descriptive field.
///
/// The incoming value wins only when it is present and non-empty; otherwise
/// the existing value is kept.
pub fn merge_field(incoming: Option<String>, existing: Option<String>) -> Option<String> {
    match incoming {
        Some(value) if !value.is_empty() => Some(value),
        _ => existing,
    }
}

/// Merges an incoming re-registration over the existing record.
///
/// Descriptive fields follow [`merge_field`]. Channel handles always carry
/// forward from the existing record: channel state is owned by the engine
/// and never inferred from the incoming request.
pub fn merge_registration(incoming: &mut Registration, existing: &Registration) {
    incoming.item_name = merge_field(incoming.item_name.take(), existing.item_name.clone());
    incoming.item_type = merge_field(incoming.item_type.take(), existing.item_type.clone());
    incoming.item_mam_channel = existing.item_mam_channel.clone();
    incoming.return_mam_channel = existing.return_mam_channel.clone();
}
