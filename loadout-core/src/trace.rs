//! Pass identifiers for log correlation

use uuid::Uuid;

/// Generate a unique id for a fetch pass
///
/// UUID v7 is time ordered, so ids sort in the order passes started.
pub fn generate_pass_id() -> String {
    Uuid::now_v7().to_string()
}
