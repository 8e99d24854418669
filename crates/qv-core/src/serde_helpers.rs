//! Shared serde helper functions used across multiple modules.

/// Serde default function that returns `true`.
///
/// Used for rule toggles that default to enabled.
pub fn default_true() -> bool {
    true
}
