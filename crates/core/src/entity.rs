//! Entity trait: identity + continuity across state changes.

/// Catalog entity marker + minimal interface.
///
/// Every catalog record has a stable identifier and a human-facing name; the
/// catalog uses the name for case-insensitive uniqueness checks.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + core::hash::Hash + Ord + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> Self::Id;

    /// Display name (unique per entity kind, ignoring case).
    fn name(&self) -> &str;
}
