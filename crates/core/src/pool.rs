use serde::{Deserialize, Serialize};

/// The three quantity pools a supply can be held in.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolKind {
    /// The global, not-yet-allocated quantity of a supply.
    Unassigned,
    /// Stock-room quantity at a physical location.
    Location,
    /// Quantity allocated to a treatment room.
    Operatory,
}

impl PoolKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PoolKind::Unassigned => "unassigned",
            PoolKind::Location => "location",
            PoolKind::Operatory => "operatory",
        }
    }
}

impl core::fmt::Display for PoolKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
