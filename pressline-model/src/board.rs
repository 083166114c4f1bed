//! Normalized board snapshot served to dashboard clients.
//!
//! The structs mirror the wire shape the dashboard consumes
//! (`boards → groups → items_page → items`), so serialization is direct.
//! A snapshot is rebuilt wholesale on every refresh and never partially
//! mutated.

/// One extracted column value on a sub-item row.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ColumnValue {
    pub id: String,
    pub text: String,
}

/// A nested sub-item row under a board item.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SubitemRow {
    pub id: String,
    pub name: String,
    pub column_values: Vec<ColumnValue>,
}

/// A board item with its display name and sub-item rows.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoardItem {
    pub id: String,
    pub name: String,
    pub subitems: Vec<SubitemRow>,
}

/// Items wrapper matching the provider's `items_page` envelope, kept so
/// the frontend shape survives normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemsPage {
    pub items: Vec<BoardItem>,
}

/// A titled group of items.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoardGroup {
    pub title: String,
    pub items_page: ItemsPage,
}

/// The cached, normalized board representation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoardSnapshot {
    pub groups: Vec<BoardGroup>,
}

impl BoardSnapshot {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total item count across all groups.
    pub fn item_count(&self) -> usize {
        self.groups.iter().map(|g| g.items_page.items.len()).sum()
    }
}
