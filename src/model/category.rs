use crate::model::Id;
use serde::{Deserialize, Serialize};

/// An expense category as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: Id,
    pub name: String,
    /// A `#RRGGBB` hex color.
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Server-computed number of expenses filed under this category. Read-only.
    #[serde(default)]
    pub expenses_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Category {
    /// Whether the client should offer deletion. A category that still has expenses is kept; the
    /// backend is expected to enforce the same rule.
    pub fn can_delete(&self) -> bool {
        self.expenses_count == 0
    }
}

/// The body sent when creating or updating a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryPayload {
    pub name: String,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// The category index endpoint has been seen returning both a bare array and a `{"data": [...]}`
/// wrapper.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum CategoryList {
    Bare(Vec<Category>),
    Wrapped { data: Vec<Category> },
}

impl From<CategoryList> for Vec<Category> {
    fn from(value: CategoryList) -> Self {
        match value {
            CategoryList::Bare(data) | CategoryList::Wrapped { data } => data,
        }
    }
}
