//! The expense list filter and its partial-update counterpart.

use crate::model::{date, Id};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// The column by which the expense list is sorted.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    ExpenseDate,
    Amount,
    Title,
    CreatedAt,
}

serde_plain::derive_display_from_serialize!(SortBy);
serde_plain::derive_fromstr_from_deserialize!(SortBy);

#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

serde_plain::derive_display_from_serialize!(SortOrder);
serde_plain::derive_fromstr_from_deserialize!(SortOrder);

/// The complete expense filter. Every field is always present; unset values are `None` or empty.
/// `Filters::default()` is the initial filter: no date range, no category, no search, newest
/// first.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filters {
    #[serde(default, with = "date::option")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, with = "date::option")]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub category_id: Option<Id>,
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub sort_by: SortBy,
    #[serde(default)]
    pub sort_order: SortOrder,
}

impl Filters {
    /// Returns a copy of `self` with every field that `patch` sets replaced.
    pub fn merged(&self, patch: &FiltersPatch) -> Filters {
        let mut next = self.clone();
        if let Some(v) = patch.start_date {
            next.start_date = v;
        }
        if let Some(v) = patch.end_date {
            next.end_date = v;
        }
        if let Some(v) = patch.category_id {
            next.category_id = v;
        }
        if let Some(v) = &patch.search {
            next.search = v.clone();
        }
        if let Some(v) = patch.sort_by {
            next.sort_by = v;
        }
        if let Some(v) = patch.sort_order {
            next.sort_order = v;
        }
        next
    }

    /// All six filter keys as query parameters, with unset values rendered as empty strings. The
    /// API client strips the empty ones before sending.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let date = |d: Option<NaiveDate>| {
            d.map(|d| d.format(date::DATE_FORMAT).to_string())
                .unwrap_or_default()
        };
        vec![
            ("start_date", date(self.start_date)),
            ("end_date", date(self.end_date)),
            (
                "category_id",
                self.category_id.map(|id| id.to_string()).unwrap_or_default(),
            ),
            ("search", self.search.trim().to_string()),
            ("sort_by", self.sort_by.to_string()),
            ("sort_order", self.sort_order.to_string()),
        ]
    }
}

/// A partial filter update. `None` leaves a field alone; for the optional fields `Some(None)`
/// clears the field.
///
/// In JSON, an absent key leaves the field alone and `null` (or `""`) clears it.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiltersPatch {
    #[serde(
        default,
        deserialize_with = "patch::date",
        skip_serializing_if = "Option::is_none",
        serialize_with = "patch::serialize_date"
    )]
    pub start_date: Option<Option<NaiveDate>>,
    #[serde(
        default,
        deserialize_with = "patch::date",
        skip_serializing_if = "Option::is_none",
        serialize_with = "patch::serialize_date"
    )]
    pub end_date: Option<Option<NaiveDate>>,
    #[serde(
        default,
        deserialize_with = "patch::id",
        skip_serializing_if = "Option::is_none"
    )]
    pub category_id: Option<Option<Id>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<SortBy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<SortOrder>,
}

impl FiltersPatch {
    pub fn start_date(mut self, value: Option<NaiveDate>) -> Self {
        self.start_date = Some(value);
        self
    }

    pub fn end_date(mut self, value: Option<NaiveDate>) -> Self {
        self.end_date = Some(value);
        self
    }

    pub fn category_id(mut self, value: Option<Id>) -> Self {
        self.category_id = Some(value);
        self
    }

    pub fn search(mut self, value: impl Into<String>) -> Self {
        self.search = Some(value.into());
        self
    }

    pub fn sort_by(mut self, value: SortBy) -> Self {
        self.sort_by = Some(value);
        self
    }

    pub fn sort_order(mut self, value: SortOrder) -> Self {
        self.sort_order = Some(value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self == &FiltersPatch::default()
    }
}

mod patch {
    use super::*;
    use serde::Serializer;

    pub(super) fn date<'de, D>(deserializer: D) -> Result<Option<Option<NaiveDate>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        date::option::deserialize(deserializer).map(Some)
    }

    pub(super) fn serialize_date<S>(
        value: &Option<Option<NaiveDate>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(inner) => date::option::serialize(inner, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub(super) fn id<'de, D>(deserializer: D) -> Result<Option<Option<Id>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum IdOrBlank {
            Id(Id),
            Blank(String),
        }

        match Option::<IdOrBlank>::deserialize(deserializer)? {
            None => Ok(Some(None)),
            Some(IdOrBlank::Id(id)) => Ok(Some(Some(id))),
            Some(IdOrBlank::Blank(s)) if s.trim().is_empty() => Ok(Some(None)),
            Some(IdOrBlank::Blank(s)) => Err(serde::de::Error::custom(format!(
                "invalid category id '{s}'"
            ))),
        }
    }
}
