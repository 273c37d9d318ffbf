use serde::{Deserialize, Serialize};

/// The default page size used by the backend and by the initial state.
pub const DEFAULT_PER_PAGE: u32 = 15;

/// A paginated response envelope.
///
/// `total` counts records across all pages. `from` and `to` are the 1-based indices of the first
/// and last record on this page, or zero when the page is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub total: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    #[serde(default = "first_page")]
    pub current_page: u32,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub from: u64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub to: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_page: Option<u32>,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            total: 0,
            per_page: DEFAULT_PER_PAGE,
            current_page: 1,
            from: 0,
            to: 0,
            last_page: None,
        }
    }
}

impl<T> Page<T> {
    /// The number of the last page, from `last_page` if the backend sent it, otherwise derived from
    /// `total` and `per_page`. Never less than 1.
    pub fn last_page(&self) -> u32 {
        if let Some(last) = self.last_page {
            return last.max(1);
        }
        if self.per_page == 0 {
            return 1;
        }
        let pages = self.total.div_ceil(u64::from(self.per_page));
        u32::try_from(pages).unwrap_or(u32::MAX).max(1)
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.last_page()
    }

    pub fn has_prev(&self) -> bool {
        self.current_page > 1
    }
}

fn default_per_page() -> u32 {
    DEFAULT_PER_PAGE
}

fn first_page() -> u32 {
    1
}

fn null_as_zero<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<u64>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_laravel_page() {
        let json = r#"{"data": [], "total": 0, "per_page": 15, "current_page": 1,
            "from": null, "to": null, "last_page": 1}"#;
        let page: Page<u8> = serde_json::from_str(json).unwrap();
        assert_eq!(page.from, 0);
        assert_eq!(page.to, 0);
        assert_eq!(page.last_page(), 1);
        assert!(!page.has_next());
        assert!(!page.has_prev());
    }

    #[test]
    fn test_derived_last_page() {
        let page = Page::<u8> {
            total: 31,
            current_page: 2,
            ..Page::default()
        };
        assert_eq!(page.last_page(), 3);
        assert!(page.has_next());
        assert!(page.has_prev());
    }
}
