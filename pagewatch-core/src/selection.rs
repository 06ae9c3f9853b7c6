//! Selection key for the detail view

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::page::{PageCategory, PageEntity};

/// The page the user is currently inspecting
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selection {
    pub page_key: String,
    pub category: PageCategory,
}

impl Selection {
    pub fn new(page_key: impl Into<String>, category: PageCategory) -> Self {
        Self {
            page_key: page_key.into(),
            category,
        }
    }

    /// Exact `(key, category)` match
    pub fn matches(&self, page: &PageEntity) -> bool {
        page.category == self.category && page.key == self.page_key
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.category, self.page_key)
    }
}
