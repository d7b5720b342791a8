use serde::{Deserialize, Serialize};

use crate::ident::PackageIdent;

/// One page of a paginated channel listing.
///
/// `range_end - range_start` is the page size for every page except
/// possibly the last.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogPage {
    #[serde(rename = "range_start")]
    pub start: u64,
    #[serde(rename = "range_end")]
    pub end: u64,
    #[serde(rename = "total_count")]
    pub total: u64,
    #[serde(default)]
    pub data: Vec<PackageIdent>,
}

impl CatalogPage {
    pub fn page_size(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
