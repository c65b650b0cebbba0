use crate::catalog::{CatalogApi, DiscoveredItem};

/// Release-year partitions, newest first. Empty when the range is inverted.
pub fn release_years(newest: u16, oldest: u16) -> Vec<u16> {
    if newest < oldest {
        return Vec::new();
    }
    (oldest..=newest).rev().collect()
}

/// One discovery step: the items of a (year, page) cell plus the page count
/// the upstream reported for that year.
#[derive(Clone, Debug, Default)]
pub struct PageBatch {
    pub items: Vec<DiscoveredItem>,
    pub total_pages: u32,
}

impl PageBatch {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Thin wrapper over the discovery endpoint. A failed request becomes an
/// empty batch with `total_pages = 0`, which ends the partition; there are
/// no retries at this layer.
pub struct CatalogPaginator<'a, C: CatalogApi> {
    api: &'a C,
    page_cap: u32,
}

impl<'a, C: CatalogApi> CatalogPaginator<'a, C> {
    pub fn new(api: &'a C, page_cap: u32) -> Self {
        Self { api, page_cap }
    }

    pub fn next_batch(&self, year: u16, page: u32) -> PageBatch {
        match self.api.discover(year, page) {
            Ok(reply) => PageBatch {
                items: reply.results,
                total_pages: reply.total_pages.min(self.page_cap),
            },
            Err(e) => {
                tracing::warn!(year, page, error = %e, "discovery request failed, ending partition");
                PageBatch::default()
            }
        }
    }
}
