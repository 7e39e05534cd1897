//! Offset pagination shared by feed reads.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_LIMIT: u32 = 20;
pub const MAX_PAGE_LIMIT: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRequest {
    pub limit: u32,
    pub offset: u32,
}

impl PageRequest {
    pub fn new(limit: u32, offset: u32) -> Self {
        Self { limit, offset }
    }

    pub fn first(limit: u32) -> Self {
        Self::new(limit, 0)
    }

    pub fn next(self) -> Self {
        Self {
            limit: self.limit,
            offset: self.offset.saturating_add(self.limit),
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first(DEFAULT_PAGE_LIMIT)
    }
}

/// One page of results together with the request that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub request: PageRequest,
    fetched: usize,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: PageRequest) -> Self {
        let fetched = items.len();
        Self {
            items,
            request,
            fetched,
        }
    }

    /// A short page means the boundary has nothing further.
    ///
    /// Measured on what the boundary returned, so local filtering of `items`
    /// does not end pagination early. A zero-limit request never advances
    /// and is always final.
    pub fn is_last(&self) -> bool {
        self.request.limit == 0 || self.fetched < self.request.limit as usize
    }

    pub fn next_request(&self) -> Option<PageRequest> {
        (!self.is_last()).then(|| self.request.next())
    }

    pub fn retain(&mut self, keep: impl FnMut(&T) -> bool) {
        self.items.retain(keep);
    }
}
