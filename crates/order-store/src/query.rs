/// Shared limit/offset policy for listings.
///
/// Callers pass raw, possibly missing or out-of-range values; the order
/// store itself never clamps, so every listing entry point goes through here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Maximum number of records to return.
    pub limit: usize,

    /// Number of records to skip.
    pub offset: usize,
}

impl Pagination {
    /// Limit used when the caller supplies none (or a non-positive one).
    pub const DEFAULT_LIMIT: usize = 10;

    /// Largest limit a caller may request.
    pub const MAX_LIMIT: usize = 100;

    /// Creates a pagination window without clamping.
    pub fn new(limit: usize, offset: usize) -> Self {
        Self { limit, offset }
    }

    /// Clamps raw caller input: missing or non-positive limits become the
    /// default, limits above the maximum are capped, negative offsets become 0.
    pub fn clamped(limit: Option<i64>, offset: Option<i64>) -> Self {
        let limit = match limit {
            Some(l) if l > 0 => usize::try_from(l)
                .unwrap_or(Self::MAX_LIMIT)
                .min(Self::MAX_LIMIT),
            _ => Self::DEFAULT_LIMIT,
        };
        let offset = offset
            .filter(|o| *o > 0)
            .and_then(|o| usize::try_from(o).ok())
            .unwrap_or(0);

        Self { limit, offset }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LIMIT, 0)
    }
}

/// One page of a listing together with the total number of matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Records in this page.
    pub items: Vec<T>,

    /// Total number of matching records across all pages.
    pub total: u64,

    /// Limit that produced this page.
    pub limit: usize,

    /// Offset that produced this page.
    pub offset: usize,
}

impl<T> Page<T> {
    /// Builds a page from store output and the window that produced it.
    pub fn new(items: Vec<T>, total: u64, pagination: Pagination) -> Self {
        Self {
            items,
            total,
            limit: pagination.limit,
            offset: pagination.offset,
        }
    }

    /// Maps the records of the page, keeping the counts.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            limit: self.limit,
            offset: self.offset,
        }
    }
}
