//! Re-pagination of an already filtered record sequence.

/// One page cut from a filtered sequence
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// Records on this page
    pub items: Vec<T>,
    /// Length of the sequence before slicing
    pub total: usize,
    /// `ceil(total / limit)`
    pub page_count: usize,
}

/// Slice `[offset, offset + limit)` out of `records`, clamped to its length.
///
/// Bounds are validated before this point; a zero `limit` yields an empty page
/// with no pages counted instead of dividing by zero.
pub fn paginate<T>(records: Vec<T>, offset: usize, limit: usize) -> Page<T> {
    let total = records.len();
    let page_count = if limit == 0 { 0 } else { total.div_ceil(limit) };

    let items = records
        .into_iter()
        .skip(offset)
        .take(limit)
        .collect();

    Page { items, total, page_count }
}
