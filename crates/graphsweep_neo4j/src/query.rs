//! Query text adjustments.

use std::borrow::Cow;

/// Append a `LIMIT` clause when a row limit is set and the query has none.
///
/// The check is a case-insensitive substring test, so a query mentioning
/// `limit` anywhere is left alone; rows are truncated client side as well.
#[must_use]
pub fn with_row_limit(query: &str, limit: usize) -> Cow<'_, str> {
    let trimmed = query.trim();
    if limit == 0 || trimmed.to_lowercase().contains("limit") {
        return Cow::Borrowed(trimmed);
    }
    Cow::Owned(format!("{}\nLIMIT {}", trimmed, limit))
}
