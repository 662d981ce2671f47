//! Ranked, paginated views over per-user counters

use crate::types::UserId;
use serde::Serialize;

/// Entries per page
pub const PAGE_SIZE: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Standing {
    /// 1-based position in the full ranking
    pub rank: usize,
    pub user: UserId,
    pub value: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    pub page: usize,
    pub pages: usize,
    pub entries: Vec<Standing>,
}

/// Rank `(user, value)` pairs by value descending, ties by user id
pub fn rank(mut values: Vec<(UserId, u64)>) -> Vec<Standing> {
    values.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    values
        .into_iter()
        .enumerate()
        .map(|(index, (user, value))| Standing {
            rank: index + 1,
            user,
            value,
        })
        .collect()
}

/// Rank `values` and cut out one page. Pages are 1-based; a page outside
/// `1..=pages` shows page 1.
pub fn paginate(values: Vec<(UserId, u64)>, page: usize) -> Page {
    let ranked = rank(values);

    let pages = ranked.len().div_ceil(PAGE_SIZE).max(1);
    let page = if page == 0 || page > pages { 1 } else { page };

    let entries = ranked
        .into_iter()
        .skip((page - 1) * PAGE_SIZE)
        .take(PAGE_SIZE)
        .collect();

    Page {
        page,
        pages,
        entries,
    }
}
