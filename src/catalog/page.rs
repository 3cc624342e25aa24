use serde::Serialize;

use super::TickerGroup;
use crate::models::TickerRecord;

/// One page of the ticker catalog
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickerPage {
    pub items: TickerGroup,
    pub total: usize,
    pub page: usize,
    pub limit: usize,
    pub total_pages: usize,
    pub next_page: Option<usize>,
    pub prev_page: Option<usize>,
}

impl TickerPage {
    /// `page` and `limit` must both be at least 1.
    pub(super) fn slice(records: &[TickerRecord], page: usize, limit: usize) -> Self {
        let total = records.len();
        let total_pages = total.div_ceil(limit);

        let start = (page - 1).saturating_mul(limit).min(total);
        let end = start.saturating_add(limit).min(total);

        Self {
            items: TickerGroup::from(records[start..end].to_vec()),
            total,
            page,
            limit,
            total_pages,
            next_page: (page < total_pages).then(|| page + 1),
            prev_page: (page > 1).then(|| page - 1),
        }
    }
}
