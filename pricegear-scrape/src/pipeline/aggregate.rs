//! Merge of per-source groups into the final response.

use crate::types::{AggregateResponse, SourceResult};

/// Merge groups in the order given, which is adapter registration order.
///
/// Empty groups are dropped. A source name seen twice has its products
/// appended to the first group so names stay unique. No ranking happens
/// here: groups and products keep their order.
pub fn aggregate(groups: Vec<SourceResult>) -> AggregateResponse {
    let mut results: Vec<SourceResult> = Vec::with_capacity(groups.len());
    for group in groups {
        if group.products.is_empty() {
            tracing::trace!(source = %group.source, "dropping empty group");
            continue;
        }
        match results.iter_mut().find(|r| r.source == group.source) {
            Some(existing) => existing.products.extend(group.products),
            None => results.push(group),
        }
    }
    AggregateResponse { results }
}
