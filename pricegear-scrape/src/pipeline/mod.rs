//! Post-extraction pipeline: normalise each source, then aggregate.

pub mod aggregate;
pub mod normalize;
pub mod url_normalize;

pub use aggregate::aggregate;
pub use normalize::{normalize_price, normalize_source};

use crate::runner::RunReport;
use crate::types::AggregateResponse;

/// Build the response from a fan-out report.
///
/// Only successful runs contribute; failed, timed-out, panicked and
/// abandoned adapters are simply absent.
pub fn assemble(report: &RunReport) -> AggregateResponse {
    let groups = report
        .runs
        .iter()
        .filter_map(|run| {
            run.extraction
                .as_ref()
                .map(|extraction| normalize_source(&run.info, extraction))
        })
        .collect();
    aggregate(groups)
}
