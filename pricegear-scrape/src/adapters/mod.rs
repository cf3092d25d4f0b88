//! Storefront adapter implementations.
//!
//! Each module provides a struct implementing [`crate::adapter::SourceAdapter`]
//! that scrapes one storefront's search results page.

pub mod binarylogic;
mod markup;
pub mod pchouse;
pub mod potakait;
pub mod ryans;
pub mod skyland;
pub mod startech;
pub mod ultratech;

use std::sync::Arc;

pub use binarylogic::BinaryLogicAdapter;
pub use pchouse::PcHouseAdapter;
pub use potakait::PotakaItAdapter;
pub use ryans::RyansAdapter;
pub use skyland::SkylandAdapter;
pub use startech::StarTechAdapter;
pub use ultratech::UltraTechAdapter;

use crate::adapter::SourceAdapter;
use crate::types::Source;

/// The production adapter for a known storefront.
pub fn adapter_for(source: Source) -> Arc<dyn SourceAdapter> {
    match source {
        Source::StarTech => Arc::new(StarTechAdapter::new()),
        Source::Ryans => Arc::new(RyansAdapter::new()),
        Source::Skyland => Arc::new(SkylandAdapter::new()),
        Source::PcHouse => Arc::new(PcHouseAdapter::new()),
        Source::UltraTech => Arc::new(UltraTechAdapter::new()),
        Source::BinaryLogic => Arc::new(BinaryLogicAdapter::new()),
        Source::PotakaIt => Arc::new(PotakaItAdapter::new()),
    }
}

/// Adapters for `sources`, in the given order. Repeated sources are kept
/// once, at their first position.
pub fn build(sources: &[Source]) -> Vec<Arc<dyn SourceAdapter>> {
    let mut seen = Vec::with_capacity(sources.len());
    sources
        .iter()
        .filter(|s| {
            if seen.contains(*s) {
                false
            } else {
                seen.push(**s);
                true
            }
        })
        .map(|s| adapter_for(*s))
        .collect()
}
