//! # pricegear
//!
//! Application crate for live hardware price comparison: configuration
//! files, logging and platform directories around the
//! [`pricegear_scrape`] aggregation library.

pub mod config;
pub mod error;
pub mod logging;
pub mod pricegear_dirs;

pub use config::{AppConfig, LoggingConfig};
pub use error::{AppError, Result};
pub use pricegear_scrape::{AggregateResponse, CallerId, PriceAggregator, ScrapeConfig};
