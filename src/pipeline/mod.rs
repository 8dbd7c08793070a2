//! fail2ban log to dashboard report pipeline
//!
//! Stages run strictly forward: the log extractor feeds the GeoIP resolver,
//! whose records feed the aggregator. The orchestrator wires them together.

pub mod aggregator;
pub mod emoji;
pub mod error;
pub mod geoip;
pub mod log_extractor;
#[cfg(test)]
mod mmdb_fixture;
pub mod models;
pub mod orchestrator;

pub use aggregator::aggregate;
pub use emoji::flag_emoji;
pub use error::{PipelineError, PipelineResult};
pub use geoip::{resolve, AsnInfo, CityInfo, GeoSource, Lookup, MaxMindSource};
pub use log_extractor::{extract_bans, BanLogExtractor};
pub use models::{AsnAggregate, BanEvent, CountryAggregate, CountryRow, GeoRecord, Report};
pub use orchestrator::{process, run, run_for_date, PipelineConfig};
