//! End-to-end ban report generation
//!
//! Validates inputs, then runs extraction, geolocation and aggregation in
//! order. Running out of data at any stage yields `Ok(None)`; every other
//! failure is logged and returned to the caller.

use chrono::{Local, NaiveDate};
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::pipeline::aggregator::aggregate;
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::geoip::{resolve, GeoSource, MaxMindSource};
use crate::pipeline::log_extractor::BanLogExtractor;
use crate::pipeline::models::{BanEvent, Report};

/// Inputs of a single pipeline run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub log_file: PathBuf,
    pub jail_name: String,
    pub city_db: PathBuf,
    pub asn_db: PathBuf,
    /// Preferred locales for place names, highest priority first
    pub locales: Vec<String>,
}

/// Generate today's report
pub fn run(config: &PipelineConfig) -> PipelineResult<Option<Report>> {
    run_for_date(config, Local::now().date_naive())
}

/// Generate the report for bans logged on `date`
pub fn run_for_date(config: &PipelineConfig, date: NaiveDate) -> PipelineResult<Option<Report>> {
    info!("Starting report generation for {}", date);

    let result = run_stages(config, date);
    match &result {
        Ok(Some(_)) => info!("Report generation complete"),
        Ok(None) => info!("No ban data to report for {}", date),
        Err(e) => error!("Report generation failed: {}", e),
    }
    result
}

fn run_stages(config: &PipelineConfig, date: NaiveDate) -> PipelineResult<Option<Report>> {
    validate_inputs(config)?;

    let date_filter = date.format("%Y-%m-%d").to_string();
    let events = BanLogExtractor::new(&config.jail_name)?.extract(&config.log_file, &date_filter)?;
    if events.is_empty() {
        return Ok(None);
    }

    let source = MaxMindSource::open(&config.city_db, &config.asn_db, &config.locales)?;
    process(&events, &source)
}

/// Resolve and aggregate already extracted events
pub fn process<S: GeoSource + ?Sized>(
    events: &[BanEvent],
    source: &S,
) -> PipelineResult<Option<Report>> {
    if events.is_empty() {
        return Ok(None);
    }

    let records = resolve(events, source)?;
    if records.is_empty() {
        return Ok(None);
    }

    Ok(aggregate(events, &records))
}

/// Check that every required file exists
///
/// Fails on the first missing path, in the order log file, city database,
/// ASN database.
pub fn validate_inputs(config: &PipelineConfig) -> PipelineResult<()> {
    let required: [(&'static str, &Path); 3] = [
        ("log_file", config.log_file.as_path()),
        ("city_db", config.city_db.as_path()),
        ("asn_db", config.asn_db.as_path()),
    ];

    for (key, path) in required {
        if !path.exists() {
            return Err(PipelineError::MissingInput {
                key,
                path: path.to_path_buf(),
            });
        }
    }
    Ok(())
}
