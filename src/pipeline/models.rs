//! Data models for the ban report pipeline

use serde::{Deserialize, Serialize};

/// One matched ban line from the log
///
/// Repeated bans of the same address produce repeated events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BanEvent {
    pub ip: String,
}

impl BanEvent {
    pub fn new(ip: impl Into<String>) -> Self {
        Self { ip: ip.into() }
    }
}

/// Geographic and network metadata for a single resolved address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoRecord {
    /// Address as it appeared in the log
    pub ip: String,

    /// Localized country name
    pub country: String,

    /// ISO country code (e.g., "US", "CN"), empty when the database has none
    pub country_code: String,

    /// Localized city name, or the placeholder when unknown
    pub city: String,

    pub latitude: f64,

    pub longitude: f64,

    /// "AS<number> <organization>"
    pub asn_label: String,
}

/// Per-country ban summary, also used as a map marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryAggregate {
    pub country: String,
    pub country_code: String,
    /// Every ban event in this country, repeats included
    pub total_bans: u64,
    /// Distinct addresses banned in this country
    pub unique_ips: u64,
    pub latitude: f64,
    pub longitude: f64,
    pub emoji: String,
    pub display_name: String,
}

/// Row of the top countries table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryRow {
    pub display_name: String,
    pub total_bans: u64,
}

impl From<&CountryAggregate> for CountryRow {
    fn from(aggregate: &CountryAggregate) -> Self {
        Self {
            display_name: aggregate.display_name.clone(),
            total_bans: aggregate.total_bans,
        }
    }
}

/// Per-network ban summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsnAggregate {
    pub asn_label: String,
    pub total_bans: u64,
}

/// Dashboard-ready output of one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// All country aggregates, ordered by total bans descending
    pub map_data: Vec<CountryAggregate>,

    /// Top countries by total bans
    pub country_table: Vec<CountryRow>,

    /// Top networks by total bans
    pub asn_table: Vec<AsnAggregate>,
}
