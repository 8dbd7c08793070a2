//! IP geolocation using MaxMind GeoLite2/GeoIP2 MMDB
//!
//! Resolution is split in two layers: a [`GeoSource`] answers single-address
//! city and ASN queries, and [`resolve`] turns a list of banned addresses into
//! complete [`GeoRecord`]s, silently dropping anything a source cannot place.

use maxminddb::{MaxMindDbError, Mmap, PathElement, Reader};
use std::collections::BTreeSet;
use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;
use tracing::{debug, info};

use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::models::{BanEvent, GeoRecord};

/// Placeholder for a missing city name or network organization
pub const UNKNOWN: &str = "unknown";

/// Outcome of a single database query
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
}

impl<T> Lookup<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            Lookup::NotFound => None,
        }
    }
}

impl<T> From<Option<T>> for Lookup<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Lookup::NotFound, Lookup::Found)
    }
}

/// Location data from the city database; any field may be missing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CityInfo {
    pub country_name: Option<String>,
    pub country_code: Option<String>,
    pub city_name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Network data from the ASN database
#[derive(Debug, Clone, PartialEq)]
pub struct AsnInfo {
    pub number: u32,
    pub organization: Option<String>,
}

impl AsnInfo {
    /// Label in the form `AS<number> <organization>`
    pub fn label(&self) -> String {
        format!(
            "AS{} {}",
            self.number,
            self.organization.as_deref().unwrap_or(UNKNOWN)
        )
    }
}

/// Read-only lookup of city and ASN metadata for a single address
///
/// Absent addresses are reported as [`Lookup::NotFound`]; errors are reserved
/// for broken databases.
pub trait GeoSource {
    fn city(&self, ip: Ipv4Addr) -> PipelineResult<Lookup<CityInfo>>;

    fn asn(&self, ip: Ipv4Addr) -> PipelineResult<Lookup<AsnInfo>>;
}

/// [`GeoSource`] backed by memory-mapped MaxMind City and ASN databases
///
/// Both readers are released when the value is dropped.
pub struct MaxMindSource {
    city_reader: Reader<Mmap>,
    asn_reader: Reader<Mmap>,
    locales: Vec<String>,
}

impl MaxMindSource {
    /// Open both databases
    ///
    /// # Arguments
    /// * `city_path` - GeoLite2-City or GeoIP2-City .mmdb file
    /// * `asn_path` - GeoLite2-ASN .mmdb file
    /// * `locales` - preferred name locales in priority order (e.g. `zh-CN`, `en`)
    pub fn open(city_path: &Path, asn_path: &Path, locales: &[String]) -> PipelineResult<Self> {
        let city_reader = unsafe { Reader::open_mmap(city_path) }.map_err(|source| {
            PipelineError::Database {
                path: city_path.to_path_buf(),
                source,
            }
        })?;

        let asn_reader = unsafe { Reader::open_mmap(asn_path) }.map_err(|source| {
            PipelineError::Database {
                path: asn_path.to_path_buf(),
                source,
            }
        })?;

        Ok(Self {
            city_reader,
            asn_reader,
            locales: locales.to_vec(),
        })
    }
}

impl GeoSource for MaxMindSource {
    fn city(&self, ip: Ipv4Addr) -> PipelineResult<Lookup<CityInfo>> {
        let result = self
            .city_reader
            .lookup(IpAddr::V4(ip))
            .map_err(|source| lookup_error(ip, source))?;
        if !result.has_data() {
            return Ok(Lookup::NotFound);
        }

        // First preferred locale that carries a name wins
        let localized = |record: &str| -> PipelineResult<Option<String>> {
            for locale in &self.locales {
                let name = result
                    .decode_path::<String>(&[
                        PathElement::Key(record),
                        PathElement::Key("names"),
                        PathElement::Key(locale.as_str()),
                    ])
                    .map_err(|source| lookup_error(ip, source))?;
                if name.is_some() {
                    return Ok(name);
                }
            }
            Ok(None)
        };

        let country_code = result
            .decode_path::<String>(&[PathElement::Key("country"), PathElement::Key("iso_code")])
            .map_err(|source| lookup_error(ip, source))?;
        let latitude = result
            .decode_path::<f64>(&[PathElement::Key("location"), PathElement::Key("latitude")])
            .map_err(|source| lookup_error(ip, source))?;
        let longitude = result
            .decode_path::<f64>(&[PathElement::Key("location"), PathElement::Key("longitude")])
            .map_err(|source| lookup_error(ip, source))?;

        Ok(Lookup::Found(CityInfo {
            country_name: localized("country")?,
            country_code,
            city_name: localized("city")?,
            latitude,
            longitude,
        }))
    }

    fn asn(&self, ip: Ipv4Addr) -> PipelineResult<Lookup<AsnInfo>> {
        let result = self
            .asn_reader
            .lookup(IpAddr::V4(ip))
            .map_err(|source| lookup_error(ip, source))?;
        if !result.has_data() {
            return Ok(Lookup::NotFound);
        }

        let number = result
            .decode_path::<u32>(&[PathElement::Key("autonomous_system_number")])
            .map_err(|source| lookup_error(ip, source))?;
        let organization = result
            .decode_path::<String>(&[PathElement::Key("autonomous_system_organization")])
            .map_err(|source| lookup_error(ip, source))?;

        Ok(number
            .map(|number| AsnInfo {
                number,
                organization,
            })
            .into())
    }
}

fn lookup_error(ip: Ipv4Addr, source: MaxMindDbError) -> PipelineError {
    PipelineError::Lookup {
        ip: ip.to_string(),
        source,
    }
}

/// Resolve every distinct banned address through `source`
///
/// Addresses are deduplicated and visited in ascending order. An address is
/// dropped when either database misses it, when it has no country name or
/// latitude, or when it is not a valid IPv4 address.
pub fn resolve<S: GeoSource + ?Sized>(
    events: &[BanEvent],
    source: &S,
) -> PipelineResult<Vec<GeoRecord>> {
    let unique_ips: BTreeSet<&str> = events.iter().map(|e| e.ip.as_str()).collect();
    info!("Geolocating {} unique IPs", unique_ips.len());

    let mut records = Vec::with_capacity(unique_ips.len());
    for ip in unique_ips {
        match resolve_one(ip, source)? {
            Some(record) => records.push(record),
            None => debug!("Dropping {}: no complete GeoIP data", ip),
        }
    }

    info!("Resolved {} IPs", records.len());
    Ok(records)
}

fn resolve_one<S: GeoSource + ?Sized>(ip: &str, source: &S) -> PipelineResult<Option<GeoRecord>> {
    let Ok(addr) = ip.parse::<Ipv4Addr>() else {
        return Ok(None);
    };

    let Some(city) = source.city(addr)?.found() else {
        return Ok(None);
    };
    let Some(asn) = source.asn(addr)?.found() else {
        return Ok(None);
    };

    let (Some(country), Some(latitude)) = (city.country_name, city.latitude) else {
        return Ok(None);
    };

    Ok(Some(GeoRecord {
        ip: ip.to_string(),
        country,
        country_code: city.country_code.unwrap_or_default(),
        city: city.city_name.unwrap_or_else(|| UNKNOWN.to_string()),
        latitude,
        longitude: city.longitude.unwrap_or_default(),
        asn_label: asn.label(),
    }))
}
