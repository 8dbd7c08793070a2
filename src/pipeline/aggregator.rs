//! Country and ASN aggregation of resolved ban events
//!
//! Ban events are inner-joined with their geo records on IP, grouped into
//! ordered accumulators, and sorted by total bans descending. Ties keep the
//! ascending key order of the accumulator, so output is fully deterministic.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, info};

use crate::pipeline::emoji::flag_emoji;
use crate::pipeline::models::{
    AsnAggregate, BanEvent, CountryAggregate, CountryRow, GeoRecord, Report,
};

/// Maximum rows in the country and ASN tables
pub const TABLE_LIMIT: usize = 10;

#[derive(Default)]
struct CountryTally<'a> {
    total_bans: u64,
    ips: BTreeSet<&'a str>,
}

/// Build the dashboard report
///
/// # Returns
/// `None` when there are no geo records at all
pub fn aggregate(events: &[BanEvent], records: &[GeoRecord]) -> Option<Report> {
    info!("Aggregating {} ban events", events.len());
    if records.is_empty() {
        return None;
    }

    let by_ip: HashMap<&str, &GeoRecord> = records.iter().map(|r| (r.ip.as_str(), r)).collect();
    let joined: Vec<&GeoRecord> = events
        .iter()
        .filter_map(|event| by_ip.get(event.ip.as_str()).copied())
        .collect();
    debug!(
        "{} of {} ban events have geo records",
        joined.len(),
        events.len()
    );

    let map_data = country_aggregates(&joined, records);
    let asn_table = asn_aggregates(&joined)
        .into_iter()
        .take(TABLE_LIMIT)
        .collect();
    let country_table = map_data
        .iter()
        .take(TABLE_LIMIT)
        .map(CountryRow::from)
        .collect();

    info!("Aggregation complete: {} countries", map_data.len());
    Some(Report {
        map_data,
        country_table,
        asn_table,
    })
}

fn country_aggregates(joined: &[&GeoRecord], records: &[GeoRecord]) -> Vec<CountryAggregate> {
    let mut groups: BTreeMap<(&str, &str), CountryTally> = BTreeMap::new();
    for record in joined {
        let tally = groups
            .entry((record.country.as_str(), record.country_code.as_str()))
            .or_default();
        tally.total_bans += 1;
        tally.ips.insert(record.ip.as_str());
    }

    // First coordinate pair seen for each country name
    let mut coordinates: HashMap<&str, (f64, f64)> = HashMap::new();
    for record in records {
        coordinates
            .entry(record.country.as_str())
            .or_insert((record.latitude, record.longitude));
    }

    let mut aggregates: Vec<CountryAggregate> = groups
        .into_iter()
        .filter_map(|((country, country_code), tally)| {
            let (latitude, longitude) = coordinates.get(country).copied()?;
            let emoji = flag_emoji(country_code);
            let display_name = format!("{} {}", emoji, country);

            Some(CountryAggregate {
                country: country.to_string(),
                country_code: country_code.to_string(),
                total_bans: tally.total_bans,
                unique_ips: tally.ips.len() as u64,
                latitude,
                longitude,
                emoji,
                display_name,
            })
        })
        .collect();

    aggregates.sort_by(|a, b| b.total_bans.cmp(&a.total_bans));
    aggregates
}

fn asn_aggregates(joined: &[&GeoRecord]) -> Vec<AsnAggregate> {
    let mut groups: BTreeMap<&str, u64> = BTreeMap::new();
    for record in joined {
        *groups.entry(record.asn_label.as_str()).or_insert(0) += 1;
    }

    let mut aggregates: Vec<AsnAggregate> = groups
        .into_iter()
        .map(|(asn_label, total_bans)| AsnAggregate {
            asn_label: asn_label.to_string(),
            total_bans,
        })
        .collect();

    aggregates.sort_by(|a, b| b.total_bans.cmp(&a.total_bans));
    aggregates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(ip: &str, country: &str, code: &str, lat: f64, asn: &str) -> GeoRecord {
        GeoRecord {
            ip: ip.to_string(),
            country: country.to_string(),
            country_code: code.to_string(),
            city: "unknown".to_string(),
            latitude: lat,
            longitude: lat + 1.0,
            asn_label: asn.to_string(),
        }
    }

    fn events(ips: &[&str]) -> Vec<BanEvent> {
        ips.iter().map(|ip| BanEvent::new(*ip)).collect()
    }

    #[test]
    fn test_aggregate_empty_records() {
        assert!(aggregate(&events(&["192.0.2.1"]), &[]).is_none());
    }

    #[test]
    fn test_aggregate_single_ban() {
        let records = vec![record("203.0.113.5", "Testland", "TL", 10.0, "AS64500 Test")];
        let report = aggregate(&events(&["203.0.113.5"]), &records).unwrap();

        assert_eq!(report.map_data.len(), 1);
        let testland = &report.map_data[0];
        assert_eq!(testland.country, "Testland");
        assert_eq!(testland.total_bans, 1);
        assert_eq!(testland.unique_ips, 1);
        assert_eq!(testland.emoji, "🇹🇱");
        assert_eq!(testland.display_name, "🇹🇱 Testland");
        assert_eq!((testland.latitude, testland.longitude), (10.0, 11.0));

        assert_eq!(
            report.country_table,
            vec![CountryRow {
                display_name: "🇹🇱 Testland".to_string(),
                total_bans: 1
            }]
        );
        assert_eq!(
            report.asn_table,
            vec![AsnAggregate {
                asn_label: "AS64500 Test".to_string(),
                total_bans: 1
            }]
        );
    }

    #[test]
    fn test_repeated_bans_count_once_as_unique() {
        let records = vec![record("203.0.113.5", "Testland", "TL", 10.0, "AS1 A")];
        let report = aggregate(&events(&["203.0.113.5", "203.0.113.5"]), &records).unwrap();

        assert_eq!(report.map_data[0].total_bans, 2);
        assert_eq!(report.map_data[0].unique_ips, 1);
        assert_eq!(report.asn_table[0].total_bans, 2);
    }

    #[test]
    fn test_unresolved_events_are_dropped() {
        let records = vec![
            record("192.0.2.1", "A", "AA", 1.0, "AS1 A"),
            record("192.0.2.2", "A", "AA", 2.0, "AS2 B"),
            record("192.0.2.3", "B", "BB", 3.0, "AS1 A"),
        ];
        let evts = events(&[
            "192.0.2.1", "192.0.2.9", "192.0.2.2", "192.0.2.1", "192.0.2.3", "192.0.2.9",
        ]);
        let report = aggregate(&evts, &records).unwrap();

        let total: u64 = report.map_data.iter().map(|c| c.total_bans).sum();
        assert_eq!(total, 4);

        let a = &report.map_data[0];
        assert_eq!(a.country, "A");
        assert_eq!((a.total_bans, a.unique_ips), (3, 2));
        // First record for the country supplies the map position
        assert_eq!(a.latitude, 1.0);

        assert_eq!(report.asn_table[0].asn_label, "AS1 A");
        assert_eq!(report.asn_table[0].total_bans, 3);
        for country in &report.map_data {
            assert!(country.unique_ips <= country.total_bans);
        }
    }

    #[test]
    fn test_tables_are_capped_and_sorted() {
        let mut records = Vec::new();
        let mut ips = Vec::new();
        for i in 0..15u8 {
            let ip = format!("192.0.2.{}", i + 1);
            records.push(record(
                &ip,
                &format!("Country {:02}", i),
                "XX",
                f64::from(i),
                &format!("AS{} Net", i),
            ));
            // Country i gets i + 1 bans
            for _ in 0..=i {
                ips.push(ip.clone());
            }
        }
        let evts: Vec<BanEvent> = ips.into_iter().map(BanEvent::new).collect();
        let report = aggregate(&evts, &records).unwrap();

        assert_eq!(report.map_data.len(), 15);
        assert_eq!(report.country_table.len(), TABLE_LIMIT);
        assert_eq!(report.asn_table.len(), TABLE_LIMIT);
        assert_eq!(report.country_table[0].total_bans, 15);
        assert!(report
            .country_table
            .windows(2)
            .all(|w| w[0].total_bans >= w[1].total_bans));
        assert!(report
            .asn_table
            .windows(2)
            .all(|w| w[0].total_bans >= w[1].total_bans));
    }

    #[test]
    fn test_ties_keep_key_order() {
        let records = vec![
            record("192.0.2.1", "Zeta", "ZZ", 1.0, "AS2 B"),
            record("192.0.2.2", "Alpha", "AA", 2.0, "AS1 A"),
        ];
        let report = aggregate(&events(&["192.0.2.1", "192.0.2.2"]), &records).unwrap();

        let names: Vec<&str> = report.map_data.iter().map(|c| c.country.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Zeta"]);
    }

    #[test]
    fn test_aggregate_is_deterministic() {
        let records = vec![
            record("192.0.2.1", "A", "AA", 1.0, "AS1 A"),
            record("192.0.2.2", "B", "BB", 2.0, "AS2 B"),
        ];
        let evts = events(&["192.0.2.2", "192.0.2.1", "192.0.2.2"]);

        let first = serde_json::to_string(&aggregate(&evts, &records)).unwrap();
        let second = serde_json::to_string(&aggregate(&evts, &records)).unwrap();
        assert_eq!(first, second);
    }
}
