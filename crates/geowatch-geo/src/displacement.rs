//! Forced displacement records and aggregation of UNHCR population rows.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::lenient::{coerce_count, coerce_string};

/// Number of origin to asylum flows kept, largest first
pub const TOP_FLOWS: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryDisplacement {
    pub code: String,
    pub name: String,
    pub refugees: u64,
    pub asylum_seekers: u64,
    pub idps: u64,
    pub stateless: u64,
    pub total_displaced: u64,
    pub host_refugees: u64,
    pub host_asylum_seekers: u64,
    pub host_total: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplacementFlow {
    pub origin_code: String,
    pub origin_name: String,
    pub asylum_code: String,
    pub asylum_name: String,
    pub refugees: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_lon: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asylum_lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asylum_lon: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalDisplacementTotals {
    pub refugees: u64,
    pub asylum_seekers: u64,
    pub idps: u64,
    pub stateless: u64,
    pub total: u64,
}

/// One row of the UNHCR population API
#[derive(Debug, Clone, Default)]
pub struct UnhcrRecord {
    pub origin_code: String,
    pub origin_name: String,
    pub asylum_code: String,
    pub asylum_name: String,
    pub refugees: u64,
    pub asylum_seekers: u64,
    pub idps: u64,
    pub stateless: u64,
}

impl UnhcrRecord {
    /// Read a raw API item; counts may be numbers, strings or `"-"`.
    pub fn from_value(item: &Value) -> Self {
        let origin_code = coerce_string(item.get("coo_iso"));
        let asylum_code = coerce_string(item.get("coa_iso"));
        let origin_name = non_empty_or(coerce_string(item.get("coo_name")), &origin_code);
        let asylum_name = non_empty_or(coerce_string(item.get("coa_name")), &asylum_code);
        Self {
            origin_code,
            origin_name,
            asylum_code,
            asylum_name,
            refugees: coerce_count(item.get("refugees")),
            asylum_seekers: coerce_count(item.get("asylum_seekers")),
            idps: coerce_count(item.get("idps")),
            stateless: coerce_count(item.get("stateless")),
        }
    }
}

fn non_empty_or(value: String, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value
    }
}

/// Result of aggregating one year of UNHCR rows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplacementSummary {
    pub global_totals: GlobalDisplacementTotals,
    /// Sorted by `max(total_displaced, host_total)` descending
    pub countries: Vec<CountryDisplacement>,
    pub top_flows: Vec<DisplacementFlow>,
}

#[derive(Default)]
struct Tally {
    name: String,
    refugees: u64,
    asylum_seekers: u64,
    idps: u64,
    stateless: u64,
}

/// Aggregate rows by origin and asylum country and rank the largest flows.
pub fn aggregate_displacement(records: &[UnhcrRecord]) -> DisplacementSummary {
    let mut totals = GlobalDisplacementTotals::default();
    // insertion order kept for stable tie-breaking
    let mut origins: Vec<(String, Tally)> = Vec::new();
    let mut origin_index: HashMap<String, usize> = HashMap::new();
    let mut asylums: Vec<(String, Tally)> = Vec::new();
    let mut asylum_index: HashMap<String, usize> = HashMap::new();
    let mut flows: Vec<DisplacementFlow> = Vec::new();
    let mut flow_index: HashMap<(String, String), usize> = HashMap::new();

    for record in records {
        totals.refugees += record.refugees;
        totals.asylum_seekers += record.asylum_seekers;
        totals.idps += record.idps;
        totals.stateless += record.stateless;

        if !record.origin_code.is_empty() {
            let tally = tally_for(&mut origins, &mut origin_index, &record.origin_code, &record.origin_name);
            tally.refugees += record.refugees;
            tally.asylum_seekers += record.asylum_seekers;
            tally.idps += record.idps;
            tally.stateless += record.stateless;
        }

        if !record.asylum_code.is_empty() {
            let tally = tally_for(&mut asylums, &mut asylum_index, &record.asylum_code, &record.asylum_name);
            tally.refugees += record.refugees;
            tally.asylum_seekers += record.asylum_seekers;
        }

        if !record.origin_code.is_empty() && !record.asylum_code.is_empty() && record.refugees > 0 {
            let key = (record.origin_code.clone(), record.asylum_code.clone());
            let idx = *flow_index.entry(key).or_insert_with(|| {
                flows.push(DisplacementFlow {
                    origin_code: record.origin_code.clone(),
                    origin_name: record.origin_name.clone(),
                    asylum_code: record.asylum_code.clone(),
                    asylum_name: record.asylum_name.clone(),
                    refugees: 0,
                    origin_lat: None,
                    origin_lon: None,
                    asylum_lat: None,
                    asylum_lon: None,
                });
                flows.len() - 1
            });
            flows[idx].refugees += record.refugees;
        }
    }
    totals.total = totals.refugees + totals.asylum_seekers + totals.idps + totals.stateless;

    let mut countries: Vec<CountryDisplacement> = Vec::with_capacity(origins.len());
    let mut country_index: HashMap<String, usize> = HashMap::new();
    for (code, tally) in origins {
        let (lat, lon) = split_centroid(centroid(&code));
        country_index.insert(code.clone(), countries.len());
        countries.push(CountryDisplacement {
            code,
            name: tally.name,
            refugees: tally.refugees,
            asylum_seekers: tally.asylum_seekers,
            idps: tally.idps,
            stateless: tally.stateless,
            total_displaced: tally.refugees + tally.asylum_seekers + tally.idps + tally.stateless,
            host_refugees: 0,
            host_asylum_seekers: 0,
            host_total: 0,
            lat,
            lon,
        });
    }
    for (code, tally) in asylums {
        let host_total = tally.refugees + tally.asylum_seekers;
        match country_index.get(&code) {
            Some(&idx) => {
                let country = &mut countries[idx];
                country.host_refugees = tally.refugees;
                country.host_asylum_seekers = tally.asylum_seekers;
                country.host_total = host_total;
            }
            None => {
                let (lat, lon) = split_centroid(centroid(&code));
                countries.push(CountryDisplacement {
                    code,
                    name: tally.name,
                    refugees: 0,
                    asylum_seekers: 0,
                    idps: 0,
                    stateless: 0,
                    total_displaced: 0,
                    host_refugees: tally.refugees,
                    host_asylum_seekers: tally.asylum_seekers,
                    host_total,
                    lat,
                    lon,
                });
            }
        }
    }
    countries.sort_by_key(|c| std::cmp::Reverse(c.total_displaced.max(c.host_total)));

    flows.sort_by_key(|f| std::cmp::Reverse(f.refugees));
    flows.truncate(TOP_FLOWS);
    for flow in &mut flows {
        (flow.origin_lat, flow.origin_lon) = split_centroid(centroid(&flow.origin_code));
        (flow.asylum_lat, flow.asylum_lon) = split_centroid(centroid(&flow.asylum_code));
    }

    DisplacementSummary {
        global_totals: totals,
        countries,
        top_flows: flows,
    }
}

fn tally_for<'a>(
    tallies: &'a mut Vec<(String, Tally)>,
    index: &mut HashMap<String, usize>,
    code: &str,
    name: &str,
) -> &'a mut Tally {
    let idx = *index.entry(code.to_string()).or_insert_with(|| {
        tallies.push((
            code.to_string(),
            Tally {
                name: name.to_string(),
                ..Tally::default()
            },
        ));
        tallies.len() - 1
    });
    &mut tallies[idx].1
}

fn split_centroid(centroid: Option<(f64, f64)>) -> (Option<f64>, Option<f64>) {
    match centroid {
        Some((lat, lon)) => (Some(lat), Some(lon)),
        None => (None, None),
    }
}

/// Approximate centroid for countries that commonly appear in flows
pub fn centroid(iso3: &str) -> Option<(f64, f64)> {
    let point = match iso3 {
        "AFG" => (33.9, 67.7),
        "SYR" => (35.0, 38.0),
        "UKR" => (48.4, 31.2),
        "SDN" => (15.5, 32.5),
        "SSD" => (6.9, 31.3),
        "SOM" => (5.2, 46.2),
        "COD" => (-4.0, 21.8),
        "MMR" => (19.8, 96.7),
        "YEM" => (15.6, 48.5),
        "ETH" => (9.1, 40.5),
        "VEN" => (6.4, -66.6),
        "IRQ" => (33.2, 43.7),
        "COL" => (4.6, -74.1),
        "NGA" => (9.1, 7.5),
        "PSE" => (31.9, 35.2),
        "TUR" => (39.9, 32.9),
        "DEU" => (51.2, 10.4),
        "PAK" => (30.4, 69.3),
        "UGA" => (1.4, 32.3),
        "BGD" => (23.7, 90.4),
        "KEN" => (0.0, 38.0),
        "TCD" => (15.5, 19.0),
        "JOR" => (31.0, 36.0),
        "LBN" => (33.9, 35.5),
        "EGY" => (26.8, 30.8),
        "IRN" => (32.4, 53.7),
        "TZA" => (-6.4, 34.9),
        "RWA" => (-1.9, 29.9),
        "CMR" => (7.4, 12.4),
        "MLI" => (17.6, -4.0),
        "BFA" => (12.3, -1.6),
        "NER" => (17.6, 8.1),
        "CAF" => (6.6, 20.9),
        "MOZ" => (-18.7, 35.5),
        "USA" => (37.1, -95.7),
        "FRA" => (46.2, 2.2),
        "GBR" => (55.4, -3.4),
        "IND" => (20.6, 79.0),
        "CHN" => (35.9, 104.2),
        "RUS" => (61.5, 105.3),
        _ => return None,
    };
    Some(point)
}
