//! Climate anomaly records and classification

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnomalySeverity {
    Normal,
    Moderate,
    Extreme,
}

impl AnomalySeverity {
    /// Classify from deltas in degrees C and millimetres.
    pub fn classify(temp_delta: f64, precip_delta: f64) -> Self {
        let abs_temp = temp_delta.abs();
        let abs_precip = precip_delta.abs();
        if abs_temp >= 5.0 || abs_precip >= 80.0 {
            Self::Extreme
        } else if abs_temp >= 3.0 || abs_precip >= 40.0 {
            Self::Moderate
        } else {
            Self::Normal
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnomalyType {
    Warm,
    Cold,
    Wet,
    Dry,
    Mixed,
}

impl AnomalyType {
    /// Temperature dominates when its delta outweighs precipitation at
    /// 1 degree : 20 mm.
    pub fn classify(temp_delta: f64, precip_delta: f64) -> Self {
        if temp_delta.abs() >= precip_delta.abs() / 20.0 {
            if temp_delta > 0.0 && precip_delta < -20.0 {
                return Self::Mixed;
            }
            if temp_delta > 3.0 {
                return Self::Warm;
            }
            if temp_delta < -3.0 {
                return Self::Cold;
            }
        }
        if precip_delta > 40.0 {
            Self::Wet
        } else if precip_delta < -40.0 {
            Self::Dry
        } else if temp_delta > 0.0 {
            Self::Warm
        } else {
            Self::Cold
        }
    }
}

/// Anomaly for one monitored zone over the sampled period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClimateAnomaly {
    pub zone: String,
    pub lat: f64,
    pub lon: f64,
    pub temp_delta: f64,
    pub precip_delta: f64,
    pub severity: AnomalySeverity,
    #[serde(rename = "type")]
    pub anomaly_type: AnomalyType,
    pub period: String,
}

impl ClimateAnomaly {
    /// Build from daily series (nulls allowed). Needs at least
    /// `MIN_SAMPLES` temperature entries, counting nulls.
    pub fn from_daily_series(
        zone: &MonitoredZone,
        temps: &[Option<f64>],
        precips: &[Option<f64>],
        period: String,
    ) -> Option<Self> {
        if temps.len() < MIN_SAMPLES {
            return None;
        }

        let temp_delta = recent_delta(temps);
        let precip_delta = recent_delta(precips);

        Some(Self {
            zone: zone.name.to_string(),
            lat: zone.lat,
            lon: zone.lon,
            temp_delta: round1(temp_delta),
            precip_delta: round1(precip_delta),
            severity: AnomalySeverity::classify(temp_delta, precip_delta),
            anomaly_type: AnomalyType::classify(temp_delta, precip_delta),
            period,
        })
    }
}

pub const MIN_SAMPLES: usize = 14;
const RECENT_DAYS: usize = 7;

/// Mean of the last 7 valid samples minus the mean of the ones before.
fn recent_delta(series: &[Option<f64>]) -> f64 {
    let valid: Vec<f64> = series.iter().flatten().copied().collect();
    let split = valid.len().saturating_sub(RECENT_DAYS);
    mean(&valid[split..]) - mean(&valid[..split])
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[derive(Debug, Clone, Copy)]
pub struct MonitoredZone {
    pub name: &'static str,
    pub lat: f64,
    pub lon: f64,
}

const fn zone(name: &'static str, lat: f64, lon: f64) -> MonitoredZone {
    MonitoredZone { name, lat, lon }
}

pub const MONITORED_ZONES: [MonitoredZone; 15] = [
    zone("Ukraine", 48.4, 31.2),
    zone("Middle East", 33.0, 44.0),
    zone("Sahel", 14.0, 0.0),
    zone("Horn of Africa", 8.0, 42.0),
    zone("South Asia", 25.0, 78.0),
    zone("California", 36.8, -119.4),
    zone("Amazon", -3.4, -60.0),
    zone("Australia", -25.0, 134.0),
    zone("Mediterranean", 38.0, 20.0),
    zone("Taiwan Strait", 24.0, 120.0),
    zone("Myanmar", 19.8, 96.7),
    zone("Central Africa", 4.0, 22.0),
    zone("Southern Africa", -25.0, 28.0),
    zone("Central Asia", 42.0, 65.0),
    zone("Caribbean", 19.0, -72.0),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_thresholds() {
        assert_eq!(AnomalySeverity::classify(5.0, 0.0), AnomalySeverity::Extreme);
        assert_eq!(AnomalySeverity::classify(0.0, -80.0), AnomalySeverity::Extreme);
        assert_eq!(AnomalySeverity::classify(-3.0, 0.0), AnomalySeverity::Moderate);
        assert_eq!(AnomalySeverity::classify(0.0, 40.0), AnomalySeverity::Moderate);
        assert_eq!(AnomalySeverity::classify(2.9, 39.9), AnomalySeverity::Normal);
    }

    #[test]
    fn test_type_classification() {
        assert_eq!(AnomalyType::classify(4.0, -30.0), AnomalyType::Mixed);
        assert_eq!(AnomalyType::classify(4.0, 0.0), AnomalyType::Warm);
        assert_eq!(AnomalyType::classify(-4.0, 0.0), AnomalyType::Cold);
        assert_eq!(AnomalyType::classify(0.5, 60.0), AnomalyType::Wet);
        assert_eq!(AnomalyType::classify(0.5, -60.0), AnomalyType::Dry);
        assert_eq!(AnomalyType::classify(0.5, 5.0), AnomalyType::Warm);
        assert_eq!(AnomalyType::classify(-0.5, 5.0), AnomalyType::Cold);
    }

    #[test]
    fn test_from_daily_series() {
        let mut temps = vec![Some(10.0); 23];
        temps.extend(vec![Some(16.0); 7]);
        let precips = vec![Some(1.0); 30];

        let anomaly =
            ClimateAnomaly::from_daily_series(&MONITORED_ZONES[0], &temps, &precips, "p".into())
                .unwrap();
        assert_eq!(anomaly.zone, "Ukraine");
        assert_eq!(anomaly.temp_delta, 6.0);
        assert_eq!(anomaly.precip_delta, 0.0);
        assert_eq!(anomaly.severity, AnomalySeverity::Extreme);
        assert_eq!(anomaly.anomaly_type, AnomalyType::Warm);
    }

    #[test]
    fn test_nulls_are_skipped_and_short_series_rejected() {
        let mut temps = vec![None; 10];
        temps.extend(vec![Some(10.0); 4]);
        let anomaly =
            ClimateAnomaly::from_daily_series(&MONITORED_ZONES[1], &temps, &[], "p".into()).unwrap();
        assert_eq!(anomaly.temp_delta, 10.0);

        assert!(ClimateAnomaly::from_daily_series(
            &MONITORED_ZONES[1],
            &vec![Some(1.0); 13],
            &[],
            "p".into()
        )
        .is_none());
    }

    #[test]
    fn test_wire_names() {
        let anomaly = ClimateAnomaly {
            zone: "Sahel".into(),
            lat: 14.0,
            lon: 0.0,
            temp_delta: 1.2,
            precip_delta: -3.4,
            severity: AnomalySeverity::Normal,
            anomaly_type: AnomalyType::Warm,
            period: "2024-04-01 to 2024-05-01".into(),
        };
        let value = serde_json::to_value(&anomaly).unwrap();
        assert_eq!(value["tempDelta"], 1.2);
        assert_eq!(value["type"], "warm");
        assert_eq!(value["severity"], "normal");
    }
}
