//! # Geowatch Geo
//!
//! Records and algorithms shared by the data proxy and the dashboard SDK:
//!
//! - **Wire records** - conflict events, displacement, climate anomalies,
//!   population exposure
//! - **Spatial helpers** - haversine distance, nearest-centroid lookup
//! - **Deduplication** - drop conflict events already reported by a second
//!   source (same place, same week, similar casualties)
//! - **Correlation** - per-country conflict impact scoring
//!
//! ## Example
//! ```rust,ignore
//! use geowatch_geo::{Deduplicator, DedupConfig};
//!
//! let dedup = Deduplicator::new(DedupConfig::default());
//! let unique = dedup.deduplicate(&ucdp_events, &acled_events);
//! ```

pub mod climate;
pub mod dates;
pub mod dedup;
pub mod displacement;
pub mod distance;
pub mod event;
pub mod impact;
pub mod lenient;
pub mod population;

pub use climate::{AnomalySeverity, AnomalyType, ClimateAnomaly, MonitoredZone, MONITORED_ZONES};
pub use dates::parse_timestamp;
pub use dedup::{DedupConfig, Deduplicator};
pub use displacement::{
    aggregate_displacement, CountryDisplacement, DisplacementFlow, DisplacementSummary,
    GlobalDisplacementTotals, UnhcrRecord,
};
pub use distance::{haversine_km, EARTH_RADIUS_KM};
pub use event::{group_by_country, group_by_type, AcledEvent, GeoEvent, ViolenceType};
pub use impact::{correlate_conflict_impact, ConflictImpactLink};
pub use population::{
    estimate_exposure, format_population, priority_countries, radius_for_event_type,
    CountryPopulation, ExposureEstimate, PopulationExposure,
};
