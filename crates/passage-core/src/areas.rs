//! In-memory catalog of restricted areas with point and route conflict
//! queries.
//!
//! The registry is seeded with a hardcoded default set and may be overlaid
//! from a backing store: store rows win by id, defaults not present in the
//! store are kept as fallback. The fetch itself lives at the service
//! boundary; the registry only exposes the staleness check and the merge so
//! the fail-open policy stays visible where the fetch result is handled.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, Utc};

use crate::models::{AreaSchedule, AreaType, GeographicBounds, RestrictedArea, Waypoint};
use crate::spatial;

/// Default seconds between backing-store refreshes.
pub const DEFAULT_REFRESH_SECS: i64 = 300;

/// Default number of interpolation intervals per route segment.
///
/// 20 intervals (21 sample points including both endpoints) is the
/// precision/performance trade-off the conflict checks are calibrated
/// against. Configurable via [`RestrictedAreaRegistry::new`].
pub const DEFAULT_ROUTE_SAMPLES: usize = 20;

/// Registry of geofenced areas, keyed by id.
#[derive(Debug, Clone)]
pub struct RestrictedAreaRegistry {
    areas: HashMap<String, RestrictedArea>,
    last_refresh: Option<DateTime<Utc>>,
    refresh_interval: Duration,
    route_samples: usize,
}

impl Default for RestrictedAreaRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_REFRESH_SECS, DEFAULT_ROUTE_SAMPLES)
    }
}

impl RestrictedAreaRegistry {
    pub fn new(refresh_secs: i64, route_samples: usize) -> Self {
        Self {
            areas: default_areas()
                .into_iter()
                .map(|area| (area.id.clone(), area))
                .collect(),
            last_refresh: None,
            refresh_interval: Duration::seconds(refresh_secs.max(0)),
            route_samples: route_samples.max(1),
        }
    }

    /// All active areas containing the given point.
    pub fn check_waypoint(&self, point: &Waypoint) -> Vec<RestrictedArea> {
        let mut hits: Vec<RestrictedArea> = self
            .areas
            .values()
            .filter(|area| area.active && area_contains(area, point))
            .cloned()
            .collect();
        hits.sort_by(|a, b| a.id.cmp(&b.id));
        hits
    }

    /// All active areas a route touches, keyed by area id.
    ///
    /// Checks every waypoint, then samples each consecutive segment at
    /// evenly spaced interpolation points so a route that merely passes
    /// through an area is still caught even when no waypoint sits inside it.
    pub fn check_route(&self, waypoints: &[Waypoint]) -> BTreeMap<String, RestrictedArea> {
        let mut conflicts = BTreeMap::new();

        for point in waypoints {
            for area in self.check_waypoint(point) {
                conflicts.insert(area.id.clone(), area);
            }
        }

        for pair in waypoints.windows(2) {
            let (start, end) = (&pair[0], &pair[1]);
            for i in 0..=self.route_samples {
                let t = i as f64 / self.route_samples as f64;
                let sample = Waypoint {
                    latitude: start.latitude + t * (end.latitude - start.latitude),
                    longitude: start.longitude + t * (end.longitude - start.longitude),
                };
                for area in self.check_waypoint(&sample) {
                    conflicts.insert(area.id.clone(), area);
                }
            }
        }

        conflicts
    }

    /// Insert or replace an area by id.
    pub fn add_restricted_area(&mut self, area: RestrictedArea) {
        self.areas.insert(area.id.clone(), area);
    }

    /// Remove an area; true if something was removed.
    pub fn remove_restricted_area(&mut self, id: &str) -> bool {
        self.areas.remove(id).is_some()
    }

    pub fn get_area(&self, id: &str) -> Option<RestrictedArea> {
        self.areas.get(id).cloned()
    }

    /// Snapshot of all active areas, sorted by id.
    pub fn get_active_areas(&self) -> Vec<RestrictedArea> {
        let mut areas: Vec<RestrictedArea> = self
            .areas
            .values()
            .filter(|area| area.active)
            .cloned()
            .collect();
        areas.sort_by(|a, b| a.id.cmp(&b.id));
        areas
    }

    /// Snapshot of all areas of the given type, sorted by id.
    pub fn get_areas_by_type(&self, area_type: AreaType) -> Vec<RestrictedArea> {
        let mut areas: Vec<RestrictedArea> = self
            .areas
            .values()
            .filter(|area| area.area_type == area_type)
            .cloned()
            .collect();
        areas.sort_by(|a, b| a.id.cmp(&b.id));
        areas
    }

    /// Distance from a point to the nearest edge of an area, in nautical
    /// miles. Zero when the point is inside. An area with no geometry can
    /// never be reached, so the distance is infinite.
    pub fn calculate_distance_to_area(&self, point: &Waypoint, area: &RestrictedArea) -> f64 {
        if let Some(bounds) = &area.bounds {
            if spatial::point_in_bounds(point, bounds) {
                return 0.0;
            }
            // Flat-Earth edge distances: 60 nm per degree of latitude,
            // scaled by cos(lat) for longitude.
            let lat_deg = (point.latitude - bounds.north)
                .abs()
                .min((point.latitude - bounds.south).abs());
            let lon_deg = (point.longitude - bounds.east)
                .abs()
                .min((point.longitude - bounds.west).abs());
            let lat_nm = lat_deg * 60.0;
            let lon_nm = lon_deg * 60.0 * point.latitude.to_radians().cos();
            return lat_nm.min(lon_nm);
        }

        if let Some(polygon) = &area.polygon {
            if spatial::point_in_polygon(point, polygon) {
                return 0.0;
            }
            return match polygon.len() {
                0 => f64::INFINITY,
                1 => spatial::haversine_distance_nm(point, &polygon[0]),
                n => {
                    let mut min_dist = f64::INFINITY;
                    let mut j = n - 1;
                    for i in 0..n {
                        let dist =
                            spatial::distance_to_segment_nm(point, &polygon[j], &polygon[i]);
                        min_dist = min_dist.min(dist);
                        j = i;
                    }
                    min_dist
                }
            };
        }

        f64::INFINITY
    }

    /// Whether the backing store should be consulted again.
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        match self.last_refresh {
            Some(at) => now - at > self.refresh_interval,
            None => true,
        }
    }

    /// Overlay store-provided areas onto the hardcoded defaults.
    ///
    /// Store rows take precedence by id; defaults absent from the store are
    /// kept as fallback. Runtime-added areas present in neither are dropped,
    /// matching last-write-wins catalog semantics. Callers must only invoke
    /// this on a successful fetch; on failure the previous in-memory state
    /// stays untouched.
    pub fn merge_store_areas(&mut self, fetched: Vec<RestrictedArea>, now: DateTime<Utc>) {
        let mut merged: HashMap<String, RestrictedArea> = default_areas()
            .into_iter()
            .map(|area| (area.id.clone(), area))
            .collect();
        let fetched_count = fetched.len();
        for area in fetched {
            merged.insert(area.id.clone(), area);
        }
        self.areas = merged;
        self.last_refresh = Some(now);
        tracing::info!(
            store_areas = fetched_count,
            total = self.areas.len(),
            "restricted area catalog refreshed from store"
        );
    }
}

fn area_contains(area: &RestrictedArea, point: &Waypoint) -> bool {
    if let Some(bounds) = &area.bounds {
        return spatial::point_in_bounds(point, bounds);
    }
    if let Some(polygon) = &area.polygon {
        return spatial::point_in_polygon(point, polygon);
    }
    false
}

fn effective_date(secs: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(secs, 0).unwrap_or_default()
}

/// The hardcoded default catalog, always available even with no backing
/// store configured.
pub fn default_areas() -> Vec<RestrictedArea> {
    vec![
        RestrictedArea {
            id: "mil-narragansett-oparea".to_string(),
            name: "Narragansett Bay Naval Operating Area".to_string(),
            area_type: AreaType::Military,
            bounds: Some(GeographicBounds {
                north: 41.40,
                south: 41.00,
                east: -71.10,
                west: -71.60,
            }),
            polygon: None,
            description: "Live-fire and torpedo exercise area south of Narragansett Bay"
                .to_string(),
            restrictions: vec![
                "No entry during scheduled exercises".to_string(),
                "Monitor VHF channel 16 for activation broadcasts".to_string(),
            ],
            active: true,
            schedule: AreaSchedule {
                start: effective_date(1672531200), // 2023-01-01
                end: None,
                recurring: Some("Activations announced via Local Notice to Mariners".to_string()),
            },
            authority: "U.S. Navy / USCG District 1".to_string(),
            penalty: Some("Vessel seizure and fines up to $250,000".to_string()),
        },
        RestrictedArea {
            id: "nms-stellwagen-bank".to_string(),
            name: "Stellwagen Bank National Marine Sanctuary".to_string(),
            area_type: AreaType::MarineSanctuary,
            bounds: Some(GeographicBounds {
                north: 42.75,
                south: 42.08,
                east: -70.02,
                west: -70.60,
            }),
            polygon: None,
            description: "Protected feeding ground for humpback and right whales at the \
                          mouth of Massachusetts Bay"
                .to_string(),
            restrictions: vec![
                "No discharge of any material".to_string(),
                "10 knot speed limit in whale advisory zones".to_string(),
                "No alteration of the seabed".to_string(),
            ],
            active: true,
            schedule: AreaSchedule {
                start: effective_date(1672531200),
                end: None,
                recurring: None,
            },
            authority: "NOAA Office of National Marine Sanctuaries".to_string(),
            penalty: Some("Civil penalties up to $100,000 per violation per day".to_string()),
        },
        RestrictedArea {
            id: "tss-boston-approach".to_string(),
            name: "Boston Harbor Traffic Separation Scheme".to_string(),
            area_type: AreaType::ShippingLane,
            bounds: None,
            polygon: Some(vec![
                Waypoint::new(42.20, -70.90),
                Waypoint::new(42.20, -70.55),
                Waypoint::new(42.35, -70.55),
                Waypoint::new(42.35, -70.90),
            ]),
            description: "Inbound/outbound deep-draft traffic lanes for the approaches to \
                          Boston Harbor"
                .to_string(),
            restrictions: vec![
                "Crossing vessels must cross at right angles to the lane axis".to_string(),
                "Vessels under 20 m must not impede vessels restricted to the lane".to_string(),
            ],
            active: true,
            schedule: AreaSchedule {
                start: effective_date(1672531200),
                end: None,
                recurring: None,
            },
            authority: "USCG / IMO".to_string(),
            penalty: None,
        },
        RestrictedArea {
            id: "sma-cape-cod-bay".to_string(),
            name: "Cape Cod Bay Right Whale Seasonal Management Area".to_string(),
            area_type: AreaType::SpeedRestricted,
            bounds: Some(GeographicBounds {
                north: 42.05,
                south: 41.75,
                east: -70.45,
                west: -70.70,
            }),
            polygon: None,
            description: "Seasonal speed restriction protecting North Atlantic right whales"
                .to_string(),
            restrictions: vec![
                "Vessels 65 ft and over restricted to 10 knots".to_string(),
            ],
            active: true,
            schedule: AreaSchedule {
                start: effective_date(1672531200),
                end: None,
                recurring: Some("Seasonal: January 1 - May 15".to_string()),
            },
            authority: "NOAA Fisheries".to_string(),
            penalty: None,
        },
    ]
}
