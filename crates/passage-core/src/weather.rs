//! Severe-weather pattern classification over marine observation series,
//! weather-window search, and departure-delay recommendations.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{GeographicBounds, MarineObservation, Waypoint};
use crate::spatial;

/// Wind, wave, and pressure thresholds used by the classifiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherThresholds {
    pub gale_wind_speed_kt: f64,
    pub storm_wind_speed_kt: f64,
    pub hurricane_wind_speed_kt: f64,
    pub small_craft_wind_speed_kt: f64,
    pub small_craft_wave_height_ft: f64,
    pub dangerous_wave_height_ft: f64,
    pub low_visibility_nm: f64,
    /// Pressure fall, in mb per 3 hours, that signals rapid deepening.
    pub rapid_pressure_drop_mb: f64,
}

impl Default for WeatherThresholds {
    fn default() -> Self {
        Self {
            gale_wind_speed_kt: 34.0,
            storm_wind_speed_kt: 48.0,
            hurricane_wind_speed_kt: 64.0,
            small_craft_wind_speed_kt: 20.0,
            small_craft_wave_height_ft: 6.0,
            dangerous_wave_height_ft: 12.0,
            low_visibility_nm: 1.0,
            rapid_pressure_drop_mb: 6.0,
        }
    }
}

/// Category of a detected severe pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    TropicalCyclone,
    GaleSeries,
    RapidPressureDrop,
    ColdFront,
    StormSystem,
}

impl PatternType {
    pub fn label(&self) -> &'static str {
        match self {
            PatternType::TropicalCyclone => "tropical cyclone",
            PatternType::GaleSeries => "gale series",
            PatternType::RapidPressureDrop => "rapid pressure drop",
            PatternType::ColdFront => "cold front",
            PatternType::StormSystem => "storm system",
        }
    }
}

/// What the vessel should do about a detected pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    ShelterImmediately,
    DelayDeparture,
    MonitorClosely,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictedImpact {
    pub timing: String,
    pub wind_speed_kt: f64,
    pub wave_height_ft: f64,
    pub recommended_action: RecommendedAction,
}

/// One severe pattern detected in an observation series. At most one is
/// reported per analysis; detectors run in a fixed priority order and the
/// first match wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SevereWeatherPattern {
    pub pattern_type: PatternType,
    pub intensity: String,
    pub affected_area: GeographicBounds,
    pub movement_speed_kt: f64,
    /// Direction of travel in degrees true, [0, 360).
    pub movement_direction_deg: f64,
    pub predicted_impact: PredictedImpact,
    #[serde(default)]
    pub forecast_track: Option<Vec<Waypoint>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowConfidence {
    High,
    Partial,
    None,
}

/// Result of a weather-window search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherWindow {
    pub exists: bool,
    pub start: Option<DateTime<Utc>>,
    /// Length of the best qualifying run, counted in data points (one
    /// observation per hour assumed).
    pub duration_hours: usize,
    pub confidence: WindowConfidence,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelayRecommendation {
    pub should_delay: bool,
    pub delay_hours: i64,
    pub reason: String,
    #[serde(default)]
    pub alternative_departure: Option<DateTime<Utc>>,
}

/// Default wind ceiling for a usable weather window, knots.
pub const DEFAULT_WINDOW_MAX_WIND_KT: f64 = 25.0;
/// Default wave ceiling for a usable weather window, feet.
pub const DEFAULT_WINDOW_MAX_WAVE_FT: f64 = 6.0;

/// Classifies observation series into severe patterns.
#[derive(Debug, Clone, Default)]
pub struct WeatherPatternDetector {
    thresholds: WeatherThresholds,
}

impl WeatherPatternDetector {
    pub fn new(thresholds: WeatherThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &WeatherThresholds {
        &self.thresholds
    }

    /// Classify a series into at most one severe pattern.
    ///
    /// Priority order: tropical cyclone, gale series, rapid pressure drop,
    /// cold front. Returns `None` for an empty series or when nothing
    /// qualifies.
    pub fn analyze_pattern(&self, series: &[MarineObservation]) -> Option<SevereWeatherPattern> {
        if series.is_empty() {
            return None;
        }

        self.detect_tropical_cyclone(series)
            .or_else(|| self.detect_gale_series(series))
            .or_else(|| self.detect_rapid_pressure_drop(series))
            .or_else(|| self.detect_cold_front(series))
    }

    fn detect_tropical_cyclone(
        &self,
        series: &[MarineObservation],
    ) -> Option<SevereWeatherPattern> {
        let qualifying: Vec<&MarineObservation> = series
            .iter()
            .filter(|obs| obs.wind_speed_kt >= self.thresholds.hurricane_wind_speed_kt)
            .collect();
        if qualifying.is_empty() {
            return None;
        }

        let max_wind = max_wind(&qualifying);
        let max_wave = max_wave(&qualifying);
        let track: Vec<Waypoint> = qualifying.iter().map(|obs| obs.location).collect();
        let (speed, direction) = movement(&qualifying);

        tracing::warn!(
            max_wind_kt = max_wind,
            points = qualifying.len(),
            "tropical cyclone signature in observation series"
        );

        Some(SevereWeatherPattern {
            pattern_type: PatternType::TropicalCyclone,
            intensity: classify_cyclone_intensity(max_wind).to_string(),
            affected_area: bounding_box(&qualifying),
            movement_speed_kt: speed,
            movement_direction_deg: direction,
            predicted_impact: PredictedImpact {
                timing: "Within 12-24 hours".to_string(),
                wind_speed_kt: max_wind,
                wave_height_ft: max_wave,
                recommended_action: RecommendedAction::ShelterImmediately,
            },
            forecast_track: Some(track),
        })
    }

    fn detect_gale_series(&self, series: &[MarineObservation]) -> Option<SevereWeatherPattern> {
        let qualifying: Vec<&MarineObservation> = series
            .iter()
            .filter(|obs| obs.wind_speed_kt >= self.thresholds.gale_wind_speed_kt)
            .collect();
        // Any three qualifying points in the series trigger; they need not
        // be consecutive.
        if qualifying.len() < 3 {
            return None;
        }

        let max_wind = max_wind(&qualifying);
        let (speed, direction) = movement(&qualifying);
        let action = if qualifying.len() > 6 {
            RecommendedAction::ShelterImmediately
        } else {
            RecommendedAction::DelayDeparture
        };

        Some(SevereWeatherPattern {
            pattern_type: PatternType::GaleSeries,
            intensity: format!("Sustained gale to {:.0} kt", max_wind),
            affected_area: bounding_box(&qualifying),
            movement_speed_kt: speed,
            movement_direction_deg: direction,
            predicted_impact: PredictedImpact {
                timing: "Within 6-12 hours".to_string(),
                wind_speed_kt: max_wind,
                wave_height_ft: max_wave(&qualifying),
                recommended_action: action,
            },
            forecast_track: None,
        })
    }

    fn detect_rapid_pressure_drop(
        &self,
        series: &[MarineObservation],
    ) -> Option<SevereWeatherPattern> {
        for pair in series.windows(2) {
            let (Some(p1), Some(p2)) = (pair[0].pressure_mb, pair[1].pressure_mb) else {
                continue;
            };
            let hours = (pair[1].timestamp - pair[0].timestamp).num_seconds() as f64 / 3600.0;
            if !(2.0..=4.0).contains(&hours) {
                continue;
            }
            let drop = p1 - p2;
            let rate_per_3h = drop / hours * 3.0;
            if rate_per_3h < self.thresholds.rapid_pressure_drop_mb {
                continue;
            }

            let points = [&pair[0], &pair[1]];
            let (speed, direction) = movement(&points);
            return Some(SevereWeatherPattern {
                pattern_type: PatternType::RapidPressureDrop,
                intensity: format!("{:.1} mb / 3 hr pressure fall", rate_per_3h),
                affected_area: bounding_box(&points),
                movement_speed_kt: speed,
                movement_direction_deg: direction,
                predicted_impact: PredictedImpact {
                    timing: "Within 3-6 hours".to_string(),
                    wind_speed_kt: max_wind(&points),
                    wave_height_ft: max_wave(&points),
                    recommended_action: RecommendedAction::DelayDeparture,
                },
                forecast_track: None,
            });
        }
        None
    }

    fn detect_cold_front(&self, series: &[MarineObservation]) -> Option<SevereWeatherPattern> {
        let qualifying: Vec<&MarineObservation> = series
            .iter()
            .filter(|obs| obs.wind_speed_kt > self.thresholds.small_craft_wind_speed_kt)
            .collect();
        if qualifying.len() <= 2 {
            return None;
        }

        let max_wind = max_wind(&qualifying);
        let (speed, _) = movement(&qualifying);

        Some(SevereWeatherPattern {
            pattern_type: PatternType::ColdFront,
            intensity: format!("Winds to {:.0} kt behind the front", max_wind),
            affected_area: bounding_box(&qualifying),
            movement_speed_kt: speed,
            // Mid-latitude fronts travel west to east
            movement_direction_deg: 270.0,
            predicted_impact: PredictedImpact {
                timing: "Within 12-18 hours".to_string(),
                wind_speed_kt: max_wind,
                wave_height_ft: max_wave(&qualifying),
                recommended_action: RecommendedAction::MonitorClosely,
            },
            forecast_track: None,
        })
    }

    /// Search for a run of benign conditions long enough for a passage,
    /// using the default wind/wave ceilings.
    pub fn check_weather_window(
        &self,
        series: &[MarineObservation],
        duration_hours: usize,
    ) -> WeatherWindow {
        self.check_weather_window_with_limits(
            series,
            duration_hours,
            DEFAULT_WINDOW_MAX_WIND_KT,
            DEFAULT_WINDOW_MAX_WAVE_FT,
        )
    }

    /// Search for a run of benign conditions long enough for a passage.
    ///
    /// Each data point counts as one hour of window; a run breaks on the
    /// first observation exceeding either ceiling. Point count, not
    /// timestamp arithmetic, is the duration measure the callers are
    /// calibrated against.
    pub fn check_weather_window_with_limits(
        &self,
        series: &[MarineObservation],
        duration_hours: usize,
        max_wind_kt: f64,
        max_wave_ft: f64,
    ) -> WeatherWindow {
        let mut run_len = 0usize;
        let mut run_start: Option<DateTime<Utc>> = None;
        let mut best_len = 0usize;

        for obs in series {
            if obs.wind_speed_kt <= max_wind_kt && obs.wave_height_ft <= max_wave_ft {
                if run_len == 0 {
                    run_start = Some(obs.timestamp);
                }
                run_len += 1;
                best_len = best_len.max(run_len);
                if duration_hours > 0 && run_len >= duration_hours {
                    return WeatherWindow {
                        exists: true,
                        start: run_start,
                        duration_hours: run_len,
                        confidence: WindowConfidence::High,
                    };
                }
            } else {
                run_len = 0;
                run_start = None;
            }
        }

        WeatherWindow {
            exists: false,
            start: None,
            duration_hours: best_len,
            confidence: if best_len > 0 {
                WindowConfidence::Partial
            } else {
                WindowConfidence::None
            },
        }
    }

    /// Decide whether departure should be delayed and by how long.
    pub fn recommend_delay(
        &self,
        series: &[MarineObservation],
        planned_duration_hours: usize,
    ) -> DelayRecommendation {
        if let Some(pattern) = self.analyze_pattern(series) {
            let delay_hours = match pattern.pattern_type {
                PatternType::TropicalCyclone => 72,
                PatternType::GaleSeries => 48,
                PatternType::RapidPressureDrop => 24,
                PatternType::ColdFront => 12,
                PatternType::StormSystem => 36,
            };
            return DelayRecommendation {
                should_delay: true,
                delay_hours,
                reason: format!(
                    "{} detected: {}",
                    pattern.pattern_type.label(),
                    pattern.intensity
                ),
                alternative_departure: Some(Utc::now() + Duration::hours(delay_hours)),
            };
        }

        let window = self.check_weather_window(series, planned_duration_hours);
        if !window.exists {
            return DelayRecommendation {
                should_delay: true,
                delay_hours: 24,
                reason: format!(
                    "No {planned_duration_hours} hour weather window in the forecast; \
                     check the updated forecast in 24 hours"
                ),
                alternative_departure: Some(Utc::now() + Duration::hours(24)),
            };
        }

        DelayRecommendation {
            should_delay: false,
            delay_hours: 0,
            reason: "Conditions support departure as planned".to_string(),
            alternative_departure: None,
        }
    }
}

fn max_wind(points: &[&MarineObservation]) -> f64 {
    points.iter().fold(0.0, |acc, obs| acc.max(obs.wind_speed_kt))
}

fn max_wave(points: &[&MarineObservation]) -> f64 {
    points.iter().fold(0.0, |acc, obs| acc.max(obs.wave_height_ft))
}

fn bounding_box(points: &[&MarineObservation]) -> GeographicBounds {
    let mut north = f64::NEG_INFINITY;
    let mut south = f64::INFINITY;
    let mut east = f64::NEG_INFINITY;
    let mut west = f64::INFINITY;
    for obs in points {
        north = north.max(obs.location.latitude);
        south = south.min(obs.location.latitude);
        east = east.max(obs.location.longitude);
        west = west.min(obs.location.longitude);
    }
    GeographicBounds { north, south, east, west }
}

/// Mean distance between consecutive points (kt, assuming hourly
/// observations) and bearing from the first point to the last.
fn movement(points: &[&MarineObservation]) -> (f64, f64) {
    if points.len() < 2 {
        return (0.0, 0.0);
    }
    let total: f64 = points
        .windows(2)
        .map(|pair| spatial::haversine_distance_nm(&pair[0].location, &pair[1].location))
        .sum();
    let speed = total / (points.len() - 1) as f64;
    let direction = spatial::bearing_deg(
        &points[0].location,
        &points[points.len() - 1].location,
    );
    (speed, direction)
}

fn classify_cyclone_intensity(max_wind_kt: f64) -> &'static str {
    if max_wind_kt >= 137.0 {
        "Category 5 Hurricane"
    } else if max_wind_kt >= 113.0 {
        "Category 4 Hurricane"
    } else if max_wind_kt >= 96.0 {
        "Category 3 Hurricane"
    } else if max_wind_kt >= 83.0 {
        "Category 2 Hurricane"
    } else if max_wind_kt >= 64.0 {
        "Category 1 Hurricane"
    } else if max_wind_kt >= 39.0 {
        "Tropical Storm"
    } else if max_wind_kt >= 34.0 {
        "Tropical Depression"
    } else {
        "Developing System"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn obs(hour: u32, wind: f64, wave: f64, pressure: Option<f64>) -> MarineObservation {
        MarineObservation {
            timestamp: Utc.with_ymd_and_hms(2025, 6, 1, hour, 0, 0).unwrap(),
            location: Waypoint::new(38.0 + hour as f64 * 0.1, -72.0 + hour as f64 * 0.1),
            wind_speed_kt: wind,
            wave_height_ft: wave,
            pressure_mb: pressure,
            visibility_nm: Some(10.0),
        }
    }

    fn detector() -> WeatherPatternDetector {
        WeatherPatternDetector::default()
    }

    #[test]
    fn empty_series_yields_no_pattern() {
        assert!(detector().analyze_pattern(&[]).is_none());
    }

    #[test]
    fn cyclone_outranks_gale_series() {
        // Every point qualifies for both detectors; priority must pick the
        // cyclone.
        let series: Vec<_> = (0..5).map(|h| obs(h, 70.0, 18.0, None)).collect();
        let pattern = detector().analyze_pattern(&series).unwrap();
        assert_eq!(pattern.pattern_type, PatternType::TropicalCyclone);
        assert_eq!(pattern.intensity, "Category 1 Hurricane");
        assert_eq!(
            pattern.predicted_impact.recommended_action,
            RecommendedAction::ShelterImmediately
        );
        assert_eq!(pattern.forecast_track.as_ref().unwrap().len(), 5);
    }

    #[test]
    fn cyclone_intensity_bands() {
        assert_eq!(classify_cyclone_intensity(140.0), "Category 5 Hurricane");
        assert_eq!(classify_cyclone_intensity(120.0), "Category 4 Hurricane");
        assert_eq!(classify_cyclone_intensity(100.0), "Category 3 Hurricane");
        assert_eq!(classify_cyclone_intensity(85.0), "Category 2 Hurricane");
        assert_eq!(classify_cyclone_intensity(64.0), "Category 1 Hurricane");
        assert_eq!(classify_cyclone_intensity(50.0), "Tropical Storm");
        assert_eq!(classify_cyclone_intensity(35.0), "Tropical Depression");
        assert_eq!(classify_cyclone_intensity(20.0), "Developing System");
    }

    #[test]
    fn cyclone_movement_derived_from_qualifying_points() {
        let series: Vec<_> = (0..3).map(|h| obs(h, 80.0, 20.0, None)).collect();
        let pattern = detector().analyze_pattern(&series).unwrap();
        // Track heads northeast at ~0.1 deg per hour in both axes
        assert!(pattern.movement_speed_kt > 0.0);
        assert!(pattern.movement_direction_deg > 0.0 && pattern.movement_direction_deg < 90.0);
        assert!(pattern.affected_area.north > pattern.affected_area.south);
    }

    #[test]
    fn three_scattered_gale_points_trigger_a_gale_series() {
        // Qualifying points are not consecutive; any three in the series
        // count.
        let series = vec![
            obs(0, 36.0, 10.0, None),
            obs(1, 15.0, 4.0, None),
            obs(2, 40.0, 12.0, None),
            obs(3, 12.0, 3.0, None),
            obs(4, 35.0, 9.0, None),
        ];
        let pattern = detector().analyze_pattern(&series).unwrap();
        assert_eq!(pattern.pattern_type, PatternType::GaleSeries);
        assert_eq!(
            pattern.predicted_impact.recommended_action,
            RecommendedAction::DelayDeparture
        );
        assert_eq!(pattern.intensity, "Sustained gale to 40 kt");
    }

    #[test]
    fn long_gale_series_escalates_to_shelter() {
        let series: Vec<_> = (0..7).map(|h| obs(h, 38.0, 11.0, None)).collect();
        let pattern = detector().analyze_pattern(&series).unwrap();
        assert_eq!(pattern.pattern_type, PatternType::GaleSeries);
        assert_eq!(
            pattern.predicted_impact.recommended_action,
            RecommendedAction::ShelterImmediately
        );
    }

    #[test]
    fn rapid_pressure_drop_detected_within_time_bracket() {
        // 8 mb over 3 hours extrapolates to 8 mb / 3 hr, above the 6 mb
        // threshold. Winds stay below every wind-based detector.
        let series = vec![
            obs(0, 15.0, 4.0, Some(1008.0)),
            obs(3, 18.0, 5.0, Some(1000.0)),
        ];
        let pattern = detector().analyze_pattern(&series).unwrap();
        assert_eq!(pattern.pattern_type, PatternType::RapidPressureDrop);
        assert_eq!(
            pattern.predicted_impact.recommended_action,
            RecommendedAction::DelayDeparture
        );
    }

    #[test]
    fn pressure_drop_outside_time_bracket_is_ignored() {
        // Same fall spread over 6 hours: adjacent delta is outside [2, 4] h
        let series = vec![
            obs(0, 15.0, 4.0, Some(1008.0)),
            obs(6, 15.0, 4.0, Some(1000.0)),
        ];
        assert!(detector().analyze_pattern(&series).is_none());
    }

    #[test]
    fn slow_pressure_fall_is_ignored() {
        // 3 mb over 3 hours extrapolates below the threshold
        let series = vec![
            obs(0, 15.0, 4.0, Some(1008.0)),
            obs(3, 15.0, 4.0, Some(1005.0)),
        ];
        assert!(detector().analyze_pattern(&series).is_none());
    }

    #[test]
    fn cold_front_from_small_craft_winds() {
        let series = vec![
            obs(0, 22.0, 5.0, None),
            obs(1, 24.0, 6.0, None),
            obs(2, 26.0, 7.0, None),
        ];
        let pattern = detector().analyze_pattern(&series).unwrap();
        assert_eq!(pattern.pattern_type, PatternType::ColdFront);
        assert_eq!(pattern.movement_direction_deg, 270.0);
        assert_eq!(
            pattern.predicted_impact.recommended_action,
            RecommendedAction::MonitorClosely
        );
    }

    #[test]
    fn calm_series_has_no_pattern() {
        let series: Vec<_> = (0..5).map(|h| obs(h, 10.0, 2.0, Some(1015.0))).collect();
        assert!(detector().analyze_pattern(&series).is_none());
    }

    #[test]
    fn window_broken_by_one_bad_point_does_not_exist() {
        // Three points with the middle one over the wind ceiling: no run
        // reaches the requested six hours.
        let series = vec![
            obs(0, 12.0, 3.0, None),
            obs(1, 30.0, 4.0, None),
            obs(2, 14.0, 3.0, None),
        ];
        let window = detector().check_weather_window(&series, 6);
        assert!(!window.exists);
        assert_eq!(window.duration_hours, 1);
        assert_eq!(window.confidence, WindowConfidence::Partial);
    }

    #[test]
    fn window_counts_points_not_elapsed_time() {
        // Six qualifying points satisfy a six-hour requirement regardless
        // of their actual timestamps.
        let series: Vec<_> = (0..6).map(|h| obs(h * 2, 12.0, 3.0, None)).collect();
        let window = detector().check_weather_window(&series, 6);
        assert!(window.exists);
        assert_eq!(window.confidence, WindowConfidence::High);
        assert_eq!(window.start, Some(series[0].timestamp));
    }

    #[test]
    fn empty_series_window_has_no_confidence() {
        let window = detector().check_weather_window(&[], 4);
        assert!(!window.exists);
        assert_eq!(window.confidence, WindowConfidence::None);
    }

    #[test]
    fn delay_for_cyclone_is_72_hours() {
        let series: Vec<_> = (0..3).map(|h| obs(h, 75.0, 20.0, None)).collect();
        let rec = detector().recommend_delay(&series, 12);
        assert!(rec.should_delay);
        assert_eq!(rec.delay_hours, 72);
        assert!(rec.alternative_departure.is_some());
    }

    #[test]
    fn delay_when_no_window_found() {
        let series = vec![
            obs(0, 12.0, 3.0, None),
            obs(1, 30.0, 8.0, None),
            obs(2, 12.0, 3.0, None),
        ];
        let rec = detector().recommend_delay(&series, 6);
        assert!(rec.should_delay);
        assert_eq!(rec.delay_hours, 24);
    }

    #[test]
    fn no_delay_when_window_exists() {
        let series: Vec<_> = (0..8).map(|h| obs(h, 10.0, 2.0, None)).collect();
        let rec = detector().recommend_delay(&series, 6);
        assert!(!rec.should_delay);
        assert_eq!(rec.delay_hours, 0);
        assert!(rec.alternative_departure.is_none());
    }
}
