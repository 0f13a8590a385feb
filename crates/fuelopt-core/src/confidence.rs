//! Confidence scoring for optimization results.

use crate::models::{Waypoint, WeatherReading};

const BASE_CONFIDENCE: f64 = 0.70;
const MAX_SAVINGS_CONFIDENCE: f64 = 0.95;
const MAX_CONFIDENCE: f64 = 0.99;
const WEATHER_QUALITY_WEIGHT: f64 = 0.1;
const DATA_COMPLETENESS_WEIGHT: f64 = 0.1;

/// Score how much a result can be trusted, in `[0, 0.99]`.
///
/// `weather_quality` and `data_completeness` are fractions; anything
/// outside `[0, 1]` (or NaN) is clamped first. Never fails.
pub fn confidence(savings_pct: f64, weather_quality: f64, data_completeness: f64) -> f64 {
    let savings_pct = if savings_pct.is_nan() { 0.0 } else { savings_pct };
    let savings_confidence = (BASE_CONFIDENCE + savings_pct / 100.0).min(MAX_SAVINGS_CONFIDENCE);
    let score = savings_confidence
        + unit(weather_quality) * WEATHER_QUALITY_WEIGHT
        + unit(data_completeness) * DATA_COMPLETENESS_WEIGHT;
    if score.is_nan() {
        return 0.0;
    }
    score.clamp(0.0, MAX_CONFIDENCE)
}

fn unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Fraction of observed readings whose values the wind model can use.
///
/// Placeholders for missing observations are not counted either way.
pub fn weather_quality(readings: &[WeatherReading]) -> f64 {
    let observed = readings.iter().filter(|r| !r.estimated).count();
    if observed == 0 {
        return 0.0;
    }
    readings.iter().filter(|r| r.is_usable()).count() as f64 / observed as f64
}

/// Fraction of waypoints that have a paired, observed reading.
pub fn data_completeness(waypoints: &[Waypoint], readings: &[WeatherReading]) -> f64 {
    if waypoints.is_empty() {
        return 0.0;
    }
    let observed = readings
        .iter()
        .take(waypoints.len())
        .filter(|r| !r.estimated)
        .count();
    observed as f64 / waypoints.len() as f64
}
