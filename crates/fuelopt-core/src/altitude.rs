//! Cruise altitude search over the fixed candidate levels.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::error::Result;
use crate::fuel::FuelEstimate;

/// Candidate cruise altitudes, lowest first (ft).
pub const ALTITUDE_CANDIDATES_FT: [u32; 5] = [32000, 34000, 36000, 38000, 40000];

/// Fuel differences below this are treated as ties (kg).
const FUEL_TIE_TOLERANCE_KG: f64 = 1e-9;

/// Result of evaluating every candidate altitude.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AltitudeChoice {
    pub requested: FuelEstimate,
    pub best: FuelEstimate,
    /// Every evaluation, requested altitude first.
    pub evaluations: Vec<FuelEstimate>,
}

impl AltitudeChoice {
    /// True when a candidate burns strictly less than the requested altitude.
    pub fn improves(&self) -> bool {
        self.best.altitude_ft != self.requested.altitude_ft
    }
}

/// Evaluate the requested altitude and every candidate, keeping the cheapest.
///
/// Candidates above `ceiling_ft` are still evaluated and reported but never
/// selected; the requested altitude is always eligible. Ties go to the
/// altitude closest to the requested one, then to the lower altitude. The
/// requested altitude wins any tie it takes part in, so the search never
/// returns more fuel than the requested altitude needs.
pub fn search_altitudes<F>(
    requested_ft: u32,
    ceiling_ft: u32,
    mut evaluate: F,
) -> Result<AltitudeChoice>
where
    F: FnMut(u32) -> Result<FuelEstimate>,
{
    let requested = evaluate(requested_ft)?;
    let mut evaluations = Vec::with_capacity(ALTITUDE_CANDIDATES_FT.len() + 1);
    evaluations.push(requested.clone());
    for altitude in ALTITUDE_CANDIDATES_FT {
        evaluations.push(evaluate(altitude)?);
    }

    let best = evaluations
        .iter()
        .filter(|e| e.altitude_ft == requested_ft || e.altitude_ft <= ceiling_ft)
        .min_by(|a, b| compare_candidates(a, b, requested_ft))
        .cloned()
        .unwrap_or_else(|| requested.clone());

    Ok(AltitudeChoice {
        requested,
        best,
        evaluations,
    })
}

fn compare_candidates(a: &FuelEstimate, b: &FuelEstimate, requested_ft: u32) -> Ordering {
    let diff = a.total_fuel_kg - b.total_fuel_kg;
    if diff.abs() > FUEL_TIE_TOLERANCE_KG {
        return a
            .total_fuel_kg
            .partial_cmp(&b.total_fuel_kg)
            .unwrap_or(Ordering::Equal);
    }
    let dist_a = a.altitude_ft.abs_diff(requested_ft);
    let dist_b = b.altitude_ft.abs_diff(requested_ft);
    dist_a
        .cmp(&dist_b)
        .then_with(|| a.altitude_ft.cmp(&b.altitude_ft))
}
