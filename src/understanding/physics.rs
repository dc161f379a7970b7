//! Physics-based post-calibration assessors (spec §4.2, SPEC_FULL.md §4.2)
//!
//! Grounded on `examples/original_source/.../assessment/disaster_assessment.py`.
//! Each assessor is a pure closed-form function; the understanding stage
//! dispatches on `disaster_type` and overwrites `affected_area_km2`,
//! `affected_population`, `disaster_level`, and the casualty estimate
//! surfaced via `additional_info.estimated_casualties`.

use crate::types::{CasualtyEstimate, DisasterLevel};

/// Radii (km) sampled when searching for the earthquake's affected-area
/// boundary (the smallest radius whose intensity drops below 6).
const EARTHQUAKE_SAMPLE_RADII_KM: [f64; 8] = [0.1, 5.0, 10.0, 20.0, 30.0, 50.0, 80.0, 100.0];

const EARTHQUAKE_INTENSITY_THRESHOLD: f64 = 6.0;
const EARTHQUAKE_ATTENUATION_K: f64 = 1.5;
const EARTHQUAKE_ATTENUATION_C: f64 = 0.003;
const DEFAULT_BUILDING_VULNERABILITY: f64 = 0.5;
const DEFAULT_EARTHQUAKE_POP_DENSITY: f64 = 1000.0;

/// Seismic intensity at distance `epicentral_km` using the attenuation
/// relation in SPEC_FULL.md §4.2, clamped to `[1, 12]`.
fn earthquake_intensity(magnitude: f64, epicentral_km: f64, depth_km: f64) -> f64 {
    let hypo_dist = (epicentral_km * epicentral_km + depth_km * depth_km).sqrt().max(0.1);
    let raw = 1.5 * magnitude - EARTHQUAKE_ATTENUATION_K * hypo_dist.log10()
        - EARTHQUAKE_ATTENUATION_C * hypo_dist
        + 3.0;
    raw.clamp(1.0, 12.0)
}

pub struct EarthquakeAssessment {
    pub affected_area_km2: f64,
    pub affected_population: f64,
    pub disaster_level: DisasterLevel,
    pub casualties: CasualtyEstimate,
}

/// Earthquake physics assessor (SPEC_FULL.md §4.2).
pub fn assess_earthquake(magnitude: f64, depth_km: f64, population_density: Option<f64>) -> EarthquakeAssessment {
    let density = population_density.unwrap_or(DEFAULT_EARTHQUAKE_POP_DENSITY);

    let radius_km = EARTHQUAKE_SAMPLE_RADII_KM
        .iter()
        .copied()
        .find(|&r| earthquake_intensity(magnitude, r, depth_km) < EARTHQUAKE_INTENSITY_THRESHOLD)
        .unwrap_or(*EARTHQUAKE_SAMPLE_RADII_KM.last().unwrap());

    let affected_area_km2 = std::f64::consts::PI * radius_km * radius_km;
    let affected_population = affected_area_km2 * density;

    let death_rate = 0.001
        * 10f64.powf(magnitude - 5.0)
        * (2.0 - depth_km / 20.0).max(0.5)
        * DEFAULT_BUILDING_VULNERABILITY;
    let deaths = affected_population * death_rate;
    let injuries = deaths * 3.0;
    let missing = (deaths * 0.2).floor();

    let disaster_level = if magnitude >= 7.0 || deaths >= 100.0 {
        DisasterLevel::I
    } else if magnitude >= 6.0 || deaths >= 50.0 {
        DisasterLevel::II
    } else if magnitude >= 5.0 || deaths >= 10.0 {
        DisasterLevel::III
    } else {
        DisasterLevel::Iv
    };

    EarthquakeAssessment {
        affected_area_km2,
        affected_population,
        disaster_level,
        casualties: CasualtyEstimate { deaths, injuries, missing },
    }
}

const DEFAULT_DRAINAGE_CAPACITY_MM_PER_HR: f64 = 30.0;
const DEFAULT_RAINFALL_DURATION_HOURS: f64 = 24.0;
const DEFAULT_TERRAIN_SLOPE: f64 = 1.0;
const DEFAULT_FLOOD_AREA_KM2: f64 = 10.0;
const DEFAULT_FLOOD_POP_DENSITY: f64 = 3000.0;

pub struct FloodAssessment {
    pub affected_area_km2: f64,
    pub affected_population: f64,
    pub disaster_level: DisasterLevel,
    pub casualties: CasualtyEstimate,
}

/// Flood physics assessor (SPEC_FULL.md §4.2).
pub fn assess_flood(
    rainfall_mm: f64,
    affected_area_km2: Option<f64>,
    population_density: Option<f64>,
) -> FloodAssessment {
    let net_rainfall_mm =
        (rainfall_mm - DEFAULT_DRAINAGE_CAPACITY_MM_PER_HR * DEFAULT_RAINFALL_DURATION_HOURS).max(0.0);
    let slope_factor = (1.0 - DEFAULT_TERRAIN_SLOPE / 10.0).max(0.1);
    let water_depth_m = (net_rainfall_mm / 1000.0) * slope_factor * 5.0;

    let area = affected_area_km2.unwrap_or(DEFAULT_FLOOD_AREA_KM2);
    let density = population_density.unwrap_or(DEFAULT_FLOOD_POP_DENSITY);
    let affected_population = area * density;

    let death_rate = if water_depth_m < 1.0 { 0.0001 } else { 0.001 };
    let deaths = affected_population * death_rate;
    let injuries = deaths * 5.0;
    let missing = deaths * 0.5;

    let disaster_level = if affected_population >= 100_000.0 || water_depth_m >= 2.0 {
        DisasterLevel::I
    } else if affected_population >= 50_000.0 || water_depth_m >= 1.0 {
        DisasterLevel::II
    } else if affected_population >= 10_000.0 || water_depth_m >= 0.5 {
        DisasterLevel::III
    } else {
        DisasterLevel::Iv
    };

    FloodAssessment {
        affected_area_km2: area,
        affected_population,
        disaster_level,
        casualties: CasualtyEstimate { deaths, injuries, missing },
    }
}

/// Pasquill-Gifford stability-class diffusion factor (SPEC_FULL.md §4.2).
fn stability_class_factor(stability_class: &str) -> f64 {
    match stability_class {
        "A" => 0.22,
        "B" => 0.16,
        "C" => 0.11,
        "E" => 0.06,
        "F" => 0.04,
        _ => 0.08, // D, default
    }
}

/// Per-chemical toxicity threshold in mg/m³ (SPEC_FULL.md §4.2).
fn chemical_threshold_mg_m3(chemical_type: &str) -> f64 {
    match chemical_type {
        "ammonia" => 300.0,
        "chlorine" => 10.0,
        "hydrogen_sulfide" => 50.0,
        "carbon_monoxide" => 400.0,
        "benzene" => 500.0,
        _ => 100.0,
    }
}

enum ToxicityClass {
    High,
    Medium,
    Low,
}

fn toxicity_class(chemical_type: &str) -> ToxicityClass {
    match chemical_type {
        "chlorine" | "hydrogen_sulfide" | "phosgene" => ToxicityClass::High,
        "ammonia" | "carbon_monoxide" | "sulfur_dioxide" => ToxicityClass::Medium,
        _ => ToxicityClass::Low,
    }
}

const DEFAULT_HAZMAT_POP_DENSITY: f64 = 2000.0;

pub struct HazmatAssessment {
    pub affected_area_km2: f64,
    pub affected_population: f64,
    pub disaster_level: DisasterLevel,
    pub casualties: CasualtyEstimate,
}

/// Simplified Gaussian-plume hazmat assessor (SPEC_FULL.md §4.2).
pub fn assess_hazmat(
    chemical_type: &str,
    leak_rate_kg_s: f64,
    wind_speed_ms: f64,
    stability_class: &str,
    population_density: Option<f64>,
) -> HazmatAssessment {
    let factor = stability_class_factor(stability_class);
    let threshold_mg_m3 = chemical_threshold_mg_m3(chemical_type);
    let wind_speed_ms = wind_speed_ms.max(0.1);

    let denom = std::f64::consts::PI * factor * factor * 0.7 * wind_speed_ms * (threshold_mg_m3 / 1000.0);
    let radius_m = (leak_rate_kg_s * 1000.0 / denom).clamp(100.0, 5000.0);
    let radius_km = radius_m / 1000.0;

    let affected_area_km2 = std::f64::consts::PI * radius_km * radius_km * 0.5;
    let density = population_density.unwrap_or(DEFAULT_HAZMAT_POP_DENSITY);
    let affected_population = affected_area_km2 * density;

    let (casualty_factor, level_multiplier) = match toxicity_class(chemical_type) {
        ToxicityClass::High => (0.01, 0.5),
        ToxicityClass::Medium => (0.001, 1.0),
        ToxicityClass::Low => (0.0001, 2.0),
    };
    let deaths = affected_population * casualty_factor;
    let injuries = deaths * 3.0;
    let missing = deaths * 0.1;

    let level_i = 10_000.0 * level_multiplier;
    let level_ii = 5_000.0 * level_multiplier;
    let level_iii = 1_000.0 * level_multiplier;
    let disaster_level = if affected_population >= level_i {
        DisasterLevel::I
    } else if affected_population >= level_ii {
        DisasterLevel::II
    } else if affected_population >= level_iii {
        DisasterLevel::III
    } else {
        DisasterLevel::Iv
    };

    HazmatAssessment {
        affected_area_km2,
        affected_population,
        disaster_level,
        casualties: CasualtyEstimate { deaths, injuries, missing },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn earthquake_intensity_decreases_with_distance() {
        let near = earthquake_intensity(6.5, 5.0, 10.0);
        let far = earthquake_intensity(6.5, 100.0, 10.0);
        assert!(near > far);
    }

    #[test]
    fn severe_earthquake_escalates_to_level_i() {
        let assessment = assess_earthquake(7.2, 10.0, None);
        assert_eq!(assessment.disaster_level, DisasterLevel::I);
        assert!(assessment.affected_population > 0.0);
    }

    #[test]
    fn moderate_earthquake_does_not_reach_level_i() {
        let assessment = assess_earthquake(4.5, 15.0, None);
        assert_ne!(assessment.disaster_level, DisasterLevel::I);
    }

    #[test]
    fn heavy_rainfall_produces_deeper_flood_than_light_rainfall() {
        let heavy = assess_flood(400.0, Some(20.0), None);
        let light = assess_flood(50.0, Some(20.0), None);
        assert!(heavy.casualties.deaths >= light.casualties.deaths);
    }

    #[test]
    fn chlorine_leak_escalates_faster_than_low_toxicity_chemical() {
        let chlorine = assess_hazmat("chlorine", 50.0, 3.0, "D", None);
        let inert = assess_hazmat("unknown_solvent", 50.0, 3.0, "D", None);
        assert!(chlorine.casualties.deaths >= inert.casualties.deaths);
    }

    #[test]
    fn hazmat_radius_is_clamped_to_bounds() {
        let tiny_leak = assess_hazmat("chlorine", 0.001, 10.0, "A", None);
        assert!(tiny_leak.affected_area_km2 >= std::f64::consts::PI * 0.1 * 0.1 * 0.5 - 1e-6);
    }
}
