/// Points and CO₂ scoring
///
/// Pure functions over a commute type, a day count and a distance.

use crate::models::commute_log::CommuteType;

/// Emissions of an average gas car, kg CO₂ per km
pub const BASELINE_KG_PER_KM: f64 = 0.19;

/// Flat bonus for logging a sustainable commute on 3+ days of a week
pub const CONSISTENCY_BONUS: i32 = 25;

/// Days required for the consistency bonus
pub const CONSISTENCY_MIN_DAYS: i32 = 3;

/// Points earned per logged day
pub fn points_per_day(commute_type: CommuteType) -> i32 {
    match commute_type {
        CommuteType::Walk => 30,
        CommuteType::Cycle => 25,
        CommuteType::PublicTransport => 20,
        CommuteType::Carpool => 15,
        CommuteType::ElectricVehicle => 10,
        CommuteType::RemoteWork => 15,
        CommuteType::GasVehicle => 0,
    }
}

/// Emission factor, kg CO₂ per km
pub fn emission_factor(commute_type: CommuteType) -> f64 {
    match commute_type {
        CommuteType::Walk | CommuteType::Cycle | CommuteType::RemoteWork => 0.0,
        CommuteType::PublicTransport => 0.03,
        CommuteType::Carpool => 0.07,
        CommuteType::ElectricVehicle => 0.05,
        CommuteType::GasVehicle => BASELINE_KG_PER_KM,
    }
}

/// Points for a week of commuting
///
/// # Example
///
/// ```
/// use ecocommute_shared::models::commute_log::CommuteType;
/// use ecocommute_shared::tracking::scoring::points_for;
///
/// assert_eq!(points_for(CommuteType::Cycle, 3), 100);
/// assert_eq!(points_for(CommuteType::GasVehicle, 5), 0);
/// ```
pub fn points_for(commute_type: CommuteType, days_logged: i32) -> i32 {
    let base = points_per_day(commute_type) * days_logged;
    let bonus = if days_logged >= CONSISTENCY_MIN_DAYS && commute_type != CommuteType::GasVehicle {
        CONSISTENCY_BONUS
    } else {
        0
    };

    base + bonus
}

/// CO₂ saved against the gas-car baseline, rounded to whole kilograms
pub fn co2_saved_kg(commute_type: CommuteType, distance_km: f64, days_logged: i32) -> i32 {
    let saved = (BASELINE_KG_PER_KM - emission_factor(commute_type))
        * distance_km
        * f64::from(days_logged);

    saved.max(0.0).round() as i32
}
