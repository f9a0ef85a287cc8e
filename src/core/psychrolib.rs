//! Moist-air property functions after the ASHRAE Handbook Fundamentals
//! formulation.
//!
//! Every function takes its inputs in the unit system carried by the
//! [`Psychrometrics`] context, so callers select SI or IP explicitly
//! instead of flipping process-wide state.
//!
//! | quantity          | SI        | IP        |
//! |-------------------|-----------|-----------|
//! | temperature       | °C        | °F        |
//! | pressure          | Pa        | psi       |
//! | humidity ratio    | kg/kg     | lb/lb     |
//! | enthalpy          | J/kg      | Btu/lb    |
//! | specific volume   | m³/kg     | ft³/lb    |

use serde::{Deserialize, Serialize};
use thiserror::Error;

const ZERO_CELSIUS_AS_KELVIN: f64 = 273.15;
const ZERO_FAHRENHEIT_AS_RANKINE: f64 = 459.67;
const R_DA_SI: f64 = 287.042;
const R_DA_IP: f64 = 53.350;
const MIN_HUM_RATIO: f64 = 1e-7;
const WET_BULB_TOLERANCE: f64 = 0.001;
const MAX_ITER_COUNT: usize = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitSystem {
    Si,
    Ip,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PsychroError {
    #[error("dry bulb temperature {0} is outside the valid range {1}..{2}")]
    TemperatureOutOfRange(f64, f64, f64),

    #[error("partial pressure of water vapor {0} must be non-negative and below total pressure {1}")]
    VaporPressureOutOfRange(f64, f64),

    #[error("relative humidity {0} is outside the range 0..1")]
    RelHumOutOfRange(f64),

    #[error("humidity ratio {0} is negative")]
    NegativeHumRatio(f64),

    #[error("wet bulb temperature {0} is above dry bulb temperature {1}")]
    WetBulbAboveDryBulb(f64, f64),

    #[error("{0} did not converge after {1} iterations")]
    NoConvergence(&'static str, usize),
}

impl PsychroError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TemperatureOutOfRange(..) => "TemperatureOutOfRange",
            Self::VaporPressureOutOfRange(..) => "VaporPressureOutOfRange",
            Self::RelHumOutOfRange(..) => "RelHumOutOfRange",
            Self::NegativeHumRatio(..) => "NegativeHumRatio",
            Self::WetBulbAboveDryBulb(..) => "WetBulbAboveDryBulb",
            Self::NoConvergence(..) => "NoConvergence",
        }
    }
}

pub type Result<T> = std::result::Result<T, PsychroError>;

/// Unit-system-aware entry point for all psychrometric computations.
#[derive(Clone, Copy, Debug)]
pub struct Psychrometrics {
    units: UnitSystem,
}

impl Psychrometrics {
    pub fn new(units: UnitSystem) -> Self {
        Self { units }
    }

    pub fn si() -> Self {
        Self::new(UnitSystem::Si)
    }

    pub fn units(&self) -> UnitSystem {
        self.units
    }

    fn triple_point(&self) -> f64 {
        match self.units {
            UnitSystem::Si => 0.01,
            UnitSystem::Ip => 32.018,
        }
    }

    fn freezing_point(&self) -> f64 {
        match self.units {
            UnitSystem::Si => 0.0,
            UnitSystem::Ip => 32.0,
        }
    }

    /// Valid dry bulb range for the saturation pressure correlation.
    pub fn temperature_bounds(&self) -> (f64, f64) {
        match self.units {
            UnitSystem::Si => (-100.0, 200.0),
            UnitSystem::Ip => (-148.0, 392.0),
        }
    }

    fn absolute(&self, t: f64) -> f64 {
        match self.units {
            UnitSystem::Si => t + ZERO_CELSIUS_AS_KELVIN,
            UnitSystem::Ip => t + ZERO_FAHRENHEIT_AS_RANKINE,
        }
    }

    pub fn check_temperature(&self, t_dry_bulb: f64) -> Result<()> {
        let (lo, hi) = self.temperature_bounds();
        if !(lo..=hi).contains(&t_dry_bulb) {
            return Err(PsychroError::TemperatureOutOfRange(t_dry_bulb, lo, hi));
        }
        Ok(())
    }

    /// Atmospheric pressure of the standard atmosphere at `altitude`
    /// (m in SI, ft in IP).
    pub fn standard_atm_pressure(&self, altitude: f64) -> f64 {
        match self.units {
            UnitSystem::Si => 101325.0 * (1.0 - 2.25577e-05 * altitude).powf(5.2559),
            UnitSystem::Ip => 14.696 * (1.0 - 6.8754e-06 * altitude).powf(5.2559),
        }
    }

    /// Saturation vapor pressure, over ice below the triple point and over
    /// liquid water above it.
    pub fn sat_vap_pres(&self, t_dry_bulb: f64) -> Result<f64> {
        self.check_temperature(t_dry_bulb)?;
        let t = self.absolute(t_dry_bulb);
        let over_ice = t_dry_bulb <= self.triple_point();

        let ln_pws = match (self.units, over_ice) {
            (UnitSystem::Si, true) => {
                -5.674_535_9e3 / t + 6.392_524_7 - 9.677_843e-3 * t + 6.221_570_1e-7 * t * t
                    + 2.074_782_5e-9 * t.powi(3)
                    - 9.484_024e-13 * t.powi(4)
                    + 4.163_501_9 * t.ln()
            }
            (UnitSystem::Si, false) => {
                -5.800_220_6e3 / t + 1.391_499_3 - 4.864_023_9e-2 * t + 4.176_476_8e-5 * t * t
                    - 1.445_209_3e-8 * t.powi(3)
                    + 6.545_967_3 * t.ln()
            }
            (UnitSystem::Ip, true) => {
                -1.021_416_5e4 / t - 4.893_242_8 - 5.376_579_4e-3 * t + 1.920_237_7e-7 * t * t
                    + 3.557_583_2e-10 * t.powi(3)
                    - 9.034_468_8e-14 * t.powi(4)
                    + 4.163_501_9 * t.ln()
            }
            (UnitSystem::Ip, false) => {
                -1.044_039_7e4 / t - 1.129_465e1 - 2.702_235_5e-2 * t + 1.289_036e-5 * t * t
                    - 2.478_068_1e-9 * t.powi(3)
                    + 6.545_967_3 * t.ln()
            }
        };

        Ok(ln_pws.exp())
    }

    pub fn hum_ratio_from_vap_pres(&self, vap_pres: f64, pressure: f64) -> Result<f64> {
        if vap_pres < 0.0 || vap_pres >= pressure {
            return Err(PsychroError::VaporPressureOutOfRange(vap_pres, pressure));
        }
        let hum_ratio = 0.621945 * vap_pres / (pressure - vap_pres);
        Ok(hum_ratio.max(MIN_HUM_RATIO))
    }

    pub fn sat_hum_ratio(&self, t_dry_bulb: f64, pressure: f64) -> Result<f64> {
        let sat_vap_pres = self.sat_vap_pres(t_dry_bulb)?;
        self.hum_ratio_from_vap_pres(sat_vap_pres, pressure)
    }

    /// `rel_hum` is a fraction in 0..1.
    pub fn hum_ratio_from_rel_hum(&self, t_dry_bulb: f64, rel_hum: f64, pressure: f64) -> Result<f64> {
        if !(0.0..=1.0).contains(&rel_hum) {
            return Err(PsychroError::RelHumOutOfRange(rel_hum));
        }
        let vap_pres = rel_hum * self.sat_vap_pres(t_dry_bulb)?;
        self.hum_ratio_from_vap_pres(vap_pres, pressure)
    }

    pub fn hum_ratio_from_t_wet_bulb(&self, t_dry_bulb: f64, t_wet_bulb: f64, pressure: f64) -> Result<f64> {
        if t_wet_bulb > t_dry_bulb {
            return Err(PsychroError::WetBulbAboveDryBulb(t_wet_bulb, t_dry_bulb));
        }
        let ws_star = self.sat_hum_ratio(t_wet_bulb, pressure)?;
        let above_freezing = t_wet_bulb >= self.freezing_point();

        let hum_ratio = match (self.units, above_freezing) {
            (UnitSystem::Si, true) => {
                ((2501.0 - 2.326 * t_wet_bulb) * ws_star - 1.006 * (t_dry_bulb - t_wet_bulb))
                    / (2501.0 + 1.86 * t_dry_bulb - 4.186 * t_wet_bulb)
            }
            (UnitSystem::Si, false) => {
                ((2830.0 - 0.24 * t_wet_bulb) * ws_star - 1.006 * (t_dry_bulb - t_wet_bulb))
                    / (2830.0 + 1.86 * t_dry_bulb - 2.1 * t_wet_bulb)
            }
            (UnitSystem::Ip, true) => {
                ((1093.0 - 0.556 * t_wet_bulb) * ws_star - 0.240 * (t_dry_bulb - t_wet_bulb))
                    / (1093.0 + 0.444 * t_dry_bulb - t_wet_bulb)
            }
            (UnitSystem::Ip, false) => {
                ((1220.0 - 0.04 * t_wet_bulb) * ws_star - 0.240 * (t_dry_bulb - t_wet_bulb))
                    / (1220.0 + 0.444 * t_dry_bulb - 0.48 * t_wet_bulb)
            }
        };

        Ok(hum_ratio.max(MIN_HUM_RATIO))
    }

    /// Solves for wet bulb temperature by bisection between the lower
    /// validity bound and the dry bulb temperature.
    pub fn t_wet_bulb_from_hum_ratio(&self, t_dry_bulb: f64, hum_ratio: f64, pressure: f64) -> Result<f64> {
        if hum_ratio < 0.0 {
            return Err(PsychroError::NegativeHumRatio(hum_ratio));
        }
        self.check_temperature(t_dry_bulb)?;
        let hum_ratio = hum_ratio.max(MIN_HUM_RATIO);

        let (mut lo, _) = self.temperature_bounds();
        let mut hi = t_dry_bulb;
        let mut t_wet_bulb = (lo + hi) / 2.0;

        for _ in 0..MAX_ITER_COUNT {
            if hi - lo <= WET_BULB_TOLERANCE {
                return Ok(t_wet_bulb);
            }
            let w_star = self.hum_ratio_from_t_wet_bulb(t_dry_bulb, t_wet_bulb, pressure)?;
            if w_star > hum_ratio {
                hi = t_wet_bulb;
            } else {
                lo = t_wet_bulb;
            }
            t_wet_bulb = (lo + hi) / 2.0;
        }

        Err(PsychroError::NoConvergence("wet bulb temperature", MAX_ITER_COUNT))
    }

    pub fn moist_air_enthalpy(&self, t_dry_bulb: f64, hum_ratio: f64) -> Result<f64> {
        if hum_ratio < 0.0 {
            return Err(PsychroError::NegativeHumRatio(hum_ratio));
        }
        let hum_ratio = hum_ratio.max(MIN_HUM_RATIO);
        Ok(match self.units {
            UnitSystem::Si => (1.006 * t_dry_bulb + hum_ratio * (2501.0 + 1.86 * t_dry_bulb)) * 1000.0,
            UnitSystem::Ip => 0.240 * t_dry_bulb + hum_ratio * (1061.0 + 0.444 * t_dry_bulb),
        })
    }

    pub fn moist_air_volume(&self, t_dry_bulb: f64, hum_ratio: f64, pressure: f64) -> Result<f64> {
        if hum_ratio < 0.0 {
            return Err(PsychroError::NegativeHumRatio(hum_ratio));
        }
        let hum_ratio = hum_ratio.max(MIN_HUM_RATIO);
        Ok(match self.units {
            UnitSystem::Si => {
                R_DA_SI * self.absolute(t_dry_bulb) * (1.0 + 1.607858 * hum_ratio) / pressure
            }
            // R_DA_IP is in ft·lbf/(lb·°R); pressure in psi needs 144 in²/ft².
            UnitSystem::Ip => {
                R_DA_IP * self.absolute(t_dry_bulb) * (1.0 + 1.607858 * hum_ratio) / (144.0 * pressure)
            }
        })
    }

    pub fn t_dry_bulb_from_enthalpy_and_hum_ratio(&self, enthalpy: f64, hum_ratio: f64) -> Result<f64> {
        if hum_ratio < 0.0 {
            return Err(PsychroError::NegativeHumRatio(hum_ratio));
        }
        let hum_ratio = hum_ratio.max(MIN_HUM_RATIO);
        Ok(match self.units {
            UnitSystem::Si => (enthalpy / 1000.0 - 2501.0 * hum_ratio) / (1.006 + 1.86 * hum_ratio),
            UnitSystem::Ip => (enthalpy - 1061.0 * hum_ratio) / (0.240 + 0.444 * hum_ratio),
        })
    }

    pub fn t_dry_bulb_from_moist_air_volume_and_hum_ratio(
        &self,
        volume: f64,
        hum_ratio: f64,
        pressure: f64,
    ) -> Result<f64> {
        if hum_ratio < 0.0 {
            return Err(PsychroError::NegativeHumRatio(hum_ratio));
        }
        let hum_ratio = hum_ratio.max(MIN_HUM_RATIO);
        Ok(match self.units {
            UnitSystem::Si => {
                volume * pressure / (R_DA_SI * (1.0 + 1.607858 * hum_ratio)) - ZERO_CELSIUS_AS_KELVIN
            }
            UnitSystem::Ip => {
                volume * (144.0 * pressure) / (R_DA_IP * (1.0 + 1.607858 * hum_ratio))
                    - ZERO_FAHRENHEIT_AS_RANKINE
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64, rel: f64) {
        let diff = (actual - expected).abs();
        assert!(
            diff <= expected.abs() * rel,
            "expected {expected}, got {actual} (rel tol {rel})"
        );
    }

    #[test]
    fn sea_level_pressure_matches_standard_atmosphere() {
        let si = Psychrometrics::si();
        assert_close(si.standard_atm_pressure(0.0), 101325.0, 1e-9);
        assert_close(si.standard_atm_pressure(1500.0), 84556.0, 1e-3);

        let ip = Psychrometrics::new(UnitSystem::Ip);
        assert_close(ip.standard_atm_pressure(0.0), 14.696, 1e-9);
    }

    #[test]
    fn saturation_pressure_matches_ashrae_tables() {
        let si = Psychrometrics::si();
        assert_close(si.sat_vap_pres(-20.0).unwrap(), 103.26, 3e-4);
        assert_close(si.sat_vap_pres(5.0).unwrap(), 872.49, 3e-4);
        assert_close(si.sat_vap_pres(25.0).unwrap(), 3169.2, 3e-4);
        assert_close(si.sat_vap_pres(95.0).unwrap(), 84_608.0, 3e-4);

        let ip = Psychrometrics::new(UnitSystem::Ip);
        assert_close(ip.sat_vap_pres(77.0).unwrap(), 0.459_66, 1e-3);
    }

    #[test]
    fn saturation_pressure_rejects_out_of_range_temperature() {
        let si = Psychrometrics::si();
        assert!(matches!(
            si.sat_vap_pres(250.0),
            Err(PsychroError::TemperatureOutOfRange(..))
        ));
        assert!(si.sat_vap_pres(-120.0).is_err());
    }

    #[test]
    fn humidity_ratio_from_relative_humidity() {
        let si = Psychrometrics::si();
        let p = si.standard_atm_pressure(0.0);
        // 25 °C, 50 % RH at sea level is roughly 9.9 g/kg
        let w = si.hum_ratio_from_rel_hum(25.0, 0.5, p).unwrap();
        assert_close(w, 0.009_88, 5e-3);

        assert!(si.hum_ratio_from_rel_hum(25.0, 1.5, p).is_err());
    }

    #[test]
    fn vapor_pressure_above_total_pressure_is_rejected() {
        let si = Psychrometrics::si();
        assert!(matches!(
            si.hum_ratio_from_vap_pres(110_000.0, 101_325.0),
            Err(PsychroError::VaporPressureOutOfRange(..))
        ));
    }

    #[test]
    fn wet_bulb_round_trips_through_humidity_ratio() {
        let si = Psychrometrics::si();
        let p = si.standard_atm_pressure(0.0);
        let w = si.hum_ratio_from_t_wet_bulb(30.0, 20.0, p).unwrap();
        let t_wet_bulb = si.t_wet_bulb_from_hum_ratio(30.0, w, p).unwrap();
        assert!((t_wet_bulb - 20.0).abs() < 0.01, "got {t_wet_bulb}");
    }

    #[test]
    fn wet_bulb_above_dry_bulb_is_rejected() {
        let si = Psychrometrics::si();
        let p = si.standard_atm_pressure(0.0);
        assert!(si.hum_ratio_from_t_wet_bulb(20.0, 25.0, p).is_err());
    }

    #[test]
    fn enthalpy_and_volume_invert() {
        let si = Psychrometrics::si();
        let p = si.standard_atm_pressure(0.0);

        let h = si.moist_air_enthalpy(25.0, 0.01).unwrap();
        assert_close(h, 50_625.0, 1e-6);
        let t = si.t_dry_bulb_from_enthalpy_and_hum_ratio(h, 0.01).unwrap();
        assert!((t - 25.0).abs() < 1e-9);

        let v = si.moist_air_volume(25.0, 0.01, p).unwrap();
        assert_close(v, 0.8582, 1e-3);
        let t = si.t_dry_bulb_from_moist_air_volume_and_hum_ratio(v, 0.01, p).unwrap();
        assert!((t - 25.0).abs() < 1e-9);
    }
}
