//! Units of measure for thresholds, bounds and setpoints.
//!
//! Two layers live here:
//!
//! - [`Unit`] and [`PhysicalParameter`]: the runtime tags attached to
//!   thresholds and ranges. A threshold's unit must measure the physical
//!   parameter of its cnec, which [`Unit::check_physical_parameter`] enforces.
//! - Newtype quantities ([`Megawatts`], [`Amperes`], [`Kilovolts`]) used by
//!   the bound engine so that a flow conversion cannot mix a voltage with a
//!   current by accident.
//!
//! # Flow conversions
//!
//! For a three-phase branch side with nominal voltage `V` (kV):
//!
//! ```text
//! I [A] = P [MW] * 1000 / (V * sqrt(3))
//! P [MW] = I [A] * V * sqrt(3) / 1000
//! ```
//!
//! ```
//! use crac_core::units::{Amperes, Kilovolts, Megawatts};
//!
//! let current = Megawatts(500.0).to_amperes(Kilovolts(380.0));
//! assert!((current.value() - 759.67).abs() < 0.01);
//! assert!((current.to_megawatts(Kilovolts(380.0)).value() - 500.0).abs() < 1e-9);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CracError, CracResult};

/// Physical quantity measured by a cnec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PhysicalParameter {
    Flow,
    Angle,
    Voltage,
}

impl fmt::Display for PhysicalParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PhysicalParameter::Flow => "FLOW",
            PhysicalParameter::Angle => "ANGLE",
            PhysicalParameter::Voltage => "VOLTAGE",
        };
        f.write_str(label)
    }
}

/// Unit tag of a threshold or a bound request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Unit {
    Megawatt,
    Ampere,
    /// Fraction of the side's thermal limit (1.0 = 100 %)
    PercentImax,
    Degree,
    Kilovolt,
}

impl Unit {
    /// Physical parameter this unit measures
    pub fn physical_parameter(self) -> PhysicalParameter {
        match self {
            Unit::Megawatt | Unit::Ampere | Unit::PercentImax => PhysicalParameter::Flow,
            Unit::Degree => PhysicalParameter::Angle,
            Unit::Kilovolt => PhysicalParameter::Voltage,
        }
    }

    pub fn is_flow_unit(self) -> bool {
        self.physical_parameter() == PhysicalParameter::Flow
    }

    /// Reject units that cannot measure `parameter`.
    pub fn check_physical_parameter(self, parameter: PhysicalParameter) -> CracResult<()> {
        if self.physical_parameter() == parameter {
            Ok(())
        } else {
            Err(CracError::InvalidData(format!(
                "{} Unit is not suited to measure a {} value.",
                self, parameter
            )))
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Unit::Megawatt => "MW",
            Unit::Ampere => "A",
            Unit::PercentImax => "%",
            Unit::Degree => "°",
            Unit::Kilovolt => "kV",
        };
        f.write_str(symbol)
    }
}

/// Accessors shared by every quantity newtype
macro_rules! impl_quantity {
    ($type:ty, $symbol:literal) => {
        impl fmt::Display for $type {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{:.4} {}", self.0, $symbol)
            }
        }

        impl $type {
            /// Raw numeric value
            #[inline]
            pub const fn value(self) -> f64 {
                self.0
            }

            #[inline]
            pub fn abs(self) -> Self {
                Self(self.0.abs())
            }
        }
    };
}

/// Active power in megawatts (MW)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Megawatts(pub f64);

impl_quantity!(Megawatts, "MW");

/// Current in amperes (A)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Amperes(pub f64);

impl_quantity!(Amperes, "A");

/// Voltage in kilovolts (kV)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Kilovolts(pub f64);

impl_quantity!(Kilovolts, "kV");

impl Megawatts {
    /// Three-phase current carried by this active power at `nominal_voltage`.
    #[inline]
    pub fn to_amperes(self, nominal_voltage: Kilovolts) -> Amperes {
        Amperes(self.0 * 1000.0 / (nominal_voltage.0 * 3.0_f64.sqrt()))
    }
}

impl Amperes {
    /// Active power carried by this current at `nominal_voltage`.
    #[inline]
    pub fn to_megawatts(self, nominal_voltage: Kilovolts) -> Megawatts {
        Megawatts(self.0 * nominal_voltage.0 * 3.0_f64.sqrt() / 1000.0)
    }

    /// Current expressed as a fraction of `i_max`.
    #[inline]
    pub fn to_percent_imax(self, i_max: Amperes) -> f64 {
        self.0 / i_max.0
    }

    /// Current corresponding to a fraction of `i_max`.
    #[inline]
    pub fn from_percent_imax(ratio: f64, i_max: Amperes) -> Self {
        Amperes(ratio * i_max.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_physical_parameter() {
        assert_eq!(Unit::Megawatt.physical_parameter(), PhysicalParameter::Flow);
        assert_eq!(Unit::PercentImax.physical_parameter(), PhysicalParameter::Flow);
        assert_eq!(Unit::Degree.physical_parameter(), PhysicalParameter::Angle);
        assert_eq!(Unit::Kilovolt.physical_parameter(), PhysicalParameter::Voltage);
        assert!(Unit::Ampere.is_flow_unit());
        assert!(!Unit::Degree.is_flow_unit());
    }

    #[test]
    fn test_check_physical_parameter_messages() {
        assert!(Unit::Ampere
            .check_physical_parameter(PhysicalParameter::Flow)
            .is_ok());

        let err = Unit::Kilovolt
            .check_physical_parameter(PhysicalParameter::Flow)
            .unwrap_err();
        assert_eq!(err.to_string(), "kV Unit is not suited to measure a FLOW value.");

        let err = Unit::Ampere
            .check_physical_parameter(PhysicalParameter::Voltage)
            .unwrap_err();
        assert_eq!(err.to_string(), "A Unit is not suited to measure a VOLTAGE value.");

        let err = Unit::Kilovolt
            .check_physical_parameter(PhysicalParameter::Angle)
            .unwrap_err();
        assert_eq!(err.to_string(), "kV Unit is not suited to measure a ANGLE value.");
    }

    #[test]
    fn test_megawatts_to_amperes() {
        let current = Megawatts(500.0).to_amperes(Kilovolts(380.0));
        assert!((current.value() - 500.0 / (0.38 * 3.0_f64.sqrt())).abs() < 1e-9);
        assert!((current.value() - 759.67).abs() < 0.01);
    }

    #[test]
    fn test_amperes_round_trip() {
        let v = Kilovolts(220.0);
        let p = Amperes(1000.0).to_megawatts(v);
        assert!((p.value() - 381.05).abs() < 0.01);
        assert!((p.to_amperes(v).value() - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_percent_imax() {
        let i_max = Amperes(1000.0);
        assert!((Amperes::from_percent_imax(1.1, i_max).value() - 1100.0).abs() < 1e-9);
        assert!((Amperes(500.0).to_percent_imax(i_max) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_negative_power_converts_to_magnitude() {
        let current = Megawatts(-100.0).to_amperes(Kilovolts(400.0)).abs();
        assert!((current.value() - 100.0 / (0.4 * 3.0_f64.sqrt())).abs() < 1e-9);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Megawatts(100.0)), "100.0000 MW");
        assert_eq!(format!("{}", Amperes(45.0)), "45.0000 A");
        assert_eq!(format!("{}", Unit::PercentImax), "%");
        assert_eq!(format!("{}", PhysicalParameter::Voltage), "VOLTAGE");
    }
}
