//! Scaling for the three multiplexed analog sensors.
//!
//! All inputs are raw 12-bit conversions against a 3.3 V reference. Packet
//! fields carry the scaled value times 1000.

use num_traits::Float;

const VREF: f32 = 3.3;
const FULL_SCALE: f32 = 4095.0;

/// Photoresistor divider resistor, ohms.
const LIGHT_DIVIDER_OHMS: f32 = 10_000.0;

/// MQ-4 load resistor and clean-air sensor resistance, ohms.
const MQ4_LOAD_OHMS: f32 = 20_000.0;
const MQ4_R0_OHMS: f32 = 4_000.0;
/// log-log fit of the MQ-4 CH4 curve: log10(Rs/R0) = SLOPE * log10(ppm) + INTERCEPT.
const MQ4_SLOPE: f32 = -0.374;
const MQ4_INTERCEPT: f32 = 1.101;

/// Channel on the CD4051 multiplexer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AnalogChannel {
    Photoresistor,
    Methane,
    Oxygen,
}

impl AnalogChannel {
    pub const ALL: [Self; 3] = [Self::Photoresistor, Self::Methane, Self::Oxygen];

    /// Multiplexer select value.
    #[must_use]
    pub const fn mux_select(self) -> u8 {
        match self {
            Self::Photoresistor => 0,
            Self::Methane => 4,
            Self::Oxygen => 7,
        }
    }

    /// Physical value for a raw conversion.
    #[must_use]
    pub fn scale(self, raw: u16) -> f32 {
        match self {
            Self::Photoresistor => lux(raw),
            Self::Methane => methane_ppm(raw),
            Self::Oxygen => oxygen_voltage(raw),
        }
    }
}

#[inline]
fn volts(raw: u16) -> f32 {
    f32::from(raw) / FULL_SCALE * VREF
}

/// Illuminance from the photoresistor divider (GL55-series curve).
#[must_use]
pub fn lux(raw: u16) -> f32 {
    let v = volts(raw);
    let r = v * LIGHT_DIVIDER_OHMS / (VREF - v);
    ((3.823 - (r / 1000.0).ln()) / 0.816).exp() * 10.764
}

/// CH4 concentration from the MQ-4.
#[must_use]
pub fn methane_ppm(raw: u16) -> f32 {
    let v = volts(raw);
    let rs = (VREF - v) * MQ4_LOAD_OHMS / v;
    let ratio = rs / MQ4_R0_OHMS;
    let scale = 10.0_f32.powf(-MQ4_INTERCEPT / MQ4_SLOPE);
    ratio.powf(1.0 / MQ4_SLOPE) * scale
}

/// ME2-O2 cell output voltage.
#[must_use]
pub fn oxygen_voltage(raw: u16) -> f32 {
    volts(raw)
}

/// Packet encoding: value times 1000, saturating, NaN as 0.
#[must_use]
pub fn to_milli(value: f32) -> u16 {
    // float-to-int `as` saturates and maps NaN to 0
    (value * 1000.0) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oxygen_is_voltage() {
        assert_eq!(oxygen_voltage(0), 0.0);
        assert!((oxygen_voltage(4095) - 3.3).abs() < 1e-6);
        assert_eq!(to_milli(oxygen_voltage(2048)), 1650);
    }

    #[test]
    fn test_lux_monotonic_in_light() {
        // Brighter light lowers the LDR resistance and the divider voltage.
        let dark = lux(3500);
        let bright = lux(500);
        assert!(bright > dark, "{bright} {dark}");
        // Midpoint: R = 10k, lux = exp((3.823 - ln 10) / 0.816) * 10.764
        let mid = lux(2048);
        assert!((mid - 69.0).abs() < 2.0, "{mid}");
    }

    #[test]
    fn test_methane_reference_point() {
        // Rs == R0 gives the curve intercept: 10^(1.101 / 0.374) ppm.
        // Rs = (3.3 - v) * 20k / v = 4k  =>  v = 2.75 V  =>  raw 3412.5
        let ppm = methane_ppm(3413);
        assert!((ppm - 879.0).abs() < 10.0, "{ppm}");
        assert!(methane_ppm(1000) < methane_ppm(3000));
    }

    #[test]
    fn test_rail_values_saturate() {
        assert_eq!(to_milli(lux(0)), u16::MAX);
        assert_eq!(to_milli(lux(4095)), 0);
        assert_eq!(to_milli(methane_ppm(0)), 0);
        assert_eq!(to_milli(f32::NAN), 0);
        assert_eq!(to_milli(-5.0), 0);
    }
}
