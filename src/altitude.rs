//! Barometric altitude above the launch site.

use num_traits::Float;

/// International barometric formula, troposphere approximation.
#[must_use]
pub fn barometric_altitude(pressure_pa: f32, reference_pa: f32) -> f32 {
    44330.0 * (1.0 - (pressure_pa / reference_pa).powf(1.0 / 5.255))
}

/// Ground pressure captured once and never re-zeroed.
///
/// If the barometer fails when the payload boots, the reference is taken
/// from the first good sample after that. Until then altitude is unknown.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GroundReference {
    pressure_pa: Option<f32>,
}

impl GroundReference {
    #[must_use]
    pub const fn new() -> Self {
        Self { pressure_pa: None }
    }

    #[must_use]
    pub fn pressure_pa(&self) -> Option<f32> {
        self.pressure_pa
    }

    #[must_use]
    pub fn is_captured(&self) -> bool {
        self.pressure_pa.is_some()
    }

    /// Feed one pressure sample (`None` on a failed read). Returns the
    /// altitude once a reference is held.
    pub fn observe(&mut self, sample: Option<f32>) -> Option<f32> {
        let pressure = sample.filter(|p| p.is_finite() && *p > 0.0)?;
        match self.pressure_pa {
            Some(reference) => Some(barometric_altitude(pressure, reference)),
            None => {
                info!("ground reference {} Pa", pressure);
                self.pressure_pa = Some(pressure);
                Some(0.0)
            }
        }
    }
}
