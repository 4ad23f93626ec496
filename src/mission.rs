//! Flight-phase state machine and actuator commands.
//!
//! | Phase                     | Leaves when                           | On exit                  |
//! |---------------------------|---------------------------------------|--------------------------|
//! | Preparation               | ground switch opens                   | light baseline recorded  |
//! | BeforeLaying              | switch closes                         | ascent counter reset     |
//! | Ascent                    | light > baseline, 3 cycles in a row   |                          |
//! | DescentBurning            | altitude <= 100 m                     | burner on, timer started |
//! | DescentSettled(Burning)   | burn timer >= 3000 ms                 | burner off, beacon on    |
//! | DescentSettled(Final)     | never                                 |                          |
//!
//! The machine owns no sensor or pin handles: it takes one [`MissionInputs`]
//! per cycle and returns the actuator changes to apply.

use embedded_hal::digital::OutputPin;
use telemetry_proto::{MissionPhase, SettledStage};

use crate::config::{BURN_ALTITUDE_M, BURN_DURATION_MS, LIGHT_CONFIRM_CYCLES};
use crate::time::elapsed_ms;

/// Values the machine needs from one superloop cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MissionInputs {
    pub now_ms: u32,
    /// Ground (umbilical) switch reads open.
    pub switch_open: bool,
    /// Photoresistor reading, same scale as the packet field.
    pub light: u16,
    /// Height above the ground reference; `None` until a reference exists.
    pub altitude_m: Option<f32>,
}

/// Actuator changes requested by one update. `None` leaves the output alone.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ActuatorCommands {
    pub burner: Option<bool>,
    pub beacon: Option<bool>,
}

impl ActuatorCommands {
    pub const NONE: Self = Self {
        burner: None,
        beacon: None,
    };

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.burner.is_none() && self.beacon.is_none()
    }
}

/// Burner wire and piezo beacon outputs.
pub trait Actuators {
    fn set_burner(&mut self, on: bool);
    fn set_beacon(&mut self, on: bool);

    fn apply(&mut self, commands: ActuatorCommands) {
        if let Some(on) = commands.burner {
            self.set_burner(on);
        }
        if let Some(on) = commands.beacon {
            self.set_beacon(on);
        }
    }
}

/// [`Actuators`] on two GPIO outputs, active high.
pub struct PinActuators<B, S> {
    burner: B,
    beacon: S,
}

impl<B: OutputPin, S: OutputPin> PinActuators<B, S> {
    /// Drives both outputs low.
    pub fn new(mut burner: B, mut beacon: S) -> Self {
        let _ = burner.set_low();
        let _ = beacon.set_low();
        Self { burner, beacon }
    }
}

impl<B: OutputPin, S: OutputPin> Actuators for PinActuators<B, S> {
    fn set_burner(&mut self, on: bool) {
        if self.burner.set_state(on.into()).is_err() {
            error!("burner pin write failed");
        }
    }

    fn set_beacon(&mut self, on: bool) {
        if self.beacon.set_state(on.into()).is_err() {
            error!("beacon pin write failed");
        }
    }
}

/// Result of one [`MissionStateMachine::update`].
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MissionStep {
    pub phase: MissionPhase,
    pub transitioned: bool,
    pub commands: ActuatorCommands,
}

/// Mission phase plus the timers and baselines it depends on.
#[derive(Clone, Debug)]
pub struct MissionStateMachine {
    phase: MissionPhase,
    light_baseline: u16,
    over_baseline: u8,
    burn_started_ms: u32,
}

impl Default for MissionStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl MissionStateMachine {
    #[must_use]
    pub const fn new() -> Self {
        Self::resume(MissionPhase::Preparation)
    }

    /// Start in an arbitrary phase, e.g. one decoded from an ordinal.
    #[must_use]
    pub const fn resume(phase: MissionPhase) -> Self {
        Self {
            phase,
            light_baseline: 0,
            over_baseline: 0,
            burn_started_ms: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn phase(&self) -> MissionPhase {
        self.phase
    }

    #[must_use]
    pub fn light_baseline(&self) -> u16 {
        self.light_baseline
    }

    /// Advance by one cycle.
    pub fn update(&mut self, inputs: &MissionInputs) -> MissionStep {
        let mut commands = ActuatorCommands::NONE;
        let next = match self.phase {
            MissionPhase::Preparation => {
                if inputs.switch_open {
                    self.light_baseline = inputs.light;
                    info!("light baseline {}", self.light_baseline);
                    MissionPhase::BeforeLaying
                } else {
                    self.phase
                }
            }
            MissionPhase::BeforeLaying => {
                if inputs.switch_open {
                    self.phase
                } else {
                    self.over_baseline = 0;
                    MissionPhase::Ascent
                }
            }
            MissionPhase::Ascent => {
                if inputs.light > self.light_baseline {
                    self.over_baseline = self.over_baseline.saturating_add(1);
                } else {
                    self.over_baseline = 0;
                }
                if self.over_baseline >= LIGHT_CONFIRM_CYCLES {
                    MissionPhase::DescentBurning
                } else {
                    self.phase
                }
            }
            MissionPhase::DescentBurning => match inputs.altitude_m {
                Some(altitude) if altitude <= BURN_ALTITUDE_M => {
                    self.burn_started_ms = inputs.now_ms;
                    commands.burner = Some(true);
                    MissionPhase::DescentSettled(SettledStage::Burning)
                }
                _ => self.phase,
            },
            MissionPhase::DescentSettled(SettledStage::Burning) => {
                if elapsed_ms(self.burn_started_ms, inputs.now_ms) >= BURN_DURATION_MS {
                    commands.burner = Some(false);
                    commands.beacon = Some(true);
                    MissionPhase::DescentSettled(SettledStage::Final)
                } else {
                    self.phase
                }
            }
            MissionPhase::DescentSettled(SettledStage::Final) | MissionPhase::Terminal(_) => {
                self.phase
            }
        };

        let transitioned = next != self.phase;
        if transitioned {
            info!("phase {:?} -> {:?}", self.phase, next);
            self.phase = next;
        }
        if let Some(on) = commands.burner {
            info!("burner {}", on);
        }
        if let Some(on) = commands.beacon {
            info!("beacon {}", on);
        }
        MissionStep {
            phase: self.phase,
            transitioned,
            commands,
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use telemetry_proto::PhaseFault;
    use std::vec::Vec;

    fn inputs(now_ms: u32, switch_open: bool, light: u16, altitude_m: Option<f32>) -> MissionInputs {
        MissionInputs {
            now_ms,
            switch_open,
            light,
            altitude_m,
        }
    }

    #[derive(Default)]
    struct RecordingActuators {
        burner: bool,
        beacon: bool,
        changes: Vec<(&'static str, bool)>,
    }

    impl Actuators for RecordingActuators {
        fn set_burner(&mut self, on: bool) {
            self.burner = on;
            self.changes.push(("burner", on));
        }

        fn set_beacon(&mut self, on: bool) {
            self.beacon = on;
            self.changes.push(("beacon", on));
        }
    }

    #[test]
    fn test_full_flight_sequence() {
        let mut m = MissionStateMachine::new();
        let mut act = RecordingActuators::default();
        let mut phases = Vec::new();
        let mut burner_on = Vec::new();

        let mut t = 0;
        let mut step = |m: &mut MissionStateMachine, i: MissionInputs| {
            let s = m.update(&i);
            act.apply(s.commands);
            if phases.last() != Some(&s.phase) {
                phases.push(s.phase);
            }
            burner_on.push((i.now_ms, act.burner));
        };

        // On the pad, switch closed.
        for _ in 0..3 {
            step(&mut m, inputs(t, false, 120, Some(0.0)));
            t += 100;
        }
        // Switch opens while loading; baseline taken in the dark.
        step(&mut m, inputs(t, true, 100, Some(0.0)));
        t += 100;
        step(&mut m, inputs(t, true, 300, Some(0.0)));
        t += 100;
        // Switch closes: launch.
        step(&mut m, inputs(t, false, 100, Some(0.0)));
        t += 100;
        // Noise: two bright readings then dark resets the count.
        for light in [150, 150, 90] {
            step(&mut m, inputs(t, false, light, Some(900.0)));
            t += 100;
        }
        for _ in 0..3 {
            step(&mut m, inputs(t, false, 150, Some(1000.0)));
            t += 100;
        }
        // Falling.
        for alt in [800.0, 400.0, 150.0] {
            step(&mut m, inputs(t, false, 150, Some(alt)));
            t += 100;
        }
        let burn_start = t;
        while t < burn_start + 4000 {
            step(&mut m, inputs(t, false, 150, Some(20.0)));
            t += 100;
        }

        assert_eq!(
            phases,
            [
                MissionPhase::Preparation,
                MissionPhase::BeforeLaying,
                MissionPhase::Ascent,
                MissionPhase::DescentBurning,
                MissionPhase::DescentSettled(SettledStage::Burning),
                MissionPhase::DescentSettled(SettledStage::Final),
            ]
        );
        assert_eq!(m.light_baseline(), 100);

        for (now, on) in burner_on {
            let expected = now >= burn_start && now < burn_start + BURN_DURATION_MS;
            assert_eq!(on, expected, "burner at {now}");
        }
        assert!(act.beacon);
        assert_eq!(
            act.changes,
            [("burner", true), ("burner", false), ("beacon", true)]
        );
    }

    #[test]
    fn test_ascent_needs_consecutive_readings() {
        let mut m = MissionStateMachine::resume(MissionPhase::Ascent);
        for light in [10, 10, 0, 10, 10, 0] {
            assert_eq!(m.update(&inputs(0, false, light, None)).phase, MissionPhase::Ascent);
        }
        m.update(&inputs(0, false, 10, None));
        m.update(&inputs(0, false, 10, None));
        let s = m.update(&inputs(0, false, 10, None));
        assert!(s.transitioned);
        assert_eq!(s.phase, MissionPhase::DescentBurning);
    }

    #[test]
    fn test_descent_waits_for_altitude() {
        let mut m = MissionStateMachine::resume(MissionPhase::DescentBurning);
        assert_eq!(m.update(&inputs(0, false, 0, None)).phase, MissionPhase::DescentBurning);
        assert_eq!(
            m.update(&inputs(0, false, 0, Some(100.5))).phase,
            MissionPhase::DescentBurning
        );
        let s = m.update(&inputs(500, false, 0, Some(100.0)));
        assert_eq!(s.commands.burner, Some(true));
        assert_eq!(s.phase, MissionPhase::DescentSettled(SettledStage::Burning));
    }

    #[test]
    fn test_burn_timer_wraps() {
        let mut m = MissionStateMachine::resume(MissionPhase::DescentBurning);
        let start = u32::MAX - 1000;
        m.update(&inputs(start, false, 0, Some(0.0)));
        assert!(m.update(&inputs(start.wrapping_add(2999), false, 0, Some(0.0))).commands.is_empty());
        let s = m.update(&inputs(start.wrapping_add(3000), false, 0, Some(0.0)));
        assert_eq!(s.commands.burner, Some(false));
        assert_eq!(s.commands.beacon, Some(true));
    }

    #[test]
    fn test_terminal_is_absorbing() {
        let mut m = MissionStateMachine::resume(MissionPhase::from_ordinal(7));
        assert_eq!(m.phase(), MissionPhase::Terminal(PhaseFault::UnknownOrdinal(7)));
        let s = m.update(&inputs(0, true, 1000, Some(0.0)));
        assert!(!s.transitioned);
        assert!(s.commands.is_empty());
    }

    #[test]
    fn test_final_is_absorbing() {
        let mut m = MissionStateMachine::resume(MissionPhase::DescentSettled(SettledStage::Final));
        for t in 0..10 {
            let s = m.update(&inputs(t * 1000, t % 2 == 0, 500, Some(5000.0)));
            assert!(!s.transitioned);
        }
    }
}
