//! The superloop: sense, decide, act, report.
//!
//! One [`TelemetryLoop::run_cycle`] reads every collaborator in a fixed
//! order, advances the mission, fills and finalizes the packet, then hands
//! the same 60 bytes to the radio and the store. Nothing in a cycle can stop
//! the next one: collaborator failures become status bits or a
//! [`CycleReport`] entry.

use telemetry_proto::{MissionPhase, Packet, StatusFlags, PACKET_LEN};

use crate::altitude::GroundReference;
use crate::config::{PROBE_POLL_INTERVAL_MS, PROBE_RESOLUTION, TEAM_ID};
use crate::gps::{drain_one, NmeaDecoder, NmeaSlot};
use crate::mission::{Actuators, MissionInputs, MissionStateMachine};
use crate::onewire::{ProbePoller, TemperatureProbe};
use crate::radio::{RadioConfig, RadioError, Transmitter};
use crate::sensors::analog::{to_milli, AnalogChannel};
use crate::sensors::{BarometerSample, InertialSample, LastKnown, SensorError, SensorSuite};
use crate::storage::{Filesystem, StoreOutcome, TelemetryStore};
use crate::time::Clock;

/// Everything the loop owns, handed over once at construction.
pub struct LoopParts<'a, S, T, G, A, R, F: Filesystem, C> {
    pub sensors: S,
    pub probe: T,
    pub gps: G,
    pub nmea: &'a NmeaSlot,
    pub actuators: A,
    pub radio: R,
    pub store: TelemetryStore<F>,
    pub clock: C,
}

/// Outcome of [`TelemetryLoop::start`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StartReport {
    pub ground_reference: bool,
    pub probe_present: bool,
    pub sensors: Result<(), SensorError>,
    pub radio: Result<(), RadioError>,
}

/// What one cycle did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CycleReport {
    pub sequence: u16,
    pub phase: MissionPhase,
    pub transitioned: bool,
    pub status: StatusFlags,
    pub nmea_line: bool,
    pub radio: Result<(), RadioError>,
    pub store: StoreOutcome,
}

/// Analog channels in sampling order, indexed like `TelemetryLoop::analog`.
const ANALOG_ORDER: [AnalogChannel; 3] = AnalogChannel::ALL;

pub struct TelemetryLoop<'a, S, T, G, A, R, F: Filesystem, C> {
    sensors: S,
    probe: ProbePoller<T>,
    gps: G,
    nmea: &'a NmeaSlot,
    actuators: A,
    radio: R,
    store: TelemetryStore<F>,
    clock: C,

    mission: MissionStateMachine,
    ground: GroundReference,
    packet: Packet,

    barometer: LastKnown<BarometerSample>,
    inertial: LastKnown<InertialSample>,
    magnetometer: LastKnown<[i16; 3]>,
    co2: LastKnown<u16>,
    /// Scaled (x1000) analog values.
    analog: [LastKnown<u16>; 3],
}

impl<'a, S, T, G, A, R, F, C> TelemetryLoop<'a, S, T, G, A, R, F, C>
where
    S: SensorSuite,
    T: TemperatureProbe,
    G: NmeaDecoder,
    A: Actuators,
    R: Transmitter,
    F: Filesystem,
    C: Clock,
{
    pub fn new(parts: LoopParts<'a, S, T, G, A, R, F, C>) -> Self {
        Self {
            sensors: parts.sensors,
            probe: ProbePoller::new(parts.probe, PROBE_POLL_INTERVAL_MS),
            gps: parts.gps,
            nmea: parts.nmea,
            actuators: parts.actuators,
            radio: parts.radio,
            store: parts.store,
            clock: parts.clock,
            mission: MissionStateMachine::new(),
            ground: GroundReference::new(),
            packet: Packet::new(TEAM_ID),
            barometer: LastKnown::new(BarometerSample::default()),
            inertial: LastKnown::new(InertialSample::default()),
            magnetometer: LastKnown::new([0; 3]),
            co2: LastKnown::new(0),
            analog: [LastKnown::new(0); 3],
        }
    }

    /// Boot sequence: sensors, ground reference, probe, radio.
    pub fn start(&mut self) -> StartReport {
        let sensors = self.sensors.begin();
        if let Err(e) = sensors {
            warn!("sensor start failed: {}", e);
        }

        let sample = self.barometer.update(self.sensors.read_barometer());
        let pressure = (!self.barometer.is_faulted()).then_some(sample.pressure_pa as f32);
        self.ground.observe(pressure);
        if !self.ground.is_captured() {
            warn!("no ground reference at start, altitude unknown until first good sample");
        }

        let probe_present = self.probe.begin(self.clock.now_ms(), PROBE_RESOLUTION);

        let radio = self.radio.configure(&RadioConfig::FLIGHT);
        if let Err(e) = radio {
            error!("radio configuration failed: {}", e);
        }

        info!("flight core started");
        StartReport {
            ground_reference: self.ground.is_captured(),
            probe_present,
            sensors,
            radio,
        }
    }

    /// Run cycles forever.
    pub fn run(&mut self) -> ! {
        loop {
            let _ = self.run_cycle();
        }
    }

    /// One full sense/decide/act/report pass.
    pub fn run_cycle(&mut self) -> CycleReport {
        let now = self.clock.now_ms();

        let baro = self.barometer.update(self.sensors.read_barometer());
        self.packet.temperature_centi = baro.temperature_centi;
        self.packet.pressure = baro.pressure_pa;
        let altitude = if self.barometer.is_faulted() {
            None
        } else {
            self.ground.observe(Some(baro.pressure_pa as f32))
        };

        let inertial = self.inertial.update(self.sensors.read_inertial());
        self.packet.acceleration = inertial.acceleration;
        self.packet.angular_rate = inertial.angular_rate;

        self.packet.magnetic = self.magnetometer.update(self.sensors.read_magnetometer());

        self.packet.probe_temperature = self.probe.poll(now);

        for (slot, channel) in self.analog.iter_mut().zip(ANALOG_ORDER) {
            let scaled = self
                .sensors
                .read_analog(channel)
                .map(|raw| to_milli(channel.scale(raw)));
            slot.update(scaled);
        }
        self.packet.light = self.analog[0].value();
        self.packet.methane = self.analog[1].value();
        self.packet.oxygen = self.analog[2].value();

        self.packet.co2 = self.co2.update(self.sensors.read_co2());

        let nmea_line = drain_one(self.nmea, &mut self.gps);
        let fix = self.gps.fix();
        self.packet.latitude = fix.latitude;
        self.packet.longitude = fix.longitude;
        self.packet.gps_altitude = fix.altitude;
        self.packet.gps_fix = fix.quality;

        let step = self.mission.update(&MissionInputs {
            now_ms: now,
            switch_open: self.sensors.switch_open(),
            light: self.packet.light,
            altitude_m: altitude,
        });
        self.actuators.apply(step.commands);

        let mut status = StatusFlags::with_phase(step.phase);
        status.set(StatusFlags::GPS_FIX, fix.valid);
        status.set(StatusFlags::CO2_FAULT, self.co2.is_faulted());
        status.set(StatusFlags::MAGNETOMETER_FAULT, self.magnetometer.is_faulted());
        status.set(StatusFlags::INERTIAL_FAULT, self.inertial.is_faulted());
        status.set(StatusFlags::BAROMETER_FAULT, self.barometer.is_faulted());
        self.packet.status = status;

        self.packet.time_ms = self.clock.now_ms();
        self.packet.sequence = self.packet.sequence.wrapping_add(1);
        let bytes: [u8; PACKET_LEN] = self.packet.finalize();

        let radio = self.radio.transmit_packet(&bytes);
        if let Err(e) = radio {
            warn!("radio send failed: {}", e);
        }
        let store = self.store.append(&bytes);

        trace!("cycle {} status {}", self.packet.sequence, status.bits());
        CycleReport {
            sequence: self.packet.sequence,
            phase: step.phase,
            transitioned: step.transitioned,
            status,
            nmea_line,
            radio,
            store,
        }
    }

    /// Packet as of the last cycle.
    pub fn packet(&self) -> &Packet {
        &self.packet
    }

    pub fn phase(&self) -> MissionPhase {
        self.mission.phase()
    }

    pub fn ground_reference(&self) -> &GroundReference {
        &self.ground
    }

    pub fn sensors_mut(&mut self) -> &mut S {
        &mut self.sensors
    }

    pub fn actuators(&self) -> &A {
        &self.actuators
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    pub fn store(&self) -> &TelemetryStore<F> {
        &self.store
    }
}
