//! Irrigation relay via GPIO. The `gpio` feature gates the real rppal
//! driver; without it, a mock implementation logs state changes.

use anyhow::Result;

#[cfg(feature = "gpio")]
use rppal::gpio::{Gpio, OutputPin};

use crate::actuation::ActuatorPort;

// ---------------------------------------------------------------------------
// Real GPIO relay (production — requires rppal + Raspberry Pi hardware)
// ---------------------------------------------------------------------------
#[cfg(feature = "gpio")]
pub struct IrrigationValve {
    pin: OutputPin,
    active_low: bool, // many relay boards are active-low
}

#[cfg(feature = "gpio")]
impl IrrigationValve {
    pub fn new(gpio_pin: u8, active_low: bool) -> Result<Self> {
        let gpio = Gpio::new()?;
        let mut pin = gpio.get(gpio_pin)?.into_output();

        // Fail-safe: released before anyone asks.
        if active_low {
            pin.set_high();
        } else {
            pin.set_low();
        }
        tracing::info!(gpio_pin, active_low, "irrigation relay initialised");

        Ok(Self { pin, active_low })
    }

    fn drive(&mut self, on: bool) {
        // active-low: LOW = ON, HIGH = OFF
        if on != self.active_low {
            self.pin.set_high();
        } else {
            self.pin.set_low();
        }
    }
}

#[cfg(feature = "gpio")]
impl ActuatorPort for IrrigationValve {
    fn set(&mut self) {
        self.drive(true);
    }

    fn clear(&mut self) {
        self.drive(false);
    }
}

// ---------------------------------------------------------------------------
// Mock relay (development — no hardware, logs state)
// ---------------------------------------------------------------------------
#[cfg(not(feature = "gpio"))]
pub struct IrrigationValve {
    pub(crate) on: bool,
}

#[cfg(not(feature = "gpio"))]
impl IrrigationValve {
    pub fn new(gpio_pin: u8, _active_low: bool) -> Result<Self> {
        tracing::info!(gpio_pin, "[mock-gpio] irrigation relay registered (not wired)");
        Ok(Self { on: false })
    }
}

#[cfg(not(feature = "gpio"))]
impl ActuatorPort for IrrigationValve {
    fn set(&mut self) {
        self.on = true;
        tracing::debug!("[mock-gpio] relay set ON");
    }

    fn clear(&mut self) {
        self.on = false;
        tracing::debug!("[mock-gpio] relay set OFF");
    }
}

// ---------------------------------------------------------------------------
// Simulator feedback
// ---------------------------------------------------------------------------

/// Wraps a relay and mirrors its state into the simulator's watering flag so
/// simulated soil responds to irrigation.
#[cfg(feature = "sim")]
pub struct Mirrored<A> {
    inner: A,
    flag: garden_probe::sim::WateringFlag,
}

#[cfg(feature = "sim")]
impl<A> Mirrored<A> {
    pub fn new(inner: A, flag: garden_probe::sim::WateringFlag) -> Self {
        Self { inner, flag }
    }
}

#[cfg(feature = "sim")]
impl<A: ActuatorPort> ActuatorPort for Mirrored<A> {
    fn set(&mut self) {
        self.inner.set();
        self.flag.set(true);
    }

    fn clear(&mut self) {
        self.inner.clear();
        self.flag.set(false);
    }
}

// ===========================================================================
// Tests
// ===========================================================================
