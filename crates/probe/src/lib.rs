//! Raw sensor acquisition for the garden controller.
//!
//! Two probe roles are modelled: the soil-moisture probe (a raw ADC count)
//! and the climate probe (temperature + relative humidity). Hardware drivers
//! are feature-gated; the simulator lets the controller run on a laptop.

pub mod climate;

#[cfg(feature = "adc")]
pub mod adc;

#[cfg(feature = "sim")]
pub mod sim;

/// One climate read. Either value is `None` when the probe failed to
/// produce it (DHT sensors drop reads regularly).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClimateReading {
    pub temperature_c: Option<f32>,
    pub humidity_pct: Option<f32>,
}

/// Source of raw soil-moisture counts.
pub trait MoistureProbe {
    /// Read one raw ADC count. Higher counts mean drier soil.
    fn read_raw(&mut self) -> anyhow::Result<i64>;
}

/// Source of ambient temperature and humidity.
pub trait ClimateProbe {
    fn read(&mut self) -> ClimateReading;
}

impl<P: MoistureProbe + ?Sized> MoistureProbe for Box<P> {
    fn read_raw(&mut self) -> anyhow::Result<i64> {
        (**self).read_raw()
    }
}

impl<P: ClimateProbe + ?Sized> ClimateProbe for Box<P> {
    fn read(&mut self) -> ClimateReading {
        (**self).read()
    }
}
