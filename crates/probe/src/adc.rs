//! ADS1115 16-bit ADC driver over I2C for the soil-moisture probe.
//!
//! Reads one single-ended channel at PGA ±4.096 V, 128 SPS, single-shot mode.
//! Calibrate `raw_dry` / `raw_wet` in `config.toml` against this range
//! (capacitive probes on 3.3 V typically land near 26000 dry, 12000 wet).

use rppal::i2c::I2c;
use std::{thread, time::Duration};

use crate::MoistureProbe;

// ── ADS1115 register addresses ──────────────────────────────────────────────

/// Conversion result register (read-only, 16-bit signed).
const REG_CONVERSION: u8 = 0x00;
/// Configuration register (read/write).
const REG_CONFIG: u8 = 0x01;

// ── Config register bit fields ──────────────────────────────────────────────
//
// Layout (MSB first):
//   [15]    OS       — write 1 to start single-shot conversion
//   [14:12] MUX      — input multiplexer (channel selection)
//   [11:9]  PGA      — programmable gain amplifier
//   [8]     MODE     — 0 = continuous, 1 = single-shot
//   [7:5]   DR       — data rate
//   [4:2]   COMP_*
//   [1:0]   COMP_QUE — 11 = disable comparator

/// OS=1, PGA=001 (±4.096 V), MODE=1, DR=100 (128 SPS), COMP_QUE=11.
const CONFIG_BASE: u16 = 0b1_000_001_1_100_0_0_0_11;

const MUX_SHIFT: u8 = 12;
const MUX_SINGLE_ENDED: [u16; 4] = [0b100, 0b101, 0b110, 0b111];

/// Highest single-ended channel index (AIN0–AIN3).
pub const MAX_CHANNEL: u8 = 3;

/// ~7.8 ms conversion at 128 SPS.
const CONVERSION_WAIT: Duration = Duration::from_millis(9);

/// Bit 15 of the config register reads back as the conversion-ready flag.
const OS_READY_BIT: u16 = 1 << 15;

/// Maximum single-ended reading (15-bit unsigned).
pub const ADS1115_MAX: i64 = 32767;

fn config_for_channel(channel: u8) -> u16 {
    CONFIG_BASE | (MUX_SINGLE_ENDED[channel as usize] << MUX_SHIFT)
}

pub struct Ads1115 {
    i2c: I2c,
    channel: u8,
}

impl Ads1115 {
    /// Open I2C bus 1 and address the ADS1115 at `addr`.
    pub fn new(addr: u16, channel: u8) -> anyhow::Result<Self> {
        anyhow::ensure!(
            channel <= MAX_CHANNEL,
            "ADS1115 channel {channel} out of range (0–{MAX_CHANNEL})"
        );

        let mut i2c = I2c::new()?;
        i2c.set_slave_address(addr)?;

        tracing::info!(
            addr = format_args!("0x{addr:02x}"),
            channel,
            "ads1115 initialised"
        );

        Ok(Self { i2c, channel })
    }
}

impl MoistureProbe for Ads1115 {
    fn read_raw(&mut self) -> anyhow::Result<i64> {
        let config = config_for_channel(self.channel);
        self.i2c.block_write(REG_CONFIG, &config.to_be_bytes())?;

        thread::sleep(CONVERSION_WAIT);

        for _ in 0..3 {
            let mut buf = [0u8; 2];
            self.i2c.block_read(REG_CONFIG, &mut buf)?;
            if u16::from_be_bytes(buf) & OS_READY_BIT != 0 {
                break;
            }
            thread::sleep(Duration::from_millis(2));
        }

        let mut buf = [0u8; 2];
        self.i2c.block_read(REG_CONVERSION, &mut buf)?;

        // Single-ended reads are non-negative; a negative value means bus noise.
        Ok((i16::from_be_bytes(buf) as i64).clamp(0, ADS1115_MAX))
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
