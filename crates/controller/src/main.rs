use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use garden_controller::actuation::{ActuationController, ActuatorPort};
use garden_controller::clock::SystemClock;
use garden_controller::config::{self, Config};
use garden_controller::control::ControlLoop;
use garden_controller::link::{AlwaysUp, InterfaceLink, LinkMonitor};
use garden_controller::remote::RestClient;
use garden_controller::sample::ProbeSensors;
use garden_controller::state;
use garden_controller::sync::SyncScheduler;
use garden_controller::valve::IrrigationValve;
use garden_controller::web;
use garden_probe::climate::IioClimate;
use garden_probe::{ClimateProbe, MoistureProbe};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // ── Config ──────────────────────────────────────────────────────
    let config_path =
        PathBuf::from(env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string()));
    let cfg = config::load(&config_path)?;
    let profile = cfg.profile.to_profile()?;

    // ── Relay (forced OFF before anything else runs) ────────────────
    let gpio_pin = u8::try_from(cfg.relay.gpio_pin).context("relay.gpio_pin out of range")?;
    let valve = IrrigationValve::new(gpio_pin, cfg.relay.active_low)
        .context("failed to initialise irrigation relay")?;

    // ── Probes ──────────────────────────────────────────────────────
    let (relay, moisture) = moisture_side(&cfg, valve)?;
    let actuation = ActuationController::new(relay);
    let sensors = ProbeSensors::new(
        moisture,
        climate_probe(&cfg),
        cfg.moisture.raw_dry,
        cfg.moisture.raw_wet,
    );

    // ── Remote + link ───────────────────────────────────────────────
    let link: Box<dyn LinkMonitor> = match &cfg.network.interface {
        Some(iface) => {
            info!(interface = %iface, "watching link state");
            Box::new(InterfaceLink::new(iface))
        }
        None => Box::new(AlwaysUp),
    };
    let remote = RestClient::new(&cfg.remote.base_url, &cfg.remote.api_key, cfg.remote.timeout())?;
    let sync = SyncScheduler::new(remote, link, cfg.remote.garden_id.clone());

    // ── Shared state + status API ───────────────────────────────────
    let shared = state::shared();
    shared
        .write()
        .await
        .record_system("controller started".to_string());

    if cfg.web.enabled {
        let web_state = shared.clone();
        let port = cfg.web.port;
        tokio::spawn(async move {
            if let Err(e) = web::serve(web_state, port).await {
                error!("status API stopped: {e:#}");
            }
        });
    }

    // ── Control loop ────────────────────────────────────────────────
    let mut control = ControlLoop::new(sensors, actuation, sync, SystemClock, profile, shared);
    control.bootstrap().await;
    control
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("cannot listen for ctrl-c: {e}");
                std::future::pending::<()>().await;
            }
            info!("shutdown requested");
        })
        .await;

    Ok(())
}

type MoistureSide = (Box<dyn ActuatorPort>, Box<dyn MoistureProbe>);

#[cfg(feature = "adc")]
fn moisture_side(cfg: &Config, valve: IrrigationValve) -> Result<MoistureSide> {
    use garden_probe::adc::Ads1115;

    let adc = Ads1115::new(cfg.moisture.adc_addr, cfg.moisture.adc_channel)
        .context("failed to open ADS1115")?;
    info!(
        addr = format!("{:#04x}", cfg.moisture.adc_addr),
        channel = cfg.moisture.adc_channel,
        "soil moisture probe on ADS1115"
    );
    let relay: Box<dyn ActuatorPort> = Box::new(valve);
    let probe: Box<dyn MoistureProbe> = Box::new(adc);
    Ok((relay, probe))
}

/// Simulated soil that responds to the relay.
#[cfg(all(feature = "sim", not(feature = "adc")))]
fn moisture_side(cfg: &Config, valve: IrrigationValve) -> Result<MoistureSide> {
    use garden_controller::valve::Mirrored;
    use garden_probe::sim::{Scenario, SoilMoistureSim, WateringFlag};

    let scenario = Scenario::from_str_lossy(&cfg.sim.scenario);
    let watering = WateringFlag::default();
    let soil = SoilMoistureSim::new(
        scenario,
        cfg.moisture.raw_dry as f64,
        cfg.moisture.raw_wet as f64,
        watering.clone(),
    );
    info!(%scenario, "using simulated soil moisture probe");
    let relay: Box<dyn ActuatorPort> = Box::new(Mirrored::new(valve, watering));
    let probe: Box<dyn MoistureProbe> = Box::new(soil);
    Ok((relay, probe))
}

#[cfg(not(any(feature = "sim", feature = "adc")))]
fn moisture_side(_cfg: &Config, _valve: IrrigationValve) -> Result<MoistureSide> {
    anyhow::bail!("no soil moisture probe compiled in; enable the `adc` or `sim` feature")
}

fn climate_probe(cfg: &Config) -> Box<dyn ClimateProbe> {
    if let Some(dir) = &cfg.climate.iio_device {
        info!(device = %dir.display(), "climate probe on IIO");
        return Box::new(IioClimate::new(dir.clone()));
    }

    #[cfg(feature = "sim")]
    {
        use garden_probe::sim::{ClimateSim, Scenario};
        info!("using simulated climate probe");
        Box::new(ClimateSim::new(Scenario::from_str_lossy(&cfg.sim.scenario)))
    }

    #[cfg(not(feature = "sim"))]
    {
        tracing::warn!("no climate probe configured; temperature and humidity unavailable");
        Box::new(garden_probe::climate::NoClimate)
    }
}
