//! Desktop simulator for the TCN75A sensor console.
//!
//! Runs the core menu shell against a register-level sensor model on a
//! simulated I2C bus. Stdin is the console; threads stand in for the
//! board's interrupt sources and indicator loop.
//!
//! # Console commands
//!
//! | Input      | Action                                   |
//! |------------|------------------------------------------|
//! | `0`..`5`   | Main menu choices                        |
//! | `x`        | Redisplay the main menu                  |
//! | `!b<n>`    | Press button `n` (0..5, 5 clears alert)  |
//! | `!a<n>`    | Re-strap the sensor to `0x48 + n`        |
//! | `!t<deg>`  | Pin the ambient temperature              |
//! | `!t`       | Release the ambient temperature          |
//!
//! Close stdin (Ctrl-D) to quit. `RUST_LOG` sets the log level.

mod ambient;
mod board;
mod config;
mod console;
mod device;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use embassy_time::Instant;
use log::{error, info, warn};

use tcn75a_core::config::{
    ALERT_LED_PIN, DEFAULT_ADDRESS, EdgeConfig, I2C_FREQUENCY_HZ, INDICATOR_POLL_INTERVAL,
};
use tcn75a_core::{EdgeEvent, EdgeHandler, Indicator, MenuShell, Tcn75a};

use crate::ambient::{AmbientModel, AmbientOverride};
use crate::board::{LogLed, StatusLeds};
use crate::config::SimConfig;
use crate::console::SimCommand;
use crate::device::{SharedDevice, SimBus};

/// How long the menu waits for a key before checking queued button digits.
const CONSOLE_POLL: Duration = Duration::from_millis(20);

static EDGES: EdgeHandler = EdgeHandler::new(EdgeConfig::new());

/// Conversion loop. Doubles as the ALERT pin interrupt source.
fn spawn_conversions(
    device: SharedDevice,
    ambient: Arc<AmbientOverride>,
    config: SimConfig,
) -> std::io::Result<()> {
    thread::Builder::new()
        .name("conversions".into())
        .spawn(move || {
            let mut model = AmbientModel::new(&config);
            let dt = config.tick.as_secs_f64();
            loop {
                thread::sleep(config.tick);
                let temperature = ambient.resolve(&mut model, dt);
                let edges = device.with(|d| {
                    d.convert(temperature);
                    d.take_falling_edges()
                });
                for _ in 0..edges {
                    EDGES.on_edge(EdgeEvent::alert(Instant::now()));
                }
            }
        })?;
    Ok(())
}

fn spawn_indicator() -> std::io::Result<()> {
    let pause = Duration::from_micros(INDICATOR_POLL_INTERVAL.as_micros());
    thread::Builder::new()
        .name("indicator".into())
        .spawn(move || {
            let indicator = Indicator::new(LogLed::new("Alert", ALERT_LED_PIN));
            if let Err(e) = indicator.run(EDGES.latch(), || thread::sleep(pause)) {
                error!("Indicator stopped: {:?}", e);
            }
        })?;
    Ok(())
}

fn handle_command(command: SimCommand, device: &SharedDevice, ambient: &AmbientOverride) {
    match command {
        SimCommand::PressButton(n) => {
            if let Some(event) = EdgeEvent::button(n, Instant::now()) {
                let outcome = EDGES.on_edge(event);
                info!("Button {} -> {:?}", n, outcome);
            }
        }
        SimCommand::Restrap(address) => {
            device.restrap(address);
            info!("Sensor strapped to {:#04x}", address);
        }
        SimCommand::PinAmbient(degrees) => ambient.pin(degrees),
        SimCommand::ReleaseAmbient => ambient.release(),
    }
}

fn main() {
    env_logger::init();
    let config = SimConfig::from_env();
    info!(
        "Starting TCN75A simulator: sensor at {:#04x}, bus at {} kHz",
        DEFAULT_ADDRESS,
        I2C_FREQUENCY_HZ / 1_000
    );
    info!(
        "Ambient {:.1} C +/- {:.1}, conversion every {:?}",
        config.ambient, config.swing, config.tick
    );

    let device = SharedDevice::new(DEFAULT_ADDRESS);
    let ambient = Arc::new(AmbientOverride::default());

    if let Err(e) = spawn_conversions(device.clone(), Arc::clone(&ambient), config) {
        error!("Could not start conversion thread: {}", e);
        return;
    }
    if let Err(e) = spawn_indicator() {
        warn!("Could not start indicator thread: {}", e);
    }

    let console = {
        let device = device.clone();
        let ambient = Arc::clone(&ambient);
        console::spawn_stdin(CONSOLE_POLL, move |command| {
            handle_command(command, &device, &ambient)
        })
    };
    let console = match console {
        Ok(console) => console,
        Err(e) => {
            error!("Could not start stdin reader: {}", e);
            return;
        }
    };

    let sensor = Tcn75a::new(SimBus::new(device), DEFAULT_ADDRESS);
    let mut shell = MenuShell::new(sensor, console, StatusLeds::new(), &EDGES);
    shell.run();

    info!("Simulator exiting");
}
