//! Dualstat Runner
//!
//! Runs a valve + fan device against a simulated host: service calls are
//! logged by a host task and the room temperature drifts with the device's
//! action.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use dualstat::hvac_runtime::service::{ChannelBus, DispatchedCall};
use dualstat::hvac_runtime::{HvacAction, HvacMode};
use dualstat::{DeviceConfig, ValveFanDevice};

/// Temperature change per cycle while heating or cooling
const ACTIVE_DRIFT: f64 = 0.2;
/// Fraction of the gap to ambient recovered per idle cycle
const AMBIENT_PULL: f64 = 0.05;

/// Valve and fan thermostat runner
#[derive(Parser, Debug)]
#[command(name = "dualstat")]
#[command(about = "Valve and fan thermostat runner", long_about = None)]
struct Args {
    /// Path to the device configuration (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Initial HVAC mode (off, heat, cool), overrides the configuration
    #[arg(long)]
    mode: Option<HvacMode>,

    /// Starting room temperature, also used as the ambient temperature
    #[arg(long, default_value = "24.0")]
    current_temp: f64,

    /// Target temperature, overrides the configuration
    #[arg(long)]
    target_temp: Option<f64>,

    /// Control cycle interval in milliseconds
    #[arg(long, default_value = "1000")]
    interval_ms: u64,

    /// Number of control cycles to run (0 runs until Ctrl+C)
    #[arg(long, default_value = "0")]
    cycles: u64,

    /// Print the effective configuration and exit
    #[arg(long)]
    dump_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("dualstat=info,hvac_runtime=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!("Starting dualstat v{}", env!("CARGO_PKG_VERSION"));

    let mut config = DeviceConfig::load(args.config.as_deref())?;
    if let Some(mode) = args.mode {
        config.initial_hvac_mode = mode;
    }
    if let Some(target) = args.target_temp {
        config.target_temp = Some(target);
    }

    if args.dump_config {
        println!("{}", config.to_toml_string()?);
        return Ok(());
    }

    let (bus, calls) = ChannelBus::new(64);
    let host = spawn_host(calls);

    let mut device = ValveFanDevice::from_config(&config, Arc::new(bus))?;
    device.environment().write().cur_temp = Some(args.current_temp);

    info!(
        "Device {} controls {:?} in {} mode",
        device.name(),
        device.device_ids(),
        device.hvac_mode()
    );

    run_control_loop(&mut device, &args).await;

    info!("Turning device off");
    device.shutdown().await;

    // Dropping the device closes the bus, which ends the host task
    drop(device);
    if let Err(e) = host.await {
        warn!("Host task did not finish cleanly: {}", e);
    }

    info!("Shutdown complete");
    Ok(())
}

/// Log every service call the device sends
fn spawn_host(mut calls: mpsc::Receiver<DispatchedCall>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(dispatched) = calls.recv().await {
            info!(
                service = %dispatched.call.qualified_name(),
                data = %dispatched.call.data,
                context = %dispatched.context.id,
                "Host received service call"
            );
        }
    })
}

async fn run_control_loop<D: dualstat::DemandSource>(device: &mut ValveFanDevice<D>, args: &Args) {
    let ambient = args.current_temp;
    let mut ticker = tokio::time::interval(Duration::from_millis(args.interval_ms.max(1)));
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let mut cycle: u64 = 0;
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = &mut shutdown => break,
        }

        let temp = {
            let mut environment = device.environment().write();
            let cur = environment.cur_temp.unwrap_or(ambient);
            let next = match device.hvac_action() {
                HvacAction::Heating => cur + ACTIVE_DRIFT,
                HvacAction::Cooling => cur - ACTIVE_DRIFT,
                HvacAction::Idle | HvacAction::Off => cur + (ambient - cur) * AMBIENT_PULL,
            };
            environment.cur_temp = Some(next);
            next
        };

        let outcome = device.control_hvac(None, false).await;
        cycle += 1;
        info!(
            cycle,
            temp = %format!("{temp:.2}"),
            action = %device.hvac_action(),
            ?outcome,
            "Control cycle"
        );

        if args.cycles > 0 && cycle >= args.cycles {
            break;
        }
    }
}

/// Resolve on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down...");
        },
    }
}
