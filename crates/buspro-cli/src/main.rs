//! Command-line interface for the Buspro field bus.

mod args;
mod poller;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use buspro_bus::{handler_fn, Bus, SharedHandler};
use buspro_core::codec::{self, TelegramCodec};
use buspro_core::config::{env_vars, BusproConfig};
use buspro_core::{Address, OperateCode, Telegram};
use buspro_scheduler::ConsumerRegistry;

use crate::poller::{ChannelStatusListener, ChannelStatusPoller};

/// Buspro - talk to an HDL Buspro bus over UDP.
#[derive(Parser, Debug)]
#[command(name = "buspro")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Action to perform.
    #[command(subcommand)]
    command: Command,

    /// Configuration file (defaults to ./buspro.toml when present).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Print every telegram seen on the bus.
    Monitor {
        /// Stop after this many seconds instead of waiting for Ctrl-C.
        #[arg(short, long)]
        duration: Option<u64>,
    },
    /// Send one telegram.
    Send {
        /// Target address, e.g. 1.10.
        #[arg(short, long, value_parser = args::parse_address)]
        address: Address,
        /// Operate code, hex (0x0031) or decimal.
        #[arg(short, long, value_parser = args::parse_operate_code)]
        operate_code: OperateCode,
        /// Comma-separated payload bytes, e.g. 1,100,0,0.
        #[arg(short, long, default_value = "")]
        payload: String,
        /// Print the encoded frame instead of sending it.
        #[arg(long)]
        dry_run: bool,
    },
    /// Poll channel status of devices on the scheduler.
    Poll {
        /// Device address; repeat for several devices.
        #[arg(short = 'D', long = "device", required = true, value_parser = args::parse_address)]
        devices: Vec<Address>,
        /// Poll interval in seconds; 0 uses the scheduler default.
        #[arg(short, long, default_value_t = 0)]
        interval: u64,
        /// Stop after this many seconds instead of waiting for Ctrl-C.
        #[arg(short, long)]
        duration: Option<u64>,
    },
    /// Decode a hex-encoded frame.
    Decode {
        /// Frame bytes as hex; spaces and colons are ignored.
        frame: String,
    },
    /// Print the effective configuration.
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = BusproConfig::load(args.config.as_deref()).context("loading configuration")?;

    match args.command {
        Command::Monitor { duration } => run_monitor(config, duration).await,
        Command::Send {
            address,
            operate_code,
            payload,
            dry_run,
        } => run_send(config, address, operate_code, payload, dry_run).await,
        Command::Poll {
            devices,
            interval,
            duration,
        } => run_poll(config, devices, interval, duration).await,
        Command::Decode { frame } => run_decode(&frame),
        Command::Config => {
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}

fn init_logging(verbose: bool) {
    let json_logging = std::env::var(env_vars::LOG_JSON)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(false);

    let default_directive = if verbose { "buspro=debug" } else { "buspro=info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));

    // Logs go to stderr; stdout carries command output.
    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .compact()
            .with_writer(std::io::stderr)
            .init();
    }
}

async fn wait(duration: Option<u64>) -> Result<()> {
    match duration {
        Some(secs) => {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(secs)) => {}
                res = tokio::signal::ctrl_c() => res?,
            }
        }
        None => tokio::signal::ctrl_c().await?,
    }
    Ok(())
}

async fn run_monitor(config: BusproConfig, duration: Option<u64>) -> Result<()> {
    let bus = Bus::new(config.bus)?;

    let printer: SharedHandler = handler_fn(|telegram| {
        println!(
            "{} {} {:?}",
            chrono::Local::now().format("%H:%M:%S%.3f"),
            telegram,
            telegram.source_device_type
        );
        Ok(())
    });
    bus.register_all_messages(printer);
    bus.start().await?;

    wait(duration).await?;
    bus.stop().await;

    println!("{}", serde_json::to_string_pretty(&bus.stats())?);
    Ok(())
}

async fn run_send(
    config: BusproConfig,
    address: Address,
    operate_code: OperateCode,
    payload: String,
    dry_run: bool,
) -> Result<()> {
    let payload = args::parse_payload(&payload).map_err(anyhow::Error::msg)?;
    let telegram = Telegram::new(address, operate_code, payload)
        .with_source(config.bus.source_address);

    if dry_run {
        let bytes = TelegramCodec::new(config.bus.origin_ip).encode(&telegram)?;
        println!("{}", hex::encode(bytes));
        return Ok(());
    }

    let bus = Bus::new(config.bus)?;
    bus.start().await?;
    let sent = bus.send(&telegram).await;
    bus.stop().await;

    if !sent? {
        anyhow::bail!("telegram to {} was not sent", address);
    }
    println!("Sent {}", telegram);
    Ok(())
}

async fn run_poll(
    config: BusproConfig,
    devices: Vec<Address>,
    interval: u64,
    duration: Option<u64>,
) -> Result<()> {
    let bus = Arc::new(Bus::new(config.bus.clone())?);
    let registry = Arc::new(ConsumerRegistry::new());

    let scheduler = buspro_scheduler::Scheduler::from_config(registry.clone(), &config.scheduler);
    let (handle, task) = buspro_scheduler::spawn(scheduler, config.scheduler.tick());

    for address in &devices {
        let id = poller::consumer_id(*address);
        registry.insert(
            id.clone(),
            Arc::new(ChannelStatusPoller::new(bus.clone(), *address)),
        );
        bus.register(
            *address,
            Arc::new(ChannelStatusListener::new(*address, handle.clone())),
        );
        handle.register(id, Duration::from_secs(interval));
    }

    bus.start().await?;
    info!(category = "poll", devices = devices.len(), interval_secs = interval, "Polling");

    wait(duration).await?;

    handle.shutdown();
    let _ = task.await;
    bus.stop().await;

    println!("{}", serde_json::to_string_pretty(&bus.stats())?);
    Ok(())
}

fn run_decode(frame: &str) -> Result<()> {
    let raw = args::parse_frame(frame).map_err(anyhow::Error::msg)?;
    let telegram = codec::decode(&raw, None)?;

    println!("{}", telegram);
    println!("  source:      {}", telegram.source_address);
    println!("  device type: {:?}", telegram.source_device_type);
    println!("  operate:     {:?}", telegram.operate_code);
    println!("  target:      {}", telegram.target_address);
    println!("  payload:     [{}]", telegram.payload_hex());
    if let Some(origin) = telegram.origin {
        println!("  origin:      {}", origin);
    }
    Ok(())
}
