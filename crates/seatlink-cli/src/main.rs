mod cli;
mod config;
mod kiosk;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command, RunOpts};
use config::load_config;
use kiosk::Seat;
use seatlink_core::SessionConfig;
use seatlink_hardware::serial;
use seatlink_hardware::{SerialSettings, SpinDelay, SystemClock};
use seatlink_protocol::payload::card_request_for;
use seatlink_session::SessionManager;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Validate => {
            info!(
                device = %config.device_id,
                control_topic = %config.topics().command(),
                "configuration is valid"
            );
            Ok(())
        }
        Command::ShowConfig => {
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
        Command::Run(opts) => run(config, opts).await,
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();
}

async fn run(config: SessionConfig, opts: RunOpts) -> Result<()> {
    let settings = SerialSettings::new(opts.ser.dev.clone()).with_baud_rate(opts.ser.baud);
    let (tx, mut rx) =
        serial::open(&settings).with_context(|| format!("opening {}", settings.path))?;

    let mut session = SessionManager::new(config, tx, SystemClock::new(), SpinDelay)?;
    let producer = session
        .take_rx_producer()
        .context("receive producer already taken")?;

    // The blocking reader stands in for the RX interrupt.
    let stop = Arc::new(AtomicBool::new(false));
    let reader_stop = Arc::clone(&stop);
    let mut reader = tokio::task::spawn_blocking(move || -> Result<()> {
        while !reader_stop.load(Ordering::Relaxed) {
            rx.pump(|byte| {
                producer.append(byte);
            })?;
        }
        Ok(())
    });

    let mut tick = tokio::time::interval(Duration::from_millis(opts.tick_ms.max(1)));
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut heartbeat = tokio::time::interval(Duration::from_secs(1));
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut seat = Seat::new(opts.price_per_min);
    let mut card = opts.card.map(|uid| uid.0);
    let mut reader_done = false;

    info!("Session started on {} at {} baud", settings.path, settings.baud_rate);

    loop {
        tokio::select! {
            _ = tick.tick() => {
                let state = session.poll();

                let followup = seat.apply(&session.take_remote_commands());
                if followup.restart {
                    session.restart();
                    continue;
                }
                if followup.publish_state {
                    publish_state(&mut session, &seat);
                }

                if state.is_running()
                    && let Some(uid) = &card
                {
                    let request = card_request_for(session.topics(), uid);
                    if session.try_enqueue_publish(request).is_ok() {
                        info!("Card request queued");
                        card = None;
                    }
                }
            }
            _ = heartbeat.tick() => {
                seat.tick_second();
                if session.is_running() {
                    publish_state(&mut session, &seat);
                }
            }
            result = &mut reader => {
                reader_done = true;
                match result {
                    Ok(Ok(())) => warn!("Serial reader stopped"),
                    Ok(Err(e)) => error!("Serial reader failed: {e:#}"),
                    Err(e) => error!("Serial reader panicked: {e}"),
                }
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, shutting down");
                break;
            }
        }
    }

    stop.store(true, Ordering::Relaxed);
    if !reader_done {
        // Returns within one read timeout.
        let _ = reader.await;
    }

    println!("{}", serde_json::to_string_pretty(session.stats())?);
    Ok(())
}

fn publish_state<T, C, D>(session: &mut SessionManager<T, C, D>, seat: &Seat)
where
    T: seatlink_hardware::SerialTx,
    C: seatlink_hardware::Clock,
    D: seatlink_hardware::DelayUs,
{
    let request = seat.state.to_request(session.topics());
    if let Err(e) = session.try_enqueue_publish(request) {
        // Another topic is pending; the next heartbeat carries the state.
        tracing::debug!("State publish skipped: {e}");
    }
}
