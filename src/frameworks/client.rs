// Framework bootstrap for the race client runtime.

use crate::domain::NetTuning;
use crate::frameworks::config;
use crate::interface_adapters::net::{Cadence, DeviceEvent, Frame, room_url, run_room_connection};
use crate::interface_adapters::utils::MonotonicClock;
use crate::use_cases::NetSession;

use std::io::Result;
use tokio::sync::{mpsc, watch};

const DEFAULT_LOG_FILTER: &str = "warn,race_netcode=info";

fn init_runtime() {
    let _ = dotenvy::dotenv();

    // Socket-level chatter from tungstenite stays at warn unless RUST_LOG asks.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

pub fn default_cadence() -> Cadence {
    Cadence {
        input: config::INPUT_SEND_INTERVAL,
        probe: config::LATENCY_PROBE_INTERVAL,
        frame: config::FRAME_INTERVAL,
    }
}

/// Handles for a host driving a spawned room connection.
pub struct ClientHandle {
    pub events_tx: mpsc::Sender<DeviceEvent>,
    pub frames_rx: watch::Receiver<Frame>,
    pub task: tokio::task::JoinHandle<Result<()>>,
}

/// Spawns one room connection. Dropping `events_tx` closes it.
///
/// Fails up front on an invalid room URL or tuning.
pub fn spawn(
    base_url: &str,
    room: &str,
    player_name: &str,
    tuning: NetTuning,
    cadence: Cadence,
) -> Result<ClientHandle> {
    tuning.validate().map_err(std::io::Error::other)?;
    let url = room_url(base_url, room, player_name).map_err(std::io::Error::other)?;
    let (events_tx, mut events_rx) = mpsc::channel(config::DEVICE_CHANNEL_CAPACITY);
    let (frames_tx, frames_rx) = watch::channel(Frame::default());

    let task = tokio::spawn(async move {
        let mut session = NetSession::new(MonotonicClock::new(), tuning);
        run_room_connection(&url, &mut session, &mut events_rx, &frames_tx, cadence)
            .await
            .map_err(std::io::Error::other)
    });

    Ok(ClientHandle {
        events_tx,
        frames_rx,
        task,
    })
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let tuning = config::tuning().inspect_err(|e| {
        tracing::error!(error = %e, "failed to load tuning");
    });
    let tuning = tuning.map_err(std::io::Error::other)?;

    let base_url = config::server_url();
    let room = config::room();
    let player_name = config::player_name();
    tracing::info!(%base_url, %room, %player_name, "joining race room");

    let handle = spawn(&base_url, &room, &player_name, tuning, default_cadence())?;
    let ClientHandle {
        events_tx,
        mut frames_rx,
        task,
    } = handle;

    // Headless: log the roster whenever it changes, leave on Ctrl-C.
    let watcher = tokio::spawn(async move {
        let mut last_count = usize::MAX;
        while frames_rx.changed().await.is_ok() {
            let count = frames_rx.borrow_and_update().entities.len();
            if count != last_count {
                tracing::info!(entities = count, "rendered roster changed");
                last_count = count;
            }
        }
    });

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    let mut task = task;
    let result = tokio::select! {
        joined = &mut task => joined,
        _ = shutdown => {
            tracing::info!("shutdown requested");
            drop(events_tx);
            task.await
        }
    };
    watcher.abort();

    result.map_err(std::io::Error::other)?
}
