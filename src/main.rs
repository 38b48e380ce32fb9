//! gym-sync: command-line front end for the training record sync layer
//!
//! Records training sets through the coordinator, triggers manual syncs,
//! and can run as a long-lived process that drains the local queue whenever
//! connectivity returns.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

use gym_sync::connectivity::{ConnectivityObserver, ManualConnectivity, ProbeConnectivity};
use gym_sync::remote::HttpRemoteStore;
use gym_sync::{Config, LocalQueue, ManualSyncOutcome, SyncCoordinator, WriteRequest};

#[derive(Parser)]
#[command(name = "gym-sync")]
#[command(about = "Offline-first training record sync")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "gym-sync.toml")]
    config: String,

    /// Data directory holding the local queue
    #[arg(short, long, env = "GYM_SYNC_DATA_DIR")]
    data_dir: Option<String>,

    /// Treat the network as unavailable
    #[arg(long)]
    offline: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Record one training set
    Record {
        /// Member id (defaults to client.user_id)
        #[arg(long, env = "GYM_SYNC_USER")]
        user: Option<String>,
        #[arg(long)]
        routine: String,
        #[arg(long)]
        exercise: String,
        /// Exercise display name
        #[arg(long)]
        name: String,
        #[arg(long)]
        series: u32,
        #[arg(long)]
        reps: u32,
        #[arg(long)]
        weight: f64,
    },
    /// Push pending records now
    Sync,
    /// Show connectivity and queue status
    Status,
    /// List pending records
    Pending,
    /// Follow connectivity and drain on reconnect until Ctrl-C
    Run,
}

fn init_tracing(json: bool) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("gym_sync=info".parse()?);
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json)?;

    let mut config = Config::load(&PathBuf::from(&cli.config))?;
    if let Some(data_dir) = cli.data_dir {
        config.client.data_dir = PathBuf::from(data_dir);
    }
    info!(data_dir = %config.client.data_dir.display(), "Starting gym-sync");

    let queue = Arc::new(LocalQueue::open(&config.client.data_dir)?);
    let remote = Arc::new(HttpRemoteStore::new(&config)?);
    let coordinator = Arc::new(SyncCoordinator::new(queue.clone(), remote, &config.sync));

    let observer: Arc<dyn ConnectivityObserver>;
    let mut probe_task = None;
    if cli.offline {
        observer = Arc::new(ManualConnectivity::new(false));
    } else {
        let probe = Arc::new(ProbeConnectivity::new(&config)?);
        if matches!(cli.command, Command::Run) {
            probe_task = Some(probe.clone().spawn());
        }
        observer = probe;
    }

    match cli.command {
        Command::Record {
            user,
            routine,
            exercise,
            name,
            series,
            reps,
            weight,
        } => {
            // Going online here also flushes anything left from earlier runs
            coordinator
                .handle_connectivity_change(observer.fetch_current_state().await)
                .await;
            let outcome = coordinator
                .record_write(WriteRequest {
                    user_id: user.unwrap_or_else(|| config.client.user_id.clone()),
                    routine_id: routine,
                    exercise_id: exercise,
                    exercise_name: name,
                    series,
                    reps,
                    weight,
                })
                .await;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            if !outcome.success {
                std::process::exit(1);
            }
        }
        Command::Sync => {
            let connected = observer.fetch_current_state().await;
            // Coming online drains by itself; otherwise ask explicitly
            let outcome = match coordinator.handle_connectivity_change(connected).await {
                Some(drain) => ManualSyncOutcome::from(drain),
                None => coordinator.manual_sync().await,
            };
            println!("{}", outcome.message);
            if !outcome.success {
                std::process::exit(1);
            }
        }
        Command::Status => {
            let online = observer.fetch_current_state().await;
            let status = serde_json::json!({
                "is_online": online,
                "pending_count": coordinator.pending_count(),
                "queue": queue.stats()?,
            });
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Command::Pending => {
            let pending = queue.list_pending()?;
            println!("{}", serde_json::to_string_pretty(&pending)?);
        }
        Command::Run => {
            coordinator.on_status_change(|status| {
                info!(
                    online = status.is_online,
                    pending = status.pending_count,
                    state = ?status.state,
                    "Sync status"
                );
            });
            let handle = coordinator.start(observer).await;
            tokio::signal::ctrl_c().await?;
            info!("Shutting down");
            handle.shutdown().await;
            if let Some(task) = probe_task {
                task.abort();
            }
        }
    }

    Ok(())
}
