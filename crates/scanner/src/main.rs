//! Arb Scanner - cross-exchange spread scanner
//!
//! Main entry point for the console scanner

use std::env;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use arb_scanner::{console, settings, CycleError, ScanCoordinator};

#[derive(Debug, Clone, Copy)]
enum Trigger {
    Scan,
    Quit,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize logging; stdout stays reserved for scan output
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let json = env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_writer(std::io::stderr)
            .init();
    }

    info!("Starting Arb Scanner v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = settings::load()?;
    info!(
        "Threshold {}%, {} exchanges, cooldown {:?}",
        config.scanner.threshold_percent,
        config.exchanges.enabled.len(),
        config.alerts.cooldown()
    );

    let coordinator = Arc::new(ScanCoordinator::from_config(&config)?);
    let threshold = coordinator.threshold();

    let (trigger_tx, mut trigger_rx) = mpsc::channel::<Trigger>(16);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Manual trigger: Enter scans, "q" quits
    let stdin_tx = trigger_tx.clone();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let trigger = if line.trim().eq_ignore_ascii_case("q") {
                        Trigger::Quit
                    } else {
                        Trigger::Scan
                    };
                    if stdin_tx.send(trigger).await.is_err() {
                        break;
                    }
                }
                Ok(None) => {
                    debug!("stdin closed, manual triggers disabled");
                    break;
                }
                Err(e) => {
                    warn!("Failed to read stdin: {}", e);
                    break;
                }
            }
        }
    });

    // Periodic trigger
    if let Some(secs) = config.presentation.scan_interval_secs.filter(|s| *s > 0) {
        info!("Scanning every {}s", secs);
        let interval_tx = trigger_tx.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(secs));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if interval_tx.send(Trigger::Scan).await.is_err() {
                    break;
                }
            }
        });
    }

    // Spawn shutdown signal handler
    tokio::spawn(async move {
        let ctrl_c = async {
            signal::ctrl_c()
                .await
                .expect("Failed to install Ctrl+C handler");
        };

        #[cfg(unix)]
        let terminate = async {
            signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("Failed to install signal handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                info!("Received Ctrl+C");
            }
            _ = terminate => {
                info!("Received termination signal");
            }
        }

        let _ = trigger_tx.send(Trigger::Quit).await;
    });

    println!("{}", console::PROMPT);

    let mut cycles: Vec<JoinHandle<()>> = Vec::new();

    while let Some(trigger) = trigger_rx.recv().await {
        match trigger {
            Trigger::Quit => break,
            Trigger::Scan => {
                cycles.retain(|handle| !handle.is_finished());

                let coordinator = coordinator.clone();
                let mut shutdown = shutdown_rx.clone();

                cycles.push(tokio::spawn(async move {
                    let cancel = async move {
                        let _ = shutdown.wait_for(|stop| *stop).await;
                    };

                    match coordinator.run_until(cancel).await {
                        Some(Ok(report)) => {
                            println!("{}", console::render_report(&report, threshold, Utc::now()));
                        }
                        Some(Err(CycleError::AlreadyRunning)) => {
                            println!("{}", console::render_error(&CycleError::AlreadyRunning));
                        }
                        Some(Err(e)) => {
                            error!("Scan failed: {}", e);
                            println!("{}", console::render_error(&e));
                            println!("{}", console::status_line(Utc::now()));
                        }
                        None => {}
                    }
                }));
            }
        }
    }

    info!("Shutting down");
    let _ = shutdown_tx.send(true);
    for handle in cycles {
        if let Err(e) = handle.await {
            error!("Scan task failed: {}", e);
        }
    }

    info!("Shutdown complete");
    Ok(())
}
