use std::sync::Arc;

use depot_core::SyncEvent;
use tokio::sync::broadcast::error::RecvError;

use crate::commands::common::{open_coordinator, CliContext};
use crate::error::CliError;

/// Run the retry and health tickers until Ctrl-C.
pub async fn run_foreground(context: &CliContext) -> Result<(), CliError> {
    let coordinator = Arc::new(open_coordinator(context)?);
    let mut events = coordinator.subscribe();

    match coordinator.auto_sync().await {
        Some(report) if report.flush.flushed + report.flush.failed > 0 => println!(
            "Pushed {} pending write(s), {} still pending",
            report.flush.flushed, report.flush.failed
        ),
        Some(_) => {}
        None => eprintln!("Remote unreachable; will keep retrying in the background"),
    }

    coordinator.start();
    println!(
        "Syncing with {} (Ctrl-C to stop)",
        coordinator.settings().api_url
    );

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal?;
                break;
            }
            event = events.recv() => match event {
                Ok(SyncEvent::DataSynced { collections }) => {
                    println!("Synced {} collection(s)", collections.len());
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Missed sync events");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    coordinator.stop().await;
    Ok(())
}
