use std::collections::BTreeMap;

use depot_core::{FlushReport, LoadOutcome};
use serde::Serialize;

use crate::commands::common::{open_coordinator, print_json, source_label, CliContext};
use crate::error::CliError;

#[derive(Debug, Serialize)]
struct SyncSummary {
    pending: FlushReport,
    collections: BTreeMap<String, LoadOutcome>,
}

pub async fn run_sync(as_json: bool, context: &CliContext) -> Result<(), CliError> {
    let coordinator = open_coordinator(context)?;
    let pending = coordinator.flush_pending().await;
    let collections = coordinator.sync_all().await;

    if as_json {
        return print_json(&SyncSummary {
            pending,
            collections,
        });
    }

    if pending.flushed + pending.failed > 0 {
        println!(
            "Pushed {} pending write(s), {} still pending",
            pending.flushed, pending.failed
        );
    }
    for (name, outcome) in &collections {
        println!(
            "{name}: {} record(s) from {}",
            outcome.data.len(),
            source_label(outcome.synced)
        );
    }
    Ok(())
}
