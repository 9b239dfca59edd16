use crate::commands::common::{
    format_record_line, normalize_collection, open_coordinator, print_json, source_label,
    CliContext,
};
use crate::error::CliError;

pub async fn run_load(
    collection: &str,
    as_json: bool,
    context: &CliContext,
) -> Result<(), CliError> {
    let collection = normalize_collection(collection)?;
    let coordinator = open_coordinator(context)?;
    let outcome = coordinator.load(&collection).await;

    if as_json {
        return print_json(&outcome);
    }

    for record in &outcome.data {
        println!("{}", format_record_line(record));
    }
    eprintln!(
        "{} record(s) from {}",
        outcome.data.len(),
        source_label(outcome.synced)
    );
    Ok(())
}
