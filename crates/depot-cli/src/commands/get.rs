use crate::commands::common::{
    normalize_collection, normalize_record_id, open_coordinator, print_json, source_label,
    CliContext,
};
use crate::error::CliError;

pub async fn run_get(
    collection: &str,
    id: &str,
    as_json: bool,
    context: &CliContext,
) -> Result<(), CliError> {
    let collection = normalize_collection(collection)?;
    let id = normalize_record_id(id)?;
    let coordinator = open_coordinator(context)?;
    let outcome = coordinator.fetch(&collection, &id).await;

    if as_json {
        return print_json(&outcome);
    }

    let Some(record) = outcome.data else {
        return Err(CliError::RecordNotFound(format!("{collection}/{id}")));
    };
    print_json(&record)?;
    if !outcome.synced {
        eprintln!("(from {})", source_label(outcome.synced));
    }
    Ok(())
}
