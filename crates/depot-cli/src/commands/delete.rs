use crate::commands::common::{
    normalize_collection, normalize_record_id, open_coordinator, CliContext,
};
use crate::error::CliError;

pub async fn run_delete(collection: &str, id: &str, context: &CliContext) -> Result<(), CliError> {
    let collection = normalize_collection(collection)?;
    let id = normalize_record_id(id)?;
    let coordinator = open_coordinator(context)?;
    let outcome = coordinator.delete(&collection, &id).await;

    if !outcome.success {
        return Err(CliError::NotPreserved);
    }
    println!("{id}");
    if outcome.fallback {
        eprintln!("Remote unavailable; deleted locally and marked pending.");
    }
    Ok(())
}
