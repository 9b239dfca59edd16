use crate::commands::common::{
    normalize_collection, normalize_record_id, open_coordinator, parse_record, print_json,
    read_record_input, CliContext,
};
use crate::error::CliError;

pub async fn run_save(
    collection: &str,
    data: &str,
    id: Option<&str>,
    as_json: bool,
    context: &CliContext,
) -> Result<(), CliError> {
    let collection = normalize_collection(collection)?;
    let record = parse_record(&read_record_input(data)?)?;
    let id = id.map(normalize_record_id).transpose()?;

    let coordinator = open_coordinator(context)?;
    let outcome = coordinator
        .save(&collection, record, id.is_some(), id)
        .await;

    if as_json {
        print_json(&outcome)?;
    } else if let Some(id) = outcome.data.id() {
        println!("{id}");
    }

    if !outcome.success {
        return Err(CliError::NotPreserved);
    }
    if outcome.fallback {
        eprintln!("Remote unavailable; saved locally and marked pending. Run `depot sync` later.");
    }
    Ok(())
}
