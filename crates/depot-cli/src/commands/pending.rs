use crate::commands::common::{
    format_record_line, normalize_collection, open_cache, pending_to_item, print_json,
    CliContext, PendingItem,
};
use crate::error::CliError;

pub fn run_pending(
    collection: Option<&str>,
    as_json: bool,
    context: &CliContext,
) -> Result<(), CliError> {
    let cache = open_cache(&context.db_path)?;
    let pending = match collection {
        Some(name) => cache.pending(&normalize_collection(name)?),
        None => cache.all_pending(),
    };

    if as_json {
        let items = pending.iter().map(pending_to_item).collect::<Vec<PendingItem>>();
        return print_json(&items);
    }

    if pending.is_empty() {
        println!("Nothing pending.");
        return Ok(());
    }

    for item in &pending {
        println!(
            "{:<10} {:<7} {}",
            item.collection,
            item.operation.as_str(),
            format_record_line(&item.record)
        );
    }
    Ok(())
}
