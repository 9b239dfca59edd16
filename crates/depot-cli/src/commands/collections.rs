use depot_core::TableRegistry;
use serde::Serialize;

use crate::commands::common::print_json;
use crate::error::CliError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionItem {
    pub name: String,
    pub resource: String,
    /// Visited by `depot sync`
    pub synced: bool,
}

pub fn collection_items(registry: &TableRegistry) -> Vec<CollectionItem> {
    registry
        .entries()
        .into_iter()
        .map(|(name, resource)| CollectionItem {
            name: name.to_string(),
            resource: resource.to_string(),
            synced: registry.collections().iter().any(|known| known == name),
        })
        .collect()
}

pub fn run_collections(as_json: bool) -> Result<(), CliError> {
    let items = collection_items(&TableRegistry::with_defaults());

    if as_json {
        return print_json(&items);
    }

    for item in &items {
        if item.synced {
            println!("{}", item.name);
        } else {
            println!("{} -> {}", item.name, item.resource);
        }
    }
    Ok(())
}
