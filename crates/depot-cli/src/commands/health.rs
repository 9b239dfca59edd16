use crate::commands::common::{open_coordinator, CliContext};
use crate::error::CliError;

pub async fn run_health(context: &CliContext) -> Result<(), CliError> {
    let coordinator = open_coordinator(context)?;
    if coordinator.check_health().await {
        println!("healthy");
        Ok(())
    } else {
        Err(CliError::RemoteUnavailable(
            coordinator.settings().api_url.clone(),
        ))
    }
}
