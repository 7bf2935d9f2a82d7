// src/cli/download.rs
use super::{CliError, HttpOrchestrator};

pub async fn run(
    orchestrator: &HttpOrchestrator,
    batch_id: Option<&str>,
    file: Option<&str>,
) -> Result<(), CliError> {
    let path = match (batch_id, file) {
        (Some(batch_id), _) => orchestrator.download_all(batch_id).await?,
        (None, Some(name)) => orchestrator.download_one(name).await?,
        (None, None) => {
            return Err(CliError::Usage("Give --batch <id> or --file <name>.".to_string()))
        }
    };
    println!("Saved {}", path.display());
    Ok(())
}
