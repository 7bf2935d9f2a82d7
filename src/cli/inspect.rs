// src/cli/inspect.rs
use super::{print_inventory, CliError, HttpOrchestrator};
use std::path::PathBuf;

pub async fn run(orchestrator: &HttpOrchestrator, paths: &[PathBuf]) -> Result<(), CliError> {
    let draft = orchestrator.collect(paths)?;
    for skipped in &draft.skipped {
        println!("Skipped: {}", skipped.display());
    }
    println!(
        "Uploading {} file(s), {} bytes\n",
        draft.files.len(),
        draft.total_bytes()
    );

    let job = orchestrator.upload(&draft).await?;
    print_inventory(&job);

    println!("\n=== Files ===");
    println!("{:<40} {:<24} {:>10}", "Name", "Id", "Bytes");
    println!("{}", "-".repeat(76));
    for file in &job.files {
        println!("{:<40} {:<24} {:>10}", file.name, file.id, file.size_bytes);
    }
    Ok(())
}
