// src/cli/process.rs
use super::{CliError, EditArgs, HttpOrchestrator};
use devicebatch::devices::render_pipe;
use std::path::Path;

pub async fn run(
    orchestrator: &HttpOrchestrator,
    file: &Path,
    edit: &EditArgs,
    reset_all_devices: bool,
    download: bool,
) -> Result<(), CliError> {
    let intent = edit.to_intent()?;
    let uploaded = orchestrator.upload_single(file).await?;
    println!(
        "Uploaded {} as {} ({} rows, {} products)",
        uploaded.name,
        uploaded.file_id,
        uploaded.row_count,
        uploaded.inventory.len()
    );
    println!("Devices: {}", render_pipe(uploaded.devices.as_slice()));
    println!("Edit:    {}", intent.describe());

    let response = orchestrator
        .process_single(&uploaded, &intent, reset_all_devices)
        .await?;
    println!(
        "\nProcessed {} rows, {} SKUs",
        response.total_rows, response.sku_count
    );
    for name in &response.output_files {
        if download {
            let path = orchestrator.download_one(name).await?;
            println!("  {} -> {}", name, path.display());
        } else {
            println!("  {}", name);
        }
    }
    Ok(())
}
