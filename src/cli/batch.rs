// src/cli/batch.rs
use super::{print_inventory, print_previews, CliError, EditArgs, HttpOrchestrator};
use devicebatch::batch::{BatchJob, JobPhase, ProcessMode};
use std::path::PathBuf;
use tracing::warn;

pub async fn run(
    orchestrator: &HttpOrchestrator,
    paths: &[PathBuf],
    edit: &EditArgs,
    mode: ProcessMode,
    download: bool,
) -> Result<(), CliError> {
    let intent = edit.to_intent()?;
    let draft = orchestrator.collect(paths)?;
    println!(
        "Uploading {} file(s), {} bytes",
        draft.files.len(),
        draft.total_bytes()
    );
    let job = orchestrator.upload(&draft).await?;
    print_inventory(&job);

    println!("\n=== Preview: {} ===", intent.describe());
    print_previews(&orchestrator.preview(&job, &intent, mode));

    let job = orchestrator.configure(&job, intent, mode)?;
    let job = orchestrator.submit(&job).await?;
    println!("\nSubmitted batch {}; polling for results...", job.batch_id);

    let mut handle = orchestrator.start_polling(&job)?;
    let batch_id = job.batch_id.clone();
    let job = tokio::select! {
        tracked = orchestrator.track_with(job, &mut handle, print_progress) => tracked?,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted while polling '{}'", batch_id);
            handle.shutdown().await;
            return Err(CliError::Interrupted(batch_id));
        }
    };
    handle.shutdown().await;

    let summary = job.summary();
    println!("\n=== Results ===");
    println!("{:<40} {:<12} {}", "File", "Status", "Message");
    println!("{}", "-".repeat(76));
    for file in &job.files {
        println!(
            "{:<40} {:<12} {}",
            file.name,
            format!("{:?}", file.status),
            file.message.as_deref().unwrap_or("")
        );
    }
    println!("\n{}", summary.headline());

    if download && summary.success_count > 0 {
        let path = orchestrator.download_all(&job.batch_id).await?;
        println!("Saved results to {}", path.display());
    }

    match job.phase {
        JobPhase::Completed => Ok(()),
        phase => Err(CliError::Unfinished {
            batch_id: job.batch_id.clone(),
            phase,
            headline: job
                .last_error
                .clone()
                .unwrap_or_else(|| summary.headline()),
        }),
    }
}

fn print_progress(job: &BatchJob) {
    let summary = job.summary();
    let progress: u32 = job.files.iter().map(|f| u32::from(f.progress)).sum();
    let average = if job.files.is_empty() {
        0
    } else {
        progress / job.files.len() as u32
    };
    println!(
        "  [{:>3}%] {} done, {} failed, {} pending",
        average, summary.success_count, summary.fail_count, summary.pending_count
    );
}
