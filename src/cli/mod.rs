// src/cli/mod.rs
// Command-line front end for the batch pipeline

pub mod batch;
pub mod config;
pub mod download;
pub mod inspect;
pub mod preview;
pub mod process;

use clap::{Args, Parser, Subcommand, ValueEnum};
use devicebatch::batch::{BatchError, BatchJob, BatchOrchestrator, JobPhase, ProcessMode};
use devicebatch::devices::{
    parse_device_input, render_pipe, Device, DeviceError, EditIntent, GroupPreview, Position,
};
use devicebatch::service::{HttpProcessingClient, OutputFormat};
use devicebatch::settings::AppSettings;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

#[derive(Parser)]
#[command(name = "devicebatch")]
#[command(about = "Bulk-edit device variations in product CSV exports through the processing service", long_about = None)]
pub struct Cli {
    /// Processing service root URL (overrides settings and environment)
    #[arg(long, global = true)]
    pub service_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Upload files and show how their device lists differ
    Inspect {
        /// CSV files or folders
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Also scan subfolders
        #[arg(long)]
        recursive: bool,
    },

    /// Resolve an edit against a device list locally, without the service
    Preview {
        /// Current devices, comma-separated
        #[arg(long)]
        reference: String,
        #[command(flatten)]
        edit: EditArgs,
    },

    /// Upload, submit and track a whole batch
    Batch {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        #[command(flatten)]
        edit: EditArgs,
        #[arg(long, value_enum, default_value_t = ModeArg::Auto)]
        mode: ModeArg,
        #[arg(long)]
        recursive: bool,
        /// single, per_product or split_60k
        #[arg(long)]
        output_format: Option<OutputFormat>,
        /// Save the result archive when at least one file succeeded
        #[arg(long)]
        download: bool,
    },

    /// Process one file on its own
    Process {
        file: PathBuf,
        #[command(flatten)]
        edit: EditArgs,
        /// Replace every existing device with the resolved order
        #[arg(long)]
        reset_all_devices: bool,
        #[arg(long)]
        output_format: Option<OutputFormat>,
        /// Save the output files
        #[arg(long)]
        download: bool,
    },

    /// Fetch results of an earlier run
    Download {
        /// Batch id whose archive to fetch
        #[arg(long, required_unless_present = "file", conflicts_with = "file")]
        batch: Option<String>,
        /// Single output file name
        #[arg(long)]
        file: Option<String>,
    },

    /// Show the effective settings
    Config {
        /// Write them to the settings file
        #[arg(long)]
        save: bool,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Auto,
    Same,
    Different,
}

impl From<ModeArg> for ProcessMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Auto => ProcessMode::Auto,
            ModeArg::Same => ProcessMode::SameDevices,
            ModeArg::Different => ProcessMode::DifferentDevices,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum PositionArg {
    Start,
    End,
}

/// How the operator describes an edit on the command line.
#[derive(Args, Debug, Clone, Default)]
pub struct EditArgs {
    /// Devices to add, comma-separated
    #[arg(long, default_value = "")]
    pub add: String,
    /// Devices to remove, comma-separated
    #[arg(long, default_value = "")]
    pub remove: String,
    /// Where added devices go
    #[arg(long, value_enum)]
    pub position: Option<PositionArg>,
    /// Insert added devices right after this device
    #[arg(long, conflicts_with = "position")]
    pub after: Option<String>,
    /// Existing devices in their new order, comma-separated
    #[arg(long, conflicts_with_all = ["position", "after"])]
    pub order: Option<String>,
    /// Index in --order where added devices go (defaults to the end)
    #[arg(long, requires = "order")]
    pub insert_index: Option<i64>,
    /// The complete final list, comma-separated
    #[arg(long, conflicts_with_all = ["add", "remove", "position", "after", "order"])]
    pub final_order: Option<String>,
}

impl EditArgs {
    pub fn to_intent(&self) -> Result<EditIntent, CliError> {
        if let Some(final_order) = &self.final_order {
            return Ok(EditIntent::FinalOrder {
                order: parse_device_input(final_order)?.into_vec(),
            });
        }

        let add = parse_device_input(&self.add)?.into_vec();
        let remove = parse_device_input(&self.remove)?.into_vec();
        if let Some(order) = &self.order {
            let order = parse_device_input(order)?.into_vec();
            let insert_index = self.insert_index.unwrap_or(order.len() as i64);
            return Ok(EditIntent::Custom { add, remove, order, insert_index });
        }

        let position = match (&self.after, self.position) {
            (Some(anchor), _) => Position::After(Device::parse(anchor)?),
            (None, Some(PositionArg::Start)) => Position::Start,
            (None, _) => Position::End,
        };
        if add.is_empty() && remove.is_empty() {
            return Err(CliError::Usage(
                "Nothing to do: give --add, --remove, --order or --final-order.".to_string(),
            ));
        }
        Ok(EditIntent::Positional { add, remove, position })
    }
}

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error(transparent)]
    Batch(#[from] BatchError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Usage(String),
    #[error("Batch '{batch_id}' {phase}: {headline}")]
    Unfinished {
        batch_id: String,
        phase: JobPhase,
        headline: String,
    },
    #[error("Interrupted. Batch '{0}' keeps processing on the service; use `download --batch` later.")]
    Interrupted(String),
}

pub type HttpOrchestrator = BatchOrchestrator<HttpProcessingClient>;

fn orchestrator(settings: &AppSettings) -> HttpOrchestrator {
    let service = Arc::new(HttpProcessingClient::new(&settings.service_url));
    BatchOrchestrator::new(service, settings.orchestrator_config())
}

pub async fn dispatch(command: Commands, mut settings: AppSettings) -> Result<(), CliError> {
    match command {
        Commands::Inspect { paths, recursive } => {
            settings.include_subfolders |= recursive;
            inspect::run(&orchestrator(&settings), &paths).await
        }
        Commands::Preview { reference, edit } => preview::run(&reference, &edit),
        Commands::Batch { paths, edit, mode, recursive, output_format, download } => {
            settings.include_subfolders |= recursive;
            if let Some(format) = output_format {
                settings.output_format = format;
            }
            batch::run(&orchestrator(&settings), &paths, &edit, mode.into(), download).await
        }
        Commands::Process { file, edit, reset_all_devices, output_format, download } => {
            if let Some(format) = output_format {
                settings.output_format = format;
            }
            process::run(&orchestrator(&settings), &file, &edit, reset_all_devices, download).await
        }
        Commands::Download { batch, file } => {
            download::run(&orchestrator(&settings), batch.as_deref(), file.as_deref()).await
        }
        Commands::Config { save } => config::run(&settings, save),
    }
}

pub(crate) fn print_inventory(job: &BatchJob) {
    println!("Batch {} ({} files)", job.batch_id, job.files.len());
    println!("Reference order: {}", render_pipe(job.reference_order.as_slice()));
    println!("\n=== Device groups ({}) ===", job.groups.len());
    for (i, group) in job.groups.iter().enumerate() {
        println!("  [{}] {}", i + 1, render_pipe(group.devices.as_slice()));
        println!("      products: {}", group.products.join(", "));
    }
    if !job.exclusive.is_empty() {
        println!("\n=== Devices only on one product ===");
        for (product, devices) in &job.exclusive {
            println!("  {}: {}", product, render_pipe(devices));
        }
    }
    println!("\nProcess mode: {}", job.effective_mode().as_wire());
}

pub(crate) fn print_previews(previews: &[GroupPreview]) {
    for preview in previews {
        match &preview.result {
            Ok(edit) => println!(
                "  {:<30} -> {}",
                preview.products.join(", "),
                render_pipe(edit.final_order.as_slice())
            ),
            Err(e) => println!("  {:<30} !! {}", preview.products.join(", "), e),
        }
    }
}
