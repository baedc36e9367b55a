//! Command-line front end for the upload pipeline.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use filekeep_core::{
    ActorContext, AnonymousActor, AppError, Config, ErrorReporter, ReportedFailure, StaticActor,
    TracingErrorLog, UploadDefaults, Visibility,
};
use filekeep_processing::{UploadError, UploadOptions, UploadProcessor, UploadRequest, UploadResult};
use filekeep_storage::create_disks;
use serde_json::{json, Value};

#[derive(Parser, Debug, Clone)]
#[command(name = "filekeep", about = "Store a file, resizing images on the way in")]
pub struct UploadArgs {
    /// File to upload
    pub file: PathBuf,

    /// Directory on the disk
    #[arg(long, default_value = "")]
    pub path: String,

    /// Disk name: public or local
    #[arg(long)]
    pub disk: Option<String>,

    /// public or private
    #[arg(long)]
    pub visibility: Option<Visibility>,

    /// Target height of the processed variant
    #[arg(long)]
    pub height: Option<u32>,

    /// Encode quality
    #[arg(long)]
    pub quality: Option<u8>,

    /// Id recorded with failure reports
    #[arg(long)]
    pub actor: Option<String>,
}

impl UploadArgs {
    /// Configured defaults overridden by whatever was passed on the command line.
    pub fn upload_options(&self, defaults: &UploadDefaults) -> UploadOptions {
        let mut options = UploadOptions::from_defaults(defaults).with_path(self.path.clone());
        if let Some(disk) = &self.disk {
            options = options.with_disk(disk.clone());
        }
        if let Some(visibility) = self.visibility {
            options = options.with_visibility(visibility);
        }
        if let Some(height) = self.height {
            options = options.with_height(height);
        }
        if let Some(quality) = self.quality {
            options = options.with_quality(quality);
        }
        options
    }

    /// Request context attached to failure reports.
    pub fn request_context(&self) -> Value {
        json!({
            "file": self.file.display().to_string(),
            "path": self.path,
            "disk": self.disk,
        })
    }

    pub fn reporter(&self) -> ErrorReporter {
        let actor: Arc<dyn ActorContext> = match &self.actor {
            Some(id) => Arc::new(StaticActor(id.clone())),
            None => Arc::new(AnonymousActor),
        };
        ErrorReporter::new(Arc::new(TracingErrorLog), actor)
    }
}

/// Build the disks from `config` and store `args.file`.
pub async fn run(args: &UploadArgs, config: &Config) -> Result<UploadResult, AppError> {
    let disks = create_disks(config).await.map_err(UploadError::from)?;
    let processor = UploadProcessor::with_disks(disks);

    let request = UploadRequest::from_path(&args.file).await?;
    let options = args.upload_options(&config.upload_defaults());

    Ok(processor.store(request, options).await?)
}

pub fn success_json(result: &UploadResult) -> Value {
    json!({
        "success": true,
        "path": result.path,
        "file_name": result.file_name,
        "variant": result.variant,
    })
}

/// Report `error` and return the payload to print.
pub fn failure(args: &UploadArgs, error: &AppError) -> ReportedFailure {
    args.reporter().report_error(error, Some(&args.request_context()))
}

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
