//! `filekeep` binary: store one file and print the outcome as JSON.
//!
//! Settings come from `FILEKEEP_*` environment variables (see `filekeep_core::Config`).

use clap::Parser;
use filekeep_cli::{failure, init_tracing, run, success_json, UploadArgs};
use filekeep_core::{AppError, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = UploadArgs::parse();

    let outcome = match Config::from_env() {
        Ok(config) => run(&args, &config).await,
        Err(e) => Err(AppError::Configuration(e.to_string())),
    };

    match outcome {
        Ok(result) => {
            tracing::info!(
                path = %result.path,
                disk = %result.disk,
                variant = ?result.variant,
                "Upload complete"
            );
            println!("{}", serde_json::to_string(&success_json(&result))?);
            Ok(())
        }
        Err(error) => {
            tracing::error!(file = %args.file.display(), error = %error, "Upload failed");
            let reported = failure(&args, &error);
            println!("{}", serde_json::to_string(&reported.to_json())?);
            std::process::exit(1);
        }
    }
}
