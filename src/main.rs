use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use clap_serde_derive::ClapSerde;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::Config;
use crate::inference::model_config::GenerationConfig;
use crate::inference::text_pipeline::TextGeneratorPipeline;
use crate::inference::TextGenerator;
use crate::server::{create_router, AppState};
use crate::telemetry::init_telemetry;

mod config;
mod error;
mod inference;
mod recipe;
mod server;
mod telemetry;

#[cfg(unix)]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, env, default_value = "RecipeRunner.toml")]
    config_file: String,

    /// Configuration options
    #[command(flatten)]
    pub opt_config: <Config as ClapSerde>::Opt,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();
    let config = match Config::from_toml(&args.config_file) {
        Ok(conf) => conf.merge(args.opt_config),
        Err(err) => {
            if args.config_file == "RecipeRunner.toml" {
                Config::default().merge(args.opt_config)
            } else {
                exit_err!(
                    1,
                    "Failed to read configuration file {} with error: {}",
                    args.config_file,
                    err
                );
            }
        }
    };

    let otlp_endpoint = (!config.otlp_endpoint.is_empty()).then_some(config.otlp_endpoint.as_str());
    init_telemetry(otlp_endpoint, config.log_console)?;

    info!(
        "Supported features: avx: {}, neon: {}, simd128: {}, f16c: {}",
        candle_core::utils::with_avx(),
        candle_core::utils::with_neon(),
        candle_core::utils::with_simd128(),
        candle_core::utils::with_f16c()
    );

    let generator = load_generator(&config.model_dir);
    let router = create_router(AppState { generator });

    let listener = TcpListener::bind(format!("{}:{}", config.address, config.port)).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// Loads the checkpoint once at startup. A failure is logged rather than fatal so the
/// server still comes up and reports 503 on every generation request.
fn load_generator(model_dir: &str) -> Option<Arc<dyn TextGenerator + Send + Sync>> {
    let start_load = Instant::now();
    match TextGeneratorPipeline::from_dir(Path::new(model_dir), GenerationConfig::default()) {
        Ok(pipeline) => {
            info!(
                "Loaded model {} from {} in {:.2}s",
                pipeline.model_name(),
                model_dir,
                start_load.elapsed().as_secs_f64()
            );
            Some(Arc::new(pipeline))
        }
        Err(err) => {
            error!("Failed to load model from {}: {:#}", model_dir, err);
            None
        }
    }
}

// TODO set timeout for shutdown signal
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutting down..."),
        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }
}

#[macro_export]
macro_rules! exit_err {
    ($code:expr, $fmt:expr $(, $arg:expr)*) => {
        {
            eprintln!($fmt $(, $arg)*);
            std::process::exit($code);
        }
    };
}
