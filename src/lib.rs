//! mailgen - personalized marketing email generation
//!
//! Redraws a product image for a target audience with an image model, has a
//! text model write a matching HTML email, and stores both artifacts.

pub mod api;
pub mod bedrock;
pub mod config;
pub mod error;
pub mod images;
pub mod pipeline;
pub mod prompts;
pub mod retry;
pub mod storage;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use config::Config;
pub use error::PipelineError;
pub use pipeline::{InvocationOutcome, InvocationRequest, InvocationResponse, Pipeline};

use config::{LogConfig, LogFormat};

/// Install the global tracing subscriber. `RUST_LOG` overrides the configured filter.
pub fn init_tracing(log: &LogConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| log.filter.as_str().into());
    let registry = tracing_subscriber::registry().with(filter);

    match log.format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

/// The mailgen daemon
pub struct Server {
    config: Config,
    pipeline: Arc<Pipeline>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl Server {
    /// Create a server with storage and model clients built from `config`
    pub fn new(config: Config) -> Result<Self> {
        let pipeline = Pipeline::from_config(&config)?;
        Ok(Self::with_pipeline(config, Arc::new(pipeline)))
    }

    /// Create a server around an existing pipeline
    pub fn with_pipeline(config: Config, pipeline: Arc<Pipeline>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            config,
            pipeline,
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Get the pipeline handle
    pub fn pipeline(&self) -> Arc<Pipeline> {
        self.pipeline.clone()
    }

    fn router(&self) -> Router {
        api::router(self.pipeline.clone())
    }

    /// Run the server until shutdown
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.config.server.bind_addr).await?;
        let local_addr = listener.local_addr()?;
        info!("mailgend listening on {}", local_addr);

        let router = self.router();
        let mut shutdown_rx = self.shutdown_rx.clone();

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                shutdown_rx.changed().await.ok();
            })
            .await?;

        info!("mailgend shutdown complete");
        Ok(())
    }

    /// Signal the server to shutdown
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Get the configured bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.server.bind_addr
    }
}
