//! Local transcript service
//!
//! Serves `GET /transcript?v=ID&lang=en` so the transcript-service strategy
//! has a counterpart that can run next to the CLI.

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::transcript::{CaptionHttp, ReqwestHttp};

pub mod handlers;
pub mod models;
pub mod server;

pub use handlers::{LookupError, TranscriptLookup};
pub use server::{router, AppState};

/// Transcript HTTP server
pub struct TranscriptServer {
    config: Arc<Config>,
    http: Arc<dyn CaptionHttp>,
}

impl TranscriptServer {
    /// Create a server using the reqwest transport from `config`
    pub fn new(config: Arc<Config>) -> Result<Self> {
        let http: Arc<dyn CaptionHttp> = Arc::new(ReqwestHttp::new(&config.transcript)?);
        Ok(Self::with_http(config, http))
    }

    pub fn with_http(config: Arc<Config>, http: Arc<dyn CaptionHttp>) -> Self {
        Self { config, http }
    }

    /// Serve until the process stops
    pub async fn start(self) -> Result<()> {
        info!("🚀 Starting transcript server on {}:{}", self.config.server.host, self.config.server.port);

        let state = AppState {
            lookup: TranscriptLookup::new(&self.config, self.http),
        };
        server::start_http_server(state, &self.config.server.host, self.config.server.port).await
    }
}
