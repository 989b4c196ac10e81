use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use crate::cli::ServeArgs;
use crate::error::LookupError;
use crate::resolve::{self, FormatSelection};
use crate::search::{self, SearchQuery, SearchResult, SortKey};
use crate::tools::yt_dlp::{ExtractorConfig, MediaExtractor, YtDlpTool};

use super::http;

/// Configuration applied when launching the HTTP service.
#[derive(Clone)]
pub struct ServeConfig {
    pub http_addr: SocketAddr,
    pub extractor: ExtractorConfig,
    pub cookies: Option<PathBuf>,
}

impl ServeConfig {
    /// Build a runtime configuration from the CLI arguments.
    pub fn try_from_args(args: ServeArgs) -> Result<Self> {
        let cookies = match args.cookies {
            Some(path) if path.is_file() => Some(path),
            Some(path) => {
                tracing::warn!(path = %path.display(), "cookie file not found; serving without cookies");
                None
            }
            None => resolve::default_cookie_file(),
        };

        Ok(Self {
            http_addr: args.http_addr,
            extractor: args.extractor.to_config(),
            cookies,
        })
    }
}

/// Top-level service runner.
pub struct LookupServer {
    config: ServeConfig,
}

impl LookupServer {
    pub fn new(config: ServeConfig) -> Self {
        Self { config }
    }

    /// Run the HTTP service until a shutdown signal is received.
    pub async fn run(self) -> Result<()> {
        let tool = YtDlpTool::new(self.config.extractor.clone());
        tracing::info!(
            addr = %self.config.http_addr,
            binary = %tool.binary().display(),
            cookies = self.config.cookies.is_some(),
            "starting lookup service"
        );
        let executor = Arc::new(LookupExecutor::new(tool, self.config.cookies));
        http::serve(self.config.http_addr, executor).await
    }
}

/// Runs search and resolve requests supplied by the protocol layer against one extractor.
pub struct LookupExecutor<E> {
    extractor: E,
    cookies: Option<PathBuf>,
}

impl<E: MediaExtractor> LookupExecutor<E> {
    pub fn new(extractor: E, cookies: Option<PathBuf>) -> Self {
        Self { extractor, cookies }
    }

    /// Faults degrade to an empty list unless the request is strict.
    pub async fn search(&self, request: SearchInput) -> Result<Vec<SearchResult>, LookupError> {
        let SearchInput {
            query,
            max_results,
            sort_by,
            strict,
        } = request;

        if query.trim().is_empty() {
            return Err(LookupError::Usage("query is required".to_string()));
        }

        let query = SearchQuery::new(query)
            .with_max_results(max_results.unwrap_or(search::DEFAULT_MAX_RESULTS))
            .with_sort(sort_by.as_deref().and_then(SortKey::parse));

        if strict.unwrap_or(false) {
            search::execute(&self.extractor, &query).await
        } else {
            Ok(search::execute_or_empty(&self.extractor, &query).await)
        }
    }

    pub async fn resolve(&self, request: ResolveInput) -> Result<String, LookupError> {
        let song = request.song.trim();
        if song.is_empty() {
            return Err(LookupError::Usage("song is required".to_string()));
        }

        let selection = match request.format.as_deref() {
            Some(raw) => raw.parse::<FormatSelection>().map_err(LookupError::Usage)?,
            None => FormatSelection::default(),
        };

        resolve::execute(&self.extractor, song, selection, self.cookies.as_deref()).await
    }
}

/// Search request as received by the protocol layer.
#[derive(Default)]
pub struct SearchInput {
    pub query: String,
    pub max_results: Option<u32>,
    pub sort_by: Option<String>,
    pub strict: Option<bool>,
}

/// Resolve request as received by the protocol layer.
#[derive(Default)]
pub struct ResolveInput {
    pub song: String,
    pub format: Option<String>,
}
