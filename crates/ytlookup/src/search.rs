use std::str::FromStr;

use anyhow::Result;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::cli::SearchArgs;
use crate::error::LookupError;
use crate::telemetry;
use crate::tools::yt_dlp::{ExtractOptions, ExtractorConfig, MediaExtractor, SEARCH_PREFIX};

pub const DEFAULT_MAX_RESULTS: u32 = 10;

/// Ordering applied to projected results.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortKey {
    /// Newest `upload_date` first.
    Date,
    /// Most viewed first.
    Views,
    /// Case-insensitive title, A to Z.
    Alphabetic,
}

impl SortKey {
    /// Parse a sort key; unknown values yield `None` and leave extractor order untouched.
    pub fn parse(value: &str) -> Option<Self> {
        match value.parse() {
            Ok(key) => Some(key),
            Err(_) => {
                debug!(sort_by = value, "unrecognized sort key; keeping extractor order");
                None
            }
        }
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "date" => Ok(SortKey::Date),
            "views" => Ok(SortKey::Views),
            "alphabetic" => Ok(SortKey::Alphabetic),
            other => Err(format!("unknown sort key '{other}'")),
        }
    }
}

/// A keyword search request.
#[derive(Clone, Debug)]
pub struct SearchQuery {
    pub text: String,
    pub max_results: u32,
    pub sort_by: Option<SortKey>,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            max_results: DEFAULT_MAX_RESULTS,
            sort_by: None,
        }
    }

    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = u32::max(1, max_results);
        self
    }

    pub fn with_sort(mut self, sort_by: Option<SortKey>) -> Self {
        self.sort_by = sort_by;
        self
    }

    /// Prefixed target handed to the extractor, e.g. `ytsearch10:lofi beats`.
    pub fn target(&self) -> String {
        format!("{SEARCH_PREFIX}{}:{}", self.max_results, self.text)
    }
}

/// One projected search hit.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    pub id: String,
    pub title: String,
    pub duration: u64,
    pub uploader: String,
    pub view_count: u64,
    pub upload_date: String,
    pub webpage_url: String,
    pub thumbnail: String,
}

impl SearchResult {
    /// Project an extractor entry, substituting defaults for anything absent or mistyped.
    pub fn from_entry(entry: &Map<String, Value>) -> Self {
        Self {
            id: text_field(entry, "id"),
            title: text_field(entry, "title"),
            duration: entry.get("duration").map(seconds).unwrap_or(0),
            uploader: text_field(entry, "uploader"),
            view_count: entry.get("view_count").map(count).unwrap_or(0),
            upload_date: text_field(entry, "upload_date"),
            webpage_url: text_field(entry, "webpage_url"),
            thumbnail: first_thumbnail(entry),
        }
    }
}

/// Resolved settings for the `search` subcommand.
pub struct SearchConfig {
    pub query: SearchQuery,
    pub extractor: ExtractorConfig,
    pub strict: bool,
    pub pretty: bool,
}

impl SearchConfig {
    pub fn try_from_args(args: SearchArgs) -> Result<Self> {
        if args.query.trim().is_empty() {
            return Err(LookupError::Usage("search query must not be empty".to_string()).into());
        }

        let sort_by = args.sort_by.as_deref().and_then(SortKey::parse);
        let query = SearchQuery::new(args.query)
            .with_max_results(args.max_results)
            .with_sort(sort_by);

        Ok(Self {
            query,
            extractor: args.extractor.to_config(),
            strict: args.strict,
            pretty: args.pretty,
        })
    }
}

/// Run a search. `Ok(vec![])` means nothing was found; `Err` means the lookup itself failed.
pub async fn execute<E>(extractor: &E, query: &SearchQuery) -> Result<Vec<SearchResult>, LookupError>
where
    E: MediaExtractor,
{
    let options = ExtractOptions::for_search();
    let target = query.target();

    telemetry::record_invocation("search");
    let started = Instant::now();
    let outcome = extractor.extract_info(&target, &options).await;
    telemetry::record_latency("search", started.elapsed());

    let document = outcome.inspect_err(|_| telemetry::record_failure("search"))?;
    let mut results = project(&document, query.max_results as usize);
    if let Some(key) = query.sort_by {
        sort_results(&mut results, key);
    }

    telemetry::record_results(results.len());
    debug!(query = %query.text, results = results.len(), "search complete");
    Ok(results)
}

/// Compatibility wrapper: extractor faults are reported on stderr and treated as zero results.
pub async fn execute_or_empty<E>(extractor: &E, query: &SearchQuery) -> Vec<SearchResult>
where
    E: MediaExtractor,
{
    match execute(extractor, query).await {
        Ok(results) => results,
        Err(err) => {
            warn!(error = %err, query = %query.text, "search failed; returning no results");
            eprintln!("Error searching: {err}");
            Vec::new()
        }
    }
}

/// Project the `entries` of an info document, skipping null and non-object entries.
pub fn project(document: &Value, limit: usize) -> Vec<SearchResult> {
    let Some(entries) = document.get("entries").and_then(Value::as_array) else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| match entry {
            Value::Object(map) => Some(SearchResult::from_entry(map)),
            Value::Null => None,
            other => {
                warn!(entry = %other, "skipping malformed search entry");
                None
            }
        })
        .take(limit)
        .collect()
}

/// Stable in-place sort; ties keep the extractor's relative order.
pub fn sort_results(results: &mut [SearchResult], key: SortKey) {
    match key {
        SortKey::Date => results.sort_by(|a, b| b.upload_date.cmp(&a.upload_date)),
        SortKey::Views => results.sort_by(|a, b| b.view_count.cmp(&a.view_count)),
        SortKey::Alphabetic => results.sort_by_cached_key(|result| result.title.to_lowercase()),
    }
}

fn text_field(entry: &Map<String, Value>, key: &str) -> String {
    entry
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn seconds(value: &Value) -> u64 {
    match value.as_u64() {
        Some(whole) => whole,
        None => value
            .as_f64()
            .filter(|secs| secs.is_finite() && *secs > 0.0)
            .map(|secs| secs.round() as u64)
            .unwrap_or(0),
    }
}

fn count(value: &Value) -> u64 {
    match value.as_u64() {
        Some(whole) => whole,
        None => value
            .as_f64()
            .filter(|n| n.is_finite() && *n > 0.0)
            .map(|n| n.trunc() as u64)
            .unwrap_or(0),
    }
}

fn first_thumbnail(entry: &Map<String, Value>) -> String {
    entry
        .get("thumbnails")
        .and_then(Value::as_array)
        .and_then(|thumbs| thumbs.first())
        .and_then(|thumb| thumb.get("url"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
