use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Result;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::cli::ResolveArgs;
use crate::error::LookupError;
use crate::telemetry;
use crate::tools::yt_dlp::{ExtractOptions, ExtractorConfig, MediaExtractor, SEARCH_PREFIX};

/// File name looked up next to the executable when no cookie path is given.
pub const COOKIE_FILE_NAME: &str = "cookies.txt";

/// How the audio variant is picked from an entry's `requested_formats`.
///
/// yt-dlp's default merge selection lists the video stream first and the audio
/// stream second, so `Index(1)` is the default.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormatSelection {
    Index(usize),
    /// First variant with no video codec and a real audio codec.
    AudioOnly,
}

impl Default for FormatSelection {
    fn default() -> Self {
        FormatSelection::Index(1)
    }
}

impl FormatSelection {
    fn pick<'a>(&self, formats: &'a [Value]) -> Option<&'a Value> {
        match self {
            FormatSelection::Index(index) => formats.get(*index),
            FormatSelection::AudioOnly => formats.iter().find(|format| is_audio_only(format)),
        }
    }
}

impl fmt::Display for FormatSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatSelection::Index(index) => write!(f, "requested format index {index}"),
            FormatSelection::AudioOnly => write!(f, "an audio-only requested format"),
        }
    }
}

impl FromStr for FormatSelection {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("audio") {
            return Ok(FormatSelection::AudioOnly);
        }
        value
            .parse::<usize>()
            .map(FormatSelection::Index)
            .map_err(|_| format!("expected a format index or 'audio', got '{value}'"))
    }
}

/// Resolved settings for the `resolve` subcommand.
pub struct ResolveConfig {
    pub song: String,
    pub selection: FormatSelection,
    pub cookies: Option<PathBuf>,
    pub extractor: ExtractorConfig,
}

impl ResolveConfig {
    pub fn try_from_args(args: ResolveArgs) -> Result<Self> {
        let song = args.song.trim().to_string();
        if song.is_empty() {
            return Err(LookupError::Usage("song name must not be empty".to_string()).into());
        }

        let cookies = match args.cookies {
            Some(path) => existing_cookie_file(path),
            None => default_cookie_file(),
        };

        Ok(Self {
            song,
            selection: args.format,
            cookies,
            extractor: args.extractor.to_config(),
        })
    }
}

/// Cookie file next to the running executable, if one exists.
pub fn default_cookie_file() -> Option<PathBuf> {
    let exe = match std::env::current_exe() {
        Ok(exe) => exe,
        Err(err) => {
            debug!(error = %err, "cannot locate executable; skipping cookie lookup");
            return None;
        }
    };
    let dir = exe.parent()?;
    existing_cookie_file(dir.join(COOKIE_FILE_NAME))
}

fn existing_cookie_file(path: PathBuf) -> Option<PathBuf> {
    if path.is_file() {
        debug!(path = %path.display(), "using cookie file");
        Some(path)
    } else {
        debug!(path = %path.display(), "cookie file not found; continuing without cookies");
        None
    }
}

/// Resolve `song` to the direct URL of the selected stream of the top search hit.
pub async fn execute<E>(
    extractor: &E,
    song: &str,
    selection: FormatSelection,
    cookies: Option<&Path>,
) -> Result<String, LookupError>
where
    E: MediaExtractor,
{
    let options = ExtractOptions::for_resolve().with_cookies(cookies.map(Path::to_path_buf));
    let target = format!("{SEARCH_PREFIX}:{song}");

    telemetry::record_invocation("resolve");
    let started = Instant::now();
    let outcome = extractor.extract_info(&target, &options).await;
    telemetry::record_latency("resolve", started.elapsed());

    let document = outcome.inspect_err(|_| telemetry::record_failure("resolve"))?;
    let url = select_stream_url(&document, song, selection)?;
    info!(song, %selection, "resolved audio url");
    Ok(url)
}

/// Pick the stream URL out of an info document returned for a single-result search.
pub fn select_stream_url(
    document: &Value,
    song: &str,
    selection: FormatSelection,
) -> Result<String, LookupError> {
    let no_results = || LookupError::NoResults {
        query: song.to_string(),
    };

    let entry = match document.get("entries") {
        Some(entries) => entries
            .as_array()
            .and_then(|entries| entries.first())
            .filter(|entry| entry.is_object())
            .ok_or_else(no_results)?,
        // A bare video document instead of a search playlist.
        None if document.get("requested_formats").is_some() => document,
        None => return Err(no_results()),
    };

    let formats = entry
        .get("requested_formats")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    selection
        .pick(formats)
        .and_then(|format| format.get("url"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(LookupError::UnsupportedFormatLayout {
            selection,
            available: formats.len(),
        })
}

fn is_audio_only(format: &Value) -> bool {
    let codec = |key: &str| format.get(key).and_then(Value::as_str);
    codec("vcodec") == Some("none") && !matches!(codec("acodec"), None | Some("none"))
}
