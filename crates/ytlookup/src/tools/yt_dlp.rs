use std::ffi::OsString;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use serde_json::Value;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::error::LookupError;

/// Search prefix understood by yt-dlp for YouTube keyword searches.
pub const SEARCH_PREFIX: &str = "ytsearch";

const STDERR_LIMIT: usize = 1024;

/// Options forwarded to the extractor for a single call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtractOptions {
    pub quiet: bool,
    /// List entries without resolving each one (no formats, fewer fields).
    pub flat: bool,
    pub ignore_errors: bool,
    pub default_search: Option<String>,
    pub cookies: Option<PathBuf>,
}

impl ExtractOptions {
    /// Metadata-only listing used by keyword search.
    pub fn for_search() -> Self {
        Self {
            quiet: true,
            flat: true,
            ignore_errors: true,
            default_search: Some(SEARCH_PREFIX.to_string()),
            cookies: None,
        }
    }

    /// Full extraction of a single hit, so that `requested_formats` is populated.
    pub fn for_resolve() -> Self {
        Self {
            quiet: true,
            ..Self::default()
        }
    }

    pub fn with_cookies(mut self, cookies: Option<PathBuf>) -> Self {
        self.cookies = cookies;
        self
    }

    /// Command-line arguments equivalent to these options, ending with `target`.
    pub fn to_args(&self, target: &str) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["--dump-single-json".into(), "--no-warnings".into()];
        if self.quiet {
            args.push("--quiet".into());
        }
        if self.flat {
            args.push("--flat-playlist".into());
        }
        if self.ignore_errors {
            args.push("--ignore-errors".into());
        }
        if let Some(prefix) = &self.default_search {
            args.push("--default-search".into());
            args.push(prefix.into());
        }
        if let Some(cookies) = &self.cookies {
            args.push("--cookies".into());
            args.push(cookies.into());
        }
        args.push("--".into());
        args.push(target.into());
        args
    }
}

/// Source of media metadata. `target` is a prefixed search such as `ytsearch3:lofi`.
///
/// Implementations return the extractor's info document, or `Value::Null` when the
/// extractor produced no document at all.
pub trait MediaExtractor {
    fn extract_info(
        &self,
        target: &str,
        options: &ExtractOptions,
    ) -> impl Future<Output = Result<Value, LookupError>> + Send;
}

/// Process-level settings for running the extractor binary.
#[derive(Clone, Debug)]
pub struct ExtractorConfig {
    pub binary: PathBuf,
    pub timeout: Option<Duration>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("yt-dlp"),
            timeout: Some(Duration::from_secs(120)),
        }
    }
}

/// Async wrapper around the `yt-dlp` command.
#[derive(Clone, Debug)]
pub struct YtDlpTool {
    config: ExtractorConfig,
}

impl YtDlpTool {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    pub fn binary(&self) -> &Path {
        &self.config.binary
    }

    async fn run(&self, target: &str, options: &ExtractOptions) -> Result<Value, LookupError> {
        let mut cmd = Command::new(&self.config.binary);
        cmd.args(options.to_args(target))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(
            target: "ytlookup::tools::yt_dlp",
            binary = %self.config.binary.display(),
            %target,
            flat = options.flat,
            cookies = options.cookies.is_some(),
            "invoking extractor"
        );

        let pending = cmd.output();
        let output = match self.config.timeout {
            Some(limit) => timeout(limit, pending).await.map_err(|_| {
                LookupError::external(format!(
                    "yt-dlp invocation timed out after {}s",
                    limit.as_secs()
                ))
            })?,
            None => pending.await,
        }
        .map_err(|err| {
            LookupError::external(format!(
                "failed to spawn {}: {err}; is yt-dlp installed and on PATH?",
                self.config.binary.display()
            ))
        })?;

        let stderr_text = String::from_utf8_lossy(&output.stderr);
        let stdout_text = String::from_utf8_lossy(&output.stdout);
        let body = stdout_text.trim();

        if body.is_empty() {
            if output.status.success() {
                debug!(target: "ytlookup::tools::yt_dlp", "extractor produced no document");
                return Ok(Value::Null);
            }
            return Err(LookupError::external(exit_message(
                output.status,
                &stderr_text,
            )));
        }

        let document: Value = serde_json::from_str(body).map_err(|err| {
            LookupError::external(format!("failed to parse yt-dlp output: {err}"))
        })?;

        if !output.status.success() {
            // --ignore-errors still prints whatever it managed to collect.
            warn!(
                target: "ytlookup::tools::yt_dlp",
                status = %output.status,
                stderr = %stderr_text.trim(),
                "yt-dlp reported errors; using partial output"
            );
        }

        Ok(document)
    }
}

impl MediaExtractor for YtDlpTool {
    fn extract_info(
        &self,
        target: &str,
        options: &ExtractOptions,
    ) -> impl Future<Output = Result<Value, LookupError>> + Send {
        self.run(target, options)
    }
}

fn exit_message(status: ExitStatus, stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        return format!("yt-dlp exited with status {status}");
    }
    let mut detail: String = trimmed.chars().take(STDERR_LIMIT).collect();
    if detail.len() < trimmed.len() {
        detail.push_str("\n... (truncated)");
    }
    format!("yt-dlp exited with status {status}: {detail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn search_preset_maps_to_flat_quiet_listing() {
        let args = strings(ExtractOptions::for_search().to_args("ytsearch3:lofi beats"));
        assert_eq!(
            args,
            vec![
                "--dump-single-json",
                "--no-warnings",
                "--quiet",
                "--flat-playlist",
                "--ignore-errors",
                "--default-search",
                "ytsearch",
                "--",
                "ytsearch3:lofi beats",
            ]
        );
    }

    #[test]
    fn resolve_preset_passes_cookies_when_present() {
        let options =
            ExtractOptions::for_resolve().with_cookies(Some(PathBuf::from("/srv/cookies.txt")));
        let args = strings(options.to_args("ytsearch:song"));
        assert!(!args.contains(&"--flat-playlist".to_string()));
        assert!(!args.contains(&"--ignore-errors".to_string()));
        let at = args
            .iter()
            .position(|arg| arg == "--cookies")
            .expect("cookies flag");
        assert_eq!(args[at + 1], "/srv/cookies.txt");
        assert_eq!(args.last().map(String::as_str), Some("ytsearch:song"));
    }

    #[cfg(unix)]
    #[test]
    fn exit_message_truncates_long_stderr() {
        use std::os::unix::process::ExitStatusExt;

        let status = ExitStatus::from_raw(1 << 8);
        let noisy = "x".repeat(STDERR_LIMIT * 2);
        let message = exit_message(status, &noisy);
        assert!(message.ends_with("... (truncated)"));
        assert!(message.len() < noisy.len());
    }
}
