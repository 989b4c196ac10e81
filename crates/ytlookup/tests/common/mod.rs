#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use tempfile::TempDir;

static SERIAL: Mutex<()> = Mutex::new(());

/// Serialize tests that write and then execute scripts; a concurrent fork can keep the
/// script's write handle open and make exec fail with ETXTBSY.
pub fn serial() -> MutexGuard<'static, ()> {
    SERIAL.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A throwaway `yt-dlp` stand-in that records its arguments and replays canned output.
pub struct FakeYtDlp {
    dir: TempDir,
    pub binary: PathBuf,
}

impl FakeYtDlp {
    pub fn new(stdout: &str, stderr: &str, exit_code: i32) -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let root = dir.path();
        fs::write(root.join("stdout.json"), stdout).expect("failed to write stdout fixture");
        fs::write(root.join("stderr.txt"), stderr).expect("failed to write stderr fixture");

        let script = format!(
            "#!/bin/sh\nprintf '%s\\n' \"$@\" > '{args}'\ncat '{out}'\ncat '{err}' >&2\nexit {exit_code}\n",
            args = root.join("args.txt").display(),
            out = root.join("stdout.json").display(),
            err = root.join("stderr.txt").display(),
        );
        let binary = install(root, &script);
        Self { dir, binary }
    }

    /// A stand-in that never answers within a short timeout.
    pub fn hanging() -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let binary = install(dir.path(), "#!/bin/sh\nexec sleep 30\n");
        Self { dir, binary }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Arguments passed by the most recent invocation, one per element.
    pub fn recorded_args(&self) -> Vec<String> {
        fs::read_to_string(self.dir.path().join("args.txt"))
            .expect("fake yt-dlp was not invoked")
            .lines()
            .map(str::to_string)
            .collect()
    }
}

fn install(root: &Path, script: &str) -> PathBuf {
    let binary = root.join("yt-dlp");
    fs::write(&binary, script).expect("failed to write fake yt-dlp");
    fs::set_permissions(&binary, fs::Permissions::from_mode(0o755))
        .expect("failed to mark fake yt-dlp executable");
    binary
}

pub fn search_document() -> String {
    serde_json::json!({
        "_type": "playlist",
        "id": "lofi beats",
        "entries": [
            {
                "id": "jfKfPfyJRdk",
                "title": "lofi hip hop radio",
                "duration": null,
                "uploader": "Lofi Girl",
                "view_count": 120,
                "thumbnails": [{ "url": "https://i.ytimg.com/vi/jfKfPfyJRdk/hq720.jpg" }]
            },
            null,
            {
                "id": "5qap5aO4i9A",
                "title": "Beats to sleep to",
                "duration": 3600.0,
                "view_count": 98000,
                "upload_date": "20200222"
            },
            {
                "id": "lTRiuFIWV54",
                "title": "1 A.M Study Session",
                "webpage_url": "https://www.youtube.com/watch?v=lTRiuFIWV54"
            }
        ]
    })
    .to_string()
}

pub fn resolve_document() -> String {
    serde_json::json!({
        "_type": "playlist",
        "entries": [{
            "id": "dQw4w9WgXcQ",
            "requested_formats": [
                { "format_id": "399", "vcodec": "av01.0.08M.08", "acodec": "none", "url": "https://rr1.googlevideo.com/video" },
                { "format_id": "251", "vcodec": "none", "acodec": "opus", "url": "https://rr1.googlevideo.com/audio" }
            ]
        }]
    })
    .to_string()
}
