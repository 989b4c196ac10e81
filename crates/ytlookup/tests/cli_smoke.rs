#![cfg(unix)]

mod common;

use std::process::{Command, Output};

use common::{FakeYtDlp, resolve_document, search_document, serial};
use serde_json::Value;

fn ytlookup(fake: &FakeYtDlp, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_ytlookup"))
        .args(args)
        .arg("--yt-dlp")
        .arg(&fake.binary)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run ytlookup")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn search_without_query_is_usage_error() {
    let _guard = serial();
    let output = Command::new(env!("CARGO_BIN_EXE_ytlookup"))
        .arg("search")
        .output()
        .expect("failed to run ytlookup");
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    assert!(stderr(&output).contains("Usage"));
}

#[test]
fn lofi_search_prints_sorted_json() {
    let _guard = serial();
    let fake = FakeYtDlp::new(&search_document(), "", 0);
    let output = ytlookup(&fake, &["search", "lofi beats", "3", "views"]);
    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));

    let parsed: Value = serde_json::from_str(stdout(&output).trim()).expect("stdout is JSON");
    let results = parsed.as_array().expect("JSON array");
    assert!(results.len() <= 3);
    let views: Vec<u64> = results
        .iter()
        .map(|r| {
            assert_eq!(r.as_object().map(|o| o.len()), Some(8));
            r["view_count"].as_u64().expect("numeric view_count")
        })
        .collect();
    assert!(views.windows(2).all(|pair| pair[0] >= pair[1]));
}

#[test]
fn failing_search_prints_empty_array() {
    let _guard = serial();
    let fake = FakeYtDlp::new("", "ERROR: network is unreachable", 1);
    let output = ytlookup(&fake, &["search", "lofi"]);
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout(&output).trim(), "[]");
    assert!(stderr(&output).contains("Error searching:"));
    assert!(stderr(&output).contains("network is unreachable"));
}

#[test]
fn strict_search_surfaces_the_fault() {
    let _guard = serial();
    let fake = FakeYtDlp::new("", "ERROR: network is unreachable", 1);
    let output = ytlookup(&fake, &["search", "lofi", "--strict"]);
    assert_eq!(output.status.code(), Some(4));
    assert!(output.stdout.is_empty());
    assert!(stderr(&output).contains("network is unreachable"));
}

#[test]
fn resolve_prints_the_audio_url() {
    let _guard = serial();
    let fake = FakeYtDlp::new(&resolve_document(), "", 0);
    let output = ytlookup(&fake, &["resolve", "never gonna give you up"]);
    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "https://rr1.googlevideo.com/audio\n");
}

#[test]
fn resolve_without_hits_exits_with_message() {
    let _guard = serial();
    let fake = FakeYtDlp::new(r#"{"entries":[]}"#, "", 0);
    let output = ytlookup(&fake, &["resolve", "some obscure string returning no hits"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(output.stdout.is_empty());
    assert!(stderr(&output).contains("no results found"));
}

#[test]
fn resolve_with_single_format_reports_layout() {
    let _guard = serial();
    let fake = FakeYtDlp::new(
        r#"{"entries":[{"requested_formats":[{"url":"https://combined"}]}]}"#,
        "",
        0,
    );
    let output = ytlookup(&fake, &["resolve", "song"]);
    assert_eq!(output.status.code(), Some(3));
    assert!(stderr(&output).contains("unsupported format layout"));
}

#[test]
fn blank_song_is_usage_error() {
    let _guard = serial();
    let fake = FakeYtDlp::new("", "", 0);
    let output = ytlookup(&fake, &["resolve", "   "]);
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
}
