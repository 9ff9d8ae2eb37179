//! Hygiene: source-scan budgets for the canvas crate.
//!
//! The canvas core must never crash the host page and must never own a clock
//! or a timer: time comes in through `tick(now)`. Each budget below is a
//! ceiling, ideally zero, and it only ever goes down.
#![allow(clippy::absurd_extreme_comparisons)]

use std::fs;
use std::path::Path;

// Panics: these crash the page.
const MAX_UNWRAP: usize = 0;
const MAX_EXPECT: usize = 0;
const MAX_PANIC: usize = 0;
const MAX_UNREACHABLE: usize = 0;
const MAX_TODO: usize = 0;

// Silent loss: discards errors without inspecting.
const MAX_SILENT_DISCARD: usize = 0;

// Clocks and timers: visibility must never hang off one.
const MAX_INSTANT_NOW: usize = 0;
const MAX_SYSTEM_TIME: usize = 0;
const MAX_SLEEP: usize = 0;
const MAX_SET_TIMEOUT: usize = 0;

struct SourceFile {
    path: String,
    content: String,
}

/// Production `.rs` files under `canvas/src/`, excluding `*_test.rs`.
fn source_files() -> Vec<SourceFile> {
    let mut files = Vec::new();
    collect_rs_files(Path::new("src"), &mut files);
    files
}

fn collect_rs_files(dir: &Path, out: &mut Vec<SourceFile>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_rs_files(&path, out);
            continue;
        }
        let path_str = path.to_string_lossy().to_string();
        if !path_str.ends_with(".rs") || path_str.ends_with("_test.rs") {
            continue;
        }
        if let Ok(content) = fs::read_to_string(&path) {
            out.push(SourceFile { path: path_str, content });
        }
    }
}

fn assert_budget(pattern: &str, max: usize) {
    let hits: Vec<(String, usize)> = source_files()
        .into_iter()
        .filter_map(|file| {
            let count = file
                .content
                .lines()
                .filter(|line| line.contains(pattern))
                .count();
            (count > 0).then_some((file.path, count))
        })
        .collect();
    let count: usize = hits.iter().map(|(_, c)| c).sum();
    let listing = hits
        .iter()
        .map(|(path, c)| format!("  {path}: {c}"))
        .collect::<Vec<_>>()
        .join("\n");
    assert!(count <= max, "`{pattern}` budget exceeded: found {count}, max {max}.\n{listing}");
}

#[test]
fn sources_are_found() {
    assert!(!source_files().is_empty(), "run from the canvas crate root");
}

#[test]
fn unwrap_budget() {
    assert_budget(".unwrap()", MAX_UNWRAP);
}

#[test]
fn expect_budget() {
    assert_budget(".expect(", MAX_EXPECT);
}

#[test]
fn panic_budget() {
    assert_budget("panic!(", MAX_PANIC);
}

#[test]
fn unreachable_budget() {
    assert_budget("unreachable!(", MAX_UNREACHABLE);
}

#[test]
fn todo_budget() {
    assert_budget("todo!(", MAX_TODO);
}

#[test]
fn silent_discard_budget() {
    assert_budget("let _ =", MAX_SILENT_DISCARD);
}

#[test]
fn instant_now_budget() {
    assert_budget("Instant::now", MAX_INSTANT_NOW);
}

#[test]
fn system_time_budget() {
    assert_budget("SystemTime", MAX_SYSTEM_TIME);
}

#[test]
fn sleep_budget() {
    assert_budget("sleep(", MAX_SLEEP);
}

#[test]
fn set_timeout_budget() {
    assert_budget("set_timeout", MAX_SET_TIMEOUT);
}
