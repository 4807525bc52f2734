//! E2E CLI tests for import, dump and reset.
//!
//! Each test runs the `rumble` binary as a subprocess against a synthetic
//! export archive written into an isolated temp directory.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{Value, json};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Test Harness
// ---------------------------------------------------------------------------

const BOT: &str = "BOT";
const CHANNEL: &str = "555";

/// Build a Command targeting the rumble binary, rooted in `dir`.
fn rumble_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("rumble"));
    cmd.current_dir(dir);
    // Suppress tracing output that goes to stderr
    cmd.env("RUMBLE_LOG", "error");
    cmd.env_remove("FORMAT");
    cmd
}

fn bot(id: &str, ts: &str, title: &str, description: &str) -> Value {
    json!({
        "id": id,
        "timestamp": ts,
        "author": {"id": BOT, "name": "Rumble Royale"},
        "embeds": [{"title": title, "description": description}],
    })
}

fn write_export(dir: &Path, file: &str, messages: &[Value]) {
    let channel = dir.join("exports").join(CHANNEL);
    fs::create_dir_all(&channel).expect("create channel dir");
    let export = json!({"channel": {"id": CHANNEL}, "messages": messages});
    fs::write(
        channel.join(file),
        serde_json::to_vec(&export).expect("encode export"),
    )
    .expect("write export");
}

fn seed_game(dir: &Path) {
    write_export(
        dir,
        "game.json",
        &[
            bot(
                "m1",
                "2024-04-01T00:00:00+00:00",
                "Rumble Royale hosted by zed",
                "Era: <:e:1>Classic\n\nClick the emoji below to join.",
            ),
            bot(
                "m2",
                "2024-04-01T00:02:00+00:00",
                "Started a new Rumble Royale session",
                "**Era:** <:e:1>Classic\n**Prize:** 500 <:gold:1>",
            ),
            bot(
                "m3",
                "2024-04-01T00:03:00+00:00",
                "__Round 1__",
                "<:K:1> | **alex** bonked ~~**sam**~~.\n\nPlayers Left: 9",
            ),
            bot(
                "m4",
                "2024-04-01T00:05:00+00:00",
                "<:Crwn2:1> **__WINNER!__**",
                "**alex**\n**Reward:** 500 <:gold:1>",
            ),
        ],
    );
}

fn import_args(extra: &[&str]) -> Vec<String> {
    let mut args: Vec<String> = [
        "import",
        "--root",
        "exports",
        "--channel",
        CHANNEL,
        "--bot-author",
        BOT,
        "--db",
        "history.db",
    ]
    .iter()
    .map(ToString::to_string)
    .collect();
    args.extend(extra.iter().map(ToString::to_string));
    args
}

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

#[test]
fn import_json_reports_replayed_game() {
    let dir = TempDir::new().expect("tempdir");
    seed_game(dir.path());

    let output = rumble_cmd(dir.path())
        .args(import_args(&["--json"]))
        .output()
        .expect("import should not crash");
    assert!(
        output.status.success(),
        "import failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let report: Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(report["files"], 1);
    assert_eq!(report["stats"]["games_started"], 1);
    assert_eq!(report["stats"]["games_won"], 1);
    assert_eq!(report["store"]["games"], 1);
    assert_eq!(report["store"]["rounds"], 1);
    assert!(report["elapsed_ms"].is_u64());
    assert!(dir.path().join("history.db").exists());
}

#[test]
fn import_text_output_is_single_line() {
    let dir = TempDir::new().expect("tempdir");
    seed_game(dir.path());

    rumble_cmd(dir.path())
        .args(import_args(&[]))
        .assert()
        .success()
        .stdout(predicate::str::starts_with("import: channels=1 files=1"))
        .stdout(predicate::str::contains("games=1 rounds=1"));
}

#[test]
fn import_reads_settings_from_config_file() {
    let dir = TempDir::new().expect("tempdir");
    seed_game(dir.path());
    fs::write(
        dir.path().join("rumble.toml"),
        format!(
            "[archive]\nroot = \"exports\"\nchannels = [\"{CHANNEL}\"]\n\n[bot]\nauthor_id = \"{BOT}\"\n\n[store]\npath = \"data/main.db\"\n"
        ),
    )
    .expect("write config");

    rumble_cmd(dir.path())
        .args(["import", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"games\": 1"));
    assert!(dir.path().join("data/main.db").exists());
}

#[test]
fn import_rerun_leaves_counts_unchanged() {
    let dir = TempDir::new().expect("tempdir");
    seed_game(dir.path());

    let run = || {
        let output = rumble_cmd(dir.path())
            .args(import_args(&["--json"]))
            .output()
            .expect("import should not crash");
        assert!(output.status.success());
        let report: Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
        report["store"].clone()
    };
    let first = run();
    let second = run();
    assert_eq!(first, second);
}

#[test]
fn import_failure_reports_error_code() {
    let dir = TempDir::new().expect("tempdir");
    write_export(
        dir.path(),
        "bad.json",
        &[
            bot(
                "m1",
                "2024-04-01T00:00:00+00:00",
                "Rumble Royale hosted by zed",
                "Era: <:e:1>Classic",
            ),
            bot(
                "m2",
                "2024-04-01T00:02:00+00:00",
                "Started a new Rumble Royale session",
                "**Era:** <:e:1>Classic",
            ),
            bot(
                "m3",
                "2024-04-01T00:03:00+00:00",
                "__Round 1__",
                "<:K:1> | **alex** traded __Bow__ for __Sword__.",
            ),
        ],
    );

    let output = rumble_cmd(dir.path())
        .args(import_args(&["--json"]))
        .output()
        .expect("import should not crash");
    assert!(!output.status.success());

    // The rendered JSON error comes first; the process error line follows it.
    let error: Value = serde_json::Deserializer::from_slice(&output.stderr)
        .into_iter::<Value>()
        .next()
        .expect("JSON error on stderr")
        .expect("valid JSON error");
    assert_eq!(error["error"]["error_code"], "E2002");
    let message = error["error"]["message"].as_str().expect("message");
    assert!(message.contains("bad.json"), "message: {message}");
    assert!(message.contains("m3"), "message: {message}");
}

#[test]
fn missing_explicit_config_fails() {
    let dir = TempDir::new().expect("tempdir");
    rumble_cmd(dir.path())
        .args(["import", "--config", "absent.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E1002"));
}

// ---------------------------------------------------------------------------
// Dump & reset
// ---------------------------------------------------------------------------

#[test]
fn dump_to_stdout_is_loadable_sql() {
    let dir = TempDir::new().expect("tempdir");
    seed_game(dir.path());
    rumble_cmd(dir.path()).args(import_args(&[])).assert().success();

    let output = rumble_cmd(dir.path())
        .args(["dump", "--db", "history.db"])
        .output()
        .expect("dump should not crash");
    assert!(output.status.success());
    let sql = String::from_utf8(output.stdout).expect("utf8");
    assert!(sql.starts_with("-- Rumble Royale statistics dump"));
    assert!(sql.contains("Latest game time considered in this dump: 2024-04-01T00:05:00Z"));
    assert!(sql.contains("DO NOT EDIT"));

    let copy = rusqlite::Connection::open_in_memory().expect("open");
    copy.execute_batch(&sql).expect("reload dump");
    let games: i64 = copy
        .query_row("SELECT COUNT(*) FROM games", [], |row| row.get(0))
        .expect("count games");
    assert_eq!(games, 1);
}

#[test]
fn dump_to_file_prints_summary() {
    let dir = TempDir::new().expect("tempdir");
    seed_game(dir.path());
    rumble_cmd(dir.path()).args(import_args(&[])).assert().success();

    let output = rumble_cmd(dir.path())
        .args(["dump", "--db", "history.db", "--output", "out.sql", "--json"])
        .output()
        .expect("dump should not crash");
    assert!(output.status.success());
    let summary: Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(summary["latest_activity"], "2024-04-01T00:05:00Z");
    assert!(summary["rows"].as_u64().unwrap_or_default() > 0);

    let sql = fs::read_to_string(dir.path().join("out.sql")).expect("read dump");
    assert!(sql.trim_end().ends_with("COMMIT;"));
}

#[test]
fn dump_without_store_fails() {
    let dir = TempDir::new().expect("tempdir");
    rumble_cmd(dir.path())
        .args(["dump", "--db", "nope.db"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E3002"));
    assert!(!dir.path().join("nope.db").exists());
}

#[test]
fn reset_prints_schema() {
    let dir = TempDir::new().expect("tempdir");
    rumble_cmd(dir.path())
        .args(["reset", "--db", "fresh.db"])
        .assert()
        .success()
        .stdout(predicate::str::contains("CREATE TABLE games"))
        .stdout(predicate::str::contains("CREATE TABLE rounds"));
    assert!(dir.path().join("fresh.db").exists());
}

#[test]
fn reset_wipe_empties_store() {
    let dir = TempDir::new().expect("tempdir");
    seed_game(dir.path());
    rumble_cmd(dir.path()).args(import_args(&[])).assert().success();

    rumble_cmd(dir.path())
        .args(["reset", "--wipe", "--db", "history.db"])
        .assert()
        .success();

    let conn = rusqlite::Connection::open(dir.path().join("history.db")).expect("open");
    let games: i64 = conn
        .query_row("SELECT COUNT(*) FROM games", [], |row| row.get(0))
        .expect("count games");
    assert_eq!(games, 0);
}

#[test]
fn completions_name_the_binary() {
    let dir = TempDir::new().expect("tempdir");
    rumble_cmd(dir.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("rumble"));
}
