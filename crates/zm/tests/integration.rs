//! End-to-end CLI integration tests for the `zm` binary.
//!
//! Each test writes a formula set and an ephemeris table into its own
//! temporary directory and runs `zm` there as a subprocess via `assert_cmd`.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const FORMULAS: &str = r#"
publisher: test
zmanim:
  - key: alos
    formula: solar(16.1, before_sunrise)
    category: dawn
  - key: netz
    formula: sunrise
    category: sunrise
  - key: shkia
    formula: sunset
    category: sunset
  - key: tzeis
    formula: "@shkia + 42min"
    category: nightfall
    tags:
      - tag: shabbos
        negated: true
  - key: deep
    formula: solar(30, after_sunset)
"#;

const EPHEMERIS: &str = r#"
days:
  2025-06-10:
    sunrise: 2025-06-10T02:33:10Z
    sunset: 2025-06-10T16:45:40Z
    solar_noon: 2025-06-10T09:39:25Z
    crossings:
      - angle: 16.1
        before_sunrise: 2025-06-10T01:05:00Z
        after_sunset: 2025-06-10T18:14:00Z
      - angle: 30
        before_sunrise: null
        after_sunset: null
"#;

/// `zm` with a clean environment rooted at `dir`.
fn zm(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("zm").unwrap();
    cmd.current_dir(dir)
        .env_remove("ZMANIM_DIR")
        .env_remove("ZMANIM_CONFIG")
        .env_remove("ZMANIM_CACHE__BACKEND")
        .env_remove("RUST_LOG");
    cmd
}

fn project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("zmanim.yaml"), FORMULAS).unwrap();
    fs::write(tmp.path().join("ephemeris.yaml"), EPHEMERIS).unwrap();
    tmp
}

const CALC: &[&str] = &[
    "calc",
    "-f",
    "zmanim.yaml",
    "-e",
    "ephemeris.yaml",
    "--lat",
    "31.778",
    "--lon",
    "35.235",
    "--tz",
    "Asia/Jerusalem",
];

const DATE: [&str; 2] = ["--date", "2025-06-10"];

fn calc_json(tmp: &TempDir, extra: &[&str]) -> serde_json::Value {
    let output = zm(tmp.path())
        .args(CALC)
        .args(DATE)
        .args(extra)
        .arg("--json")
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "calc failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

fn keys(day: &serde_json::Value) -> Vec<String> {
    day["zmanim"]
        .as_array()
        .unwrap()
        .iter()
        .map(|z| z["key"].as_str().unwrap().to_string())
        .collect()
}

// ---------------------------------------------------------------------------
// calc
// ---------------------------------------------------------------------------

#[test]
fn calc_prints_local_rounded_times() {
    let tmp = project();
    zm(tmp.path())
        .args(CALC)
        .args(DATE)
        .assert()
        .success()
        .stdout(predicate::str::contains("netz"))
        .stdout(predicate::str::contains("05:33"))
        .stdout(predicate::str::contains("19:46"))
        .stdout(predicate::str::contains("20:28"))
        .stderr(predicate::str::contains("deep omitted"));
}

#[test]
fn calc_json_is_chronological_with_failures() {
    let tmp = project();
    let day = calc_json(&tmp, &[]);
    assert_eq!(keys(&day), vec!["alos", "netz", "shkia", "tzeis"]);
    assert_eq!(day["from_cache"], false);
    assert_eq!(day["timezone"], "Asia/Jerusalem");
    assert_eq!(day["failures"][0]["key"], "deep");

    let netz = &day["zmanim"][1];
    assert_eq!(netz["exact"], "05:33:10");
    assert_eq!(netz["rounded"], "05:33");

    let shkia = day["zmanim"][2]["timestamp"].as_i64().unwrap();
    let tzeis = day["zmanim"][3]["timestamp"].as_i64().unwrap();
    assert_eq!(tzeis - shkia, 42 * 60);
}

#[test]
fn calc_active_tag_hides_negated_zman() {
    let tmp = project();
    let day = calc_json(&tmp, &["--tag", "shabbos"]);
    assert_eq!(keys(&day), vec!["alos", "netz", "shkia"]);
}

#[test]
fn calc_rounding_override() {
    let tmp = project();
    let day = calc_json(&tmp, &["--round", "shkia=floor"]);
    assert_eq!(day["zmanim"][2]["rounded"], "19:45");
    assert_eq!(day["zmanim"][2]["rounding_mode"], "floor");
}

#[test]
fn calc_missing_ephemeris_day_fails_batch() {
    let tmp = project();
    zm(tmp.path())
        .args(CALC)
        .args(["--date", "2025-06-11"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("unavailable"));
}

#[test]
fn calc_cycle_is_reported() {
    let tmp = project();
    fs::write(
        tmp.path().join("zmanim.yaml"),
        "zmanim:\n  - key: a\n    formula: \"@b + 1h\"\n  - key: b\n    formula: \"@a - 1h\"\n",
    )
    .unwrap();
    zm(tmp.path())
        .args(CALC)
        .args(DATE)
        .assert()
        .failure()
        .stderr(predicate::str::contains("circular reference: a -> b -> a"));
}

// ---------------------------------------------------------------------------
// cache
// ---------------------------------------------------------------------------

#[test]
fn sqlite_cache_hit_and_invalidate() {
    let tmp = project();
    fs::create_dir(tmp.path().join(".zmanim")).unwrap();
    fs::write(tmp.path().join(".zmanim/config.yaml"), "cache:\n  backend: sqlite\n").unwrap();
    let scope = ["--publisher", "test", "--locality", "jerusalem"];

    let first = calc_json(&tmp, &scope);
    assert_eq!(first["from_cache"], false);
    assert!(tmp.path().join(".zmanim/cache.db").exists());

    let second = calc_json(&tmp, &scope);
    assert_eq!(second["from_cache"], true);
    assert_eq!(second["zmanim"], first["zmanim"]);
    assert_eq!(second["failures"].as_array().unwrap().len(), 0);

    zm(tmp.path())
        .args(["cache", "invalidate", "--publisher", "test"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Invalidated 1"));

    let third = calc_json(&tmp, &scope);
    assert_eq!(third["from_cache"], false);
}

#[test]
fn env_overrides_cache_backend() {
    let tmp = project();
    fs::create_dir(tmp.path().join(".zmanim")).unwrap();
    zm(tmp.path())
        .args(CALC)
        .args(DATE)
        .args(["--publisher", "test", "--locality", "jerusalem"])
        .env("ZMANIM_CACHE__BACKEND", "sqlite")
        .assert()
        .success();
    assert!(tmp.path().join(".zmanim/cache.db").exists());
}

#[test]
fn cache_purge_with_memory_backend() {
    let tmp = project();
    zm(tmp.path())
        .args(["cache", "purge", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"removed\": 0"));
}

// ---------------------------------------------------------------------------
// validate / order
// ---------------------------------------------------------------------------

#[test]
fn validate_accepts_and_canonicalizes() {
    let tmp = project();
    zm(tmp.path())
        .args(["validate", "tzeis_72", "@shkia+72min", "-f", "zmanim.yaml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(@shkia + 1h12min)"));
}

#[test]
fn validate_reports_parse_offset() {
    let tmp = project();
    zm(tmp.path())
        .args(["validate", "x", "sunset - 18m"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("offset 9"));
}

#[test]
fn validate_extended_functions() {
    let tmp = project();
    zm(tmp.path())
        .args(["validate", "alos_72z", "proportional_minutes(72, before_visible_sunrise)"])
        .assert()
        .success()
        .stdout(predicate::str::contains("proportional_minutes(72, before_sunrise)"));
    zm(tmp.path())
        .args(["validate", "sz_shma", "proportional_hours(3, mga_16_1)"])
        .assert()
        .success();
}

#[test]
fn validate_rejects_runaway_nesting() {
    let tmp = project();
    let source = format!("{}sunrise{}", "(".repeat(10_000), ")".repeat(10_000));
    zm(tmp.path())
        .args(["validate", "x", source.as_str()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nests deeper than 64"));
}

#[test]
fn validate_rejects_cycle_through_existing_set() {
    let tmp = project();
    zm(tmp.path())
        .args(["validate", "shkia", "@tzeis - 42min", "-f", "zmanim.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("circular reference"));
}

#[test]
fn validate_json_error_on_stderr() {
    let tmp = project();
    let output = zm(tmp.path())
        .args(["validate", "x", "@nope", "--json"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let err: serde_json::Value = serde_json::from_slice(&output.stderr).unwrap();
    assert!(err["error"].as_str().unwrap().contains("@nope"));
}

#[test]
fn order_lists_dependencies_first() {
    let tmp = project();
    let output = zm(tmp.path())
        .args(["order", "-f", "zmanim.yaml", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let order: Vec<String> = serde_json::from_slice(&output.stdout).unwrap();
    let pos = |k: &str| order.iter().position(|x| x == k).unwrap();
    assert_eq!(order.len(), 5);
    assert!(pos("shkia") < pos("tzeis"));
}

#[test]
fn completion_generates_script() {
    let tmp = project();
    zm(tmp.path())
        .args(["completion", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("zm"));
}
