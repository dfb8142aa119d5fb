use assert_cmd::Command;
use predicates::prelude::*;

fn desk() -> Command {
    let mut cmd = Command::cargo_bin("spot-desk").unwrap();
    cmd.env_remove("DATABASE_URL")
        .env_remove("MARKET_TZ")
        .env_remove("DEFAULT_STAT")
        .env("LOG_LEVEL", "off");
    cmd
}

#[test]
fn test_parse_month_query() {
    desk()
        .args(["parse", "Aug 2025", "--today", "2025-06-15"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"outcome\": \"query\""))
        .stdout(predicate::str::contains("2025-08-01"))
        .stdout(predicate::str::contains("2025-08-31"))
        .stdout(predicate::str::contains("\"kind\": \"contract_month\""));
}

#[test]
fn test_parse_output_is_json() {
    let output = desk()
        .args(["parse", "GDAM yesterday 08:00 to 18:00 vwap", "--today", "2025-06-15"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let plan: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(plan["outcome"], "query");
    assert_eq!(plan["market"], "GDAM");
    assert_eq!(plan["stat"], "vwap");
    assert_eq!(plan["periods"][0]["span"]["start"], "2025-06-14");
}

#[test]
fn test_parse_unparsed() {
    desk()
        .args(["parse", "hello there", "--today", "2025-06-15"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"outcome\": \"unparsed\""));
}

#[test]
fn test_parse_default_stat_flag() {
    desk()
        .args(["--default-stat", "list", "parse", "yesterday", "--today", "2025-06-15"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"stat\": \"list\""));
}

#[test]
fn test_invalid_today_rejected() {
    desk()
        .args(["parse", "Aug 2025", "--today", "15/06/2025"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--today"));
}

#[test]
fn test_no_subcommand_shows_usage() {
    desk()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}
