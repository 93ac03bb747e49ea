//! Integration tests for the `fritzly` CLI binary.
//!
//! Argument parsing, help output, completions and error handling, plus one
//! end-to-end run against a mocked router.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `fritzly` binary with env isolation.
///
/// Clears all `FRITZLY_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn fritzly_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("fritzly");
    cmd.env("HOME", "/tmp/fritzly-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/fritzly-cli-test-nonexistent")
        .env_remove("FRITZLY_PROFILE")
        .env_remove("FRITZLY_URL")
        .env_remove("FRITZLY_USERNAME")
        .env_remove("FRITZLY_PASSWORD")
        .env_remove("FRITZLY_OUTPUT")
        .env_remove("FRITZLY_INSECURE")
        .env_remove("FRITZLY_TIMEOUT")
        .env_remove("RUST_LOG");
    cmd
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = fritzly_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    fritzly_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("FRITZ!Box")
            .and(predicate::str::contains("devices"))
            .and(predicate::str::contains("thermostat")),
    );
}

#[test]
fn test_version_flag() {
    fritzly_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("fritzly"));
}

#[test]
fn test_completions_bash() {
    fritzly_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

// ── Argument validation ─────────────────────────────────────────────

#[test]
fn test_out_of_range_temperature_is_a_usage_error() {
    let output = fritzly_cmd()
        .args(["thermostat", "set", "08761 0000434", "7.9"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(text.contains("Invalid temperature"), "{text}");
}

#[test]
fn test_boost_over_a_day_is_rejected() {
    let output = fritzly_cmd()
        .args(["thermostat", "boost", "08761 0000434", "25h"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("24h"));
}

#[test]
fn test_unknown_capability_filter() {
    fritzly_cmd()
        .args(["devices", "list", "--capability", "toaster"])
        .assert()
        .code(2);
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_devices_list_without_router() {
    fritzly_cmd()
        .args(["devices", "list"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("No router configured"));
}

#[test]
fn test_unknown_profile() {
    fritzly_cmd()
        .args(["--profile", "attic", "devices", "list"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("attic"));
}

// ── Against a mocked router ─────────────────────────────────────────

const SESSION_SENTINEL: &str = "<SessionInfo><SID>0000000000000000</SID><Challenge>1234567z</Challenge><BlockTime>0</BlockTime></SessionInfo>";
const SESSION_OK: &str = "<SessionInfo><SID>9c8ab0f9ad0a1f76</SID><Challenge>1234567z</Challenge><BlockTime>0</BlockTime></SessionInfo>";
const SESSION_BLOCKED: &str = "<SessionInfo><SID>0000000000000000</SID><Challenge>1234567z</Challenge><BlockTime>16</BlockTime></SessionInfo>";

const DEVICE_LIST: &str = r#"<devicelist version="1" fwversion="7.57">
<device identifier="08761 0000434" id="17" functionbitmask="320" fwversion="04.94" manufacturer="AVM" productname="FRITZ!DECT 301">
  <present>1</present><txbusy>0</txbusy><name>Bad</name><battery>80</battery><batterylow>0</batterylow>
  <temperature><celsius>215</celsius><offset>0</offset></temperature>
  <hkr><tist>43</tist><tsoll>42</tsoll><absenk>32</absenk><komfort>42</komfort><lock>0</lock><devicelock>0</devicelock>
    <errorcode>0</errorcode><windowopenactiv>0</windowopenactiv><boostactive>0</boostactive>
    <summeractive>0</summeractive><holidayactive>0</holidayactive></hkr>
</device>
</devicelist>"#;

async fn mock_router(login_response: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/login_sid.lua"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SESSION_SENTINEL))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/login_sid.lua"))
        .respond_with(ResponseTemplate::new(200).set_body_string(login_response))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/webservices/homeautoswitch.lua"))
        .and(query_param("switchcmd", "getdevicelistinfos"))
        .respond_with(ResponseTemplate::new(200).set_body_string(DEVICE_LIST))
        .mount(&server)
        .await;
    server
}

#[tokio::test(flavor = "multi_thread")]
async fn test_devices_list_json() {
    let server = mock_router(SESSION_OK).await;
    let uri = server.uri();

    let output = tokio::task::spawn_blocking(move || {
        fritzly_cmd()
            .args(["--url", &uri, "--username", "admin", "--password", "secret"])
            .args(["-o", "json", "devices", "list"])
            .output()
            .unwrap()
    })
    .await
    .unwrap();

    assert!(output.status.success(), "{}", combined_output(&output));
    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["identifier"], "08761 0000434");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rejected_login_exits_with_auth_code() {
    let server = mock_router(SESSION_BLOCKED).await;
    let uri = server.uri();

    let output = tokio::task::spawn_blocking(move || {
        fritzly_cmd()
            .args(["--url", &uri, "--username", "admin", "--password", "wrong"])
            .args(["devices", "list"])
            .output()
            .unwrap()
    })
    .await
    .unwrap();

    assert_eq!(output.status.code(), Some(3), "{}", combined_output(&output));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_profile_from_config_file() {
    let server = mock_router(SESSION_OK).await;
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("fritzly")).unwrap();
    std::fs::write(
        dir.path().join("fritzly/config.toml"),
        format!(
            "default_profile = \"home\"\n\n[profiles.home]\nurl = \"{}\"\nusername = \"admin\"\n",
            server.uri()
        ),
    )
    .unwrap();
    let config_home = dir.path().to_path_buf();

    let output = tokio::task::spawn_blocking(move || {
        fritzly_cmd()
            .env("XDG_CONFIG_HOME", &config_home)
            .env("FRITZLY_PASSWORD", "secret")
            .args(["-o", "plain", "devices", "list", "--capability", "thermostat"])
            .output()
            .unwrap()
    })
    .await
    .unwrap();

    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "08761 0000434");
}
