mod common;

use common::{TestCommand, TestEnvironment, EVENT_ONLY_CONFIG};

#[test]
fn test_cli_help() {
    TestCommand::new()
        .arg("--help")
        .expect_success()
        .stdout_contains("Run timer- and event-driven data daemons")
        .stdout_contains_all(["init", "validate", "fetch", "run"])
        .done();
}

#[test]
fn test_cli_version() {
    TestCommand::new()
        .arg("--version")
        .expect_success()
        .stdout_contains("ddm")
        .done();
}

#[test]
fn test_init_writes_example_config() {
    let env = TestEnvironment::new();

    env.command()
        .arg("init")
        .expect_success()
        .stdout_contains("Configuration initialized")
        .done();
    assert!(env.config_path().exists());

    // A second init refuses to clobber the file
    env.command()
        .arg("init")
        .expect_failure()
        .stderr_contains("--force")
        .done();

    env.command().args(["init", "--force"]).expect_success().done();
}

#[test]
fn test_validate_lists_daemons() {
    let env = TestEnvironment::new();
    env.command().arg("init").expect_success().done();

    env.command()
        .arg("validate")
        .expect_success()
        .stdout_contains("Configuration OK")
        .stdout_contains_all(["clock [timer]", "uuid [event]"])
        .done();
}

#[test]
fn test_validate_rejects_bad_config() {
    let env = TestEnvironment::new();
    env.write_config(
        r#"
[[daemons]]
name = "weather"
type = "timer"
url = "https://api.example.com/weather"
"#,
    );

    env.command()
        .arg("validate")
        .expect_failure()
        .stderr_contains("weather")
        .done();
}

#[test]
fn test_validate_rejects_unknown_daemon_type() {
    let env = TestEnvironment::new();
    env.write_config(
        r#"
[[daemons]]
name = "weather"
type = "cron"
"#,
    );

    env.command().arg("validate").expect_failure().done();
}

#[test]
fn test_missing_config_fails() {
    let env = TestEnvironment::new();
    env.command()
        .arg("validate")
        .expect_failure()
        .stderr_contains("not found")
        .done();
}

#[test]
fn test_run_accepts_control_lines() {
    let env = TestEnvironment::new();
    env.write_config(EVENT_ONLY_CONFIG);

    env.command()
        .arg("run")
        .stdin("list\nget inbox\nstop outbox\nlist\nquit\n")
        .expect_success()
        .stdout_contains_all([
            "inbox [event] status='' running=true listeners=1",
            "inbox has no data yet",
            "outbox stopped",
            "outbox [event] status='' running=false listeners=1",
        ])
        .done();
}

#[test]
fn test_run_reports_bad_control_lines() {
    let env = TestEnvironment::new();
    env.write_config(EVENT_ONLY_CONFIG);

    env.command()
        .arg("run")
        .stdin("dance\nget nobody\nquit\n")
        .expect_success()
        .stderr_contains("unknown command")
        .stderr_contains("nobody")
        .done();
}
