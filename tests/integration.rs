//! Integration tests for the keygap CLI

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn test_attack_msb_job_from_file() {
    Command::cargo_bin("keygap")
        .unwrap()
        .arg("attack")
        .arg("tests/fixtures/scenario_a.json")
        .assert()
        .code(0)
        .stdout(predicate::str::contains("recovered"))
        .stdout(predicate::str::contains("90076698098945"));
}

#[test]
fn test_attack_job_from_stdin() {
    let input = include_str!("fixtures/scenario_a.json");
    Command::cargo_bin("keygap")
        .unwrap()
        .arg("attack")
        .arg("-")
        .write_stdin(input)
        .assert()
        .code(0)
        .stdout(predicate::str::contains("Hidden block x: 3329"));
}

#[test]
fn test_attack_lsb_job_csv() {
    let input = "n,e,d0,x_bound,modulus,exposure,shift\n\
                 90802716437687,65537,19823836417,4096,90798519799904,lsb,35";
    Command::cargo_bin("keygap")
        .unwrap()
        .arg("attack")
        .arg("-")
        .write_stdin(input)
        .assert()
        .code(0)
        .stdout(predicate::str::contains("90076698098945"));
}

#[test]
fn test_infeasible_job_fails_with_reason() {
    let input = r#"[{
        "n": "90802716437687",
        "e": "65537",
        "d0": "90076201615360",
        "x_bound": "536870912",
        "modulus": "90798519799904",
        "exposure": "msb"
    }]"#;
    Command::cargo_bin("keygap")
        .unwrap()
        .arg("attack")
        .arg("-")
        .write_stdin(input)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("failed"))
        .stdout(predicate::str::contains("bound exceeded"));
}

#[test]
fn test_sweep_reports_winner() {
    let input = include_str!("fixtures/scenario_a.json");
    Command::cargo_bin("keygap")
        .unwrap()
        .arg("attack")
        .arg("-")
        .arg("--sweep")
        .arg("2,1;3,2")
        .arg("--threads")
        .arg("2")
        .write_stdin(input)
        .assert()
        .code(0)
        .stdout(predicate::str::contains("Sweep winner"));
}

#[test]
fn test_brute_force_method() {
    let input = include_str!("fixtures/scenario_a.json");
    Command::cargo_bin("keygap")
        .unwrap()
        .arg("attack")
        .arg("-")
        .arg("--method")
        .arg("brute-force")
        .write_stdin(input)
        .assert()
        .code(0)
        .stdout(predicate::str::contains("90076698098945"));
}

#[test]
fn test_sweep_rejected_for_brute_force_method() {
    let input = include_str!("fixtures/scenario_a.json");
    Command::cargo_bin("keygap")
        .unwrap()
        .arg("attack")
        .arg("-")
        .arg("--method")
        .arg("brute-force")
        .arg("--sweep")
        .arg("2,1;3,2")
        .write_stdin(input)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--sweep"));
}

#[test]
fn test_json_output_schema() {
    let output = Command::cargo_bin("keygap")
        .unwrap()
        .arg("--json")
        .arg("attack")
        .arg("tests/fixtures/scenario_a.json")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0));

    let json: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("Output should be valid JSON");

    assert!(json["jobs"].is_array());
    let job = &json["jobs"][0];
    assert_eq!(job["status"].as_str(), Some("recovered"));
    assert_eq!(job["exposure"].as_str(), Some("msb"));
    assert_eq!(job["hidden_block"].as_str(), Some("3329"));
    assert_eq!(
        job["private_exponent_decimal"].as_str(),
        Some("90076698098945")
    );
    assert_eq!(job["congruence_check"].as_bool(), Some(true));
    let hex = job["private_exponent_hex"].as_str().unwrap();
    assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(json["summary"]["keys_recovered"].as_u64(), Some(1));
}

#[test]
fn test_demo_recovers_seeded_key() {
    Command::cargo_bin("keygap")
        .unwrap()
        .arg("demo")
        .arg("--seed")
        .arg("7")
        .assert()
        .code(0)
        .stdout(predicate::str::contains("Status: recovered"))
        .stdout(predicate::str::contains("Matches true key: yes"))
        .stdout(predicate::str::contains("Encryption round trip: ok"));
}

#[test]
fn test_demo_json_output() {
    let output = Command::cargo_bin("keygap")
        .unwrap()
        .arg("--json")
        .arg("demo")
        .arg("--seed")
        .arg("7")
        .arg("--exposure")
        .arg("lsb")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0));
    let json: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("Output should be valid JSON");
    assert_eq!(json["status"].as_str(), Some("recovered"));
    assert_eq!(json["matches_true_key"].as_bool(), Some(true));
}

#[test]
fn test_invalid_input_error_exit() {
    Command::cargo_bin("keygap")
        .unwrap()
        .arg("attack")
        .arg("-")
        .write_stdin("not valid json")
        .assert()
        .code(2);
}

#[test]
fn test_unknown_method_error_exit() {
    let input = include_str!("fixtures/scenario_a.json");
    Command::cargo_bin("keygap")
        .unwrap()
        .arg("attack")
        .arg("-")
        .arg("--method")
        .arg("quantum")
        .write_stdin(input)
        .assert()
        .code(2);
}
