//! CLI contract tests.

use assert_cmd::Command;

const DISJOINT_CHROOT: &str = r#"
operation = "chroot"
name = "jail"
authority = "allow"

[subject]
pid = 100
vss = [1, 2]
vsw = [1, 2]
monitored = ["chroot"]

[object]
ino = 12
vs = [3]
"#;

const MONITORED_READLINK: &str = r#"
operation = "readlink"
name = "lnk"
authority = "deny"

[subject]
pid = 200
vss = [4]
vsw = [4]

[object]
ino = 30
mode = 41471
vs = [4]
monitored = ["readlink"]
"#;

fn scenario(contents: &str) -> tempfile::NamedTempFile {
    let file = tempfile::NamedTempFile::new().expect("temp file");
    std::fs::write(file.path(), contents).expect("write scenario");
    file
}

fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(stdout.trim()).expect("stdout is one JSON object")
}

#[test]
fn acctypes_lists_builtin_access_types() {
    let output = Command::cargo_bin("medusa")
        .expect("binary")
        .arg("acctypes")
        .output()
        .expect("run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let names: Vec<String> = stdout
        .lines()
        .map(|line| {
            let def: serde_json::Value = serde_json::from_str(line).expect("JSON line");
            def["name"].as_str().expect("name").to_owned()
        })
        .collect();
    assert_eq!(names, vec!["chroot", "readlink"]);
}

#[test]
fn check_denies_disjoint_virtual_spaces() {
    let file = scenario(DISJOINT_CHROOT);
    let output = Command::cargo_bin("medusa")
        .expect("binary")
        .arg("check")
        .arg(file.path())
        .output()
        .expect("run");
    assert!(output.status.success());
    let outcome = stdout_json(&output);
    assert_eq!(outcome["operation"], "chroot");
    assert_eq!(outcome["answer"], "deny");
    assert_eq!(outcome["status"], "fast_path");
    assert_eq!(outcome["audited"], true);
}

#[test]
fn check_escalates_to_the_endpoint() {
    let file = scenario(MONITORED_READLINK);
    let output = Command::cargo_bin("medusa")
        .expect("binary")
        .arg("check")
        .arg(file.path())
        .output()
        .expect("run");
    assert!(output.status.success());
    let outcome = stdout_json(&output);
    assert_eq!(outcome["answer"], "deny");
    assert_eq!(outcome["status"], "request");
}

#[test]
fn check_writes_audit_file_from_config() {
    let dir = tempfile::tempdir().expect("temp dir");
    let audit_path = dir.path().join("audit.jsonl");
    let config_path = dir.path().join("medusa.toml");
    std::fs::write(
        &config_path,
        format!("[audit]\npath = {:?}\n", audit_path.display().to_string()),
    )
    .expect("write config");
    let file = scenario(DISJOINT_CHROOT);

    let output = Command::cargo_bin("medusa")
        .expect("binary")
        .arg("--config")
        .arg(&config_path)
        .arg("check")
        .arg(file.path())
        .output()
        .expect("run");

    assert!(output.status.success());
    let audit = std::fs::read_to_string(&audit_path).expect("audit written");
    let record: serde_json::Value = serde_json::from_str(audit.trim()).expect("JSON record");
    assert_eq!(record["function"], "chroot");
    assert_eq!(record["vs"]["vst"], serde_json::json!([3]));
}

#[test]
fn check_rejects_unknown_monitored_name() {
    let file = scenario(&DISJOINT_CHROOT.replace("[\"chroot\"]", "[\"mkdir\"]"));
    Command::cargo_bin("medusa")
        .expect("binary")
        .arg("check")
        .arg(file.path())
        .assert()
        .failure();
}
