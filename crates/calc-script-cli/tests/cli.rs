use pretty_assertions::assert_eq;
use std::path::PathBuf;
use std::process::Command;

fn scratch_file(name: &str, contents: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("calc-check-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

fn calc_check() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_calc-check"));
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_clean_script_exits_zero() {
    let script = scratch_file("clean.js", "var dose = dosePerKg(5, weight);\n");
    let params = scratch_file(
        "clean-params.json",
        r#"[{ "name": "weight", "data_type": "Number", "default_value": "70" }]"#,
    );
    let output = calc_check()
        .arg(&script)
        .arg("--params")
        .arg(&params)
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "No problems found\n");
}

#[test]
fn test_errors_exit_one() {
    let script = scratch_file("broken.js", "var dose = dosePerKg(5);\n");
    let output = calc_check().arg(&script).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains(":1:12: error: Function 'dosePerKg' requires at least 2 arguments, 1 provided"),
        "{stdout}"
    );
    assert!(stdout.ends_with("1 error\n"), "{stdout}");
}

#[test]
fn test_json_output() {
    let script = scratch_file("json.js", "total = 1;\n");
    let output = calc_check()
        .arg(&script)
        .args(["--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["status"], "1 warning");
    assert_eq!(
        value["diagnostics"][0]["message"],
        "Variable 'total' is assigned without declaration"
    );
    assert_eq!(value["diagnostics"][0]["category"], "Semantic");
}

#[test]
fn test_missing_file_reports_context() {
    let output = calc_check()
        .arg("/nonexistent/calc-check/script.js")
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to read script"), "{stderr}");
}
