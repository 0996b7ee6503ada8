use std::process::Command;

use photojudge::judging::Criterion;
use tempfile::tempdir;

#[test]
fn cli_criteria_prints_stock_set() {
    let output = Command::new(env!("CARGO_BIN_EXE_photojudge"))
        .arg("criteria")
        .output()
        .unwrap();
    assert!(output.status.success());

    let criteria: Vec<Criterion> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(criteria.len(), 4);
    assert_eq!(criteria[0].name, "Composition");
    assert!((criteria[1].weight - 1.2).abs() < 1e-9);
}

#[test]
fn cli_judge_fails_cleanly_without_api_key() {
    let dir = tempdir().unwrap();
    let image_path = dir.path().join("blank.jpg");
    std::fs::write(&image_path, [0xFF, 0xD8, 0xFF, 0xD9]).unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_photojudge"))
        .env_remove("OPENROUTER_API_KEY")
        .args(["judge", "--image"])
        .arg(&image_path)
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("OPENROUTER_API_KEY"),
        "stderr should name the missing key: {stderr}"
    );
}
