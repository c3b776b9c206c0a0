use std::fs;
use std::process::{Command, Output};
use tempfile::TempDir;

fn run_command(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_html2pptx"))
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("Failed to execute command")
}

#[test]
fn test_missing_input_directory_exits_with_error() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let input_dir = temp_dir.path().join("inhtml");
    let output_dir = temp_dir.path().join("outppt");

    let output = run_command(&[
        "--inputDir",
        input_dir.to_str().unwrap(),
        "--outputDir",
        output_dir.to_str().unwrap(),
    ]);

    assert!(!output.status.success(), "Command should fail: {:?}", output);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error (input)"), "stderr: {}", stderr);
    assert!(!output_dir.join("output.pptx").exists());
}

#[test]
fn test_directory_without_documents_exits_with_error() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let input_dir = temp_dir.path().join("inhtml");
    fs::create_dir(&input_dir).expect("Failed to create input directory");
    fs::write(input_dir.join("notes.txt"), "no slides here").expect("Failed to write file");

    let output = run_command(&[
        "--input-dir",
        input_dir.to_str().unwrap(),
        "--output-dir",
        temp_dir.path().join("outppt").to_str().unwrap(),
    ]);

    assert!(!output.status.success(), "Command should fail: {:?}", output);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("No .html documents"), "stderr: {}", stderr);
}

#[test]
fn test_allow_empty_writes_deck_without_browser() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let input_dir = temp_dir.path().join("inhtml");
    fs::create_dir(&input_dir).expect("Failed to create input directory");
    let output_dir = temp_dir.path().join("outppt");

    let output = run_command(&[
        "--input-dir",
        input_dir.to_str().unwrap(),
        "--output-dir",
        output_dir.to_str().unwrap(),
        "--output-name",
        "empty.pptx",
        "--allow-empty",
    ]);

    assert!(output.status.success(), "Command failed: {:?}", output);
    assert!(output_dir.join("empty.pptx").exists(), "Deck was not written");
}

#[test]
fn test_zero_concurrency_is_rejected() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    let output = run_command(&[
        "--input-dir",
        temp_dir.path().to_str().unwrap(),
        "--concurrency",
        "0",
    ]);

    assert!(!output.status.success(), "Command should fail: {:?}", output);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error (config)"), "stderr: {}", stderr);
}
