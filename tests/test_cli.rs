//! Tests for the `upscale` command line front end
//!
//! Only paths that never reach the network are exercised here.

mod common;

use std::process::{Command, Output};

use common::gradient_png;

fn upscale(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_upscale"))
        .args(args)
        .env_remove("FAL_KEY")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to run upscale binary")
}

#[test]
fn test_missing_input_file() {
    let output = upscale(&["/definitely/not/here.png", "--api-key", "k"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_out_of_range_parameter_is_rejected() {
    let output = upscale(&["in.png", "--creativity", "1.5", "--api-key", "k"]);
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("creativity"), "{}", stderr);
}

#[test]
fn test_unsupported_upload_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "not an image").unwrap();

    let output = upscale(&[path.to_str().unwrap(), "--api-key", "k"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_missing_api_key_warns() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.png");
    let target = dir.path().join("out.png");
    std::fs::write(&input, gradient_png(10, 6)).unwrap();

    let output = upscale(&[input.to_str().unwrap(), "-o", target.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(2));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stdout.contains("Original Size: 10x6"), "{}", stdout);
    assert!(stderr.contains("Please upload an image and enter your API key."), "{}", stderr);
    assert!(!target.exists());
}
