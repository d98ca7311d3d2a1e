// tests/cli.rs
// ============================================================================
// Tests del binario: códigos de salida y salida estándar / de error
// ============================================================================

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

fn quantize(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_stablelm-quantize"))
        .args(args)
        .env("RUST_LOG", "info")
        .output()
        .unwrap()
}

fn path_str(p: &Path) -> &str {
    p.to_str().unwrap()
}

/// Modelo mínimo: header sin versión, sin vocab, un tensor 2D f32 [32, 1]
fn write_model(path: &Path, magic: u32) {
    let mut buf = magic.to_le_bytes().to_vec();
    for v in [0i32, 512, 32, 1, 1, 8, 1, 0] {
        buf.extend_from_slice(&v.to_le_bytes());
    }
    let name = b"layer.weight";
    for v in [2i32, name.len() as i32, 0, 32, 1] {
        buf.extend_from_slice(&v.to_le_bytes());
    }
    buf.extend_from_slice(name);
    for i in 0..32 {
        buf.extend_from_slice(&(i as f32 / 8.0).to_le_bytes());
    }
    fs::write(path, buf).unwrap();
}

#[test]
fn test_wrong_arity_prints_types_and_fails() {
    let out = quantize(&["only-one-arg.bin"]);

    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    for name in ["q4_0", "q4_1", "q5_0", "q5_1", "q8_0"] {
        assert!(stderr.contains(name), "missing {} in stderr:\n{}", name, stderr);
    }
    assert!(out.stdout.is_empty());
}

#[test]
fn test_unknown_type_fails_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.bin");
    let output = dir.path().join("out.bin");
    write_model(&input, 0x67676d6c);

    let out = quantize(&[path_str(&input), path_str(&output), "q3_k", "--no-progress"]);

    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("q3_k"));
    assert!(!output.exists());
}

#[test]
fn test_bad_magic_fails_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.bin");
    let output = dir.path().join("out.bin");
    write_model(&input, 0xdeadbeef);

    let out = quantize(&[path_str(&input), path_str(&output), "q4_0", "--no-progress"]);

    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("bad magic"));
    assert!(!output.exists());
}

#[test]
fn test_success_reports_on_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.bin");
    let output = dir.path().join("out.bin");
    write_model(&input, 0x67676d6c);

    let out = quantize(&[path_str(&input), path_str(&output), "7", "--no-progress"]);

    assert_eq!(out.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("layer.weight"), "stdout:\n{}", stdout);
    assert!(stdout.contains("hist:"), "stdout:\n{}", stdout);
    assert!(stdout.contains("total time"), "stdout:\n{}", stdout);
    // header + hparams + cabecera del tensor + 1 bloque q8_0
    assert_eq!(fs::metadata(&output).unwrap().len(), 4 + 32 + 20 + 12 + 34);
}
