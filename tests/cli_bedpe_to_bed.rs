//! Integration tests for the bedpe-to-bed and bam-to-bed commands.

use std::fs;
use std::io::Write;
use std::process::{Command, Output, Stdio};

const BEDPE: &str = "track name=pairs\n\
chr2\t50\t100\tchr2\t80\t130\tr1\t60\t+\t-\n\
#unsorted below\n\
chr1\t300\t350\tchr1\t200\t260\tr2\t60\t+\t-\n\
chr1\t100\t200\tmate\t150\t250\t60\t+\t-\n";

fn checseq(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_checseq"))
        .args(args)
        .output()
        .expect("Failed to run checseq")
}

fn checseq_with_stdin(args: &[&str], stdin_content: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_checseq"))
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn checseq");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(stdin_content.as_bytes())
        .unwrap();
    child.wait_with_output().expect("Failed to wait for checseq")
}

#[test]
fn test_merge_keeps_order_and_headers() {
    let out = checseq_with_stdin(&["bedpe-to-bed"], BEDPE);
    assert!(out.status.success());
    assert_eq!(
        String::from_utf8(out.stdout).unwrap(),
        "track name=pairs\n\
         chr2\t50\t130\tr1\t60\t+\t-\n\
         #unsorted below\n\
         chr1\t200\t350\tr2\t60\t+\t-\n\
         chr1\t100\t250\t60\t+\t-\n"
    );
}

#[test]
fn test_merge_and_sort_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("s1.bedpe");
    let output = dir.path().join("s1-raw.bed");
    fs::write(&input, BEDPE).unwrap();

    let out = checseq(&[
        "bedpe-to-bed",
        "-i",
        input.to_str().unwrap(),
        "-o",
        output.to_str().unwrap(),
        "--sort",
    ]);
    assert!(out.status.success());
    assert!(out.stdout.is_empty());
    assert_eq!(
        fs::read_to_string(&output).unwrap(),
        "track name=pairs\n\
         #unsorted below\n\
         chr1\t100\t250\t60\t+\t-\n\
         chr1\t200\t350\tr2\t60\t+\t-\n\
         chr2\t50\t130\tr1\t60\t+\t-\n"
    );
}

#[test]
fn test_unmapped_mates_kept_unless_skipped() {
    let input = ".\t-1\t-1\tchr1\t150\t250\tr1\nchr1\t1\t2\tchr1\t3\t4\tr2\n";

    let out = checseq_with_stdin(&["bedpe-to-bed"], input);
    assert!(out.status.success());
    assert_eq!(
        String::from_utf8(out.stdout).unwrap(),
        ".\t-1\t250\tr1\nchr1\t1\t4\tr2\n"
    );

    let out = checseq_with_stdin(&["bedpe-to-bed", "--skip-unmapped"], input);
    assert!(out.status.success());
    assert_eq!(String::from_utf8(out.stdout).unwrap(), "chr1\t1\t4\tr2\n");
}

#[test]
fn test_short_record_reports_line() {
    let out = checseq_with_stdin(&["bedpe-to-bed", "-i", "-"], "chr1\t1\t2\tchr1\t3\t4\nchr1\t5\n");
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Parse error at line 2"), "stderr: {stderr}");
}

#[test]
fn test_bam_to_bed_rejects_zero_threads() {
    let dir = tempfile::tempdir().unwrap();
    let samples = dir.path().join("samples.txt");
    fs::write(&samples, "Sample\ns1\n").unwrap();

    let out = checseq(&["bam-to-bed", "-s", samples.to_str().unwrap(), "-t", "0"]);
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("threads must be at least 1"), "stderr: {stderr}");
}

#[test]
fn test_bam_to_bed_missing_samples_file() {
    let dir = tempfile::tempdir().unwrap();
    let samples = dir.path().join("absent.txt");
    let out = checseq(&["bam-to-bed", "-s", samples.to_str().unwrap()]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("Error: I/O error"));
}
