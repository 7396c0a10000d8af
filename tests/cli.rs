//! End-to-end tests for the `news-nexus` binary.

use assert_cmd::Command;
use predicates::prelude::*;

fn news_nexus() -> Command {
    let mut cmd = Command::cargo_bin("news-nexus").unwrap_or_else(|e| unreachable!("{e}"));
    cmd.env_remove("NEWS_NEXUS_DB_PATH")
        .env_remove("NEWS_NEXUS_PROVIDER")
        .env("NEWS_NEXUS_LOG", "off");
    cmd
}

#[test]
fn help_lists_commands() {
    news_nexus()
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("ingest")
                .and(predicate::str::contains("search"))
                .and(predicate::str::contains("resume"))
                .and(predicate::str::contains("review")),
        );
}

#[test]
fn resume_unknown_thread_fails() {
    let dir = tempfile::tempdir().unwrap_or_else(|e| unreachable!("{e}"));
    let db = dir.path().join("nn.db");
    news_nexus()
        .arg("--db-path")
        .arg(&db)
        .args(["resume", "no-such-thread", "approve"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no checkpoint found"));
}

#[test]
fn show_unknown_thread_fails() {
    let dir = tempfile::tempdir().unwrap_or_else(|e| unreachable!("{e}"));
    news_nexus()
        .arg("--db-path")
        .arg(dir.path().join("nn.db"))
        .args(["show", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ghost"));
}

#[test]
fn delete_unknown_thread_fails() {
    let dir = tempfile::tempdir().unwrap_or_else(|e| unreachable!("{e}"));
    news_nexus()
        .arg("--db-path")
        .arg(dir.path().join("nn.db"))
        .args(["delete", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no checkpoint found"));
}

#[test]
fn ingest_missing_directory_reports_no_pdfs() {
    let dir = tempfile::tempdir().unwrap_or_else(|e| unreachable!("{e}"));
    news_nexus()
        .arg("--db-path")
        .arg(dir.path().join("nn.db"))
        .arg("--data-dir")
        .arg(dir.path().join("absent"))
        .arg("ingest")
        .assert()
        .success()
        .stdout(predicate::str::contains("No PDFs found"));
}

#[test]
fn init_prompts_writes_templates() {
    let dir = tempfile::tempdir().unwrap_or_else(|e| unreachable!("{e}"));
    news_nexus()
        .args(["init-prompts", "--dir"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 3 prompt template(s)"));
    assert!(dir.path().join("writer.md").exists());
}
