//! CLI contract tests.

use assert_cmd::Command;

fn bibenrich(dir: &std::path::Path) -> Command {
    let mut cmd = match Command::cargo_bin("bibenrich") {
        Ok(cmd) => cmd,
        Err(err) => panic!("binary should build: {err}"),
    };
    cmd.current_dir(dir)
        .env_remove("BIBENRICH_API_KEY")
        .env_remove("BIBENRICH_API_ENDPOINT")
        .env_remove("BIBENRICH_MODEL");
    cmd
}

#[test]
fn help_lists_subcommands() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let output = bibenrich(tmp.path())
        .arg("--help")
        .output()
        .expect("runs");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("abstracts"));
    assert!(stdout.contains("tag"));
    assert!(stdout.contains("reset-config"));
}

#[test]
fn missing_api_key_aborts_before_opening_library() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let prefs = tmp.path().join("prefs.toml");
    let output = bibenrich(tmp.path())
        .args(["--non-interactive", "--prefs"])
        .arg(&prefs)
        .args(["--library", "does-not-exist.json", "tag"])
        .output()
        .expect("runs");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("apiKey is required"), "stderr: {stderr}");
}

#[test]
fn reset_config_clears_persisted_preferences() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let prefs = tmp.path().join("prefs.toml");
    std::fs::write(
        &prefs,
        "\"extensions.zotero.abstractGen.apiKey\" = \"sk-old\"\n\"unrelated\" = \"kept\"\n",
    )
    .expect("write fixture");

    bibenrich(tmp.path())
        .arg("--prefs")
        .arg(&prefs)
        .arg("reset-config")
        .assert()
        .success();

    let contents = std::fs::read_to_string(&prefs).expect("prefs still present");
    assert!(!contents.contains("sk-old"));
    assert!(contents.contains("kept"));
}
