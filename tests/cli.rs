use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"[store]
path = "{}/data/pantry_state.json"

[analyzer]
provider = "disabled"

[server]
bind = "127.0.0.1:7341"
"#,
        root.display()
    );

    let config_path = config_dir.join("pantry.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_pantry(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let output = Command::new(env!("CARGO_BIN_EXE_pantry"))
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .expect("Failed to run pantry binary");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

fn today() -> String {
    chrono::Local::now().date_naive().format("%Y-%m-%d").to_string()
}

#[test]
fn test_list_empty_pantry() {
    let (_tmp, config_path) = setup_test_env();
    let (stdout, stderr, success) = run_pantry(&config_path, &["inventory", "list"]);
    assert!(success, "list failed: {}", stderr);
    assert!(stdout.contains("(pantry is empty)"));
}

#[test]
fn test_add_then_list() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_pantry(
        &config_path,
        &["inventory", "add", "Rice", "--expiry", "2026-01-01"],
    );
    assert!(success, "add failed: {}", stderr);
    assert!(stdout.contains("added Rice"));

    let (stdout, _, success) = run_pantry(&config_path, &["inventory", "list"]);
    assert!(success);
    assert!(stdout.contains("Rice"));
    assert!(stdout.contains("2026-01-01"));
    assert!(stdout.contains(&format!("added: {}", today())));
}

#[test]
fn test_add_rejects_bad_expiry() {
    let (_tmp, config_path) = setup_test_env();
    let (_, _, success) = run_pantry(
        &config_path,
        &["inventory", "add", "Rice", "--expiry", "soon"],
    );
    assert!(!success);
}

#[test]
fn test_resolve_is_stable_across_runs() {
    let (_tmp, config_path) = setup_test_env();

    let (first, _, ok1) = run_pantry(&config_path, &["resolve", "Ketchup"]);
    let (second, _, ok2) = run_pantry(&config_path, &["resolve", "  ketchup "]);
    let (other, _, ok3) = run_pantry(&config_path, &["resolve", "Heinz Ketchup"]);
    assert!(ok1 && ok2 && ok3);
    assert_eq!(first.trim(), second.trim());
    assert_ne!(first.trim(), other.trim());
}

#[test]
fn test_delete_unknown_id_fails_without_change() {
    let (tmp, config_path) = setup_test_env();
    run_pantry(&config_path, &["inventory", "add", "Beans"]);
    let state_path = tmp.path().join("data/pantry_state.json");
    let before = fs::read(&state_path).unwrap();

    let (_, stderr, success) = run_pantry(
        &config_path,
        &["inventory", "delete", "00000000-0000-4000-8000-000000000000"],
    );
    assert!(!success);
    assert!(stderr.contains("not found"), "stderr: {}", stderr);
    assert_eq!(fs::read(&state_path).unwrap(), before);
}

#[test]
fn test_delete_existing_item() {
    let (tmp, config_path) = setup_test_env();
    run_pantry(&config_path, &["inventory", "add", "Beans"]);

    let record: serde_json::Value =
        serde_json::from_slice(&fs::read(tmp.path().join("data/pantry_state.json")).unwrap())
            .unwrap();
    let id = record["current_full_inventory"][0]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let (stdout, stderr, success) = run_pantry(&config_path, &["inventory", "delete", &id]);
    assert!(success, "delete failed: {}", stderr);
    assert!(stdout.contains("deleted Beans"));

    let (stdout, _, _) = run_pantry(&config_path, &["inventory", "names"]);
    assert!(stdout.trim().is_empty());
}

#[test]
fn test_snapshot_has_all_fields() {
    let (_tmp, config_path) = setup_test_env();
    let (stdout, _, success) = run_pantry(&config_path, &["snapshot"]);
    assert!(success);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    for field in [
        "item_registry",
        "items_added",
        "items_removed",
        "current_full_inventory",
    ] {
        assert!(json.get(field).is_some(), "missing {}", field);
    }
}

#[test]
fn test_analyze_with_disabled_provider_fails() {
    let (tmp, config_path) = setup_test_env();
    let before = tmp.path().join("before.jpg");
    let after = tmp.path().join("after.jpg");
    fs::write(&before, b"\xff\xd8before").unwrap();
    fs::write(&after, b"\xff\xd8after").unwrap();

    let (_, stderr, success) = run_pantry(
        &config_path,
        &[
            "analyze",
            before.to_str().unwrap(),
            after.to_str().unwrap(),
        ],
    );
    assert!(!success);
    assert!(stderr.contains("disabled"), "stderr: {}", stderr);
    assert!(!tmp.path().join("data/pantry_state.json").exists());
}
