//! Integration tests for configuration loading

use std::fs;

use tempfile::TempDir;

use statsync::config::Config;
use statsync::{RequestScope, UploadMethod};

#[test]
fn test_explicit_path_wins_over_local_config() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    fs::create_dir_all(dir.path().join(".statsync")).unwrap();
    fs::write(
        dir.path().join(".statsync/config.toml"),
        "[achievements]\ncount = 1\n",
    )
    .unwrap();
    let explicit = dir.path().join("other.toml");
    fs::write(&explicit, "[achievements]\ncount = 7\n").unwrap();

    let config = Config::load(dir.path(), Some(explicit.as_path())).unwrap();
    assert_eq!(config.achievements.count, 7);

    let config = Config::load(dir.path(), None).unwrap();
    assert_eq!(config.achievements.count, 1);
}

#[test]
fn test_leaderboard_tables() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
[leaderboard.Weekly]
range_start = -3
range_end = 3
scope = "global_around_user"

[leaderboard.Friends]
scope = "friends"
upload_method = "force_update"
"#,
    )
    .unwrap();

    let config = Config::from_file(&path).unwrap();
    let weekly = &config.leaderboard["Weekly"];
    assert_eq!((weekly.range_start, weekly.range_end), (-3, 3));
    assert_eq!(weekly.upload_method, UploadMethod::KeepBest);
    let friends = &config.leaderboard["Friends"];
    assert_eq!(friends.scope, RequestScope::Friends);
    assert_eq!(friends.upload_method, UploadMethod::ForceUpdate);
}

#[test]
fn test_parse_error_names_the_file() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("broken.toml");
    fs::write(&path, "[leaderboard.X]\nscope = \"galaxy\"\n").unwrap();

    let err = Config::from_file(&path).unwrap_err();
    let message = format!("{:#}", err);
    assert!(
        message.contains("broken.toml"),
        "error should name the file, got: {}",
        message
    );
}

#[test]
fn test_missing_file_is_an_error() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let missing = dir.path().join("absent.toml");
    assert!(Config::load(dir.path(), Some(missing.as_path())).is_err());
}
