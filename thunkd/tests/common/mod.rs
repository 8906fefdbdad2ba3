#![allow(dead_code)]

use assert_cmd::Command;
use std::fs::File;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use tempdir::TempDir;
use uuid::Uuid;

const TEST_DEBUG_OUTPUT_ENABLED: bool = true;

pub const TEST_TOKEN: &str = "abc123";

pub const PULLED_PROJECT: &str = r#"{"data":{"project":{"id":"proj001","projectName":"Demo","hash":"h1","components":{"children":[{"name":"Home","id":"s1","type":"Screen","children":[]},{"name":"Tabs","id":"n1","type":"TabNavigator","children":[{"name":"Tab One","id":"s2","type":"Screen"}]}]},"blockly":{"s1":{"xml":"<xml><block/></xml>","code":"var a;"},"s2":{"xml":"<xml/>"}}},"user":{"id":"u1"}}}"#;

pub const PULLED_PROJECT_CONTENT: &str = r#"{"id":"proj001","projectName":"Demo","hash":"h1","components":{"children":[{"name":"Home","id":"s1","type":"Screen","children":[]},{"name":"Tabs","id":"n1","type":"TabNavigator","children":[{"name":"Tab One","id":"s2","type":"Screen"}]}]},"blockly":{"s1":{"xml":"<xml><block/></xml>","code":"var a;"},"s2":{"xml":"<xml/>"}}}"#;

pub fn get_unique_test_run_id() -> String {
    let test_run_uuid = Uuid::new_v4();
    format!("thunkd-{test_run_uuid}")
}

pub fn initialize_temp_dir(test_run_id: &str) -> TempDir {
    let dir = TempDir::new(test_run_id).expect("Unable to create temp dir");
    if TEST_DEBUG_OUTPUT_ENABLED {
        println!("Initialized temporary dir {:?}", dir.path());
    }
    dir
}

/// A `thunkd` invocation isolated to `config_dir`, talking to `endpoint`.
pub fn thunkd(config_dir: &Path, endpoint: &str) -> Command {
    let mut cmd = Command::cargo_bin("thunkd").unwrap();
    cmd.env("THUNKD_CONFIG_DIR", config_dir)
        .env("THUNKD_ENDPOINT", endpoint)
        .env_remove("RUST_LOG");
    cmd
}

pub fn set_test_token(config_dir: &Path, endpoint: &str) {
    thunkd(config_dir, endpoint)
        .args(["set", "thunk_token", TEST_TOKEN])
        .assert()
        .success();
}

pub fn credentials_file(config_dir: &Path) -> PathBuf {
    config_dir.join("credentials")
}

pub fn debug_output_credentials_file(config_dir: &Path) {
    if !TEST_DEBUG_OUTPUT_ENABLED {
        return;
    }

    println!();
    let path = credentials_file(config_dir);
    println!("thunkd credentials file ({path:?}) contents:");
    let lines = io::BufReader::new(
        File::open(&path).unwrap_or_else(|e| panic!("Unable to open file: {path:?}: {e:?}")),
    )
    .lines();
    for l in lines {
        let line = l.expect("Unable to read line from file");
        if line.starts_with("thunk_token") {
            println!("thunk_token=<REDACTED>");
        } else {
            println!("{line}");
        }
    }
}
