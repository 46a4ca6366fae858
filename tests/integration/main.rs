//! Integration tests for shellkeep

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const MANIFEST: &str = r#"{
        "resources": {
            "/": "d41d8cd9",
            "index.html": "d41d8cd9",
            "main.dart.js": "8f14e45f",
            "assets/FontManifest.json": "c9f0f895"
        },
        "core": ["/", "main.dart.js"]
    }"#;

    const WORKER_SCRIPT: &str = r#"'use strict';
const MANIFEST = 'flutter-app-manifest';
const TEMP = 'flutter-temp-cache';
const CACHE_NAME = 'flutter-app-cache';
const RESOURCES = {
  "/": "d41d8cd9",
  "main.dart.js": "8f14e45f",
  "version.json": "45c48cce"
};
const CORE = [
  "/",
  "main.dart.js"
];
self.addEventListener("install", (event) => {});
"#;

    /// Isolated config, cache root and working directory
    struct Fixture {
        dir: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            std::fs::write(dir.path().join("config.toml"), "[general]\njournal = false\n").unwrap();
            Self { dir }
        }

        fn path(&self, name: &str) -> PathBuf {
            self.dir.path().join(name)
        }

        fn write(&self, name: &str, content: &str) -> PathBuf {
            let path = self.path(name);
            std::fs::write(&path, content).unwrap();
            path
        }

        fn shellkeep(&self) -> Command {
            let mut cmd = cargo_bin_cmd!("shellkeep");
            cmd.current_dir(self.dir.path())
                .env_remove("SHELLKEEP_CONFIG")
                .arg("--config")
                .arg(self.path("config.toml"))
                .arg("--cache-dir")
                .arg(self.path("cache"))
                .arg("--no-local");
            cmd
        }

        /// Command with origin and a JSON manifest configured
        fn app(&self) -> Command {
            let manifest = self.write("manifest.json", MANIFEST);
            let mut cmd = self.shellkeep();
            cmd.args(["--origin", "http://127.0.0.1:9"])
                .arg("--manifest")
                .arg(manifest);
            cmd
        }
    }

    #[test]
    fn help_displays() {
        cargo_bin_cmd!("shellkeep")
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("offline asset cache manager"));
    }

    #[test]
    fn version_displays() {
        cargo_bin_cmd!("shellkeep")
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("shellkeep"));
    }

    #[test]
    fn config_path() {
        let fx = Fixture::new();
        fx.shellkeep()
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let fx = Fixture::new();
        fx.shellkeep()
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[app]"))
            .stdout(predicate::str::contains("journal = false"));
    }

    #[test]
    fn config_set_then_show() {
        let fx = Fixture::new();
        fx.shellkeep()
            .args(["config", "set", "app.origin", "https://portfolio.test/"])
            .assert()
            .success();

        fx.shellkeep()
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("origin = \"https://portfolio.test\""));
    }

    #[test]
    fn config_set_unknown_key() {
        let fx = Fixture::new();
        fx.shellkeep()
            .args(["config", "set", "vm.name", "x"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown config key"));
    }

    #[test]
    fn status_without_origin_hints() {
        let fx = Fixture::new();
        fx.shellkeep()
            .arg("status")
            .assert()
            .failure()
            .stderr(predicate::str::contains("No origin configured"))
            .stderr(predicate::str::contains("Hint:"));
    }

    #[test]
    fn status_with_missing_manifest() {
        let fx = Fixture::new();
        fx.shellkeep()
            .args(["--origin", "https://app.test", "--manifest", "nope.json", "status"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Manifest not found"));
    }

    #[test]
    fn status_json_on_empty_cache() {
        let fx = Fixture::new();
        fx.app()
            .args(["status", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"content_entries\": 0"))
            .stdout(predicate::str::contains("flutter-app-cache"))
            .stdout(predicate::str::contains("\"has_stored_manifest\": false"));

        // Status is read-only
        assert!(!fx.path("cache").join("flutter-app-cache").exists());
    }

    #[test]
    fn status_plain_lists_missing_keys() {
        let fx = Fixture::new();
        fx.app()
            .args(["status", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("main.dart.js"))
            .stdout(predicate::str::contains("assets/FontManifest.json"));
    }

    #[test]
    fn status_reads_worker_script() {
        let fx = Fixture::new();
        let script = fx.write("flutter_service_worker.js", WORKER_SCRIPT);
        fx.shellkeep()
            .args(["--origin", "https://app.test", "--manifest"])
            .arg(script)
            .args(["status", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"resources\": 3"))
            .stdout(predicate::str::contains("\"core\": 2"));
    }

    #[test]
    fn install_against_unreachable_origin_fails() {
        let fx = Fixture::new();
        fx.app()
            .arg("install")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Fetch failed"))
            .stderr(predicate::str::contains("shellkeep install"));

        assert!(!fx.path("cache").join("flutter-temp-cache").exists());
    }

    #[test]
    fn unknown_message_is_ignored() {
        let fx = Fixture::new();
        fx.app()
            .args(["message", "reloadEverything"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Ignored message"));
    }

    #[test]
    fn skip_waiting_without_install() {
        let fx = Fixture::new();
        fx.app()
            .args(["message", "skipWaiting"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No install is waiting"));
    }

    #[test]
    fn fetch_foreign_url_passes_through() {
        let fx = Fixture::new();
        fx.app()
            .args(["fetch", "https://cdn.test/font.woff2"])
            .assert()
            .success()
            .stdout(predicate::str::contains("is not intercepted"));
    }

    #[test]
    fn fetch_post_passes_through() {
        let fx = Fixture::new();
        fx.app()
            .args(["fetch", "main.dart.js", "-X", "POST"])
            .assert()
            .success()
            .stdout(predicate::str::contains("POST"));
    }

    #[test]
    fn clear_requires_confirmation() {
        let fx = Fixture::new();
        fx.shellkeep()
            .arg("clear")
            .assert()
            .success()
            .stdout(predicate::str::contains("Nothing deleted"));
    }

    #[test]
    fn clear_with_yes_removes_partitions() {
        let fx = Fixture::new();
        let content = fx.path("cache").join("flutter-app-cache");
        std::fs::create_dir_all(&content).unwrap();

        fx.shellkeep()
            .args(["clear", "--yes"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Offline cache deleted"));
        assert!(!content.exists());
    }

    #[test]
    fn completions_generate() {
        cargo_bin_cmd!("shellkeep")
            .args(["completions", "bash"])
            .assert()
            .success()
            .stdout(predicate::str::contains("shellkeep"));
    }
}
