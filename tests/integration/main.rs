//! Integration tests for Kiln

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

const HELLO_SHA256: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

/// Input tree with a build script, plus an output dir and a config path
struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let ws = Self {
            dir: TempDir::new().unwrap(),
        };
        fs::create_dir_all(ws.input()).unwrap();
        fs::write(ws.input().join("script.sh"), "cd /input && zip -r /output/app.zip .\n").unwrap();
        ws
    }

    fn input(&self) -> PathBuf {
        self.dir.path().join("input")
    }

    fn output(&self) -> PathBuf {
        self.dir.path().join("output")
    }

    fn archive(&self) -> PathBuf {
        self.output().join("app.zip")
    }

    fn config(&self) -> PathBuf {
        self.dir.path().join("config.toml")
    }

    fn write_config(&self, content: &str) {
        fs::write(self.config(), content).unwrap();
    }
}

/// Write a zip at `path` holding the given entries
fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut zip = zip::ZipWriter::new(fs::File::create(path).unwrap());
    for (name, content) in entries {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(content).unwrap();
    }
    zip.finish().unwrap();
}

mod cli_tests {
    use super::*;
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;

    fn kiln(ws: &Workspace) -> Command {
        let mut cmd = cargo_bin_cmd!("kiln");
        cmd.env_remove("KILN_CONFIG").arg("--config").arg(ws.config());
        cmd
    }

    fn target_args(ws: &Workspace) -> Vec<String> {
        vec![
            "-f".to_string(),
            "app.zip".to_string(),
            "-i".to_string(),
            ws.input().display().to_string(),
            "-o".to_string(),
            ws.output().display().to_string(),
        ]
    }

    /// Archive whose listing matches the workspace input exactly
    fn write_fresh_archive(ws: &Workspace) {
        let map = kiln::cache::fingerprint_dir(&ws.input(), "listing").unwrap();
        let listing = kiln::cache::manifest::encode(&map, "listing");
        write_zip(&ws.archive(), &[("listing", listing.as_slice())]);
    }

    #[test]
    fn help_displays() {
        cargo_bin_cmd!("kiln")
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Incremental build cache"));
    }

    #[test]
    fn version_displays() {
        cargo_bin_cmd!("kiln")
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("kiln"));
    }

    #[test]
    fn config_path_honors_flag() {
        let ws = Workspace::new();
        kiln(&ws)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show_defaults() {
        let ws = Workspace::new();
        kiln(&ws)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[cache]"))
            .stdout(predicate::str::contains("listing_name = \"listing\""));
    }

    #[test]
    fn config_init_writes_once() {
        let ws = Workspace::new();
        kiln(&ws).args(["config", "init"]).assert().success();
        assert!(ws.config().exists());

        kiln(&ws)
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("already exists"));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let ws = Workspace::new();
        ws.write_config("[cache]\nlisting_name = \"a/b\"\n");

        kiln(&ws)
            .args(["config", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[test]
    fn fingerprint_prints_listing() {
        let ws = Workspace::new();
        let dir = ws.dir.path().join("tree");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("a.txt"), "hello").unwrap();
        fs::write(dir.join("listing"), "stale").unwrap();

        kiln(&ws)
            .arg("fingerprint")
            .arg(&dir)
            .assert()
            .success()
            .stdout(format!("/a.txt {}\n", HELLO_SHA256));
    }

    #[test]
    fn check_reports_absent() {
        let ws = Workspace::new();

        kiln(&ws)
            .arg("check")
            .args(target_args(&ws))
            .args(["--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"state\": \"absent\""));
    }

    #[test]
    fn check_reports_stale_after_edit() {
        let ws = Workspace::new();
        write_fresh_archive(&ws);
        fs::write(ws.input().join("new.txt"), "x").unwrap();

        kiln(&ws)
            .arg("check")
            .args(target_args(&ws))
            .args(["--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"state\": \"stale\""))
            .stdout(predicate::str::contains("/new.txt"));
    }

    #[test]
    fn check_missing_input_fails() {
        let ws = Workspace::new();
        fs::remove_dir_all(ws.input()).unwrap();

        kiln(&ws)
            .arg("check")
            .args(target_args(&ws))
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid input"));
    }

    #[test]
    fn corrupt_archive_fails_by_default() {
        let ws = Workspace::new();
        fs::create_dir_all(ws.output()).unwrap();
        fs::write(ws.archive(), "not a zip").unwrap();

        kiln(&ws)
            .arg("check")
            .args(target_args(&ws))
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to open archive"))
            .stderr(predicate::str::contains("Hint:"));
    }

    #[test]
    fn corrupt_archive_is_absent_under_rebuild_policy() {
        let ws = Workspace::new();
        ws.write_config("[cache]\nunusable_archive = \"rebuild\"\n");
        fs::create_dir_all(ws.output()).unwrap();
        fs::write(ws.archive(), "not a zip").unwrap();

        kiln(&ws)
            .arg("check")
            .args(target_args(&ws))
            .args(["--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"state\": \"absent\""));
    }

    #[test]
    fn fresh_build_never_touches_the_engine() {
        let ws = Workspace::new();
        ws.write_config("[engine]\nbinary = \"kiln-no-such-engine\"\n");
        write_fresh_archive(&ws);

        kiln(&ws)
            .arg("build")
            .args(target_args(&ws))
            .args(["--image", "alpine:3.20", "-s", "script.sh", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"built\": false"));
    }

    #[test]
    fn build_without_engine_fails_and_cleans_up() {
        let ws = Workspace::new();
        ws.write_config("[engine]\nbinary = \"kiln-no-such-engine\"\n");

        kiln(&ws)
            .arg("build")
            .args(target_args(&ws))
            .args(["--image", "alpine:3.20", "-s", "script.sh"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Container engine not found"));

        assert!(!ws.input().join("listing").exists());
    }
}

mod pipeline_tests {
    use super::*;
    use async_trait::async_trait;
    use kiln::cache::CacheState;
    use kiln::error::{KilnError, KilnResult};
    use kiln::orchestration::{ContainerEngine, ContainerSpec, INPUT_MOUNT, OUTPUT_MOUNT};
    use kiln::pipeline::{BuildOutcome, BuildSettings, Builder};
    use kiln::request::BuildRequest;
    use std::sync::Mutex;

    /// Engine that "runs" the build by zipping the staged listing into the output
    struct FakeEngine {
        filename: String,
        runs: Mutex<Vec<ContainerSpec>>,
    }

    impl FakeEngine {
        fn new(filename: &str) -> Self {
            Self {
                filename: filename.to_string(),
                runs: Mutex::new(Vec::new()),
            }
        }

        fn run_count(&self) -> usize {
            self.runs.lock().unwrap().len()
        }

        fn last_run(&self) -> ContainerSpec {
            self.runs.lock().unwrap().last().cloned().unwrap()
        }

        fn mount_source(spec: &ContainerSpec, target: &str) -> PathBuf {
            spec.mounts
                .iter()
                .find(|m| m.target == target)
                .map(|m| m.source.clone())
                .unwrap()
        }
    }

    #[async_trait]
    impl ContainerEngine for FakeEngine {
        async fn pull_image(&self, _image: &str) -> KilnResult<Vec<u8>> {
            Ok(Vec::new())
        }

        async fn create_container(&self, spec: &ContainerSpec) -> KilnResult<String> {
            self.runs.lock().unwrap().push(spec.clone());
            Ok(format!("fake-{}", self.run_count()))
        }

        async fn start_container(&self, _id: &str) -> KilnResult<()> {
            let spec = self.last_run();
            let input = Self::mount_source(&spec, INPUT_MOUNT);
            let output = Self::mount_source(&spec, OUTPUT_MOUNT);

            let listing = fs::read(input.join("listing"))
                .map_err(|e| KilnError::io("reading staged listing", e))?;
            write_zip(&output.join(&self.filename), &[("listing", listing.as_slice())]);
            Ok(())
        }

        async fn wait_container(&self, _id: &str) -> KilnResult<i64> {
            Ok(0)
        }

        async fn container_logs(&self, _id: &str) -> KilnResult<Vec<u8>> {
            Ok(b"adding: listing\n".to_vec())
        }

        async fn remove_container(&self, _id: &str) -> KilnResult<()> {
            Ok(())
        }

        fn engine_name(&self) -> &'static str {
            "Fake"
        }
    }

    fn request(ws: &Workspace) -> BuildRequest {
        BuildRequest {
            output_filename: "app.zip".to_string(),
            input_dir: ws.input(),
            output_dir: ws.output(),
            image: "alpine:3.20".to_string(),
            script: PathBuf::from("script.sh"),
        }
    }

    #[tokio::test]
    async fn first_build_runs_with_both_mounts() {
        let ws = Workspace::new();
        let engine = FakeEngine::new("app.zip");

        let outcome = Builder::new(&engine, BuildSettings::default())
            .build(&request(&ws))
            .await
            .unwrap();

        assert_eq!(outcome.decision().state, CacheState::Absent);
        assert_eq!(engine.run_count(), 1);

        let spec = engine.last_run();
        assert_eq!(spec.image, "alpine:3.20");
        assert_eq!(spec.command, vec!["/bin/sh", "/input/script.sh"]);
        assert_eq!(
            FakeEngine::mount_source(&spec, INPUT_MOUNT),
            ws.input().canonicalize().unwrap()
        );
        assert_eq!(
            FakeEngine::mount_source(&spec, OUTPUT_MOUNT),
            ws.output().canonicalize().unwrap()
        );

        assert!(ws.archive().exists());
        assert!(!ws.input().join("listing").exists());
    }

    #[tokio::test]
    async fn unchanged_inputs_reuse_the_archive() {
        let ws = Workspace::new();
        fs::write(ws.input().join("main.c"), "int main;").unwrap();
        let engine = FakeEngine::new("app.zip");
        let builder = Builder::new(&engine, BuildSettings::default());

        builder.build(&request(&ws)).await.unwrap();
        let outcome = builder.build(&request(&ws)).await.unwrap();

        assert!(matches!(outcome, BuildOutcome::Reused { .. }));
        assert_eq!(outcome.decision().state, CacheState::Fresh);
        assert_eq!(engine.run_count(), 1);
    }

    #[tokio::test]
    async fn modified_file_triggers_rebuild() {
        let ws = Workspace::new();
        fs::write(ws.input().join("main.c"), "int main;").unwrap();
        let engine = FakeEngine::new("app.zip");
        let builder = Builder::new(&engine, BuildSettings::default());

        builder.build(&request(&ws)).await.unwrap();
        fs::write(ws.input().join("main.c"), "int main(void);").unwrap();
        let outcome = builder.build(&request(&ws)).await.unwrap();

        assert_eq!(outcome.decision().state, CacheState::Stale);
        assert_eq!(outcome.decision().diff.changed, vec!["/main.c".to_string()]);
        assert_eq!(engine.run_count(), 2);
        assert!(!ws.input().join("listing").exists());

        // The rebuilt archive now matches the edited tree
        let outcome = builder.build(&request(&ws)).await.unwrap();
        assert_eq!(outcome.decision().state, CacheState::Fresh);
        assert_eq!(engine.run_count(), 2);
    }

    #[tokio::test]
    async fn corrupt_archive_policy() {
        let ws = Workspace::new();
        fs::create_dir_all(ws.output()).unwrap();
        fs::write(ws.archive(), "not a zip").unwrap();
        let engine = FakeEngine::new("app.zip");

        let err = Builder::new(&engine, BuildSettings::default())
            .build(&request(&ws))
            .await
            .unwrap_err();
        assert!(matches!(err, KilnError::ArchiveOpen { .. }));
        assert_eq!(engine.run_count(), 0);

        let settings = BuildSettings {
            unusable_archive: kiln::cache::UnusableArchivePolicy::Rebuild,
            ..BuildSettings::default()
        };
        let outcome = Builder::new(&engine, settings)
            .build(&request(&ws))
            .await
            .unwrap();
        assert_eq!(outcome.decision().state, CacheState::Absent);
        assert_eq!(engine.run_count(), 1);
    }
}
