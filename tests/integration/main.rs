//! Integration tests for autobackup

mod cli_tests {
    use assert_cmd::Command;
    use predicates::prelude::*;
    use tempfile::TempDir;

    fn autobackup() -> Command {
        Command::cargo_bin("autobackup").unwrap()
    }

    /// Config pointing storage at a temp dir, so tests never touch the
    /// real state directory.
    fn write_config(dir: &TempDir) -> std::path::PathBuf {
        let path = dir.path().join("config.toml");
        let storage = dir.path().join("artifacts");
        std::fs::write(
            &path,
            format!("[export]\nstorage_dir = \"{}\"\n", storage.display()),
        )
        .unwrap();
        path
    }

    #[test]
    fn help_displays() {
        autobackup()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("sanitized activity exports"));
    }

    #[test]
    fn version_displays() {
        autobackup()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("autobackup"));
    }

    #[test]
    fn config_show() {
        let dir = TempDir::new().unwrap();
        let config = write_config(&dir);

        autobackup()
            .args(["--config"])
            .arg(&config)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[general]"));
    }

    #[test]
    fn config_path_honors_env() {
        autobackup()
            .env("AUTOBACKUP_CONFIG", "/some/where/config.toml")
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("/some/where/config.toml"));
    }

    #[test]
    fn config_init_writes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        autobackup()
            .args(["--config"])
            .arg(&path)
            .args(["config", "init"])
            .assert()
            .success();

        assert!(path.exists());
    }

    #[test]
    fn cache_list_empty() {
        let dir = TempDir::new().unwrap();
        let config = write_config(&dir);

        autobackup()
            .args(["--config"])
            .arg(&config)
            .args(["cache", "list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No cached artifacts"));
    }

    #[test]
    fn cache_gc_empty() {
        let dir = TempDir::new().unwrap();
        let config = write_config(&dir);

        autobackup()
            .args(["--config"])
            .arg(&config)
            .args(["cache", "gc", "--days", "7"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Nothing older than"));
    }

    #[test]
    fn serve_without_subjects_file_fails_with_hint() {
        let dir = TempDir::new().unwrap();
        let config = write_config(&dir);

        autobackup()
            .args(["--config"])
            .arg(&config)
            .arg("serve")
            .assert()
            .failure()
            .stderr(predicate::str::contains("subjects_file"));
    }
}

mod export_flow {
    use autobackup::cache::{ExportCache, FreshnessWindow};
    use autobackup::export::{backup_filename, CommandExporter};
    use autobackup::store::FsArtifactStore;
    use std::sync::Arc;
    use tempfile::TempDir;

    /// Exporter command that counts invocations through a side file and
    /// writes the package to stdout.
    fn counting_exporter(dir: &TempDir) -> (CommandExporter, std::path::PathBuf) {
        let count_file = dir.path().join("invocations");
        let script = format!(
            "echo run >> {} && printf 'package-{{subject}}'",
            count_file.display()
        );
        let exporter =
            CommandExporter::new(vec!["sh".to_string(), "-c".to_string(), script]).unwrap();
        (exporter, count_file)
    }

    fn invocations(count_file: &std::path::Path) -> usize {
        std::fs::read_to_string(count_file)
            .map(|s| s.lines().count())
            .unwrap_or(0)
    }

    #[tokio::test]
    async fn cold_then_warm_download_generates_once() {
        let dir = TempDir::new().unwrap();
        let (exporter, count_file) = counting_exporter(&dir);

        let store = Arc::new(FsArtifactStore::new(dir.path().join("artifacts")));
        let cache = ExportCache::new(store.clone(), FreshnessWindow::hours(24));

        let filename = backup_filename("Intro Quiz");
        assert_eq!(filename, "intro_quiz.mbz");

        let first = cache.get_or_generate(12, &filename, &exporter).await.unwrap();
        assert_eq!(first.content, b"package-12");
        assert_eq!(invocations(&count_file), 1);

        // Warm call reuses the stored artifact, no second invocation.
        let second = cache.get_or_generate(12, &filename, &exporter).await.unwrap();
        assert_eq!(second.digest, first.digest);
        assert_eq!(invocations(&count_file), 1);

        // Exactly one generation on disk.
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn separate_subjects_get_separate_artifacts() {
        let dir = TempDir::new().unwrap();
        let (exporter, count_file) = counting_exporter(&dir);

        let store = Arc::new(FsArtifactStore::new(dir.path().join("artifacts")));
        let cache = ExportCache::new(store, FreshnessWindow::hours(24));

        let a = cache.get_or_generate(1, "a.mbz", &exporter).await.unwrap();
        let b = cache.get_or_generate(2, "b.mbz", &exporter).await.unwrap();

        assert_eq!(a.content, b"package-1");
        assert_eq!(b.content, b"package-2");
        assert_eq!(invocations(&count_file), 2);
    }
}
