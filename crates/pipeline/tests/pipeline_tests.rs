//! End-to-end pipeline behavior against fake processes and downloads.

mod support;

use provision_core::{Error, PipelineState, ProvisionConfig, Stage};
use provision_events::{EventCategory, PipelineEvent, ProvisionEventLayer, StageEvent};
use provision_pipeline::{PipelineRunner, ToolchainFetcher};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use support::{Behavior, FakeDownloader, FakeRunner, go_release};
use tracing_subscriber::layer::SubscriberExt;

fn host_config(root: &Path) -> ProvisionConfig {
    let mut config = ProvisionConfig::default();
    config.toolchain.install_root = root.join("usr/local/go");
    config.workspace.root = root.join("go");
    config
}

/// Download staging directory beside the fake host's workspace.
fn staging_dir(config: &ProvisionConfig) -> PathBuf {
    config.workspace.root.with_file_name("staging")
}

fn pipeline(
    config: ProvisionConfig,
    runner: &Arc<FakeRunner>,
    downloader: &Arc<FakeDownloader>,
) -> PipelineRunner {
    let staging = staging_dir(&config);
    std::fs::create_dir_all(&staging).unwrap();
    let fetcher = ToolchainFetcher::new(downloader.clone()).with_staging_parent(staging);

    PipelineRunner::new(config, runner.clone(), downloader.clone())
        .with_inherited_path(Some(OsString::from("/usr/bin:/bin")))
        .with_toolchain_fetcher(fetcher)
}

fn staged_entries(config: &ProvisionConfig) -> usize {
    std::fs::read_dir(staging_dir(config)).unwrap().count()
}

fn installing_runner() -> Arc<FakeRunner> {
    Arc::new(FakeRunner::new().on("go", Behavior::InstallInto("naabu".to_string())))
}

#[tokio::test]
async fn test_fresh_host_end_to_end() {
    let host = tempfile::tempdir().unwrap();
    let config = host_config(host.path());
    let runner = installing_runner();
    let downloader = Arc::new(FakeDownloader::serving(go_release()));

    let mut pipeline = pipeline(config.clone(), &runner, &downloader);
    let report = pipeline.run().await.unwrap();

    assert_eq!(pipeline.state(), PipelineState::Done);
    assert_eq!(report.executable.path, host.path().join("go/bin/naabu"));
    assert!(report.executable.path.is_file());
    assert_eq!(
        report.executable.target,
        "github.com/projectdiscovery/naabu/v2/cmd/naabu@latest"
    );
    assert!(config.toolchain.driver().is_file());
    assert_eq!(runner.programs(), ["apt-get", "apt-get", "go"]);
    assert!(downloader.destinations()[0].starts_with(staging_dir(&config)));
    assert_eq!(staged_entries(&config), 0);

    let install = &runner.calls()[2];
    assert_eq!(install.program, config.toolchain.driver());
    assert_eq!(
        install.env_value("GOROOT"),
        Some(&config.toolchain.install_root.clone().into_os_string())
    );
}

#[tokio::test]
async fn test_second_run_replaces_installation() {
    let host = tempfile::tempdir().unwrap();
    let config = host_config(host.path());
    let runner = installing_runner();
    let downloader = Arc::new(FakeDownloader::serving(go_release()));

    let mut pipeline = pipeline(config.clone(), &runner, &downloader);
    pipeline.run().await.unwrap();
    pipeline.run().await.unwrap();

    let mut entries: Vec<String> = std::fs::read_dir(&config.toolchain.install_root)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    entries.sort();
    assert_eq!(entries, ["VERSION", "bin"]);
    assert_eq!(runner.programs().len(), 6);
}

#[tokio::test]
async fn test_package_failure_halts_before_download() {
    let host = tempfile::tempdir().unwrap();
    let runner = Arc::new(FakeRunner::new().on_arg("apt-get", "update", Behavior::Exit(100)));
    let downloader = Arc::new(FakeDownloader::serving(go_release()));

    let mut pipeline = pipeline(host_config(host.path()), &runner, &downloader);
    let failure = pipeline.run().await.unwrap_err();

    assert_eq!(failure.stage, Stage::Packages);
    assert_eq!(failure.exit_code(), 100);
    assert!(matches!(failure.source, Error::Package { .. }));
    assert_eq!(
        pipeline.state(),
        PipelineState::Failed {
            stage: Stage::Packages,
            exit_code: 100
        }
    );
    assert_eq!(runner.programs(), ["apt-get"]);
    assert!(downloader.destinations().is_empty());
}

#[tokio::test]
async fn test_install_step_failure_propagates_code() {
    let host = tempfile::tempdir().unwrap();
    let runner = Arc::new(FakeRunner::new().on_arg("apt-get", "install", Behavior::Exit(100)));
    let downloader = Arc::new(FakeDownloader::serving(go_release()));

    let failure = pipeline(host_config(host.path()), &runner, &downloader)
        .run()
        .await
        .unwrap_err();

    assert_eq!(failure.stage, Stage::Packages);
    assert_eq!(failure.exit_code(), 100);
    assert_eq!(runner.programs(), ["apt-get", "apt-get"]);
}

#[tokio::test]
async fn test_missing_package_manager_exits_127() {
    let host = tempfile::tempdir().unwrap();
    let runner = Arc::new(FakeRunner::new().on(
        "apt-get",
        Behavior::SpawnError(std::io::ErrorKind::NotFound),
    ));
    let downloader = Arc::new(FakeDownloader::serving(go_release()));

    let failure = pipeline(host_config(host.path()), &runner, &downloader)
        .run()
        .await
        .unwrap_err();

    assert_eq!(failure.stage, Stage::Packages);
    assert_eq!(failure.exit_code(), 127);
}

#[tokio::test]
async fn test_download_failure_leaves_no_trace() {
    let host = tempfile::tempdir().unwrap();
    let config = host_config(host.path());
    let runner = installing_runner();
    let downloader = Arc::new(FakeDownloader::failing());

    let failure = pipeline(config.clone(), &runner, &downloader)
        .run()
        .await
        .unwrap_err();

    assert_eq!(failure.stage, Stage::Toolchain);
    assert_eq!(failure.exit_code(), 1);
    assert!(matches!(failure.source, Error::Fetch { .. }));

    let archives = downloader.destinations();
    assert_eq!(archives.len(), 1);
    assert!(!archives[0].exists());
    assert_eq!(staged_entries(&config), 0);
    assert!(!config.workspace.source_dir().exists());
    assert!(!config.workspace.bin_dir().exists());
    assert!(!runner.programs().contains(&"go".to_string()));
}

#[tokio::test]
async fn test_bindings_put_workspace_first() {
    let host = tempfile::tempdir().unwrap();
    let config = host_config(host.path());
    let runner = installing_runner();
    let downloader = Arc::new(FakeDownloader::serving(go_release()));

    let report = pipeline(config.clone(), &runner, &downloader)
        .run()
        .await
        .unwrap();

    let entries = report.bindings.search_path_entries();
    assert_eq!(entries[0], config.workspace.bin_dir());
    assert_eq!(entries[1], config.toolchain.bin_dir());
    assert_eq!(entries[2], PathBuf::from("/usr/bin"));
    assert!(config.workspace.source_dir().is_dir());
    assert!(config.workspace.bin_dir().is_dir());

    let install = runner.calls().pop().unwrap();
    assert_eq!(install.env_value("PATH"), Some(&report.bindings.search_path));
    assert_eq!(install.env_value("CGO_ENABLED"), Some(&OsString::from("1")));
}

#[tokio::test]
async fn test_module_install_failure() {
    let host = tempfile::tempdir().unwrap();
    let config = host_config(host.path());
    let runner = Arc::new(FakeRunner::new().on("go", Behavior::Exit(2)));
    let downloader = Arc::new(FakeDownloader::serving(go_release()));

    let failure = pipeline(config.clone(), &runner, &downloader)
        .run()
        .await
        .unwrap_err();

    assert_eq!(failure.stage, Stage::Install);
    assert_eq!(failure.exit_code(), 2);
    assert!(!config.workspace.bin_dir().join("naabu").exists());
}

#[tokio::test]
async fn test_install_without_executable_fails() {
    let host = tempfile::tempdir().unwrap();
    let runner = Arc::new(FakeRunner::new());
    let downloader = Arc::new(FakeDownloader::serving(go_release()));

    let failure = pipeline(host_config(host.path()), &runner, &downloader)
        .run()
        .await
        .unwrap_err();

    assert_eq!(failure.stage, Stage::Install);
    assert_eq!(failure.exit_code(), 1);
    assert!(failure.source.to_string().contains("was not produced"));
}

#[tokio::test]
async fn test_checksum_mismatch_removes_archive() {
    let host = tempfile::tempdir().unwrap();
    let mut config = host_config(host.path());
    config.toolchain.sha256 = Some("0".repeat(64));
    let runner = installing_runner();
    let downloader = Arc::new(FakeDownloader::serving(go_release()));

    let failure = pipeline(config.clone(), &runner, &downloader)
        .run()
        .await
        .unwrap_err();

    assert_eq!(failure.stage, Stage::Toolchain);
    assert!(matches!(failure.source, Error::ChecksumMismatch { .. }));
    assert!(!downloader.destinations()[0].exists());
    assert!(!config.toolchain.install_root.exists());
}

#[tokio::test]
async fn test_corrupt_archive_keeps_existing_root() {
    let host = tempfile::tempdir().unwrap();
    let config = host_config(host.path());
    let old_driver = config.toolchain.driver();
    std::fs::create_dir_all(old_driver.parent().unwrap()).unwrap();
    std::fs::write(&old_driver, b"previous go").unwrap();

    let runner = installing_runner();
    let downloader = Arc::new(FakeDownloader::serving(b"not a tarball".to_vec()));

    let failure = pipeline(config.clone(), &runner, &downloader)
        .run()
        .await
        .unwrap_err();

    assert_eq!(failure.stage, Stage::Toolchain);
    assert!(matches!(failure.source, Error::Extraction { .. }));
    assert_eq!(std::fs::read(&old_driver).unwrap(), b"previous go");
}

#[tokio::test]
async fn test_markers_bracket_successful_run() {
    let (layer, mut rx) = ProvisionEventLayer::channel();
    let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(layer));

    let host = tempfile::tempdir().unwrap();
    let runner = installing_runner();
    let downloader = Arc::new(FakeDownloader::serving(go_release()));
    pipeline(host_config(host.path()), &runner, &downloader)
        .run()
        .await
        .unwrap();

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event.category);
    }

    assert!(matches!(
        events.first(),
        Some(EventCategory::Pipeline(PipelineEvent::Started { tool })) if tool == "naabu"
    ));
    assert!(matches!(
        events.last(),
        Some(EventCategory::Pipeline(PipelineEvent::Completed { tool, .. })) if tool == "naabu"
    ));
    let completed_stages = events
        .iter()
        .filter(|e| matches!(e, EventCategory::Stage(StageEvent::Completed { .. })))
        .count();
    assert_eq!(completed_stages, 4);
}

#[tokio::test]
async fn test_no_end_marker_on_failure() {
    let (layer, mut rx) = ProvisionEventLayer::channel();
    let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(layer));

    let host = tempfile::tempdir().unwrap();
    let runner = installing_runner();
    let downloader = Arc::new(FakeDownloader::failing());
    let _ = pipeline(host_config(host.path()), &runner, &downloader)
        .run()
        .await;

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event.category);
    }

    assert!(
        !events
            .iter()
            .any(|e| matches!(e, EventCategory::Pipeline(PipelineEvent::Completed { .. })))
    );
    assert!(matches!(
        events.last(),
        Some(EventCategory::Pipeline(PipelineEvent::Failed { stage, exit_code: 1 }))
            if stage == "toolchain"
    ));
}
