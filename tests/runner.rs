use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use hostvisor::{
    HostRestart, RunOutcome, Settings, SharedStore, Worker, WorkerCatalog, WorkerContext,
    WorkerError,
};

#[derive(Default)]
struct RecordingRestart {
    calls: AtomicU32,
}

#[async_trait]
impl HostRestart for RecordingRestart {
    async fn restart_host(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

struct Doomed;

#[async_trait]
impl Worker for Doomed {
    fn name(&self) -> &str {
        "doomed"
    }

    async fn main_loop(&mut self, _ctx: &WorkerContext) -> Result<(), WorkerError> {
        panic!("firmware assertion");
    }
}

fn settings_in(dir: &Path, services: &str, max_restarts: u32) -> Settings {
    let list = dir.join("services_list.json");
    std::fs::write(&list, services).unwrap();

    let mut settings = Settings::default();
    settings.paths.state_file = dir.join("system_state.json");
    settings.paths.services_list = list;
    settings.system.check_interval_secs = 1;
    settings.system.max_thread_restarts = max_restarts;
    settings.system.reboot_delay_ms = 0;
    settings
}

#[tokio::test(flavor = "multi_thread")]
async fn shutdown_signal_stops_workers_and_records_boot() {
    let dir = tempfile::tempdir().unwrap();
    let services = r#"{"services": ["producer", "consumer", "sensors"]}"#;
    let settings = settings_in(dir.path(), services, 3);
    let restart = Arc::new(RecordingRestart::default());

    let outcome = hostvisor::run_until(
        settings,
        WorkerCatalog::builtin(),
        restart.clone(),
        async {
            tokio::time::sleep(Duration::from_millis(300)).await;
            Ok::<(), std::io::Error>(())
        },
    )
    .await
    .unwrap();

    assert_eq!(outcome, RunOutcome::Shutdown);
    assert_eq!(restart.calls.load(Ordering::SeqCst), 0);

    let store = SharedStore::open(dir.path().join("system_state.json"), 1);
    let info = store.snapshot().system_info;
    assert!(info.first_install_date.is_some());
    assert!(info.last_boot_timestamp.is_some());
    assert!(info.total_uptime_hours > 0.0);
}

#[tokio::test(flavor = "multi_thread")]
async fn exhausted_budget_ends_the_run_with_hard_recovery() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings_in(dir.path(), r#"{"services": ["doomed"]}"#, 0);
    let restart = Arc::new(RecordingRestart::default());
    let catalog = WorkerCatalog::new().with("doomed", |_| Ok(Box::new(Doomed)));

    let outcome = hostvisor::run_until(settings, catalog, restart.clone(), std::future::pending())
        .await
        .unwrap();

    assert_eq!(outcome, RunOutcome::HardRecovery);
    assert_eq!(restart.calls.load(Ordering::SeqCst), 1);

    let store = SharedStore::open(dir.path().join("system_state.json"), 1);
    assert_eq!(store.get_resilience(|r| r.reboot_error_count), 1);
    assert_eq!(store.get_metric(|m| m.total_system_restarts), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn invalid_settings_are_rejected_before_anything_starts() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = settings_in(dir.path(), r#"{"services": []}"#, 3);
    settings.store.frame_queue_capacity = 0;

    let err = hostvisor::run_until(
        settings,
        WorkerCatalog::builtin(),
        Arc::new(RecordingRestart::default()),
        std::future::pending(),
    )
    .await
    .unwrap_err();

    assert_eq!(err.as_label(), "config_invalid");
    assert!(!dir.path().join("system_state.json").exists());
}
