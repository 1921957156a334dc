use std::sync::Arc;

use axum::Router;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use tempfile::TempDir;
use tokio::sync::broadcast;

use logs_export::config::{
    Config, DestinationConfig, ExportConfig, ReportConfig, SlackConfig, UpstreamConfig,
    WorkerConfig,
};
use logs_export::constants::{DEFAULT_RUN_LEASE_TTL_SECS, DEFAULT_TRUSTED_REFERER};
use logs_export::export::orchestrator::{Orchestrator, OrchestratorSettings};
use logs_export::notify::Notifier;
use logs_export::routes::build_router;
use logs_export::senders::{LogSender, SenderRegistry};
use logs_export::source::LogSource;
use logs_export::state::AppState;
use logs_export::store::Store;

use super::fakes::{FakeSource, RecordingNotifier, RecordingSender};

pub const REPORT_HOUR: u32 = 16;

/// Before the report hour on 2024-06-02 (UTC).
pub fn midday() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 2, 12, 0, 0).unwrap()
}

/// After the report hour on 2024-06-02 (UTC).
pub fn evening() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 2, 17, 30, 0).unwrap()
}

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn setup_store(db_name: &str) -> (TempDir, Arc<Store>) {
    let temp_dir = tempfile::tempdir().expect("tempdir");
    let db_path = temp_dir.path().join(db_name);
    let store = Arc::new(Store::open(db_path.to_str().expect("db path")).expect("open store"));
    (temp_dir, store)
}

pub fn settings(provider: &str) -> OrchestratorSettings {
    OrchestratorSettings {
        export: ExportConfig {
            provider: provider.to_string(),
            batch_size: None,
            start_from: None,
            log_types: None,
            run_lease_ttl_secs: DEFAULT_RUN_LEASE_TTL_SECS,
        },
        notify_on_success: false,
        report: ReportConfig {
            hour: REPORT_HOUR,
            timezone: chrono_tz::Tz::UTC,
        },
    }
}

pub struct Harness {
    pub store: Arc<Store>,
    pub source: Arc<FakeSource>,
    pub http: Arc<RecordingSender>,
    pub mixpanel: Arc<RecordingSender>,
    pub notifier: Arc<RecordingNotifier>,
    pub orchestrator: Arc<Orchestrator>,
    _temp_dir: TempDir,
}

pub struct HarnessBuilder {
    source: FakeSource,
    http: RecordingSender,
    notifier: RecordingNotifier,
    settings: OrchestratorSettings,
}

impl HarnessBuilder {
    pub fn new(source: FakeSource) -> Self {
        Self {
            source,
            http: RecordingSender::default(),
            notifier: RecordingNotifier::default(),
            settings: settings("http"),
        }
    }

    pub fn http_sender(mut self, sender: RecordingSender) -> Self {
        self.http = sender;
        self
    }

    pub fn notifier(mut self, notifier: RecordingNotifier) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn settings(mut self, f: impl FnOnce(&mut OrchestratorSettings)) -> Self {
        f(&mut self.settings);
        self
    }

    pub fn build(self) -> Harness {
        let (temp_dir, store) = setup_store("export-test.sled");
        let source = Arc::new(self.source);
        let http = Arc::new(self.http);
        let mixpanel = Arc::new(RecordingSender::default());
        let notifier = Arc::new(self.notifier);

        let http_sender: Arc<dyn LogSender> = http.clone();
        let mixpanel_sender: Arc<dyn LogSender> = mixpanel.clone();
        let senders = SenderRegistry::default()
            .register("http", 100, http_sender)
            .register("mixpanel", 20, mixpanel_sender);

        let source_dyn: Arc<dyn LogSource> = source.clone();
        let notifier_dyn: Arc<dyn Notifier> = notifier.clone();
        let orchestrator = Arc::new(Orchestrator::new(
            store.clone(),
            source_dyn,
            senders,
            notifier_dyn,
            self.settings,
        ));

        Harness {
            store,
            source,
            http,
            mixpanel,
            notifier,
            orchestrator,
            _temp_dir: temp_dir,
        }
    }
}

impl Harness {
    /// Pretend today's digest already went out so runs do not trigger one.
    pub fn mark_reported(&self, date: NaiveDate) {
        self.store
            .update_state(|s| s.last_report_date = Some(date))
            .expect("mark reported");
    }
}

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub harness: Harness,
}

pub fn test_config(sled_path: &str) -> Config {
    Config {
        host: std::net::IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
        port: 3000,
        log_level: "info".to_string(),
        enable_file_logs: false,
        log_dir: "./logs".to_string(),
        sled_path: sled_path.to_string(),
        trusted_referer: DEFAULT_TRUSTED_REFERER.to_string(),
        export: settings("http").export,
        upstream: UpstreamConfig {
            domain: String::new(),
            api_token: String::new(),
            timeout_secs: 5,
        },
        destination: DestinationConfig {
            url: String::new(),
            token: String::new(),
        },
        slack: SlackConfig {
            webhook_url: None,
            send_success: false,
        },
        report: ReportConfig {
            hour: REPORT_HOUR,
            timezone: chrono_tz::Tz::UTC,
        },
        worker: WorkerConfig {
            is_leader: false,
            export_cron: None,
        },
    }
}

/// Router wired to fakes. The HTTP trigger runs with the wall clock, so the digest
/// is pre-marked as sent for today.
pub fn spawn_test_app(source: FakeSource) -> TestApp {
    spawn_test_app_with(HarnessBuilder::new(source))
}

pub fn spawn_test_app_with(builder: HarnessBuilder) -> TestApp {
    let harness = builder.build();
    harness.mark_reported(Utc::now().date_naive());

    let config = test_config("unused-by-router.sled");
    let (shutdown_tx, _) = broadcast::channel::<()>(8);
    let state = AppState::new(
        harness.store.clone(),
        harness.orchestrator.clone(),
        &config,
        shutdown_tx,
    );
    let app = build_router(state.clone());

    TestApp {
        app,
        state,
        harness,
    }
}
