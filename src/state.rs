use std::sync::Arc;
use std::time::Instant;

use tokio::sync::broadcast;

use crate::config::Config;
use crate::export::orchestrator::{Orchestrator, OrchestratorSettings};
use crate::notify::{NoopNotifier, Notifier, SlackNotifier};
use crate::senders::SenderRegistry;
use crate::source::{LogSource, ManagementApiSource};
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    store: Arc<Store>,
    orchestrator: Arc<Orchestrator>,
    config: Arc<Config>,
    shutdown_tx: broadcast::Sender<()>,
    started_at: Instant,
}

impl AppState {
    pub fn new(
        store: Arc<Store>,
        orchestrator: Arc<Orchestrator>,
        config: &Config,
        shutdown_tx: broadcast::Sender<()>,
    ) -> Self {
        Self {
            store,
            orchestrator,
            config: Arc::new(config.clone()),
            shutdown_tx,
            started_at: Instant::now(),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn shutdown_rx(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

/// Wire the production collaborators from configuration.
pub fn build_orchestrator(config: &Config, store: Arc<Store>) -> Orchestrator {
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(config.upstream.timeout_secs))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new());

    let senders = SenderRegistry::builtin(client, &config.destination);
    let source: Arc<dyn LogSource> = Arc::new(ManagementApiSource::new(&config.upstream, store.clone()));
    let notifier: Arc<dyn Notifier> = match &config.slack.webhook_url {
        Some(url) => Arc::new(SlackNotifier::new(url, &config.export.provider)),
        None => Arc::new(NoopNotifier),
    };

    Orchestrator::new(
        store,
        source,
        senders,
        notifier,
        OrchestratorSettings::from_config(config),
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::broadcast;

    use crate::config::Config;
    use crate::store::Store;

    use super::*;

    #[tokio::test]
    async fn shutdown_receiver_can_clone() {
        let cfg = Config::from_env();
        let tmp = tempfile::tempdir().expect("tempdir");
        let store = Arc::new(
            Store::open(tmp.path().join("state_shutdown.sled").to_str().unwrap()).unwrap(),
        );
        let orchestrator = Arc::new(build_orchestrator(&cfg, store.clone()));
        let (tx, _) = broadcast::channel(4);
        let state = AppState::new(store, orchestrator, &cfg, tx.clone());

        let mut rx1 = state.shutdown_rx();
        let mut rx2 = state.shutdown_rx();
        tx.send(()).unwrap();
        rx1.recv().await.unwrap();
        rx2.recv().await.unwrap();
    }

    #[tokio::test]
    async fn orchestrator_settings_follow_config() {
        let mut cfg = Config::from_env();
        cfg.slack.send_success = true;
        cfg.report.hour = 7;
        let tmp = tempfile::tempdir().expect("tempdir");
        let store =
            Arc::new(Store::open(tmp.path().join("state_settings.sled").to_str().unwrap()).unwrap());
        let orchestrator = build_orchestrator(&cfg, store);
        assert!(orchestrator.settings().notify_on_success);
        assert_eq!(orchestrator.settings().report.hour, 7);
    }
}
