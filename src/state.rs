use std::time::Duration;

use crate::services::{AvailabilityProber, ConfigService, SourceFetcher, StatusStore};

/// Global application state: the services behind the channel browser,
/// wired from persisted configuration.
pub struct AppState {
    pub config: ConfigService,
    pub fetcher: SourceFetcher,
    pub status: StatusStore,
    pub prober: AvailabilityProber,
}

impl AppState {
    pub fn new() -> Self {
        let config_service = ConfigService::new();
        let app_config = config_service.get();

        log::info!(
            "Initializing availability prober with config: max_concurrent={}, check_timeout={}s, debounce={}ms",
            app_config.prober.max_concurrent,
            app_config.prober.check_timeout_secs,
            app_config.prober.startup_debounce_ms
        );

        let status = StatusStore::new();
        let prober =
            AvailabilityProber::new(app_config.prober.to_prober_config(), status.clone());
        let fetcher =
            SourceFetcher::new(Duration::from_secs(app_config.sources.fetch_timeout_secs));

        Self {
            config: config_service,
            fetcher,
            status,
            prober,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
