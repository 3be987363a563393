//! Channel availability probing.
//!
//! Determines, without blocking the caller and without saturating the
//! network, whether each registered channel's stream URL currently
//! responds, publishing results into the shared status store. Each URL is
//! probed at most once per session; registrations arriving in a burst are
//! coalesced by a short debounce window before the queue starts draining.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use super::channel_types::{Channel, ChannelStatus};
use super::status_store::StatusStore;

/// Tuning knobs for the prober. Defaults are calibrated for slow
/// streaming origins: generous timeout, small concurrency cap.
#[derive(Debug, Clone)]
pub struct ProberConfig {
    /// Maximum probes in flight at once.
    pub max_concurrent: u32,
    /// Wall-clock bound for a single probe.
    pub check_timeout: Duration,
    /// Window used to batch near-simultaneous registrations before the
    /// queue starts draining.
    pub startup_debounce: Duration,
    /// User-Agent sent with probes; some origins reject unknown agents.
    pub user_agent: String,
}

impl Default for ProberConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 3,
            check_timeout: Duration::from_secs(8),
            startup_debounce: Duration::from_millis(300),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36"
                .to_string(),
        }
    }
}

/// A registration awaiting a probe.
#[derive(Debug, Clone)]
struct QueuedCheck {
    channel_id: String,
    url: String,
}

/// State owned exclusively by the prober. The UI layer never touches
/// this; it only reads the status store.
#[derive(Debug, Default)]
struct ProberState {
    /// URLs already enqueued or probed this session.
    checked_urls: HashSet<String>,
    pending: VecDeque<QueuedCheck>,
    active: u32,
    /// Draining is held off while a debounce window is open.
    paused: bool,
    /// Bumped by `clear_cache`; probes finishing under an older epoch
    /// discard their results.
    epoch: u64,
    /// Latest-wins sequence for the debounce timer.
    timer_seq: u64,
}

struct ProberInner {
    config: ProberConfig,
    client: reqwest::Client,
    status: StatusStore,
    state: Mutex<ProberState>,
}

/// Cheaply clonable handle; constructed once per process and shared.
#[derive(Clone)]
pub struct AvailabilityProber {
    inner: Arc<ProberInner>,
}

impl AvailabilityProber {
    pub fn new(config: ProberConfig, status: StatusStore) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.check_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .unwrap_or_default();

        Self {
            inner: Arc::new(ProberInner {
                config,
                client,
                status,
                state: Mutex::new(ProberState::default()),
            }),
        }
    }

    /// The store this prober publishes into.
    pub fn status_store(&self) -> &StatusStore {
        &self.inner.status
    }

    /// Register a channel for a reachability check.
    ///
    /// Idempotent: a channel with a terminal status, an already-checked
    /// URL, or an already-queued id triggers no new work. Each accepted
    /// registration re-arms the debounce window; a burst of registrations
    /// coalesces into a single drain.
    pub async fn request_check(&self, channel: &Channel) {
        if self.inner.status.get(&channel.id).await.is_terminal() {
            return;
        }

        let (seq, epoch) = {
            let mut state = self.inner.state.lock().await;
            if state.checked_urls.contains(&channel.url) {
                return;
            }
            if state.pending.iter().any(|c| c.channel_id == channel.id) {
                return;
            }
            state.pending.push_back(QueuedCheck {
                channel_id: channel.id.clone(),
                url: channel.url.clone(),
            });
            state.paused = true;
            state.timer_seq += 1;
            (state.timer_seq, state.epoch)
        };

        let inner = self.inner.clone();
        tokio::spawn(async move {
            tokio::time::sleep(inner.config.startup_debounce).await;
            let mut state = inner.state.lock().await;
            // Superseded by a newer registration or a cache clear
            if state.epoch != epoch || state.timer_seq != seq {
                return;
            }
            state.paused = false;
            ProberInner::drain(&inner, &mut state);
        });
    }

    /// Drop all queued work, forget which URLs were probed, and clear the
    /// status store. In-flight probes run to completion but their results
    /// are discarded.
    pub async fn clear_cache(&self) {
        {
            let mut state = self.inner.state.lock().await;
            state.epoch += 1;
            state.pending.clear();
            state.checked_urls.clear();
            state.active = 0;
            state.paused = false;
        }
        self.inner.status.clear().await;
        log::info!("Cleared channel status cache");
    }
}

impl ProberInner {
    /// Start as many queued probes as the concurrency cap allows. Called
    /// with the state lock held; no-op while the debounce window is open.
    fn drain(inner: &Arc<Self>, state: &mut ProberState) {
        if state.paused {
            return;
        }

        while state.active < inner.config.max_concurrent {
            let check = match state.pending.pop_front() {
                Some(check) => check,
                None => break,
            };
            // A second id sharing the URL may have been queued before the
            // first drained
            if state.checked_urls.contains(&check.url) {
                continue;
            }
            state.checked_urls.insert(check.url.clone());
            state.active += 1;

            let inner = inner.clone();
            let epoch = state.epoch;
            tokio::spawn(async move {
                let status = inner.probe_url(&check.url).await;

                let mut state = inner.state.lock().await;
                // Cache cleared while in flight: result discarded
                if state.epoch != epoch {
                    return;
                }
                state.active -= 1;
                inner.status.set(&check.channel_id, status).await;
                Self::drain(&inner, &mut state);
            });
        }
    }

    /// Probe a stream URL with a bare GET, dropping the response as soon
    /// as headers arrive; the body is never read. Network errors,
    /// timeouts, and non-success statuses all fold to `Unavailable`.
    async fn probe_url(&self, url: &str) -> ChannelStatus {
        match self.client.get(url).send().await {
            Ok(response) => {
                let status = response.status();
                log::debug!("Probe {} -> {}", url, status);
                if status.is_success() {
                    ChannelStatus::Available
                } else {
                    ChannelStatus::Unavailable
                }
            }
            Err(e) => {
                log::debug!("Probe {} failed: {}", url, e);
                ChannelStatus::Unavailable
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(debounce_ms: u64, timeout_ms: u64, max_concurrent: u32) -> ProberConfig {
        ProberConfig {
            max_concurrent,
            check_timeout: Duration::from_millis(timeout_ms),
            startup_debounce: Duration::from_millis(debounce_ms),
            ..ProberConfig::default()
        }
    }

    fn test_channel(id: &str, url: &str) -> Channel {
        Channel {
            id: id.to_string(),
            name: id.to_string(),
            url: url.to_string(),
            logo: None,
            group: "Other".to_string(),
            tvg_id: None,
            tvg_name: None,
        }
    }

    async fn wait_for_terminal(
        store: &StatusStore,
        channel_id: &str,
        timeout: Duration,
    ) -> ChannelStatus {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let status = store.get(channel_id).await;
            if status.is_terminal() || tokio::time::Instant::now() >= deadline {
                return status;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    #[tokio::test]
    async fn test_probe_success_marks_available() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/s.m3u8"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let prober = AvailabilityProber::new(test_config(50, 2000, 3), StatusStore::new());
        prober
            .request_check(&test_channel("a", &format!("{}/s.m3u8", server.uri())))
            .await;

        let status =
            wait_for_terminal(prober.status_store(), "a", Duration::from_secs(5)).await;
        assert_eq!(status, ChannelStatus::Available);
    }

    #[tokio::test]
    async fn test_probe_http_error_marks_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let prober = AvailabilityProber::new(test_config(50, 2000, 3), StatusStore::new());
        prober
            .request_check(&test_channel("a", &format!("{}/gone.m3u8", server.uri())))
            .await;

        let status =
            wait_for_terminal(prober.status_store(), "a", Duration::from_secs(5)).await;
        assert_eq!(status, ChannelStatus::Unavailable);
    }

    #[tokio::test]
    async fn test_probe_connection_error_marks_unavailable() {
        // Port 1 is never listening
        let prober = AvailabilityProber::new(test_config(50, 2000, 3), StatusStore::new());
        prober
            .request_check(&test_channel("a", "http://127.0.0.1:1/s.m3u8"))
            .await;

        let status =
            wait_for_terminal(prober.status_store(), "a", Duration::from_secs(5)).await;
        assert_eq!(status, ChannelStatus::Unavailable);
    }

    #[tokio::test]
    async fn test_duplicate_registration_probes_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/s.m3u8"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let prober = AvailabilityProber::new(test_config(100, 2000, 3), StatusStore::new());
        let channel = test_channel("a", &format!("{}/s.m3u8", server.uri()));
        prober.request_check(&channel).await;
        prober.request_check(&channel).await;
        prober.request_check(&channel).await;

        wait_for_terminal(prober.status_store(), "a", Duration::from_secs(5)).await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_shared_url_probed_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/shared.m3u8"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let prober = AvailabilityProber::new(test_config(50, 2000, 3), StatusStore::new());
        let url = format!("{}/shared.m3u8", server.uri());
        prober.request_check(&test_channel("first", &url)).await;
        prober.request_check(&test_channel("second", &url)).await;

        let status =
            wait_for_terminal(prober.status_store(), "first", Duration::from_secs(5)).await;
        assert_eq!(status, ChannelStatus::Available);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_terminal_status_never_reprobed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/s.m3u8"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let prober = AvailabilityProber::new(test_config(50, 2000, 3), StatusStore::new());
        let channel = test_channel("a", &format!("{}/s.m3u8", server.uri()));
        prober.request_check(&channel).await;
        let status =
            wait_for_terminal(prober.status_store(), "a", Duration::from_secs(5)).await;
        assert_eq!(status, ChannelStatus::Available);

        prober.request_check(&channel).await;
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(prober.status_store().get("a").await, ChannelStatus::Available);
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_timeout_resolves_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(30)))
            .mount(&server)
            .await;

        let prober = AvailabilityProber::new(test_config(50, 400, 3), StatusStore::new());
        let started = tokio::time::Instant::now();
        prober
            .request_check(&test_channel("slow", &format!("{}/slow.m3u8", server.uri())))
            .await;

        let status =
            wait_for_terminal(prober.status_store(), "slow", Duration::from_secs(10)).await;
        assert_eq!(status, ChannelStatus::Unavailable);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_debounce_defers_first_probe() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let prober = AvailabilityProber::new(test_config(400, 2000, 3), StatusStore::new());
        prober
            .request_check(&test_channel("a", &format!("{}/a.m3u8", server.uri())))
            .await;

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(server.received_requests().await.unwrap().is_empty());

        wait_for_terminal(prober.status_store(), "a", Duration::from_secs(5)).await;
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_clear_cache_resets_and_allows_reprobe() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/s.m3u8"))
            .respond_with(ResponseTemplate::new(200))
            .expect(2)
            .mount(&server)
            .await;

        let prober = AvailabilityProber::new(test_config(50, 2000, 3), StatusStore::new());
        let channel = test_channel("a", &format!("{}/s.m3u8", server.uri()));

        prober.request_check(&channel).await;
        wait_for_terminal(prober.status_store(), "a", Duration::from_secs(5)).await;

        prober.clear_cache().await;
        assert_eq!(prober.status_store().get("a").await, ChannelStatus::Unknown);

        prober.request_check(&channel).await;
        let status =
            wait_for_terminal(prober.status_store(), "a", Duration::from_secs(5)).await;
        assert_eq!(status, ChannelStatus::Available);
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_clear_cache_discards_in_flight_result() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let prober = AvailabilityProber::new(test_config(50, 5000, 3), StatusStore::new());
        prober
            .request_check(&test_channel("a", &format!("{}/a.m3u8", server.uri())))
            .await;

        // Let the probe start, then clear while it is in flight
        tokio::time::sleep(Duration::from_millis(200)).await;
        prober.clear_cache().await;

        tokio::time::sleep(Duration::from_millis(800)).await;
        assert_eq!(prober.status_store().get("a").await, ChannelStatus::Unknown);
    }

    /// Minimal HTTP server that tracks how many connections are being
    /// served at once.
    async fn spawn_counting_server(
        delay: Duration,
    ) -> (std::net::SocketAddr, Arc<AtomicUsize>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let peak = Arc::new(AtomicUsize::new(0));
        let active = Arc::new(AtomicUsize::new(0));
        let peak_handle = peak.clone();

        tokio::spawn(async move {
            loop {
                let (mut socket, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => break,
                };
                let active = active.clone();
                let peak = peak_handle.clone();
                tokio::spawn(async move {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);

                    let mut buf = [0u8; 1024];
                    let _ = socket.read(&mut buf).await;
                    tokio::time::sleep(delay).await;
                    let _ = socket
                        .write_all(
                            b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
                        )
                        .await;
                    active.fetch_sub(1, Ordering::SeqCst);
                });
            }
        });

        (addr, peak)
    }

    #[tokio::test]
    async fn test_concurrency_cap_respected() {
        let (addr, peak) = spawn_counting_server(Duration::from_millis(150)).await;

        let store = StatusStore::new();
        let prober = AvailabilityProber::new(test_config(50, 5000, 3), store.clone());

        let channels: Vec<Channel> = (0..8)
            .map(|i| test_channel(&format!("ch{}", i), &format!("http://{}/{}.m3u8", addr, i)))
            .collect();
        for channel in &channels {
            prober.request_check(channel).await;
        }

        for channel in &channels {
            let status =
                wait_for_terminal(&store, &channel.id, Duration::from_secs(10)).await;
            assert_eq!(status, ChannelStatus::Available);
        }
        assert!(peak.load(Ordering::SeqCst) <= 3, "cap exceeded: {}", peak.load(Ordering::SeqCst));
    }
}
