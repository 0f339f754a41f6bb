//! Main monitor implementation.
//!
//! Coordinates all components: registry, fetcher, scanner, alert delivery,
//! commands and the health endpoint.

mod cycle;
mod error;
mod history;
mod sink;
mod state;
mod stats;

pub use cycle::{CycleReport, ScanCycle};
pub use error::BotError;
pub use history::AlertHistory;
pub use sink::{AlertSink, QueuedSink};
pub use state::{RuntimeState, StateError, parse_threshold};
pub use stats::Stats;

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval, interval_at};
use tracing::{debug, error, info, warn};

use crate::commands::{CommandHandler, CommandListener};
use crate::config::Config;
use crate::domain::Pair;
use crate::exchanges::{PriceFetcher, Registry};
use crate::notification::{
    ErrorData, Event, NoopNotifier, Notifier, OverviewData, ShutdownData, StartupData,
    TelegramClient, TelegramNotifier, TelegramNotifierConfig,
};
use crate::server::{self, HealthState};
use crate::storage::{AlertStorage, SqliteStorage, SqliteStorageConfig};

/// How long `stop` waits for queued alerts to be delivered.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Main monitor that coordinates all components.
pub struct Bot {
    cfg: Config,
    version: String,
    pairs: Vec<Pair>,

    state: Arc<RuntimeState>,
    registry: Arc<Registry>,
    fetcher: Arc<PriceFetcher>,
    history: Arc<AlertHistory>,
    cycle: Arc<ScanCycle>,

    notifier: Arc<dyn Notifier>,
    telegram_client: Option<TelegramClient>,
    storage: Option<Arc<dyn AlertStorage>>,
    sink: Arc<QueuedSink>,
    sink_worker: Mutex<Option<JoinHandle<()>>>,
    background: Mutex<Vec<JoinHandle<()>>>,

    scan_interval: Duration,

    started_at: Mutex<Option<Instant>>,
    running: AtomicBool,
    stats: Mutex<Stats>,
}

impl Bot {
    /// Creates a new Bot instance. Must be called inside a tokio runtime.
    pub async fn new(cfg: Config, version: impl Into<String>) -> Result<Self, BotError> {
        let pairs = cfg.parsed_pairs()?;
        let arbitrage = cfg.arbitrage();

        let state = Arc::new(RuntimeState::new(cfg.threshold()?)?);
        let registry = Arc::new(Registry::from_config(&cfg)?);
        let fetcher = Arc::new(PriceFetcher::new(arbitrage.request_timeout())?);
        let history = Arc::new(AlertHistory::new(arbitrage.alert_history()));

        // Fall back to a silent notifier when Telegram is off or unconfigured
        let mut notifier: Arc<dyn Notifier> = Arc::new(NoopNotifier);
        let mut telegram_client = None;
        if let Some(telegram) = cfg.telegram() {
            if telegram.is_usable() {
                let client = TelegramClient::new(&telegram.bot_token)?;
                let telegram_notifier =
                    TelegramNotifier::new(TelegramNotifierConfig::from(telegram), client.clone())?;
                notifier = Arc::new(telegram_notifier);
                telegram_client = Some(client);
                info!("Telegram notifier created");
            } else if telegram.enabled {
                warn!("Telegram enabled but credentials are missing, notifications disabled");
            }
        }

        let storage_cfg = cfg.storage();
        let storage: Option<Arc<dyn AlertStorage>> = if storage_cfg.enabled {
            let sqlite = SqliteStorage::new(SqliteStorageConfig::new(storage_cfg.path())).await?;
            Some(Arc::new(sqlite))
        } else {
            None
        };
        if let Some(ref storage) = storage {
            restore_history(storage.as_ref(), &history).await?;
        }

        let (sink, sink_worker) =
            QueuedSink::spawn(arbitrage.alert_queue_size(), notifier.clone(), storage.clone());
        let sink = Arc::new(sink);

        let cycle = Arc::new(ScanCycle::new(
            pairs.clone(),
            registry.clone(),
            fetcher.clone(),
            state.clone(),
            sink.clone(),
            history.clone(),
            arbitrage.max_concurrent_pairs(),
        ));

        Ok(Bot {
            version: version.into(),
            pairs,
            state,
            registry,
            fetcher,
            history,
            cycle,
            notifier,
            telegram_client,
            storage,
            sink,
            sink_worker: Mutex::new(Some(sink_worker)),
            background: Mutex::new(Vec::new()),
            scan_interval: arbitrage.scan_interval(),
            started_at: Mutex::new(None),
            running: AtomicBool::new(false),
            stats: Mutex::new(Stats::default()),
            cfg,
        })
    }

    /// Starts the bot and scans until Ctrl+C.
    pub async fn start(&self) -> Result<(), BotError> {
        self.start_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            info!("Shutdown signal received");
        })
        .await
    }

    /// Starts the bot and scans until `shutdown` completes.
    pub async fn start_until<F>(&self, shutdown: F) -> Result<(), BotError>
    where
        F: Future<Output = ()>,
    {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(BotError::AlreadyRunning);
        }
        *self.started_at.lock() = Some(Instant::now());

        let exchanges = self.registry.names();
        let pair_names: Vec<String> = self.pairs.iter().map(Pair::to_string).collect();

        info!(
            name = %self.cfg.app.name,
            version = %self.version,
            exchanges = ?exchanges,
            pairs = ?pair_names,
            threshold = %self.state.threshold(),
            "Starting price divergence monitor"
        );

        self.spawn_health_server();
        self.spawn_command_listener();

        self.send_notification(Event::Startup(StartupData {
            name: self.cfg.app.name.clone(),
            version: self.version.clone(),
            exchanges,
            pairs: pair_names,
            threshold: self.state.threshold(),
            scan_interval: self.scan_interval,
        }))
        .await;

        self.run_main_loop(shutdown).await
    }

    /// Gracefully stops the bot.
    pub async fn stop(&self) -> Result<(), BotError> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Ok(());
        }

        info!("Stopping bot...");

        for task in self.background.lock().drain(..) {
            task.abort();
        }

        // Let queued alerts go out before the shutdown notice
        self.sink.close();
        let worker = self.sink_worker.lock().take();
        if let Some(worker) = worker {
            if tokio::time::timeout(DRAIN_TIMEOUT, worker).await.is_err() {
                warn!("Timed out draining alert queue");
            }
        }

        let uptime = self.uptime();

        self.send_notification(Event::Shutdown(ShutdownData {
            reason: "graceful shutdown".to_string(),
            uptime,
            graceful: true,
        }))
        .await;

        if let Err(e) = self.notifier.close().await {
            debug!(error = %e, "Failed to close notifier");
        }
        if let Some(ref storage) = self.storage {
            if let Err(e) = storage.close().await {
                warn!(error = %e, "Failed to close storage");
            }
        }

        info!(uptime = ?uptime, "Bot stopped");

        Ok(())
    }

    /// Returns a copy of the current statistics.
    pub fn stats(&self) -> Stats {
        self.stats.lock().clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> &Arc<RuntimeState> {
        &self.state
    }

    pub fn history(&self) -> &Arc<AlertHistory> {
        &self.history
    }

    /// Returns how long the bot has been running.
    pub fn uptime(&self) -> Duration {
        self.started_at
            .lock()
            .map(|s| s.elapsed())
            .unwrap_or(Duration::ZERO)
    }

    /// Returns a command handler bound to this bot's state.
    pub fn command_handler(&self) -> CommandHandler {
        CommandHandler::new(
            self.state.clone(),
            self.history.clone(),
            self.pairs.clone(),
            self.registry.names(),
        )
    }

    fn spawn_health_server(&self) {
        let server_cfg = self.cfg.server();
        if !server_cfg.enabled {
            info!("Health server disabled");
            return;
        }

        let addr = server_cfg.bind_addr();
        let health = HealthState::new(self.pairs.len(), self.registry.names());
        let task = tokio::spawn(async move {
            // Scanning keeps going without the endpoint
            if let Err(e) = server::serve(&addr, health).await {
                error!(error = %e, "Health server stopped");
            }
        });
        self.background.lock().push(task);
    }

    fn spawn_command_listener(&self) {
        let Some(telegram) = self.cfg.telegram() else {
            return;
        };
        let Some(client) = self.telegram_client.clone() else {
            return;
        };
        if !telegram.commands {
            info!("Telegram commands disabled");
            return;
        }

        let listener =
            CommandListener::new(client, telegram.chat_id.clone(), self.command_handler());
        self.background.lock().push(tokio::spawn(listener.run()));
    }

    /// Main scan loop.
    ///
    /// Ticks that fire while a cycle is still running are skipped, so cycles
    /// never overlap. Shutdown is observed between cycles.
    async fn run_main_loop<F>(&self, shutdown: F) -> Result<(), BotError>
    where
        F: Future<Output = ()>,
    {
        let mut scan_timer = interval(self.scan_interval);
        scan_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let telegram = self.cfg.telegram();
        let notify_overview = telegram.is_some_and(|t| t.notify_overview);
        let overview_interval = telegram
            .map(|t| t.overview_interval())
            .unwrap_or(crate::config::DEFAULT_OVERVIEW_INTERVAL);
        let mut overview_timer = interval_at(
            tokio::time::Instant::now() + overview_interval,
            overview_interval,
        );
        overview_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            scan_interval = ?self.scan_interval,
            overview_interval = ?overview_interval,
            request_timeout = ?self.fetcher.request_timeout(),
            pairs = self.pairs.len(),
            "Starting main scan loop"
        );

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = scan_timer.tick() => {
                    if !self.is_running() {
                        break;
                    }
                    self.run_cycle().await;
                }
                _ = overview_timer.tick(), if notify_overview => {
                    self.send_overview().await;
                }
            }
        }

        Ok(())
    }

    /// Runs one cycle on its own task so a panic cannot take the loop down.
    pub async fn run_cycle(&self) -> Option<CycleReport> {
        let cycle = Arc::clone(&self.cycle);
        match tokio::spawn(async move { cycle.run().await }).await {
            Ok(report) => {
                let mut stats = self.stats.lock();
                if !report.paused {
                    stats.scan_cycles += 1;
                    stats.alerts_detected += report.alerts as u64;
                    stats.quotes_fetched += report.quotes as u64;
                    stats.last_cycle_duration = report.duration;
                }
                Some(report)
            }
            Err(e) => {
                self.stats.lock().failed_cycles += 1;
                error!(error = %e, "Scan cycle aborted");
                self.send_notification(Event::Error(ErrorData {
                    component: "scan_cycle".to_string(),
                    message: "Scan cycle aborted".to_string(),
                    error: Some(e.to_string()),
                }))
                .await;
                None
            }
        }
    }

    /// Sends a notification event, logging failures.
    async fn send_notification(&self, event: Event) {
        if let Err(e) = self.notifier.send(&event).await {
            warn!(
                event_type = %event.kind(),
                error = %e,
                "Failed to send notification"
            );
        }
    }

    /// Sends a periodic overview notification with current stats.
    async fn send_overview(&self) {
        let stats = self.stats();
        let fetch_totals = self.fetcher.stats().totals();

        for (exchange, counters) in self.fetcher.stats().snapshot() {
            info!(
                exchange = %exchange,
                success = counters.success,
                rate_limited = counters.rate_limited,
                transport_error = counters.transport_error,
                parse_failure = counters.parse_failure,
                "Fetch counters"
            );
        }

        self.send_notification(Event::Overview(OverviewData {
            uptime: self.uptime(),
            scan_cycles: stats.scan_cycles,
            alerts_detected: stats.alerts_detected,
            alerts_dropped: self.sink.dropped(),
            quotes_fetched: fetch_totals.success,
            fetch_failures: fetch_totals.failures(),
            threshold: self.state.threshold(),
            paused: self.state.is_paused(),
        }))
        .await;
    }
}

/// Refills the in-memory history from storage, oldest first.
async fn restore_history(
    storage: &dyn AlertStorage,
    history: &AlertHistory,
) -> Result<(), BotError> {
    let stored = storage.count().await?;
    let recent = storage.recent(history.capacity()).await?;
    let restored = recent.len();
    for alert in recent.into_iter().rev() {
        history.push(alert);
    }
    info!(stored, restored, "Alert storage opened");
    Ok(())
}
