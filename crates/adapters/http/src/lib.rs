//! # panelkit-adapter-http
//!
//! HTTP client for the hub's template API: the one-shot bootstrap fetch that
//! populates the registry, and the periodic weather/clock poll.
//!
//! Transport failures never escalate: the bootstrap retries a bounded number
//! of times (cancellable between attempts) and the poll simply tries again
//! next period. TLS/certificate plumbing stays inside reqwest.
//!
//! ## Dependency rule
//! Depends on `panelkit-app` (store, port traits) and `panelkit-domain` only.

pub mod config;
pub mod error;
pub mod weather;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use panelkit_app::ports::link::LinkStatus;
use panelkit_app::store::{BootstrapStats, StateStore};
use panelkit_domain::clock::{ClockState, ClockSync};
use panelkit_domain::time::monotonic_us;

pub use config::HttpConfig;
pub use error::HttpError;
pub use weather::WeatherRow;

const BOOTSTRAP_TEMPLATE: &str = "AREA_ID,AREA_NAME,ENTITY_ID,ENTITY_NAME,STATE\n\
    {% for area in areas() -%}\n\
    {% for e in area_entities(area) -%}\n\
    {{ area }},{{ area_name(area) }},{{ e }},{{ states[e].name }},{{ states[e].state }}\n\
    {% endfor %}\n\
    {% endfor %}";

const WEATHER_TEMPLATE: &str = "Temperature,Condition,Year,Month,Day,Weekday,Hour,Minute,Second\
    {% set w = states['__WEATHER__'] %}\n\
    {{ w.attributes.temperature if w else 'N/A' }},{{ w.state if w else 'N/A' }},\
    {{ now().year }},{{ now().month }},{{ now().day }},{{ now().weekday() }},\
    {{ now().strftime('%H') }},{{ now().strftime('%M') }},{{ now().strftime('%S') }}";

/// Cooperative cancellation for the bootstrap retry loop.
///
/// Checked between attempts, never mid-request; an in-flight request runs to
/// its own timeout.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Client for the hub's template API.
pub struct HubClient {
    http: reqwest::Client,
    config: HttpConfig,
}

impl HubClient {
    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::Transport`] when the underlying client cannot be
    /// constructed.
    pub fn new(config: HttpConfig) -> Result<Self, HttpError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(HttpError::Transport)?;
        Ok(Self { http, config })
    }

    /// Fetch the bootstrap CSV and rebuild `store` from it.
    ///
    /// Bounded at `bootstrap_attempts` tries with a fixed `retry_delay_secs`
    /// pause in between; `cancel` is checked between attempts. A payload
    /// that fails to parse counts as a failed attempt and leaves the
    /// registry empty, never half-built.
    ///
    /// # Errors
    ///
    /// [`HttpError::Cancelled`] when the flag was raised, otherwise
    /// [`HttpError::Exhausted`] after the last failed attempt.
    pub async fn bootstrap(
        &self,
        store: &StateStore,
        cancel: &CancelFlag,
    ) -> Result<BootstrapStats, HttpError> {
        let attempts = self.config.bootstrap_attempts.max(1);
        let delay = Duration::from_secs(self.config.retry_delay_secs);

        for attempt in 1..=attempts {
            if cancel.is_cancelled() {
                tracing::info!("bootstrap cancelled");
                return Err(HttpError::Cancelled);
            }
            match self.fetch_template(&bootstrap_template()).await {
                Ok(csv) => match store.init_from_csv(&csv) {
                    Ok(stats) => {
                        tracing::info!(
                            attempt,
                            areas = stats.areas,
                            entities = stats.entities,
                            "bootstrap complete"
                        );
                        return Ok(stats);
                    }
                    Err(err) => {
                        tracing::warn!(attempt, error = %err, "bootstrap payload did not parse");
                    }
                },
                Err(err) => tracing::warn!(attempt, error = %err, "bootstrap fetch failed"),
            }
            if attempt < attempts {
                tokio::time::sleep(delay).await;
            }
        }
        Err(HttpError::Exhausted { attempts })
    }

    /// Spawn the periodic weather/clock poll feeding `store`.
    ///
    /// Polls every `weather_poll_secs` while the link is up. A row whose
    /// temperature fails to parse is discarded whole — weather and clock are
    /// only ever replaced together.
    pub fn spawn_weather_poll<L>(self: Arc<Self>, store: StateStore, link: L) -> JoinHandle<()>
    where
        L: LinkStatus + 'static,
    {
        tokio::spawn(async move {
            let period = Duration::from_secs(self.config.weather_poll_secs.max(1));
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let body = weather_template(&self.config.weather_entity);

            loop {
                ticker.tick().await;
                if !link.is_connected() {
                    tracing::debug!("link down, skipping weather poll");
                    continue;
                }
                match self.fetch_template(&body).await {
                    Ok(csv) => {
                        let Some(row) = WeatherRow::parse(&csv) else {
                            tracing::warn!("weather payload did not parse");
                            continue;
                        };
                        store.set_weather(row.temperature_c, &row.condition);
                        store.set_clock(ClockState::from_sync(
                            ClockSync {
                                year: row.year,
                                month: row.month,
                                day: row.day,
                                weekday: row.weekday,
                                hour: row.hour,
                                minute: row.minute,
                                second: row.second,
                            },
                            monotonic_us(),
                        ));
                        tracing::debug!(
                            temperature_c = row.temperature_c,
                            condition = %row.condition,
                            "weather and clock updated"
                        );
                    }
                    Err(err) => tracing::warn!(error = %err, "weather poll failed"),
                }
            }
        })
    }

    async fn fetch_template(&self, body: &serde_json::Value) -> Result<String, HttpError> {
        let mut request = self.http.post(&self.config.base_url).json(body);
        if !self.config.token.is_empty() {
            request = request.bearer_auth(&self.config.token);
        }
        let response = request.send().await.map_err(HttpError::Transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(HttpError::Status(status.as_u16()));
        }
        response.text().await.map_err(HttpError::Transport)
    }
}

fn bootstrap_template() -> serde_json::Value {
    serde_json::json!({ "template": BOOTSTRAP_TEMPLATE })
}

fn weather_template(weather_entity: &str) -> serde_json::Value {
    serde_json::json!({ "template": WEATHER_TEMPLATE.replace("__WEATHER__", weather_entity) })
}
