//! Async driver tying the API client to the session dispatcher.
//!
//! The dispatcher is pure; this layer performs its network-facing effects
//! (`SubmitPayment`, `RefreshHeader`, `RefreshQuests`) and feeds the terminal
//! outcomes back in as events. UI-facing effects are returned to the caller
//! in the order the dispatcher produced them.

use std::collections::VecDeque;
use std::env;

use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};

use crate::api::{ApiClient, ApiError};
use crate::session::{Effect, Event, Notice, Session};

#[derive(Debug, Clone, PartialEq)]
pub struct WatchConfig {
    pub base_url: String,
    pub user_id: i64,
    /// Quest re-fetch cadence; the countdown itself ticks once per second.
    pub refresh_interval_ms: u64,
    /// Submit the offered resolution path once when the screen opens. Stand-in
    /// for the user's single click when running headless.
    pub auto_resolve: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            user_id: 0,
            refresh_interval_ms: 30_000,
            auto_resolve: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("QUESTFLOW_USER_ID is required and must be an integer")]
    MissingUserId,
    #[error(transparent)]
    Api(#[from] ApiError),
}

pub fn watch_config_from_env() -> Result<WatchConfig, WatchError> {
    let mut config = WatchConfig::default();

    if let Ok(base_url) = env::var("QUESTFLOW_API_URL") {
        let trimmed = base_url.trim();
        if !trimmed.is_empty() {
            config.base_url = trimmed.to_string();
        }
    }

    config.user_id = env::var("QUESTFLOW_USER_ID")
        .ok()
        .and_then(|raw| raw.trim().parse().ok())
        .ok_or(WatchError::MissingUserId)?;

    if let Ok(interval) = env::var("QUESTFLOW_REFRESH_INTERVAL_MS") {
        if let Ok(parsed) = interval.trim().parse() {
            config.refresh_interval_ms = parsed;
        }
    }

    if let Ok(auto) = env::var("QUESTFLOW_AUTO_RESOLVE") {
        config.auto_resolve = auto == "1" || auto.eq_ignore_ascii_case("true");
    }

    Ok(config)
}

pub struct SessionRunner {
    client: ApiClient,
    session: Session,
    auto_resolve: bool,
}

impl SessionRunner {
    pub fn new(client: ApiClient, session: Session) -> Self {
        Self {
            client,
            session,
            auto_resolve: false,
        }
    }

    pub fn with_auto_resolve(mut self, auto_resolve: bool) -> Self {
        self.auto_resolve = auto_resolve;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Fetches the quest list and runs the resulting event through the
    /// dispatcher.
    pub async fn refresh_quests(&mut self) -> Result<Vec<Effect>, ApiError> {
        let response = self.client.quests(self.session.user_id()).await?;
        Ok(self
            .dispatch(Event::QuestsLoaded {
                response,
                now_ms: Utc::now().timestamp_millis(),
            })
            .await)
    }

    pub async fn tick_now(&mut self) -> Vec<Effect> {
        self.dispatch(Event::Tick {
            now_ms: Utc::now().timestamp_millis(),
        })
        .await
    }

    /// Applies an event and drains every network-facing effect it cascades
    /// into, returning only the UI-facing ones.
    pub async fn dispatch(&mut self, event: Event) -> Vec<Effect> {
        let mut queue: VecDeque<Effect> = self.session.apply(event).into();
        let mut surfaced = Vec::new();

        while let Some(effect) = queue.pop_front() {
            match effect {
                Effect::SubmitPayment(request) => {
                    let outcome = match self.client.deadline_payment(&request).await {
                        Ok(response) => Event::PaymentCompleted {
                            response,
                            now_ms: Utc::now().timestamp_millis(),
                        },
                        Err(err) => {
                            warn!(event = "payment.transport_error", error = %err);
                            Event::PaymentFailed
                        }
                    };
                    queue.extend(self.session.apply(outcome));
                }
                Effect::RefreshQuests => match self.client.quests(self.session.user_id()).await {
                    Ok(response) => {
                        let follow_up = self.session.apply(Event::QuestsLoaded {
                            response,
                            now_ms: Utc::now().timestamp_millis(),
                        });
                        queue.extend(follow_up);
                    }
                    Err(err) => warn!(event = "quests.refresh_failed", error = %err),
                },
                Effect::RefreshHeader => match self.client.user(self.session.user_id()).await {
                    Ok(profile) => info!(
                        event = "header.refreshed",
                        xp = profile.xp,
                        level = profile.level,
                        module_index = profile.module_index
                    ),
                    Err(err) => warn!(event = "header.refresh_failed", error = %err),
                },
                Effect::ShowResolution(offer) => {
                    surfaced.push(Effect::ShowResolution(offer));
                    if self.auto_resolve {
                        queue.extend(self.session.apply(Event::ChoiceSelected(offer.kind)));
                    }
                }
                other => surfaced.push(other),
            }
        }

        surfaced
    }
}

/// Headless watch loop: one-second countdown ticks, periodic quest refreshes,
/// effects logged as they surface.
pub async fn run_watch(config: WatchConfig) -> Result<(), WatchError> {
    let client = ApiClient::new(&config.base_url)?;
    let session = Session::new(config.user_id);
    let mut runner = SessionRunner::new(client, session).with_auto_resolve(config.auto_resolve);

    info!(
        event = "session.start",
        user_id = config.user_id,
        base_url = %config.base_url,
        refresh_interval_ms = config.refresh_interval_ms,
        auto_resolve = config.auto_resolve
    );

    log_effects(&runner.refresh_quests().await?);

    let mut tick = tokio::time::interval(std::time::Duration::from_secs(1));
    let mut refresh =
        tokio::time::interval(std::time::Duration::from_millis(config.refresh_interval_ms.max(1)));
    refresh.tick().await; // the initial refresh already happened

    loop {
        tokio::select! {
            _ = tick.tick() => {
                log_effects(&runner.tick_now().await);
            }
            _ = refresh.tick() => {
                match runner.refresh_quests().await {
                    Ok(effects) => log_effects(&effects),
                    Err(err) => warn!(event = "quests.refresh_failed", error = %err),
                }
            }
        }
    }
}

fn log_effects(effects: &[Effect]) {
    for effect in effects {
        match effect {
            Effect::RenderCountdown {
                display: frame_display,
                tier,
            } => {
                let urgency = tier.map(|t| t.as_str()).unwrap_or("expired");
                info!(event = "countdown.frame", display = %frame_display, urgency);
            }
            Effect::HideCountdown => info!(event = "countdown.hidden"),
            Effect::ShowResolution(offer) => info!(
                event = "resolution.shown",
                payment_type = offer.kind.as_str(),
                amount = offer.amount
            ),
            Effect::HideResolution => info!(event = "resolution.hidden"),
            Effect::Notify(Notice { kind, text }) => {
                info!(event = "notice", kind = ?kind, text = %text)
            }
            Effect::SubmitPayment(_) | Effect::RefreshHeader | Effect::RefreshQuests => {}
        }
    }
}
