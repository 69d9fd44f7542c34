//! Questflow client core.
//!
//! Headless client-side logic for the quest-based trading-education backend:
//! - deadline record mirroring and the `HH:MM:SS` urgency countdown
//! - the expiry-resolution flow (penalty extension vs. repurchase)
//! - an event/effect dispatcher making ordering and idempotence testable
//! - a REST client and a tokio watch loop driving the dispatcher

mod api;
mod deadline;
mod observability;
mod resolution;
mod runtime;
mod session;

pub use api::{
    ApiClient, ApiError, PaymentRequest, PaymentResponse, QuestActionRequest, QuestActionResponse,
    QuestSummary, QuestsResponse, UserProfile,
};
pub use deadline::{
    format_remaining, parse_deadline_ms, urgency_tier, Countdown, CountdownFrame, DeadlineInfo,
    UrgencyTier, EXPIRED_DISPLAY,
};
pub use observability::{
    init_logging, log_app_start, logging_config_from_env, LogFormat, LoggingConfig,
    LoggingInitError,
};
pub use resolution::{
    offer_for, PaymentKind, ResolutionOffer, DEFAULT_PENALTY_AMOUNT, DEFAULT_REPURCHASE_AMOUNT,
};
pub use runtime::{run_watch, watch_config_from_env, SessionRunner, WatchConfig, WatchError};
pub use session::{
    Effect, Event, Notice, NoticeKind, Phase, Session, GENERIC_ERROR_NOTICE, NETWORK_ERROR_NOTICE,
    PENALTY_PAID_NOTICE, REPURCHASED_NOTICE,
};
