//! Single-owner session state and the event dispatcher.
//!
//! All deadline state lives in one `Session` object mutated only by
//! `Session::apply`, which consumes explicit [`Event`]s and returns
//! [`Effect`]s for the embedding layer (UI or runtime driver) to act on.
//! That keeps the ordering rules testable without a DOM:
//!
//! - at most one countdown exists; restarting replaces it, never stacks
//! - the expiry transition opens the resolution screen exactly once
//! - a payment choice is accepted only while awaiting one, so duplicate
//!   clicks during submission cannot issue a second request
//! - the server stays authoritative: every response carrying a deadline
//!   record replaces the cached copy wholesale

use tracing::{debug, info, warn};

use crate::api::{PaymentRequest, PaymentResponse, QuestsResponse};
use crate::deadline::{Countdown, CountdownFrame, DeadlineInfo, UrgencyTier, EXPIRED_DISPLAY};
use crate::resolution::{offer_for, PaymentKind, ResolutionOffer};

pub const GENERIC_ERROR_NOTICE: &str = "Something went wrong, try again";
pub const NETWORK_ERROR_NOTICE: &str = "Network error, try again";
pub const PENALTY_PAID_NOTICE: &str = "Penalty paid, deadline extended";
pub const REPURCHASED_NOTICE: &str = "Module repurchased, fresh deadline granted";

/// Resolution-screen lifecycle. `Submitting` doubles as the disabled-button
/// state: no second payment can be issued from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Hidden,
    AwaitingChoice,
    Submitting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    fn success(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            text: text.into(),
        }
    }

    fn error(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            text: text.into(),
        }
    }
}

/// Inputs to the dispatcher. Events that may render a first countdown frame
/// carry the clock with them so tests can drive a simulated one.
#[derive(Debug, Clone)]
pub enum Event {
    Tick { now_ms: i64 },
    QuestsLoaded { response: QuestsResponse, now_ms: i64 },
    QuestRejected { error: Option<String>, message: Option<String> },
    ChoiceSelected(PaymentKind),
    PaymentCompleted { response: PaymentResponse, now_ms: i64 },
    PaymentFailed,
}

/// Outputs of the dispatcher. `SubmitPayment`, `RefreshHeader` and
/// `RefreshQuests` are requests to the embedding layer; the rest describe
/// what the UI should show.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// `tier` is `None` once the countdown has entered its terminal state.
    RenderCountdown {
        display: String,
        tier: Option<UrgencyTier>,
    },
    HideCountdown,
    ShowResolution(ResolutionOffer),
    HideResolution,
    SubmitPayment(PaymentRequest),
    Notify(Notice),
    RefreshHeader,
    RefreshQuests,
}

#[derive(Debug)]
pub struct Session {
    user_id: i64,
    module_index: u32,
    deadline: Option<DeadlineInfo>,
    countdown: Option<Countdown>,
    phase: Phase,
}

impl Session {
    pub fn new(user_id: i64) -> Self {
        Self {
            user_id,
            module_index: 0,
            deadline: None,
            countdown: None,
            phase: Phase::Hidden,
        }
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn module_index(&self) -> u32 {
        self.module_index
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn deadline(&self) -> Option<&DeadlineInfo> {
        self.deadline.as_ref()
    }

    /// Deadline instant of the live countdown, if one is running.
    pub fn countdown_deadline_ms(&self) -> Option<i64> {
        self.countdown.as_ref().and_then(Countdown::deadline_ms)
    }

    /// Clears all deadline state. The record's lifetime is one module; entering
    /// another one starts from whatever the next quests fetch reports.
    pub fn enter_module(&mut self, module_index: u32) {
        self.module_index = module_index;
        self.deadline = None;
        self.countdown = None;
        self.phase = Phase::Hidden;
    }

    pub fn apply(&mut self, event: Event) -> Vec<Effect> {
        let mut effects = Vec::new();
        match event {
            Event::Tick { now_ms } => self.tick(now_ms, &mut effects),
            Event::QuestsLoaded { response, now_ms } => {
                self.on_quests_loaded(response, now_ms, &mut effects)
            }
            Event::QuestRejected { error, message } => {
                self.on_quest_rejected(error, message, &mut effects)
            }
            Event::ChoiceSelected(kind) => self.on_choice_selected(kind, &mut effects),
            Event::PaymentCompleted { response, now_ms } => {
                self.on_payment_completed(response, now_ms, &mut effects)
            }
            Event::PaymentFailed => {
                warn!(event = "payment.result", outcome = "network_error");
                self.phase = Phase::AwaitingChoice;
                effects.push(Effect::Notify(Notice::error(NETWORK_ERROR_NOTICE)));
            }
        }
        effects
    }

    fn tick(&mut self, now_ms: i64, effects: &mut Vec<Effect>) {
        let Some(countdown) = self.countdown.as_mut() else {
            return;
        };
        match countdown.tick(now_ms) {
            CountdownFrame::Running { display, tier } => {
                effects.push(Effect::RenderCountdown {
                    display,
                    tier: Some(tier),
                });
            }
            CountdownFrame::Expired { just_expired } => {
                effects.push(Effect::RenderCountdown {
                    display: EXPIRED_DISPLAY.to_string(),
                    tier: None,
                });
                if just_expired {
                    info!(event = "deadline.expired", module_index = self.module_index);
                    self.open_resolution(effects);
                }
            }
        }
    }

    fn on_quests_loaded(
        &mut self,
        response: QuestsResponse,
        now_ms: i64,
        effects: &mut Vec<Effect>,
    ) {
        if let Some(module_index) = response.module_index {
            if module_index != self.module_index {
                debug!(
                    event = "module.changed",
                    from = self.module_index,
                    to = module_index
                );
                self.enter_module(module_index);
            }
        }

        let Some(info) = response.deadline_info else {
            // No record in this response: the cached copy (if any) stands,
            // but a top-level expired flag still routes to resolution.
            if response.deadline_expired {
                self.countdown = None;
                effects.push(Effect::HideCountdown);
                self.open_resolution(effects);
            }
            return;
        };

        let expired = info.deadline_expired || response.deadline_expired;
        let deadline_iso = info.deadline_iso.clone();
        self.deadline = Some(info);

        if expired {
            self.countdown = None;
            effects.push(Effect::HideCountdown);
            self.open_resolution(effects);
        } else {
            self.restart_countdown(deadline_iso.as_deref(), now_ms, effects);
        }
    }

    fn on_quest_rejected(
        &mut self,
        error: Option<String>,
        message: Option<String>,
        effects: &mut Vec<Effect>,
    ) {
        if error.as_deref() == Some("deadline_expired") {
            info!(event = "deadline.rejected_by_server", module_index = self.module_index);
            self.open_resolution(effects);
            return;
        }
        let text = message
            .or(error)
            .unwrap_or_else(|| GENERIC_ERROR_NOTICE.to_string());
        effects.push(Effect::Notify(Notice::error(text)));
    }

    fn on_choice_selected(&mut self, kind: PaymentKind, effects: &mut Vec<Effect>) {
        if self.phase != Phase::AwaitingChoice {
            // Submitting already, or no resolution on screen: ignore, so a
            // duplicate click can never issue a second payment request.
            debug!(event = "payment.choice_ignored", phase = ?self.phase);
            return;
        }
        self.phase = Phase::Submitting;
        info!(
            event = "payment.submit",
            payment_type = kind.as_str(),
            module_index = self.module_index
        );
        effects.push(Effect::SubmitPayment(PaymentRequest {
            user_id: self.user_id,
            module_index: self.module_index,
            payment_type: kind,
        }));
    }

    fn on_payment_completed(
        &mut self,
        response: PaymentResponse,
        now_ms: i64,
        effects: &mut Vec<Effect>,
    ) {
        if !response.ok {
            warn!(event = "payment.result", outcome = "rejected");
            self.phase = Phase::AwaitingChoice;
            let text = response
                .message
                .unwrap_or_else(|| GENERIC_ERROR_NOTICE.to_string());
            effects.push(Effect::Notify(Notice::error(text)));
            return;
        }

        info!(event = "payment.result", outcome = "ok");
        self.phase = Phase::Hidden;
        effects.push(Effect::HideResolution);

        // Penalty responses carry the fresh window in `new_deadline_iso`;
        // repurchase responses put it on the record itself.
        let notice = if response.new_deadline_iso.is_some() {
            PENALTY_PAID_NOTICE
        } else {
            REPURCHASED_NOTICE
        };
        let next_iso = response.new_deadline_iso.or_else(|| {
            response
                .deadline_info
                .as_ref()
                .and_then(|info| info.deadline_iso.clone())
        });
        if let Some(info) = response.deadline_info {
            self.deadline = Some(info);
        }
        self.restart_countdown(next_iso.as_deref(), now_ms, effects);

        effects.push(Effect::Notify(Notice::success(notice)));
        effects.push(Effect::RefreshHeader);
        effects.push(Effect::RefreshQuests);
    }

    /// Cancel-before-replace: assigning the option drops any previous
    /// countdown, so exactly one tick stream exists afterwards. Renders the
    /// first frame immediately, which also catches already-past timestamps.
    fn restart_countdown(
        &mut self,
        deadline_iso: Option<&str>,
        now_ms: i64,
        effects: &mut Vec<Effect>,
    ) {
        match deadline_iso {
            Some(iso) => {
                self.countdown = Some(Countdown::new(iso));
                self.tick(now_ms, effects);
            }
            None => {
                self.countdown = None;
                effects.push(Effect::HideCountdown);
            }
        }
    }

    fn open_resolution(&mut self, effects: &mut Vec<Effect>) {
        if self.phase != Phase::Hidden {
            return;
        }
        self.phase = Phase::AwaitingChoice;
        effects.push(Effect::ShowResolution(offer_for(self.deadline.as_ref())));
    }
}
