//! Module-deadline record and the client-side countdown.
//!
//! Rules implemented:
//! - the backend record is mirrored verbatim and replaced wholesale
//! - remaining time renders as zero-padded `HH:MM:SS`, hours may exceed 24
//! - urgency partitions hours-left into normal/warning/danger/critical
//! - a countdown fires its expiry transition exactly once
//! - malformed or missing timestamps behave as already past

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Server-issued deadline record for the current module.
///
/// The server decides expiry and the penalty/repurchase terms; the client only
/// derives a live countdown display from `deadline_iso`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadlineInfo {
    pub deadline_iso: Option<String>,
    #[serde(default)]
    pub deadline_expired: bool,
    pub can_extend: Option<bool>,
    pub penalty_amount: Option<f64>,
    pub repurchase_amount: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UrgencyTier {
    Normal,
    Warning,
    Danger,
    Critical,
}

impl UrgencyTier {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Warning => "warning",
            Self::Danger => "danger",
            Self::Critical => "critical",
        }
    }
}

/// Display once the countdown has run out.
pub const EXPIRED_DISPLAY: &str = "00:00:00";

const MS_PER_HOUR: i64 = 3_600_000;
const MS_PER_MINUTE: i64 = 60_000;

/// Classifies hours-remaining into a display tier. Total over all inputs;
/// anything at or below one hour is critical.
pub fn urgency_tier(hours_left: f64) -> UrgencyTier {
    if hours_left <= 1.0 {
        UrgencyTier::Critical
    } else if hours_left <= 6.0 {
        UrgencyTier::Danger
    } else if hours_left <= 24.0 {
        UrgencyTier::Warning
    } else {
        UrgencyTier::Normal
    }
}

/// Zero-padded `HH:MM:SS` for a positive remaining interval. No day rollover.
pub fn format_remaining(remaining_ms: i64) -> String {
    let clamped = remaining_ms.max(0);
    let hours = clamped / MS_PER_HOUR;
    let minutes = (clamped % MS_PER_HOUR) / MS_PER_MINUTE;
    let seconds = (clamped % MS_PER_MINUTE) / 1_000;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// Accepts both RFC 3339 (`2025-01-01T12:00:00Z`) and the naive UTC form the
/// backend's `isoformat()` emits (`2025-01-01T12:00:00.123456`).
pub fn parse_deadline_ms(raw: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp_millis());
    }
    raw.parse::<NaiveDateTime>()
        .ok()
        .map(|naive| naive.and_utc().timestamp_millis())
}

#[derive(Debug, Clone, PartialEq)]
pub enum CountdownFrame {
    Running { display: String, tier: UrgencyTier },
    Expired { just_expired: bool },
}

/// Live countdown against one absolute deadline.
///
/// The session owns at most one of these; replacing it is the only way to
/// restart, so tick streams never stack. The expiry transition is reported
/// once per instance via `just_expired`.
#[derive(Debug, Clone)]
pub struct Countdown {
    deadline_ms: Option<i64>,
    expiry_fired: bool,
}

impl Countdown {
    pub fn new(deadline_iso: &str) -> Self {
        Self {
            deadline_ms: parse_deadline_ms(deadline_iso),
            expiry_fired: false,
        }
    }

    /// Epoch milliseconds of the deadline, `None` when the timestamp did not
    /// parse (treated as already past on the first tick).
    pub fn deadline_ms(&self) -> Option<i64> {
        self.deadline_ms
    }

    pub fn tick(&mut self, now_ms: i64) -> CountdownFrame {
        let remaining = match self.deadline_ms {
            Some(deadline) => deadline - now_ms,
            None => -1,
        };

        if remaining <= 0 {
            let just_expired = !self.expiry_fired;
            self.expiry_fired = true;
            return CountdownFrame::Expired { just_expired };
        }

        CountdownFrame::Running {
            display: format_remaining(remaining),
            tier: urgency_tier(remaining as f64 / MS_PER_HOUR as f64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urgency_tiers_partition_hours_left_without_gaps() {
        let cases = [
            (0.0, UrgencyTier::Critical),
            (0.5, UrgencyTier::Critical),
            (1.0, UrgencyTier::Critical),
            (1.000_1, UrgencyTier::Danger),
            (5.9, UrgencyTier::Danger),
            (6.0, UrgencyTier::Danger),
            (6.000_1, UrgencyTier::Warning),
            (23.9, UrgencyTier::Warning),
            (24.0, UrgencyTier::Warning),
            (24.000_1, UrgencyTier::Normal),
            (100.0, UrgencyTier::Normal),
        ];

        for (hours, expected) in cases {
            assert_eq!(urgency_tier(hours), expected, "hours_left={hours}");
        }
    }

    #[test]
    fn formatting_zero_pads_and_keeps_hours_above_24() {
        assert_eq!(format_remaining(0), "00:00:00");
        assert_eq!(format_remaining(1_000), "00:00:01");
        assert_eq!(format_remaining(61_000), "00:01:01");
        assert_eq!(format_remaining(3_600_000), "01:00:00");
        // 30h12m05s stays in hours, no day rollover.
        assert_eq!(format_remaining(30 * 3_600_000 + 12 * 60_000 + 5_000), "30:12:05");
    }

    #[test]
    fn parses_rfc3339_and_naive_iso_timestamps() {
        assert_eq!(
            parse_deadline_ms("2025-01-01T12:00:00Z"),
            Some(1_735_732_800_000)
        );
        assert_eq!(
            parse_deadline_ms("2025-01-01T12:00:00"),
            Some(1_735_732_800_000)
        );
        assert_eq!(
            parse_deadline_ms("2025-01-01T12:00:00.500000"),
            Some(1_735_732_800_500)
        );
        assert_eq!(parse_deadline_ms("not-a-date"), None);
        assert_eq!(parse_deadline_ms(""), None);
    }

    #[test]
    fn running_frames_recompute_display_and_tier_every_tick() {
        let mut countdown = Countdown::new("2025-01-01T12:00:00Z");
        let deadline_ms = countdown.deadline_ms().unwrap();

        let frame = countdown.tick(deadline_ms - 30 * 3_600_000);
        assert_eq!(
            frame,
            CountdownFrame::Running {
                display: "30:00:00".to_string(),
                tier: UrgencyTier::Normal,
            }
        );

        let frame = countdown.tick(deadline_ms - 3 * 3_600_000);
        assert_eq!(
            frame,
            CountdownFrame::Running {
                display: "03:00:00".to_string(),
                tier: UrgencyTier::Danger,
            }
        );

        let frame = countdown.tick(deadline_ms - 1_000);
        assert_eq!(
            frame,
            CountdownFrame::Running {
                display: "00:00:01".to_string(),
                tier: UrgencyTier::Critical,
            }
        );
    }

    #[test]
    fn expiry_fires_exactly_once_per_countdown() {
        let mut countdown = Countdown::new("2025-01-01T12:00:00Z");
        let deadline_ms = countdown.deadline_ms().unwrap();

        assert_eq!(
            countdown.tick(deadline_ms),
            CountdownFrame::Expired { just_expired: true }
        );
        assert_eq!(
            countdown.tick(deadline_ms + 1_000),
            CountdownFrame::Expired {
                just_expired: false
            }
        );
        assert_eq!(
            countdown.tick(deadline_ms + 2_000),
            CountdownFrame::Expired {
                just_expired: false
            }
        );
    }

    #[test]
    fn past_timestamp_expires_on_first_tick() {
        let mut countdown = Countdown::new("2025-01-01T12:00:00Z");
        let frame = countdown.tick(countdown.deadline_ms().unwrap() + 86_400_000);
        assert_eq!(frame, CountdownFrame::Expired { just_expired: true });
    }

    #[test]
    fn malformed_timestamp_expires_on_first_tick() {
        let mut countdown = Countdown::new("garbage");
        assert_eq!(countdown.deadline_ms(), None);
        assert_eq!(
            countdown.tick(0),
            CountdownFrame::Expired { just_expired: true }
        );
        assert_eq!(
            countdown.tick(1_000),
            CountdownFrame::Expired {
                just_expired: false
            }
        );
    }

    #[test]
    fn replacing_a_countdown_resets_the_expiry_latch() {
        let mut countdown = Countdown::new("2025-01-01T12:00:00Z");
        let first_deadline = countdown.deadline_ms().unwrap();
        assert_eq!(
            countdown.tick(first_deadline),
            CountdownFrame::Expired { just_expired: true }
        );

        // Restart against a later deadline: old instance is dropped, the new
        // one runs and expires independently.
        countdown = Countdown::new("2025-01-03T12:00:00Z");
        let second_deadline = countdown.deadline_ms().unwrap();
        assert!(matches!(
            countdown.tick(first_deadline),
            CountdownFrame::Running { .. }
        ));
        assert_eq!(
            countdown.tick(second_deadline + 1),
            CountdownFrame::Expired { just_expired: true }
        );
    }
}
