//! Expiry-resolution offer selection: penalty extension vs. mandatory repurchase.

use serde::{Deserialize, Serialize};

use crate::deadline::DeadlineInfo;

/// Fallback amounts used when the cached record lacks them.
pub const DEFAULT_PENALTY_AMOUNT: f64 = 5.0;
pub const DEFAULT_REPURCHASE_AMOUNT: f64 = 15.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentKind {
    Penalty,
    Repurchase,
}

impl PaymentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Penalty => "penalty",
            Self::Repurchase => "repurchase",
        }
    }
}

/// The single resolution action offered once a deadline lapses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolutionOffer {
    pub kind: PaymentKind,
    pub amount: f64,
}

/// Picks exactly one of the two mutually exclusive resolution paths from the
/// cached record: penalty while the server still allows extensions, repurchase
/// once they are exhausted. A missing record or flag defaults to extendable.
pub fn offer_for(info: Option<&DeadlineInfo>) -> ResolutionOffer {
    let can_extend = info.and_then(|dl| dl.can_extend).unwrap_or(true);
    if can_extend {
        ResolutionOffer {
            kind: PaymentKind::Penalty,
            amount: info
                .and_then(|dl| dl.penalty_amount)
                .unwrap_or(DEFAULT_PENALTY_AMOUNT),
        }
    } else {
        ResolutionOffer {
            kind: PaymentKind::Repurchase,
            amount: info
                .and_then(|dl| dl.repurchase_amount)
                .unwrap_or(DEFAULT_REPURCHASE_AMOUNT),
        }
    }
}
