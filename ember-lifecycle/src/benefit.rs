use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One benefit line on a time-bounded instance. Values are multipliers or
/// additive grants; "unlimited" is modeled as a very large grant rather than
/// a separate code path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Benefit {
    pub benefit_type: String,
    pub value: f64,
}

impl Benefit {
    pub fn new(benefit_type: impl Into<String>, value: f64) -> Self {
        Self {
            benefit_type: benefit_type.into(),
            value,
        }
    }
}

/// Shared shape for subscriptions, seasonal passes and countdown offers:
/// Created → Active → Expired, with optional renewal or early cancellation.
/// The periodic sweep, not a per-instance timer, clears the active flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeBoundedBenefit {
    pub id: Uuid,
    pub player_id: String,
    pub starts_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_active: bool,
    pub benefits: Vec<Benefit>,
}

impl TimeBoundedBenefit {
    pub fn new(
        player_id: impl Into<String>,
        starts_at: DateTime<Utc>,
        duration: Duration,
        benefits: Vec<Benefit>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            player_id: player_id.into(),
            starts_at,
            expires_at: starts_at + duration,
            is_active: true,
            benefits,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Sweep step: clear the active flag once past expiry.
    /// Returns true when this call performed the transition.
    pub fn expire_if_due(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_active && self.is_expired(now) {
            self.is_active = false;
            return true;
        }
        false
    }

    /// Re-enter Active with a fresh expiry, keeping the same id. Extends from
    /// the later of now and the current expiry so renewing early does not
    /// shorten the window.
    pub fn renew(&mut self, now: DateTime<Utc>, duration: Duration) {
        let base = if self.expires_at > now {
            self.expires_at
        } else {
            now
        };
        self.expires_at = base + duration;
        self.is_active = true;
    }

    /// Explicit early revocation; benefits stop applying immediately
    pub fn cancel(&mut self) {
        self.is_active = false;
    }

    /// Benefit value by type, only while active. Inactive instances grant
    /// nothing, so multiplier lookups fall back to the caller's neutral value.
    pub fn benefit_value(&self, benefit_type: &str) -> Option<f64> {
        if !self.is_active {
            return None;
        }
        self.benefits
            .iter()
            .find(|b| b.benefit_type == benefit_type)
            .map(|b| b.value)
    }
}
