use uuid::Uuid;

/// Outcome of the plan check for one more booking this month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Allowed,
    PastDue,
    QuotaExceeded { limit: u32 },
}

/// Billing lives in another context; the core only asks whether one more
/// booking may be admitted given the merchant's running monthly counter.
pub trait SubscriptionGate: Send + Sync {
    fn allow_booking(&self, merchant_id: Uuid, month_count: u64) -> GateDecision;
}

/// Default gate: every merchant may book without limit. Deployments wire in
/// a billing-backed implementation instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnmeteredGate;

impl SubscriptionGate for UnmeteredGate {
    fn allow_booking(&self, _merchant_id: Uuid, _month_count: u64) -> GateDecision {
        GateDecision::Allowed
    }
}

/// Flat monthly cap, useful for free-tier style plans and for tests.
#[derive(Debug, Clone, Copy)]
pub struct MonthlyQuotaGate {
    pub limit: u32,
}

impl SubscriptionGate for MonthlyQuotaGate {
    fn allow_booking(&self, _merchant_id: Uuid, month_count: u64) -> GateDecision {
        if month_count >= u64::from(self.limit) {
            GateDecision::QuotaExceeded { limit: self.limit }
        } else {
            GateDecision::Allowed
        }
    }
}
