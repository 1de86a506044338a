use chrono::{DateTime, Timelike, Utc};

use crate::repository::{AccountStatus, UserAccount};

/// Extensible access predicates. Each is evaluated independently and ALL
/// configured conditions must pass for the permission to be granted.
#[derive(Debug, Clone, PartialEq)]
pub enum AccessCondition {
    /// The account status must be `Active`.
    AccountActive,
    /// The account email must be verified.
    EmailVerified,
    /// The account must be within `days` of its trial start.
    WithinTrialPeriod { days: i64 },
    /// The caller must have an active subscription.
    HasActiveSubscription,
    /// The current UTC hour must be within `[start_hour, end_hour)`.
    TimeOfDay { start_hour: u32, end_hour: u32 },
    /// The request IP must be one of the listed addresses.
    IpWhitelist(Vec<String>),
}

/// Per-request facts the conditions are evaluated against.
#[derive(Debug, Clone, Default)]
pub struct ConditionContext {
    /// Request source IP, if known.
    pub ip: Option<String>,
    /// When the account's trial started, if any.
    pub trial_started_at: Option<DateTime<Utc>>,
    /// Whether the account currently has an active subscription.
    pub has_active_subscription: bool,
    /// Evaluation time; `None` means now.
    pub now: Option<DateTime<Utc>>,
}

impl AccessCondition {
    /// Evaluates this condition for the given account and request context.
    pub fn evaluate(&self, user: &UserAccount, ctx: &ConditionContext) -> bool {
        let now = ctx.now.unwrap_or_else(Utc::now);
        match self {
            AccessCondition::AccountActive => user.status == AccountStatus::Active,
            AccessCondition::EmailVerified => user.email_verified_at.is_some(),
            AccessCondition::WithinTrialPeriod { days } => ctx
                .trial_started_at
                .is_some_and(|start| (now - start).num_days() < *days),
            AccessCondition::HasActiveSubscription => ctx.has_active_subscription,
            AccessCondition::TimeOfDay {
                start_hour,
                end_hour,
            } => {
                let hour = now.hour();
                if start_hour <= end_hour {
                    hour >= *start_hour && hour < *end_hour
                } else {
                    // Window wraps past midnight.
                    hour >= *start_hour || hour < *end_hour
                }
            }
            AccessCondition::IpWhitelist(allowed) => ctx
                .ip
                .as_deref()
                .is_some_and(|ip| allowed.iter().any(|a| a == ip)),
        }
    }

    /// Short identifier for denial logging.
    pub fn name(&self) -> &'static str {
        match self {
            AccessCondition::AccountActive => "account_active",
            AccessCondition::EmailVerified => "email_verified",
            AccessCondition::WithinTrialPeriod { .. } => "within_trial_period",
            AccessCondition::HasActiveSubscription => "has_active_subscription",
            AccessCondition::TimeOfDay { .. } => "time_of_day",
            AccessCondition::IpWhitelist(_) => "ip_whitelist",
        }
    }
}
