//! Subscription validity window computation
//!
//! Pure date arithmetic. The end date of a subscription is derived here and
//! nowhere else; callers persist the result verbatim.

use medialog_shared::{BillingCycle, Plan, Subscription, SubscriptionStatus};
use time::{util, Date, Duration, Month};

use crate::error::{BillingError, BillingResult};

/// Trial length when the plan leaves it unset.
pub const DEFAULT_TRIAL_DAYS: i64 = 7;

/// Compute the validity window for a plan starting at `start`.
///
/// - monthly: +1 calendar month, clamping end-of-month dates
///   (Jan 31 -> Feb 28/29)
/// - yearly: +1 calendar year (Feb 29 clamps to Feb 28)
/// - trial: +trial_days, defaulting to [`DEFAULT_TRIAL_DAYS`] when the plan
///   leaves it unset or non-positive
pub fn compute_new_window(plan: &Plan, start: Date) -> BillingResult<(Date, Date)> {
    let end = match plan.billing_cycle {
        BillingCycle::Monthly => add_calendar_months(start, 1)?,
        BillingCycle::Yearly => add_calendar_years(start, 1)?,
        BillingCycle::Trial => {
            let days = plan
                .trial_days
                .filter(|d| *d > 0)
                .unwrap_or(DEFAULT_TRIAL_DAYS);
            start
                .checked_add(Duration::days(days))
                .ok_or_else(|| BillingError::InvalidPlan(format!("trial_days {days} overflows")))?
        }
    };
    Ok((start, end))
}

/// Where a new window starts: an active subscription that has not yet lapsed
/// extends from its current end date, everything else starts today.
pub fn activation_start(subscription: &Subscription, today: Date) -> Date {
    if subscription.status == SubscriptionStatus::Active && subscription.end_date >= today {
        subscription.end_date
    } else {
        today
    }
}

fn add_calendar_months(date: Date, months: u8) -> BillingResult<Date> {
    let zero_based = date.month() as i32 - 1 + months as i32;
    let year = date.year() + zero_based.div_euclid(12);
    let month = Month::January.nth_next(zero_based.rem_euclid(12) as u8);
    let day = date.day().min(util::days_in_year_month(year, month));
    Date::from_calendar_date(year, month, day).map_err(|e| BillingError::Internal(e.to_string()))
}

fn add_calendar_years(date: Date, years: i32) -> BillingResult<Date> {
    let year = date.year() + years;
    let day = date.day().min(util::days_in_year_month(year, date.month()));
    Date::from_calendar_date(year, date.month(), day)
        .map_err(|e| BillingError::Internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn plan(cycle: BillingCycle, trial_days: Option<i64>) -> Plan {
        Plan {
            id: "plan1".into(),
            name: "Premium".into(),
            price: 14_900,
            billing_cycle: cycle,
            trial_days,
        }
    }

    #[test]
    fn monthly_mid_month() {
        let (start, end) =
            compute_new_window(&plan(BillingCycle::Monthly, None), date!(2024 - 01 - 15)).unwrap();
        assert_eq!(start, date!(2024 - 01 - 15));
        assert_eq!(end, date!(2024 - 02 - 15));
    }

    #[test]
    fn monthly_clamps_to_leap_february() {
        let (_, end) =
            compute_new_window(&plan(BillingCycle::Monthly, None), date!(2024 - 01 - 31)).unwrap();
        assert_eq!(end, date!(2024 - 02 - 29));
    }

    #[test]
    fn monthly_clamps_to_short_february() {
        let (_, end) =
            compute_new_window(&plan(BillingCycle::Monthly, None), date!(2023 - 01 - 31)).unwrap();
        assert_eq!(end, date!(2023 - 02 - 28));
    }

    #[test]
    fn monthly_crosses_year_boundary() {
        let (_, end) =
            compute_new_window(&plan(BillingCycle::Monthly, None), date!(2024 - 12 - 31)).unwrap();
        assert_eq!(end, date!(2025 - 01 - 31));
    }

    #[test]
    fn yearly_plain() {
        let (_, end) =
            compute_new_window(&plan(BillingCycle::Yearly, None), date!(2024 - 03 - 10)).unwrap();
        assert_eq!(end, date!(2025 - 03 - 10));
    }

    #[test]
    fn yearly_clamps_leap_day() {
        let (_, end) =
            compute_new_window(&plan(BillingCycle::Yearly, None), date!(2024 - 02 - 29)).unwrap();
        assert_eq!(end, date!(2025 - 02 - 28));
    }

    #[test]
    fn trial_uses_plan_days() {
        let (_, end) =
            compute_new_window(&plan(BillingCycle::Trial, Some(14)), date!(2024 - 01 - 15)).unwrap();
        assert_eq!(end, date!(2024 - 01 - 29));
    }

    #[test]
    fn trial_defaults_to_seven_days() {
        let (_, end) =
            compute_new_window(&plan(BillingCycle::Trial, None), date!(2024 - 01 - 15)).unwrap();
        assert_eq!(end, date!(2024 - 01 - 22));

        // Non-positive trial_days must not produce an empty window.
        let (_, end) =
            compute_new_window(&plan(BillingCycle::Trial, Some(0)), date!(2024 - 01 - 15)).unwrap();
        assert_eq!(end, date!(2024 - 01 - 22));
    }

    #[test]
    fn active_subscription_extends_from_its_end_date() {
        let sub = Subscription {
            id: "s1".into(),
            user_id: "u1".into(),
            plan_id: "plan1".into(),
            status: SubscriptionStatus::Active,
            start_date: date!(2024 - 01 - 01),
            end_date: date!(2024 - 02 - 01),
            admin_notes: None,
        };
        assert_eq!(
            activation_start(&sub, date!(2024 - 01 - 20)),
            date!(2024 - 02 - 01)
        );
    }

    #[test]
    fn lapsed_or_inactive_subscription_starts_today() {
        let mut sub = Subscription {
            id: "s1".into(),
            user_id: "u1".into(),
            plan_id: "plan1".into(),
            status: SubscriptionStatus::Active,
            start_date: date!(2023 - 12 - 01),
            end_date: date!(2024 - 01 - 01),
            admin_notes: None,
        };
        // Lapsed: end date in the past.
        assert_eq!(
            activation_start(&sub, date!(2024 - 01 - 20)),
            date!(2024 - 01 - 20)
        );
        // Trial status never extends.
        sub.status = SubscriptionStatus::Trial;
        sub.end_date = date!(2024 - 02 - 01);
        assert_eq!(
            activation_start(&sub, date!(2024 - 01 - 20)),
            date!(2024 - 01 - 20)
        );
    }
}
