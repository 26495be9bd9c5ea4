//! Summary figures shown above the dashboard tables.

use chrono::{DateTime, Datelike, Months, Utc};

use crate::models::{
    AgentTrader, Challenge, ChallengeStatus, Commission, CommissionStatus, KycStatus,
    KycSubmission, Payment, PaymentStatus,
};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ChallengeSummary {
    pub active: usize,
    pub total_profit: f64,
    /// Whole percent of challenges that passed.
    pub success_rate: u32,
    pub funded: usize,
}

pub fn challenge_summary(challenges: &[Challenge]) -> ChallengeSummary {
    let count = |status: ChallengeStatus| challenges.iter().filter(|c| c.status == status).count();

    let success_rate = if challenges.is_empty() {
        0
    } else {
        let passed = count(ChallengeStatus::Passed) as f64;
        (passed / challenges.len() as f64 * 100.0).round() as u32
    };

    ChallengeSummary {
        active: count(ChallengeStatus::Active),
        total_profit: challenges.iter().map(|c| c.total_profit.unwrap_or(0.0)).sum(),
        success_rate,
        funded: count(ChallengeStatus::Funded),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommissionPeriod {
    #[default]
    All,
    ThisMonth,
    LastMonth,
    ThisYear,
}

impl CommissionPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommissionPeriod::All => "all",
            CommissionPeriod::ThisMonth => "this_month",
            CommissionPeriod::LastMonth => "last_month",
            CommissionPeriod::ThisYear => "this_year",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "all" => Some(CommissionPeriod::All),
            "this_month" | "month" => Some(CommissionPeriod::ThisMonth),
            "last_month" => Some(CommissionPeriod::LastMonth),
            "this_year" | "year" => Some(CommissionPeriod::ThisYear),
            _ => None,
        }
    }

    /// Whether `date` falls in the period relative to `now`. Undated entries only match `All`.
    pub fn contains(&self, date: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        let Some(date) = date else {
            return *self == CommissionPeriod::All;
        };
        match self {
            CommissionPeriod::All => true,
            CommissionPeriod::ThisMonth => same_month(date, now),
            CommissionPeriod::LastMonth => now
                .checked_sub_months(Months::new(1))
                .map(|last| same_month(date, last))
                .unwrap_or(false),
            CommissionPeriod::ThisYear => date.year() == now.year(),
        }
    }
}

fn same_month(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

pub fn filter_commissions(
    commissions: &[Commission],
    period: CommissionPeriod,
    now: DateTime<Utc>,
) -> Vec<Commission> {
    commissions
        .iter()
        .filter(|c| period.contains(c.date, now))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CommissionSummary {
    pub total_earned: f64,
    pub pending: f64,
    pub paid_out: f64,
    pub this_month: f64,
}

pub fn commission_summary(commissions: &[Commission], now: DateTime<Utc>) -> CommissionSummary {
    commissions
        .iter()
        .fold(CommissionSummary::default(), |mut summary, c| {
            match c.status {
                CommissionStatus::Paid => {
                    summary.total_earned += c.amount;
                    summary.paid_out += c.amount;
                }
                CommissionStatus::Pending => summary.pending += c.amount,
                _ => {}
            }
            if CommissionPeriod::ThisMonth.contains(c.date, now) {
                summary.this_month += c.amount;
            }
            summary
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PaymentSummary {
    pub total_revenue: f64,
    pub completed: usize,
    pub pending: usize,
    pub failed: usize,
    pub refunded: usize,
}

pub fn payment_summary(payments: &[Payment]) -> PaymentSummary {
    payments
        .iter()
        .fold(PaymentSummary::default(), |mut summary, p| {
            match p.status {
                PaymentStatus::Completed => {
                    summary.completed += 1;
                    summary.total_revenue += p.amount;
                }
                PaymentStatus::Pending => summary.pending += 1,
                PaymentStatus::Failed => summary.failed += 1,
                PaymentStatus::Refunded => summary.refunded += 1,
                PaymentStatus::Unknown => {}
            }
            summary
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KycSummary {
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
}

pub fn kyc_summary(submissions: &[KycSubmission]) -> KycSummary {
    let count = |status: KycStatus| submissions.iter().filter(|s| s.status == status).count();
    KycSummary {
        pending: count(KycStatus::Pending),
        approved: count(KycStatus::Approved),
        rejected: count(KycStatus::Rejected),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TraderSummary {
    pub total: usize,
    pub active: usize,
    pub funded: usize,
    pub average_win_rate: f64,
}

pub fn trader_summary(traders: &[AgentTrader]) -> TraderSummary {
    let count = |status: ChallengeStatus| traders.iter().filter(|t| t.status == status).count();
    let average_win_rate = if traders.is_empty() {
        0.0
    } else {
        traders.iter().map(|t| t.win_rate).sum::<f64>() / traders.len() as f64
    };
    TraderSummary {
        total: traders.len(),
        active: count(ChallengeStatus::Active),
        funded: count(ChallengeStatus::Funded),
        average_win_rate,
    }
}
