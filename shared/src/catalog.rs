//! Program catalogue: type tabs, account-size filter and card text.

use crate::models::{Program, ProgramType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgramTab {
    #[default]
    All,
    Type(ProgramType),
}

impl ProgramTab {
    pub const ALL: [ProgramTab; 4] = [
        ProgramTab::All,
        ProgramTab::Type(ProgramType::OnePhase),
        ProgramTab::Type(ProgramType::TwoPhase),
        ProgramTab::Type(ProgramType::InstantFunding),
    ];

    pub fn parse(raw: &str) -> Option<Self> {
        if raw.trim().eq_ignore_ascii_case("all") {
            return Some(ProgramTab::All);
        }
        ProgramType::parse(raw).map(ProgramTab::Type)
    }

    pub fn label(&self) -> &'static str {
        match self {
            ProgramTab::All => "All Programs",
            ProgramTab::Type(ProgramType::OnePhase) => "One Phase",
            ProgramTab::Type(ProgramType::TwoPhase) => "Two Phase",
            ProgramTab::Type(ProgramType::InstantFunding) => "Instant Funding",
            ProgramTab::Type(ProgramType::Unknown) => "Other",
        }
    }

    pub fn matches(&self, program: &Program) -> bool {
        match self {
            ProgramTab::All => true,
            ProgramTab::Type(kind) => program.program_type == *kind,
        }
    }
}

/// Account sizes offered in the size filter.
pub const ACCOUNT_SIZES: [u64; 5] = [5_000, 10_000, 25_000, 50_000, 100_000];

/// Accepts "50000", "50,000", "$50,000" or "50k".
pub fn parse_account_size(raw: &str) -> Option<u64> {
    let cleaned: String = raw
        .trim()
        .trim_start_matches('$')
        .chars()
        .filter(|c| *c != ',' && *c != '_')
        .collect();
    let lower = cleaned.to_lowercase();
    match lower.strip_suffix('k') {
        Some(thousands) => thousands.parse::<u64>().ok().map(|k| k * 1_000),
        None => lower.parse().ok(),
    }
}

pub fn filter_programs<'a>(
    programs: &'a [Program],
    tab: ProgramTab,
    account_size: Option<u64>,
) -> Vec<&'a Program> {
    programs
        .iter()
        .filter(|p| tab.matches(p))
        .filter(|p| account_size.map_or(true, |size| p.account_size.round() as u64 == size))
        .collect()
}

/// Dollars with thousands separators, cents only when present:
/// `299.0` -> `$299`, `149.99` -> `$149.99`, `50000.0` -> `$50,000`.
pub fn format_usd(amount: f64) -> String {
    let cents = (amount * 100.0).round() as i64;
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    let digits = (cents / 100).to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    match cents % 100 {
        0 => format!("{}${}", sign, grouped),
        rest => format!("{}${}.{:02}", sign, grouped, rest),
    }
}

fn format_percent(value: Option<f64>) -> String {
    match value {
        Some(v) if v.fract() == 0.0 => format!("{}%", v as i64),
        Some(v) => format!("{:.1}%", v),
        None => "-".to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgramCard {
    pub id: i64,
    pub name: String,
    pub type_label: &'static str,
    pub price: String,
    pub account_size: String,
    pub profit_target: String,
    pub max_daily_loss: String,
    pub max_total_loss: String,
    pub profit_split: String,
}

impl From<&Program> for ProgramCard {
    fn from(program: &Program) -> Self {
        ProgramCard {
            id: program.id,
            name: program.name.clone(),
            type_label: program.program_type.label(),
            price: format_usd(program.price),
            account_size: format_usd(program.account_size),
            profit_target: format_percent(program.profit_target),
            max_daily_loss: format_percent(program.max_daily_loss),
            max_total_loss: format_percent(program.max_total_loss),
            profit_split: format_percent(Some(program.profit_split)),
        }
    }
}

pub fn program_cards(
    programs: &[Program],
    tab: ProgramTab,
    account_size: Option<u64>,
) -> Vec<ProgramCard> {
    filter_programs(programs, tab, account_size)
        .into_iter()
        .map(ProgramCard::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn programs() -> Vec<Program> {
        serde_json::from_value(json!([
            {"id": 1, "name": "Starter", "type": "one_phase", "account_size": 10000.0, "price": 99.0,
             "profit_target": 10.0, "max_daily_loss": 5.0, "max_total_loss": 10.0, "profit_split": 80.0},
            {"id": 2, "name": "Pro", "type": "two_phase", "account_size": 50000.0, "price": 299.0,
             "profit_target": 8.0, "max_daily_loss": 5.0, "max_total_loss": 10.0, "profit_split": 85.0},
            {"id": 3, "name": "Instant", "type": "instant", "account_size": 50000.0, "price": 549.0,
             "profit_split": 70.0}
        ]))
        .unwrap()
    }

    #[test]
    fn formats_dollars_with_cents_when_present() {
        assert_eq!(format_usd(299.0), "$299");
        assert_eq!(format_usd(50000.0), "$50,000");
        assert_eq!(format_usd(149.99), "$149.99");
        assert_eq!(format_usd(34.9), "$34.90");
        assert_eq!(format_usd(1_250_000.4), "$1,250,000.40");
        assert_eq!(format_usd(0.0), "$0");
        assert_eq!(format_usd(-1500.5), "-$1,500.50");
    }

    #[test]
    fn card_price_keeps_cents() {
        let program: Program = serde_json::from_value(json!({
            "id": 9, "name": "Lite", "type": "one_phase", "account_size": 5000.0, "price": 149.99
        }))
        .unwrap();
        assert_eq!(ProgramCard::from(&program).price, "$149.99");
    }

    #[test]
    fn tabs_and_sizes_filter() {
        let all = programs();
        assert_eq!(program_cards(&all, ProgramTab::All, None).len(), 3);

        let two_phase = program_cards(&all, ProgramTab::Type(ProgramType::TwoPhase), None);
        assert_eq!(two_phase.len(), 1);
        assert_eq!(two_phase[0].type_label, "2 Phase");
        assert_eq!(two_phase[0].price, "$299");
        assert_eq!(two_phase[0].account_size, "$50,000");

        let fifty_k = program_cards(&all, ProgramTab::All, Some(50_000));
        assert_eq!(fifty_k.iter().map(|c| c.id).collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(fifty_k[1].type_label, "Instant");
        assert_eq!(fifty_k[1].profit_target, "-");
    }

    #[test]
    fn parses_filters() {
        assert_eq!(ProgramTab::parse("ALL"), Some(ProgramTab::All));
        assert_eq!(
            ProgramTab::parse("instant"),
            Some(ProgramTab::Type(ProgramType::InstantFunding))
        );
        assert_eq!(ProgramTab::parse("three_phase"), None);
        assert_eq!(parse_account_size("$50,000"), Some(50_000));
        assert_eq!(parse_account_size("25k"), Some(25_000));
        assert_eq!(parse_account_size("lots"), None);
    }
}
