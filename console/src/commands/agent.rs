use std::time::Instant;

use chrono::Utc;
use shared::catalog::format_usd;
use shared::stats::{commission_summary, filter_commissions, trader_summary, CommissionPeriod};
use shared::{AgentTrader, Column, Commission, DataTable, RoleGuard};

use super::{api_alert, require};
use crate::state::{AppState, Dialogue, HandlerResult};

pub(crate) fn commission_table(
    rows: Vec<Commission>,
    page_size: usize,
) -> Result<DataTable<Commission>, anyhow::Error> {
    let columns = vec![
        Column::field("date", "Date"),
        Column::field("trader", "Trader"),
        Column::field("type", "Type"),
        Column::field("program", "Program"),
        Column::field("rate", "Rate"),
        Column::render("amount", "Amount", |c: &Commission| format_usd(c.amount)),
        Column::field("status", "Status"),
        Column::field("payout_date", "Payout"),
    ];
    Ok(DataTable::new(columns, page_size)?
        .with_empty_message("No commissions for this period")
        .with_rows(rows))
}

pub(crate) fn trader_table(
    rows: Vec<AgentTrader>,
    page_size: usize,
) -> Result<DataTable<AgentTrader>, anyhow::Error> {
    let columns = vec![
        Column::field("name", "Trader"),
        Column::field("email", "Email"),
        Column::field("status", "Status"),
        Column::render("current_balance", "Balance", |t: &AgentTrader| format_usd(t.current_balance)),
        Column::render("profit_loss", "P/L", |t: &AgentTrader| format_usd(t.profit_loss)),
        Column::field("total_trades", "Trades"),
        Column::field("win_rate", "Win rate"),
    ];
    Ok(DataTable::new(columns, page_size)?
        .with_empty_message("No referred traders yet")
        .with_rows(rows))
}

pub async fn handle_commissions(
    state: &AppState,
    dialogue: &mut Dialogue,
    period: CommissionPeriod,
) -> HandlerResult {
    let start_time = Instant::now();
    tracing::info!("Handling /commissions command with parameters: period={}", period.as_str());

    require(RoleGuard::agent().check(&state.session.snapshot()))?;
    let commissions = state.client().agent().commissions(period).await.map_err(api_alert)?;

    let now = Utc::now();
    // Cards summarise everything; the table follows the period filter.
    let summary = commission_summary(&commissions, now);
    let rows = filter_commissions(&commissions, period, now);

    let mut text = format!(
        "Total earned: {}  Pending: {}  Paid out: {}  This month: {}\n\n",
        format_usd(summary.total_earned),
        format_usd(summary.pending),
        format_usd(summary.paid_out),
        format_usd(summary.this_month)
    );
    let table = commission_table(rows, state.config.table_page_size)?;
    text.push_str(&dialogue.show(Box::new(table), state.color));

    tracing::info!("Time taken to handle /commissions command: {:?}", start_time.elapsed());
    Ok(text)
}

pub async fn handle_traders(state: &AppState, dialogue: &mut Dialogue) -> HandlerResult {
    let start_time = Instant::now();
    tracing::info!("Handling /traders command");

    require(RoleGuard::agent().check(&state.session.snapshot()))?;
    let traders = state.client().agent().traders().await.map_err(api_alert)?;
    let summary = trader_summary(&traders);

    let mut text = format!(
        "Traders: {}  Active: {}  Funded: {}  Avg win rate: {:.1}%\n\n",
        summary.total, summary.active, summary.funded, summary.average_win_rate
    );
    let table = trader_table(traders, state.config.table_page_size)?;
    text.push_str(&dialogue.show(Box::new(table), state.color));

    tracing::info!("Time taken to handle /traders command: {:?}", start_time.elapsed());
    Ok(text)
}
