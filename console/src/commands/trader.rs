use std::time::Instant;

use anyhow::bail;
use shared::catalog::{format_usd, program_cards, ProgramCard, ProgramTab};
use shared::client::programs::ProgramFilter;
use shared::routing::{ADMIN_ROUTE, AGENT_ROUTE};
use shared::stats::challenge_summary;
use shared::{dashboard_for, protected_route, Challenge, Column, DataTable};

use super::{admin, agent, api_alert, require};
use crate::state::{AppState, Dialogue, HandlerResult};

pub(crate) fn challenge_table(
    challenges: Vec<Challenge>,
    page_size: usize,
) -> Result<DataTable<Challenge>, anyhow::Error> {
    let columns = vec![
        Column::field("id", "ID"),
        Column::field("program", "Program"),
        Column::field("account_number", "Account"),
        Column::field("status", "Status"),
        Column::field("phase", "Phase"),
        Column::field("progress", "Progress"),
        Column::render("current_balance", "Balance", |c: &Challenge| {
            c.current_balance.map(format_usd).unwrap_or_else(|| "-".to_string())
        }),
        Column::field("payment_status", "Payment"),
    ];
    Ok(DataTable::new(columns, page_size)?
        .with_empty_message("You have no challenges yet. Browse /programs to start one.")
        .with_rows(challenges))
}

fn render_card(card: &ProgramCard) -> String {
    format!(
        "#{} {} [{}]\n  {} account for {}\n  Target {} | Daily loss {} | Max loss {} | Split {}\n",
        card.id,
        card.name,
        card.type_label,
        card.account_size,
        card.price,
        card.profit_target,
        card.max_daily_loss,
        card.max_total_loss,
        card.profit_split
    )
}

pub async fn handle_dashboard(state: &AppState, dialogue: &mut Dialogue) -> HandlerResult {
    let start_time = Instant::now();
    tracing::info!("Handling /dashboard command");

    let snapshot = state.session.snapshot();
    require(protected_route(&snapshot))?;

    let reply = match dashboard_for(snapshot.user.as_ref()) {
        ADMIN_ROUTE => admin::handle_stats(state).await,
        AGENT_ROUTE => agent::handle_commissions(state, dialogue, Default::default()).await,
        _ => handle_challenges(state, dialogue).await,
    };

    tracing::info!("Time taken to handle /dashboard command: {:?}", start_time.elapsed());
    reply
}

pub async fn handle_programs(
    state: &AppState,
    tab: ProgramTab,
    size: Option<u64>,
) -> HandlerResult {
    let start_time = Instant::now();
    tracing::info!(
        "Handling /programs command with parameters: tab={}, size={:?}",
        tab.label(),
        size
    );

    let programs = state
        .client()
        .programs()
        .list(&ProgramFilter::default())
        .await
        .map_err(api_alert)?;
    let cards = program_cards(&programs, tab, size);

    let mut text = String::new();
    let tabs: Vec<String> = ProgramTab::ALL
        .iter()
        .map(|t| if *t == tab { format!("[{}]", t.label()) } else { t.label().to_string() })
        .collect();
    text.push_str(&tabs.join("  "));
    text.push_str("\n\n");
    if cards.is_empty() {
        text.push_str("No programs match these filters.\n");
    }
    for card in &cards {
        text.push_str(&render_card(card));
    }
    if !cards.is_empty() {
        text.push_str("\nStart a challenge with /purchase <program_id>\n");
    }

    tracing::info!("Time taken to handle /programs command: {:?}", start_time.elapsed());
    Ok(text)
}

pub async fn handle_challenges(state: &AppState, dialogue: &mut Dialogue) -> HandlerResult {
    let start_time = Instant::now();
    tracing::info!("Handling /challenges command");

    require(protected_route(&state.session.snapshot()))?;
    let challenges = state.client().programs().my_challenges().await.map_err(api_alert)?;
    let summary = challenge_summary(&challenges);

    let mut text = format!(
        "Active: {}  Total profit: {}  Success rate: {}%  Funded: {}\n\n",
        summary.active,
        format_usd(summary.total_profit),
        summary.success_rate,
        summary.funded
    );
    let table = challenge_table(challenges, state.config.table_page_size)?;
    text.push_str(&dialogue.show(Box::new(table), state.color));

    tracing::info!("Time taken to handle /challenges command: {:?}", start_time.elapsed());
    Ok(text)
}

pub async fn handle_purchase(state: &AppState, program_id: i64) -> HandlerResult {
    let start_time = Instant::now();
    tracing::info!("Handling /purchase command with parameters: program_id={}", program_id);

    require(protected_route(&state.session.snapshot()))?;
    let receipt = state
        .client()
        .programs()
        .purchase(program_id, &[])
        .await
        .map_err(api_alert)?;

    let mut text = format!(
        "{}\nChallenge #{} created, total {}.",
        receipt.message,
        receipt.challenge.id,
        format_usd(receipt.total_price)
    );
    if receipt.payment_required {
        text.push_str(&format!("\nPay with /pay {}", receipt.challenge.id));
    }

    tracing::info!("Time taken to handle /purchase command: {:?}", start_time.elapsed());
    Ok(text)
}

pub async fn handle_pay(state: &AppState, challenge_id: i64) -> HandlerResult {
    let start_time = Instant::now();
    tracing::info!("Handling /pay command with parameters: challenge_id={}", challenge_id);

    require(protected_route(&state.session.snapshot()))?;
    let payments = state.client().payments();
    let intent = payments
        .create_payment_intent(challenge_id)
        .await
        .map_err(api_alert)?;
    tracing::info!(
        "Created payment intent {} for challenge {}",
        intent.payment_intent_id,
        challenge_id
    );

    let confirmation = payments
        .confirm_payment(&intent.payment_intent_id)
        .await
        .map_err(api_alert)?;
    if confirmation.status.as_deref().is_some_and(|s| s != "succeeded" && s != "completed") {
        bail!(
            "Payment {} is {}",
            intent.payment_intent_id,
            confirmation.status.as_deref().unwrap_or("unknown")
        );
    }

    tracing::info!("Time taken to handle /pay command: {:?}", start_time.elapsed());
    Ok(format!(
        "{}\nPaid {} {} for challenge #{}.",
        confirmation.message,
        format_usd(intent.amount),
        intent.currency.to_uppercase(),
        challenge_id
    ))
}
