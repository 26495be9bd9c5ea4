use std::time::Instant;

use shared::catalog::format_usd;
use shared::client::admin::UserQuery;
use shared::stats::kyc_summary;
use shared::{Column, DataTable, KycSubmission, RoleGuard, User};

use super::{api_alert, require};
use crate::state::{AppState, Dialogue, HandlerResult};

pub async fn handle_version(state: &AppState) -> HandlerResult {
    let start_time = Instant::now();
    tracing::info!("Handling /version command");

    let git_hash = option_env!("GIT_HASH").unwrap_or("unknown");
    let git_branch = option_env!("GIT_BRANCH").unwrap_or("unknown");
    let git_tag = option_env!("GIT_TAG").unwrap_or("unknown");
    let target_os = option_env!("TARGET_OS").unwrap_or(std::env::consts::OS);

    // BUILD_TIME is epoch seconds
    let build_time_raw = option_env!("BUILD_TIME").unwrap_or("unknown");
    let build_time_human = if let Ok(epoch) = build_time_raw.parse::<i64>() {
        use chrono::{TimeZone, Utc};
        match Utc.timestamp_opt(epoch, 0).single() {
            Some(dt) => dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            None => build_time_raw.to_string(),
        }
    } else {
        build_time_raw.to_string()
    };

    let version_info = format!(
        "PropTrade console {}\n\
         Git commit: {}\n\
         Branch:     {}\n\
         Tag:        {}\n\
         Built:      {}\n\
         Target:     {}\n\
         API:        {}",
        env!("CARGO_PKG_VERSION"),
        git_hash,
        git_branch,
        git_tag,
        build_time_human,
        target_os,
        state.config.api_base_url
    );

    tracing::info!("Time taken to handle /version command: {:?}", start_time.elapsed());
    Ok(version_info)
}

pub(crate) fn user_table(
    users: Vec<User>,
    page_size: usize,
) -> Result<DataTable<User>, anyhow::Error> {
    let columns = vec![
        Column::field("id", "ID"),
        Column::field("name", "Name"),
        Column::field("email", "Email"),
        Column::field("role", "Role"),
        Column::field("status", "Status"),
        Column::field("kyc_status", "KYC"),
        Column::field("created_at", "Joined"),
    ];
    Ok(DataTable::new(columns, page_size.max(1))?
        .with_empty_message("No users found")
        .with_rows(users))
}

pub(crate) fn kyc_table(
    rows: Vec<KycSubmission>,
    page_size: usize,
) -> Result<DataTable<KycSubmission>, anyhow::Error> {
    let columns = vec![
        Column::field("id", "User"),
        Column::field("name", "Name"),
        Column::field("email", "Email"),
        Column::field("document_type", "Document"),
        Column::field("documents", "Files"),
        Column::field("submitted_at", "Submitted"),
        Column::field("status", "Status"),
    ];
    Ok(DataTable::new(columns, page_size)?
        .with_empty_message("No pending KYC submissions")
        .with_rows(rows))
}

pub async fn handle_users(state: &AppState, dialogue: &mut Dialogue, page: u32) -> HandlerResult {
    let start_time = Instant::now();
    tracing::info!("Handling /admin users command with parameters: page={}", page);

    require(RoleGuard::admin().check(&state.session.snapshot()))?;
    let per_page = state.config.table_page_size as u32;
    let query = UserQuery {
        page: Some(page),
        per_page: Some(per_page),
        ..Default::default()
    };
    let list = state.client().admin().users(&query).await.map_err(api_alert)?;
    let pagination = list.pagination;

    // The server pages this list, so the whole response fits on one table page.
    let page_size = list.users.len();
    let mut text = dialogue.show(Box::new(user_table(list.users, page_size)?), state.color);
    if pagination.pages > 1 {
        text.push_str(&format!(
            "\n{} users | Page {} of {} (/admin users <page>)\n",
            pagination.total, pagination.page, pagination.pages
        ));
    }

    tracing::info!("Time taken to handle /admin users command: {:?}", start_time.elapsed());
    Ok(text)
}

pub async fn handle_stats(state: &AppState) -> HandlerResult {
    let start_time = Instant::now();
    tracing::info!("Handling /admin stats command");

    require(RoleGuard::admin().check(&state.session.snapshot()))?;
    let stats = state.client().admin().dashboard_stats().await.map_err(api_alert)?;

    let mut text = String::new();
    text.push_str(&format!(
        "Users:       {} total, {} active, {} pending KYC, {} suspended\n",
        stats.users.total, stats.users.active, stats.users.pending_kyc, stats.users.suspended
    ));
    text.push_str(&format!(
        "Revenue:     {} total, {} this month, {} per user\n",
        format_usd(stats.revenue.total),
        format_usd(stats.revenue.monthly),
        format_usd(stats.revenue.average_per_user)
    ));
    text.push_str(&format!(
        "Challenges:  {} total, {} active, {} completed, {} failed, {} funded\n",
        stats.challenges.total,
        stats.challenges.active,
        stats.challenges.completed,
        stats.challenges.failed,
        stats.challenges.funded
    ));

    if !stats.recent_users.is_empty() {
        text.push_str("\nRecent users\n");
        for user in &stats.recent_users {
            text.push_str(&format!(
                "  #{} {} <{}> {} {}\n",
                user.id,
                user.name,
                user.email,
                user.role.as_str(),
                user.status
            ));
        }
    }
    if !stats.recent_payments.is_empty() {
        text.push_str("\nRecent payments\n");
        for payment in &stats.recent_payments {
            text.push_str(&format!(
                "  #{} {} {} {}\n",
                payment.id,
                format_usd(payment.amount),
                payment.kind.as_deref().unwrap_or("-"),
                payment.status.as_str()
            ));
        }
    }

    tracing::info!("Time taken to handle /admin stats command: {:?}", start_time.elapsed());
    Ok(text)
}

pub async fn handle_kyc(state: &AppState, dialogue: &mut Dialogue) -> HandlerResult {
    let start_time = Instant::now();
    tracing::info!("Handling /admin kyc command");

    require(RoleGuard::admin().check(&state.session.snapshot()))?;
    let submissions = state.client().admin().pending_kyc().await.map_err(api_alert)?;
    let summary = kyc_summary(&submissions);

    let mut text = format!(
        "Pending: {}  Approved: {}  Rejected: {}\n\n",
        summary.pending, summary.approved, summary.rejected
    );
    let table = kyc_table(submissions, state.config.table_page_size)?;
    text.push_str(&dialogue.show(Box::new(table), state.color));

    tracing::info!("Time taken to handle /admin kyc command: {:?}", start_time.elapsed());
    Ok(text)
}

pub async fn handle_approve_kyc(state: &AppState, user_id: i64) -> HandlerResult {
    let start_time = Instant::now();
    tracing::info!("Handling /admin approve command with parameters: user_id={}", user_id);

    require(RoleGuard::admin().check(&state.session.snapshot()))?;
    let response = state.client().admin().approve_kyc(user_id).await.map_err(api_alert)?;

    tracing::info!("Time taken to handle /admin approve command: {:?}", start_time.elapsed());
    Ok(response.message)
}

pub async fn handle_reject_kyc(state: &AppState, user_id: i64, reason: &str) -> HandlerResult {
    let start_time = Instant::now();
    tracing::info!(
        "Handling /admin reject command with parameters: user_id={}, reason={}",
        user_id,
        reason
    );

    require(RoleGuard::admin().check(&state.session.snapshot()))?;
    let response = state
        .client()
        .admin()
        .reject_kyc(user_id, reason, None)
        .await
        .map_err(api_alert)?;

    tracing::info!("Time taken to handle /admin reject command: {:?}", start_time.elapsed());
    Ok(response.message)
}
