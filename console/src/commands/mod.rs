use std::str::FromStr;
use std::time::Instant;

use anyhow::{anyhow, bail, Result};
use shared::catalog::{parse_account_size, ProgramTab};
use shared::routing::LOGIN_ROUTE;
use shared::stats::CommissionPeriod;
use shared::{ApiError, AuthError, RouteDecision};

use crate::state::{AppState, Dialogue, HandlerResult};

pub mod admin;
pub mod agent;
pub mod auth;
pub mod trader;

pub use admin::{handle_approve_kyc, handle_kyc, handle_reject_kyc, handle_stats, handle_users, handle_version};
pub use agent::{handle_commissions, handle_traders};
pub use auth::{handle_login, handle_logout, handle_me, handle_otp};
pub use trader::{handle_challenges, handle_dashboard, handle_pay, handle_programs, handle_purchase};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Version,
    Login { email: String, password: String },
    Otp(String),
    Logout,
    Me,
    Dashboard,
    Programs { tab: ProgramTab, size: Option<u64> },
    Challenges,
    Purchase(i64),
    Pay(i64),
    Commissions(CommissionPeriod),
    Traders,
    AdminUsers { page: u32 },
    AdminStats,
    AdminKyc,
    ApproveKyc(i64),
    RejectKyc { user_id: i64, reason: String },
    Next,
    Prev,
    Quit,
}

fn id_arg(raw: Option<&str>, usage: &str) -> Result<i64> {
    raw.and_then(|s| s.parse().ok())
        .ok_or_else(|| anyhow!("Usage: {}", usage))
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let mut parts = line.split_whitespace();
        let Some(name) = parts.next() else {
            bail!("Type /help to see the available commands");
        };
        let args: Vec<&str> = parts.collect();

        let command = match name.to_lowercase().as_str() {
            "/help" | "/start" => Command::Help,
            "/version" => Command::Version,
            "/login" => match args.as_slice() {
                [email, password] => Command::Login {
                    email: email.to_string(),
                    password: password.to_string(),
                },
                _ => bail!("Usage: /login <email> <password>"),
            },
            "/otp" => match args.as_slice() {
                [code] => Command::Otp(code.to_string()),
                _ => bail!("Usage: /otp <code>"),
            },
            "/logout" => Command::Logout,
            "/me" => Command::Me,
            "/dashboard" => Command::Dashboard,
            "/programs" => {
                let tab = match args.first() {
                    Some(raw) => ProgramTab::parse(raw).ok_or_else(|| {
                        anyhow!("Unknown program type {}, try all, one_phase, two_phase or instant", raw)
                    })?,
                    None => ProgramTab::All,
                };
                let size = match args.get(1) {
                    Some(raw) => Some(
                        parse_account_size(raw).ok_or_else(|| anyhow!("Invalid account size {}", raw))?,
                    ),
                    None => None,
                };
                Command::Programs { tab, size }
            }
            "/challenges" => Command::Challenges,
            "/purchase" => Command::Purchase(id_arg(args.first().copied(), "/purchase <program_id>")?),
            "/pay" => Command::Pay(id_arg(args.first().copied(), "/pay <challenge_id>")?),
            "/commissions" => match args.first() {
                Some(raw) => Command::Commissions(CommissionPeriod::parse(raw).ok_or_else(|| {
                    anyhow!("Unknown period {}, try all, this_month, last_month or this_year", raw)
                })?),
                None => Command::Commissions(CommissionPeriod::All),
            },
            "/traders" => Command::Traders,
            "/admin" => match args.as_slice() {
                ["users"] => Command::AdminUsers { page: 1 },
                ["users", page] => Command::AdminUsers {
                    page: page
                        .parse()
                        .ok()
                        .filter(|p| *p > 0)
                        .ok_or_else(|| anyhow!("Usage: /admin users [page]"))?,
                },
                ["stats"] => Command::AdminStats,
                ["kyc"] => Command::AdminKyc,
                ["approve", id] => Command::ApproveKyc(id_arg(Some(id), "/admin approve <user_id>")?),
                ["reject", id, reason @ ..] if !reason.is_empty() => Command::RejectKyc {
                    user_id: id_arg(Some(id), "/admin reject <user_id> <reason>")?,
                    reason: reason.join(" "),
                },
                _ => bail!("Usage: /admin users [page] | stats | kyc | approve <user_id> | reject <user_id> <reason>"),
            },
            "/next" => Command::Next,
            "/prev" => Command::Prev,
            "/quit" | "/exit" => Command::Quit,
            other => bail!("Unknown command {}. Type /help to see the available commands", other),
        };
        Ok(command)
    }
}

/// Turn a route decision into an alert when the page may not be shown.
pub(crate) fn require(decision: RouteDecision) -> Result<()> {
    match decision {
        RouteDecision::Render => Ok(()),
        RouteDecision::Loading => bail!("Session is still loading, try again"),
        RouteDecision::Redirect(route) if route == LOGIN_ROUTE => {
            bail!("Please log in first: /login <email> <password>")
        }
        RouteDecision::Redirect(_) => bail!("You do not have access to this page"),
    }
}

pub(crate) fn api_alert(err: ApiError) -> anyhow::Error {
    anyhow!(err.message())
}

pub(crate) fn auth_alert(err: AuthError) -> anyhow::Error {
    anyhow!(err.message)
}

pub async fn dispatch(
    state: &AppState,
    dialogue: &mut Dialogue,
    command: Command,
) -> HandlerResult {
    let start_time = Instant::now();
    tracing::debug!("Dispatching {:?}", command);

    let result = match command {
        Command::Help => handle_help(),
        Command::Version => handle_version(state).await,
        Command::Login { email, password } => handle_login(state, dialogue, &email, &password).await,
        Command::Otp(code) => handle_otp(state, dialogue, &code).await,
        Command::Logout => handle_logout(state, dialogue).await,
        Command::Me => handle_me(state).await,
        Command::Dashboard => handle_dashboard(state, dialogue).await,
        Command::Programs { tab, size } => handle_programs(state, tab, size).await,
        Command::Challenges => handle_challenges(state, dialogue).await,
        Command::Purchase(program_id) => handle_purchase(state, program_id).await,
        Command::Pay(challenge_id) => handle_pay(state, challenge_id).await,
        Command::Commissions(period) => handle_commissions(state, dialogue, period).await,
        Command::Traders => handle_traders(state, dialogue).await,
        Command::AdminUsers { page } => handle_users(state, dialogue, page).await,
        Command::AdminStats => handle_stats(state).await,
        Command::AdminKyc => handle_kyc(state, dialogue).await,
        Command::ApproveKyc(user_id) => handle_approve_kyc(state, user_id).await,
        Command::RejectKyc { user_id, reason } => handle_reject_kyc(state, user_id, &reason).await,
        Command::Next | Command::Prev => handle_paging(state, dialogue, command == Command::Next),
        Command::Quit => Ok(String::new()),
    };

    tracing::debug!("Command handled in {:?}", start_time.elapsed());
    result
}

pub fn handle_help() -> HandlerResult {
    let mut help_text = String::from("PropTrade console\n\n");
    for (command, description) in [
        ("/login <email> <password>", "Sign in"),
        ("/otp <code>", "Finish a two-factor sign in"),
        ("/logout", "Sign out"),
        ("/me", "Show your profile"),
        ("/dashboard", "Open the dashboard for your role"),
        ("/programs [type] [size]", "Browse programs (all, one_phase, two_phase, instant)"),
        ("/challenges", "List your challenges"),
        ("/purchase <program_id>", "Start a challenge"),
        ("/pay <challenge_id>", "Pay for a pending challenge"),
        ("/commissions [period]", "Agent commissions (all, this_month, last_month, this_year)"),
        ("/traders", "Traders referred by you"),
        ("/admin users [page]", "Manage users"),
        ("/admin stats", "Platform statistics"),
        ("/admin kyc", "Pending KYC submissions"),
        ("/admin approve <user_id>", "Approve a KYC submission"),
        ("/admin reject <user_id> <reason>", "Reject a KYC submission"),
        ("/next, /prev", "Page through the last table"),
        ("/version", "Build information"),
        ("/quit", "Exit"),
    ] {
        help_text.push_str(&format!("{:<36} {}\n", command, description));
    }
    Ok(help_text)
}

fn handle_paging(state: &AppState, dialogue: &mut Dialogue, forward: bool) -> HandlerResult {
    let Some(pager) = dialogue.pager.as_mut() else {
        bail!("Nothing to page through");
    };
    if forward {
        pager.next();
    } else {
        pager.previous();
    }
    Ok(pager.render(state.color))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::ProgramType;

    #[test]
    fn parses_commands_with_arguments() {
        assert_eq!(
            "/login jane@example.com s3cret".parse::<Command>().unwrap(),
            Command::Login {
                email: "jane@example.com".into(),
                password: "s3cret".into()
            }
        );
        assert_eq!(
            "/programs two_phase $50,000".parse::<Command>().unwrap(),
            Command::Programs {
                tab: ProgramTab::Type(ProgramType::TwoPhase),
                size: Some(50_000)
            }
        );
        assert_eq!(
            "/commissions last_month".parse::<Command>().unwrap(),
            Command::Commissions(CommissionPeriod::LastMonth)
        );
        assert_eq!(
            "/admin users 3".parse::<Command>().unwrap(),
            Command::AdminUsers { page: 3 }
        );
        assert_eq!(
            "/admin reject 12 blurry id photo".parse::<Command>().unwrap(),
            Command::RejectKyc {
                user_id: 12,
                reason: "blurry id photo".into()
            }
        );
        assert_eq!("/NEXT".parse::<Command>().unwrap(), Command::Next);
    }

    #[test]
    fn rejects_bad_input() {
        assert!("/login only-email".parse::<Command>().is_err());
        assert!("/purchase abc".parse::<Command>().is_err());
        assert!("/admin users 0".parse::<Command>().is_err());
        assert!("/admin reject 12".parse::<Command>().is_err());
        assert!("/programs three_phase".parse::<Command>().is_err());
        let err = "/frobnicate".parse::<Command>().unwrap_err();
        assert!(err.to_string().contains("Unknown command /frobnicate"));
    }

    #[test]
    fn guard_messages() {
        assert!(require(RouteDecision::Render).is_ok());
        let err = require(RouteDecision::Redirect("/login")).unwrap_err();
        assert!(err.to_string().contains("log in"));
        let err = require(RouteDecision::Redirect("/dashboard")).unwrap_err();
        assert_eq!(err.to_string(), "You do not have access to this page");
    }

    #[test]
    fn help_lists_every_command() {
        let help = handle_help().unwrap();
        for command in ["/login", "/otp", "/programs", "/admin kyc", "/next", "/quit"] {
            assert!(help.contains(command), "missing {}", command);
        }
    }
}
