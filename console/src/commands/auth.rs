use std::time::Instant;

use anyhow::bail;
use shared::{dashboard_for, protected_route, public_route, LoginOutcome, RouteDecision, User};

use super::{api_alert, auth_alert, require};
use crate::state::{AppState, ConsoleState, Dialogue, HandlerResult};

fn welcome(user: &User) -> String {
    format!(
        "Welcome back, {}! Signed in as {}. Type /dashboard to continue ({}).",
        user.full_name(),
        user.role.as_str(),
        dashboard_for(Some(user))
    )
}

pub async fn handle_login(
    state: &AppState,
    dialogue: &mut Dialogue,
    email: &str,
    password: &str,
) -> HandlerResult {
    let start_time = Instant::now();
    tracing::info!("Handling /login command with parameters: email={}", email);

    if let RouteDecision::Redirect(_) = public_route(&state.session.snapshot()) {
        bail!("Already signed in. Use /logout first");
    }

    let reply = match state.session.login(email, password).await.map_err(auth_alert)? {
        LoginOutcome::TwoFactorRequired { user_id } => {
            dialogue.state = ConsoleState::AwaitingOtp { user_id };
            "Two-factor authentication is enabled. Enter the code from your authenticator app: /otp <code>".to_string()
        }
        LoginOutcome::Authenticated(user) => {
            dialogue.reset();
            welcome(&user)
        }
    };

    tracing::info!("Time taken to handle /login command: {:?}", start_time.elapsed());
    Ok(reply)
}

pub async fn handle_otp(state: &AppState, dialogue: &mut Dialogue, code: &str) -> HandlerResult {
    let start_time = Instant::now();
    let ConsoleState::AwaitingOtp { user_id } = dialogue.state else {
        bail!("No sign in is waiting for a code. Start with /login <email> <password>");
    };
    tracing::info!("Handling /otp command with parameters: user_id={}", user_id);

    // A wrong code keeps the prompt open so the user can retry.
    let user = state.session.login_2fa(user_id, code.trim()).await.map_err(auth_alert)?;
    dialogue.reset();

    tracing::info!("Time taken to handle /otp command: {:?}", start_time.elapsed());
    Ok(welcome(&user))
}

pub async fn handle_logout(state: &AppState, dialogue: &mut Dialogue) -> HandlerResult {
    let start_time = Instant::now();
    tracing::info!("Handling /logout command");

    state.session.logout().await;
    dialogue.reset();

    tracing::info!("Time taken to handle /logout command: {:?}", start_time.elapsed());
    Ok("Signed out.".to_string())
}

pub async fn handle_me(state: &AppState) -> HandlerResult {
    let start_time = Instant::now();
    tracing::info!("Handling /me command");

    require(protected_route(&state.session.snapshot()))?;
    let user = state.client().auth().me().await.map_err(api_alert)?;
    state.session.update_user(user.clone());

    let mut text = String::new();
    text.push_str(&format!("Name:        {}\n", user.full_name()));
    text.push_str(&format!("Email:       {}\n", user.email));
    text.push_str(&format!("Role:        {}\n", user.role.as_str()));
    text.push_str(&format!("KYC:         {}\n", user.kyc_status.as_str()));
    text.push_str(&format!("Verified:    {}\n", if user.is_verified { "yes" } else { "no" }));
    text.push_str(&format!(
        "Two-factor:  {}\n",
        if user.two_factor_enabled { "enabled" } else { "disabled" }
    ));
    if let Some(phone) = &user.phone {
        text.push_str(&format!("Phone:       {}\n", phone));
    }
    if let Some(joined) = user.created_at {
        text.push_str(&format!("Joined:      {}\n", joined.format("%Y-%m-%d")));
    }

    tracing::info!("Time taken to handle /me command: {:?}", start_time.elapsed());
    Ok(text)
}
