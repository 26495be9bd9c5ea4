use std::sync::Arc;
use std::time::Duration;

use api::store::{DEMO_2FA_TRADER, DEMO_ADMIN, DEMO_AGENT, DEMO_TOTP_SECRET, DEMO_TRADER};
use api::{SandboxState, Store};
use serde_json::{json, Value};
use shared::client::admin::{AdminUserInput, UserQuery};
use shared::client::auth::RegisterRequest;
use shared::client::profile::ProfileUpdate;
use shared::client::programs::AddonInput;
use shared::client::uploads::Upload;
use shared::client::IDEMPOTENCY_HEADER;
use shared::routing::LOGIN_ROUTE;
use shared::stats::CommissionPeriod;
use shared::{
    ApiClient, ApiError, ChallengeStatus, CommissionType, Config, LoginOutcome, MemoryTokenStore,
    Role, SessionEvent, SessionStore,
};

struct Harness {
    state: SandboxState,
    base: String,
    session: Arc<SessionStore>,
}

impl Harness {
    async fn start() -> Self {
        let state = SandboxState::with_store(Store::seeded().unwrap(), "PropTradePro");
        let addr = api::spawn(state.clone()).await.unwrap();
        let base = format!("http://{}/api/v1", addr);
        let session = Arc::new(SessionStore::new(Self::client(&base)));
        Harness { state, base, session }
    }

    fn client(base: &str) -> Arc<ApiClient> {
        let client = ApiClient::new(&Config::for_base_url(base), Arc::new(MemoryTokenStore::new()))
            .unwrap();
        Arc::new(client)
    }

    fn api(&self) -> &Arc<ApiClient> {
        self.session.client()
    }

    async fn login_as(&self, (email, password): (&str, &str)) {
        match self.session.login(email, password).await.unwrap() {
            LoginOutcome::Authenticated(user) => assert_eq!(user.email, email),
            other => panic!("unexpected login outcome: {:?}", other),
        }
    }
}

/// A six-digit code guaranteed to differ from `code` in every digit.
fn wrong_code(code: &str) -> String {
    code.chars()
        .map(|c| char::from_digit((c.to_digit(10).unwrap() + 5) % 10, 10).unwrap())
        .collect()
}

/// Buy the add-on-free "Standard 50K" and open a payment intent for it.
async fn pending_intent(h: &Harness) -> (i64, String) {
    let programs = h.api().programs().list(&Default::default()).await.unwrap();
    let standard = programs.iter().find(|p| p.name == "Standard 50K").unwrap();
    let receipt = h.api().programs().purchase(standard.id, &[]).await.unwrap();
    let intent = h
        .api()
        .payments()
        .create_payment_intent(receipt.challenge.id)
        .await
        .unwrap();
    (receipt.challenge.id, intent.payment_intent_id)
}

#[tokio::test]
async fn health_and_error_bodies() {
    let h = Harness::start().await;
    let root = h.base.trim_end_matches("/api/v1");

    let health: serde_json::Value = reqwest::get(format!("{}/health", root))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");

    let response = reqwest::get(format!("{}/auth/me", h.base)).await.unwrap();
    assert_eq!(response.status().as_u16(), 401);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Token is missing");
}

#[tokio::test]
async fn login_stores_session_and_restores_it() {
    let h = Harness::start().await;
    h.login_as(DEMO_TRADER).await;

    assert!(h.session.is_authenticated());
    assert!(h.api().tokens().access_token().is_some());
    assert!(h.api().tokens().refresh_token().is_some());
    assert_eq!(h.session.user().unwrap().role, Role::Trader);

    // A second store over the same tokens picks the session back up.
    let restored = SessionStore::new(h.api().clone());
    restored.init().await;
    let snapshot = restored.snapshot();
    assert!(snapshot.is_authenticated);
    assert!(!snapshot.is_loading);
    assert_eq!(snapshot.user.unwrap().email, DEMO_TRADER.0);
}

#[tokio::test]
async fn bad_credentials_surface_server_message() {
    let h = Harness::start().await;
    let err = h.session.login(DEMO_TRADER.0, "wrong-password1").await.unwrap_err();
    assert_eq!(err.message, "Invalid email or password");
    assert_eq!(err.status, Some(401));
    assert_eq!(h.session.snapshot().error.as_deref(), Some("Invalid email or password"));
    assert!(h.api().tokens().access_token().is_none());
}

#[tokio::test]
async fn two_factor_login_needs_a_valid_code() {
    let h = Harness::start().await;
    let user_id = match h.session.login(DEMO_2FA_TRADER.0, DEMO_2FA_TRADER.1).await.unwrap() {
        LoginOutcome::TwoFactorRequired { user_id } => user_id,
        other => panic!("expected a second factor, got {:?}", other),
    };
    assert!(!h.session.is_authenticated());
    assert!(h.api().tokens().access_token().is_none());

    let code = api::totp::current_code(DEMO_TOTP_SECRET).unwrap();
    let err = h.session.login_2fa(user_id, &wrong_code(&code)).await.unwrap_err();
    assert_eq!(err.message, "Invalid 2FA token");

    let user = h.session.login_2fa(user_id, &code).await.unwrap();
    assert_eq!(user.email, DEMO_2FA_TRADER.0);
    assert!(h.session.is_authenticated());
}

#[tokio::test]
async fn expired_access_token_is_refreshed_once() {
    let h = Harness::start().await;
    h.login_as(DEMO_TRADER).await;
    let before = h.api().tokens().access_token();

    h.state.expire_access_tokens().await;
    let challenges = h.api().programs().my_challenges().await.unwrap();
    assert_eq!(challenges.len(), 2);
    assert_eq!(h.state.refresh_calls(), 1);
    assert_ne!(h.api().tokens().access_token(), before);
}

#[tokio::test]
async fn concurrent_401s_share_one_refresh() {
    let h = Harness::start().await;
    h.login_as(DEMO_TRADER).await;
    h.state.expire_access_tokens().await;

    let mut tasks = Vec::new();
    for _ in 0..5 {
        let client = h.api().clone();
        tasks.push(tokio::spawn(async move { client.auth().me().await }));
    }
    for task in tasks {
        assert_eq!(task.await.unwrap().unwrap().email, DEMO_TRADER.0);
    }
    assert_eq!(h.state.refresh_calls(), 1);
}

#[tokio::test]
async fn rejected_refresh_ends_the_session() {
    let h = Harness::start().await;
    h.login_as(DEMO_TRADER).await;
    let mut events = h.api().subscribe();
    let listener = h.session.spawn_expiry_listener();

    h.state.expire_access_tokens().await;
    h.state.revoke_refresh_tokens().await;

    let err = h.api().auth().me().await.unwrap_err();
    assert!(matches!(err, ApiError::SessionExpired));
    assert!(h.api().tokens().access_token().is_none());
    assert!(h.api().tokens().refresh_token().is_none());
    assert_eq!(
        events.recv().await.unwrap(),
        SessionEvent::Expired { redirect: LOGIN_ROUTE }
    );

    for _ in 0..50 {
        if !h.session.is_authenticated() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(!h.session.is_authenticated());
    listener.abort();
}

#[tokio::test]
async fn logout_clears_tokens_and_server_session() {
    let h = Harness::start().await;
    h.login_as(DEMO_TRADER).await;
    let token = h.api().tokens().access_token().unwrap();

    h.session.logout().await;
    assert!(!h.session.is_authenticated());
    assert!(h.api().tokens().access_token().is_none());

    let response = reqwest::Client::new()
        .get(format!("{}/auth/me", h.base))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn purchase_pay_and_refund() {
    let h = Harness::start().await;
    h.login_as(DEMO_TRADER).await;

    let programs = h.api().programs().list(&Default::default()).await.unwrap();
    assert_eq!(programs.len(), 4);
    let standard = programs.iter().find(|p| p.name == "Standard 50K").unwrap();
    let addon = standard.addons[0].id;

    let receipt = h.api().programs().purchase(standard.id, &[addon]).await.unwrap();
    assert!(receipt.payment_required);
    assert_eq!(receipt.total_price, 349.0);
    assert_eq!(receipt.challenge.status, ChallengeStatus::Pending);
    let challenge_id = receipt.challenge.id;

    let intent = h.api().payments().create_payment_intent(challenge_id).await.unwrap();
    assert_eq!(intent.amount, 349.0);
    assert_eq!(intent.currency, "usd");

    let confirmation = h.api().payments().confirm_payment(&intent.payment_intent_id).await.unwrap();
    assert_eq!(confirmation.challenge_id, Some(challenge_id));
    assert_eq!(h.state.idempotency_keys().await.len(), 1);

    let challenge = h.api().programs().challenge(challenge_id).await.unwrap();
    assert_eq!(challenge.status, ChallengeStatus::Active);
    assert_eq!(challenge.payment_status.as_deref(), Some("paid"));

    let status = h.api().payments().status(&intent.payment_intent_id).await.unwrap();
    assert_eq!(status.status, "succeeded");

    let again = h.api().payments().create_payment_intent(challenge_id).await.unwrap_err();
    assert_eq!(again.status(), Some(409));

    let refund = h.api().payments().refund(challenge_id, Some("changed my mind")).await.unwrap();
    assert_eq!(refund.amount, 349.0);
    assert_eq!(refund.status, "succeeded");
    assert!(refund.refund_id.starts_with("re_"));

    // The referring agent earned an enrollment commission on the purchase.
    h.session.logout().await;
    h.login_as(DEMO_AGENT).await;
    let commissions = h.api().agent().commissions(CommissionPeriod::All).await.unwrap();
    assert_eq!(commissions.len(), 5);
    let newest = &commissions[0];
    assert_eq!(newest.kind, CommissionType::Enrollment);
    assert_eq!(newest.amount, 34.9);
}

#[tokio::test]
async fn admin_reviews_users_and_kyc() {
    let h = Harness::start().await;
    h.login_as(DEMO_ADMIN).await;
    let admin = h.api().admin();

    let stats = admin.dashboard_stats().await.unwrap();
    assert_eq!(stats.users.total, 5);
    assert_eq!(stats.users.pending_kyc, 1);
    assert_eq!(stats.challenges.total, 3);
    assert_eq!(stats.revenue.total, 299.0 + 99.0 + 99.0);

    let traders = admin
        .users(&UserQuery {
            role: Some(Role::Trader),
            per_page: Some(2),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(traders.pagination.total, 3);
    assert_eq!(traders.pagination.pages, 2);
    assert_eq!(traders.users.len(), 2);

    let pending = admin.pending_kyc().await.unwrap();
    assert_eq!(pending.len(), 1);
    let reviewed = pending[0].id;
    let approved = admin.approve_kyc(reviewed).await.unwrap();
    assert_eq!(approved.message, "KYC approved successfully");
    assert!(admin.pending_kyc().await.unwrap().is_empty());

    let again = admin.approve_kyc(reviewed).await.unwrap_err();
    assert_eq!(again.message(), "KYC is not pending");

    let toggled = admin.toggle_user_status(reviewed).await.unwrap();
    assert!(!toggled.is_active);
}

#[tokio::test]
async fn role_checks_are_enforced_server_side() {
    let h = Harness::start().await;
    h.login_as(DEMO_TRADER).await;

    let err = h.api().admin().dashboard_stats().await.unwrap_err();
    assert_eq!(err.status(), Some(403));
    let err = h.api().agent().traders().await.unwrap_err();
    assert_eq!(err.status(), Some(403));
}

#[tokio::test]
async fn agent_sees_referred_traders() {
    let h = Harness::start().await;
    h.login_as(DEMO_AGENT).await;

    let traders = h.api().agent().traders().await.unwrap();
    assert_eq!(traders.len(), 2);
    let secure = traders.iter().find(|t| t.email == DEMO_2FA_TRADER.0).unwrap();
    assert_eq!(secure.status, ChallengeStatus::Failed);
    assert_eq!(secure.profit_loss, -1_000.0);

    let all = h.api().agent().commissions(CommissionPeriod::All).await.unwrap();
    assert_eq!(all.len(), 4);
}

#[tokio::test]
async fn profile_and_uploads() {
    let h = Harness::start().await;
    h.login_as(DEMO_TRADER).await;

    let update = ProfileUpdate {
        phone: Some("+44 20 7946 0000".to_string()),
        ..Default::default()
    };
    let user = h.api().profile().update(&update).await.unwrap();
    assert_eq!(user.phone.as_deref(), Some("+44 20 7946 0000"));
    assert_eq!(h.api().profile().get().await.unwrap().phone, user.phone);

    let err = h.api().profile().change_password("nope", "Another123").await.unwrap_err();
    assert_eq!(err.message(), "Current password is incorrect");
    let ok = h.api().profile().change_password(DEMO_TRADER.1, "Another123").await.unwrap();
    assert_eq!(ok.message, "Password updated successfully");

    let scan = Upload::new("passport.png", vec![0x89, 0x50, 0x4e, 0x47]).with_mime("image/png");
    let receipt = h.api().uploads().kyc(scan, "passport").await.unwrap();
    assert!(receipt.url.unwrap().starts_with("/uploads/kyc/"));
    assert_eq!(h.api().auth().me().await.unwrap().kyc_status, shared::KycStatus::Pending);

    let notes = Upload::new("notes.txt", b"hello".to_vec());
    let err = h.api().uploads().kyc(notes, "passport").await.unwrap_err();
    assert_eq!(err.status(), Some(400));

    let avatar = Upload::new("me.JPG", vec![0xff, 0xd8, 0xff]).with_mime("image/jpeg");
    let receipt = h.api().uploads().profile_image(avatar).await.unwrap();
    let url = receipt.url.unwrap();
    assert!(url.starts_with("/uploads/profiles/"));
    assert!(url.ends_with(".jpg"));

    let scan = Upload::new("me.pdf", b"%PDF-1.4".to_vec()).with_mime("application/pdf");
    let err = h.api().uploads().profile_image(scan).await.unwrap_err();
    assert_eq!(err.message(), "Profile image must be an image");

    let logo = Upload::new("logo.png", vec![0x89, 0x50]).with_mime("image/png");
    let err = h.api().uploads().tenant_logo(logo, 1).await.unwrap_err();
    assert_eq!(err.status(), Some(403));
}

#[tokio::test]
async fn registration_verification_and_password_reset() {
    let h = Harness::start().await;
    let request = RegisterRequest {
        email: "nia@proptrade.test".to_string(),
        password: "Fresh123!".to_string(),
        first_name: "Nia".to_string(),
        last_name: "New".to_string(),
        ..Default::default()
    };

    let user = h.session.register(&request).await.unwrap();
    assert_eq!(user.role, Role::Trader);
    assert!(!user.is_verified);
    assert!(!h.session.is_authenticated());
    assert!(h.api().tokens().access_token().is_none());

    let err = h.session.register(&request).await.unwrap_err();
    assert_eq!(err.message, "Email already registered");
    assert_eq!(err.status, Some(400));

    let token = h.state.store().await.accounts[&user.id]
        .verification_token
        .clone()
        .unwrap();
    let verified = h.api().auth().verify_email(&token).await.unwrap();
    assert!(verified.user.is_verified);
    let err = h.api().auth().verify_email(&token).await.unwrap_err();
    assert_eq!(err.message(), "Invalid or expired token");

    let ticket = h.api().auth().request_password_reset(&request.email).await.unwrap();
    let reset_token = ticket.reset_token.unwrap();
    let err = h.api().auth().reset_password(&reset_token, "short").await.unwrap_err();
    assert_eq!(err.status(), Some(400));
    h.api().auth().reset_password(&reset_token, "Renewed123").await.unwrap();

    let err = h.session.login(&request.email, &request.password).await.unwrap_err();
    assert_eq!(err.status, Some(401));
    h.login_as((request.email.as_str(), "Renewed123")).await;

    let unknown = h
        .api()
        .auth()
        .request_password_reset("nobody@proptrade.test")
        .await
        .unwrap();
    assert!(unknown.reset_token.is_none());
}

#[tokio::test]
async fn two_factor_enrolment_changes_the_login_flow() {
    let h = Harness::start().await;
    h.login_as(DEMO_TRADER).await;

    let setup = h.api().auth().enable_2fa().await.unwrap();
    assert!(setup.uri.starts_with("otpauth://totp/"));
    let code = api::totp::current_code(&setup.secret).unwrap();
    let err = h.api().auth().confirm_2fa(&wrong_code(&code)).await.unwrap_err();
    assert_eq!(err.message(), "Invalid 2FA token");
    let user = h.api().auth().confirm_2fa(&code).await.unwrap();
    assert!(user.two_factor_enabled);

    h.session.logout().await;
    let user_id = match h.session.login(DEMO_TRADER.0, DEMO_TRADER.1).await.unwrap() {
        LoginOutcome::TwoFactorRequired { user_id } => user_id,
        other => panic!("expected a second factor, got {:?}", other),
    };
    let code = api::totp::current_code(&setup.secret).unwrap();
    h.session.login_2fa(user_id, &code).await.unwrap();
    assert!(h.session.is_authenticated());

    let err = h.api().auth().disable_2fa("not-my-password").await.unwrap_err();
    assert_eq!(err.message(), "Invalid password");
    let user = h.api().auth().disable_2fa(DEMO_TRADER.1).await.unwrap();
    assert!(!user.two_factor_enabled);

    h.session.logout().await;
    h.login_as(DEMO_TRADER).await;
}

#[tokio::test]
async fn admin_manages_users_settings_and_catalogue() {
    let h = Harness::start().await;
    h.login_as(DEMO_ADMIN).await;
    let admin = h.api().admin();

    let input = AdminUserInput {
        email: Some("desk@proptrade.test".to_string()),
        password: Some("Desk1234".to_string()),
        first_name: Some("Dee".to_string()),
        last_name: Some("Desk".to_string()),
        role: Some(Role::Agent),
        ..Default::default()
    };
    let created = admin.create_user(&input).await.unwrap();
    assert_eq!(created.role, Role::Agent);
    assert!(created.is_active);
    let err = admin.create_user(&input).await.unwrap_err();
    assert_eq!(err.message(), "User already exists");

    let removed = admin.delete_user(created.id).await.unwrap();
    assert_eq!(removed.message, "User deleted successfully");
    assert!(!admin.user(created.id).await.unwrap().is_active);
    let me = h.session.user().unwrap().id;
    let err = admin.delete_user(me).await.unwrap_err();
    assert_eq!(err.message(), "Cannot delete yourself");

    let settings = admin.settings().await.unwrap();
    assert_eq!(settings["platform_name"], "PropTradePro");
    let updated = admin
        .update_settings(&json!({ "maintenance_mode": true }))
        .await
        .unwrap();
    assert_eq!(updated["maintenance_mode"], true);
    assert_eq!(updated["default_profit_split"], 80);
    let err = admin.update_settings(&json!(["not", "an", "object"])).await.unwrap_err();
    assert_eq!(err.status(), Some(400));

    let programs = h.api().programs().list(&Default::default()).await.unwrap();
    let target = programs[0].id;
    let addon_input = AddonInput {
        name: "Weekend holding".to_string(),
        price: 25.0,
        description: None,
        price_type: None,
    };
    let addon = h.api().programs().create_addon(target, &addon_input).await.unwrap();
    assert_eq!(addon.program_id, Some(target));
    assert_eq!(addon.price_type.as_deref(), Some("fixed"));
    let program = h.api().programs().get(target).await.unwrap();
    assert!(program.addons.iter().any(|a| a.id == addon.id));

    let logo = Upload::new("brand.png", vec![0x89, 0x50]).with_mime("image/png");
    let receipt = h.api().uploads().tenant_logo(logo, 3).await.unwrap();
    assert!(receipt.url.unwrap().starts_with("/uploads/tenants/3/"));
}

#[tokio::test]
async fn confirmation_replayed_after_refresh_keeps_its_key() {
    let h = Harness::start().await;
    h.login_as(DEMO_TRADER).await;
    let (challenge_id, intent_id) = pending_intent(&h).await;

    h.state.expire_access_tokens().await;
    let confirmation = h.api().payments().confirm_payment(&intent_id).await.unwrap();
    assert_eq!(confirmation.challenge_id, Some(challenge_id));
    assert_eq!(h.state.refresh_calls(), 1);

    let received = h.state.received_idempotency_keys().await;
    assert_eq!(received.len(), 2);
    assert_eq!(received[0], received[1]);
    assert_eq!(h.state.idempotency_keys().await, vec![received[0].clone()]);
}

#[tokio::test]
async fn repeated_confirmation_is_served_from_the_first_response() {
    let h = Harness::start().await;
    h.login_as(DEMO_TRADER).await;
    let (_, intent_id) = pending_intent(&h).await;
    let token = h.api().tokens().access_token().unwrap();

    let http = reqwest::Client::new();
    let confirm = |bearer: &str| {
        http.post(format!("{}/payments/confirm-payment", h.base))
            .bearer_auth(bearer)
            .header(IDEMPOTENCY_HEADER, "retry-1")
            .json(&json!({ "payment_intent_id": intent_id }))
    };

    let first: Value = confirm(&token).send().await.unwrap().json().await.unwrap();
    let payments = h.state.store().await.payments.len();
    let second: Value = confirm(&token).send().await.unwrap().json().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first["status"], "succeeded");
    assert_eq!(h.state.store().await.payments.len(), payments);

    // The same key from another caller is not a replay of this one.
    let agent: Value = http
        .post(format!("{}/auth/login", h.base))
        .json(&json!({ "email": DEMO_AGENT.0, "password": DEMO_AGENT.1 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let other = confirm(agent["access_token"].as_str().unwrap()).send().await.unwrap();
    assert_eq!(other.status().as_u16(), 403);
}
