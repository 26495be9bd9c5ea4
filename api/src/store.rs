//! In-memory records behind the sandbox, seeded with demo accounts.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::http::{header, HeaderMap};
use chrono::{Duration, Utc};
use shared::{
    Challenge, ChallengeStatus, Commission, CommissionStatus, CommissionType, KycStatus,
    KycSubmission, Payment, PaymentStatus, Program, ProgramAddon, ProgramType, Role, TraderRef,
    User,
};
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::config::SandboxConfig;
use crate::error::{SandboxError, SandboxResult};

/// Base32 secret of the seeded two-factor account.
pub const DEMO_TOTP_SECRET: &str = "JBSWY3DPEHPK3PXPJBSWY3DPEHPK3PXP";

pub const DEMO_ADMIN: (&str, &str) = ("admin@proptrade.test", "Admin123!");
pub const DEMO_AGENT: (&str, &str) = ("agent@proptrade.test", "Agent123!");
pub const DEMO_TRADER: (&str, &str) = ("trader@proptrade.test", "Trader123!");
pub const DEMO_2FA_TRADER: (&str, &str) = ("secure@proptrade.test", "Secure123!");

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
}

pub struct Account {
    pub user: User,
    pub password: String,
    pub totp_secret: Option<String>,
    pub referred_by: Option<i64>,
    pub verification_token: Option<String>,
}

pub struct PaymentIntentRecord {
    pub challenge_id: i64,
    pub user_id: i64,
    pub amount: f64,
    pub status: String,
    pub created: i64,
}

/// Caller and route an `Idempotency-Key` was presented on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdempotencyScope {
    pub user_id: i64,
    pub route: String,
    pub key: String,
}

#[derive(Default)]
pub struct Store {
    pub accounts: BTreeMap<i64, Account>,
    pub programs: BTreeMap<i64, Program>,
    pub challenges: BTreeMap<i64, Challenge>,
    pub payments: Vec<Payment>,
    pub intents: HashMap<String, PaymentIntentRecord>,
    /// Purchase price of a challenge, add-ons included.
    pub challenge_totals: HashMap<i64, f64>,
    /// Commission rows keyed by the earning agent.
    pub commissions: Vec<(i64, Commission)>,
    pub kyc: BTreeMap<i64, KycSubmission>,
    /// Closed trade count and win rate per trader.
    pub trade_stats: HashMap<i64, (u32, f64)>,
    pub access_tokens: HashMap<String, i64>,
    pub refresh_tokens: HashMap<String, i64>,
    pub reset_tokens: HashMap<String, i64>,
    /// Replayable responses of idempotent requests.
    pub idempotent: HashMap<IdempotencyScope, serde_json::Value>,
    /// `Idempotency-Key` headers in arrival order, rejected requests included.
    pub idempotency_log: Vec<String>,
    pub settings: serde_json::Value,
    next_id: i64,
}

impl Store {
    pub fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    pub fn account(&self, user_id: i64) -> SandboxResult<&Account> {
        self.accounts
            .get(&user_id)
            .ok_or_else(|| SandboxError::not_found("User"))
    }

    pub fn account_mut(&mut self, user_id: i64) -> SandboxResult<&mut Account> {
        self.accounts
            .get_mut(&user_id)
            .ok_or_else(|| SandboxError::not_found("User"))
    }

    pub fn account_by_email(&self, email: &str) -> Option<&Account> {
        let email = email.trim().to_lowercase();
        self.accounts.values().find(|a| a.user.email == email)
    }

    pub fn program(&self, id: i64) -> SandboxResult<&Program> {
        self.programs
            .get(&id)
            .ok_or_else(|| SandboxError::not_found("Program"))
    }

    /// Issue an access/refresh pair for `user_id`.
    pub fn issue_tokens(&mut self, user_id: i64) -> (String, String) {
        let access = Uuid::new_v4().to_string();
        let refresh = Uuid::new_v4().to_string();
        self.access_tokens.insert(access.clone(), user_id);
        self.refresh_tokens.insert(refresh.clone(), user_id);
        (access, refresh)
    }

    /// Resolve the bearer token of a request to an active user.
    pub fn authenticate(&self, headers: &HeaderMap) -> SandboxResult<User> {
        let token =
            bearer_token(headers).ok_or_else(|| SandboxError::unauthorized("Token is missing"))?;
        let user_id = self
            .access_tokens
            .get(token)
            .ok_or_else(|| SandboxError::unauthorized("Token is invalid or expired"))?;
        let account = self
            .accounts
            .get(user_id)
            .ok_or_else(|| SandboxError::unauthorized("Token is invalid or expired"))?;
        if !account.user.is_active {
            return Err(SandboxError::unauthorized("Account is deactivated"));
        }
        Ok(account.user.clone())
    }

    pub fn authenticate_admin(&self, headers: &HeaderMap) -> SandboxResult<User> {
        let user = self.authenticate(headers)?;
        if !user.role.is_admin() {
            return Err(SandboxError::forbidden());
        }
        Ok(user)
    }

    pub fn authenticate_agent(&self, headers: &HeaderMap) -> SandboxResult<User> {
        let user = self.authenticate(headers)?;
        if user.role != Role::Agent && !user.role.is_admin() {
            return Err(SandboxError::forbidden());
        }
        Ok(user)
    }

    fn add_account(
        &mut self,
        email: &str,
        password: &str,
        first: &str,
        last: &str,
        role: Role,
    ) -> i64 {
        let id = self.next_id();
        let user = User {
            id,
            email: email.to_string(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            phone: None,
            country_code: None,
            date_of_birth: None,
            role,
            kyc_status: KycStatus::Approved,
            is_active: true,
            is_verified: true,
            two_factor_enabled: false,
            created_at: Some(Utc::now() - Duration::days(90)),
            last_login_at: None,
        };
        self.accounts.insert(
            id,
            Account {
                user,
                password: password.to_string(),
                totp_secret: None,
                referred_by: None,
                verification_token: None,
            },
        );
        id
    }

    fn add_program(
        &mut self,
        name: &str,
        kind: ProgramType,
        size: f64,
        price: f64,
        target: Option<f64>,
        split: f64,
    ) -> i64 {
        let id = self.next_id();
        self.programs.insert(
            id,
            Program {
                id,
                tenant_id: None,
                name: name.to_string(),
                program_type: kind,
                description: None,
                account_size: size,
                price,
                profit_target: target,
                max_daily_loss: Some(5.0),
                max_total_loss: Some(10.0),
                profit_split: split,
                min_trading_days: target.map(|_| 5),
                is_active: true,
                addons: Vec::new(),
            },
        );
        id
    }

    /// Open a challenge on `program_id`; `paid` also records the completed payment.
    pub fn add_challenge(
        &mut self,
        user_id: i64,
        program_id: i64,
        status: ChallengeStatus,
        profit: f64,
        progress: f64,
        paid: bool,
    ) -> SandboxResult<i64> {
        let program = self.program(program_id)?.clone();
        let id = self.next_id();
        let total_phases = match program.program_type {
            ProgramType::OnePhase => 1,
            ProgramType::TwoPhase => 2,
            _ => 3,
        };
        self.challenges.insert(
            id,
            Challenge {
                id,
                user_id: Some(user_id),
                program_id: Some(program_id),
                program: Some(program.clone()),
                status,
                account_number: Some(format!("PT-{:06}", id)),
                initial_balance: Some(program.account_size),
                current_balance: Some(program.account_size + profit),
                progress,
                total_profit: Some(profit.max(0.0)),
                total_loss: Some((-profit).max(0.0)),
                current_phase: Some(1),
                total_phases: Some(total_phases),
                payment_status: Some(if paid { "paid" } else { "pending" }.to_string()),
                created_at: Some(Utc::now() - Duration::days(20)),
            },
        );
        self.challenge_totals.insert(id, program.price);
        if paid {
            let payment_id = self.next_id();
            self.payments.push(Payment {
                id: payment_id,
                transaction_id: Some(format!("pi_seed_{}", id)),
                user_id: Some(user_id),
                program_id: Some(program_id),
                amount: program.price,
                currency: Some("usd".to_string()),
                status: PaymentStatus::Completed,
                payment_method: Some("card".to_string()),
                created_at: Some(Utc::now() - Duration::days(20)),
            });
        }
        Ok(id)
    }

    /// Demo data: one account per role, a two-factor trader, programs and history.
    pub fn seeded() -> SandboxResult<Self> {
        let mut store = Store {
            settings: serde_json::json!({
                "platform_name": "PropTradePro",
                "maintenance_mode": false,
                "default_profit_split": 80,
            }),
            ..Default::default()
        };

        store.add_account(DEMO_ADMIN.0, DEMO_ADMIN.1, "Ada", "Admin", Role::Admin);
        let agent = store.add_account(DEMO_AGENT.0, DEMO_AGENT.1, "Alex", "Agent", Role::Agent);
        let trader =
            store.add_account(DEMO_TRADER.0, DEMO_TRADER.1, "Tara", "Trader", Role::Trader);
        let secure =
            store.add_account(DEMO_2FA_TRADER.0, DEMO_2FA_TRADER.1, "Sam", "Secure", Role::Trader);
        let pending = store.add_account(
            "pending@proptrade.test",
            "Pending123!",
            "Kim",
            "Young",
            Role::Trader,
        );

        store.account_mut(trader)?.referred_by = Some(agent);
        let secure_account = store.account_mut(secure)?;
        secure_account.referred_by = Some(agent);
        secure_account.totp_secret = Some(DEMO_TOTP_SECRET.to_string());
        secure_account.user.two_factor_enabled = true;
        store.account_mut(pending)?.user.kyc_status = KycStatus::Pending;
        store.trade_stats.insert(trader, (42, 57.1));
        store.trade_stats.insert(secure, (17, 35.3));

        let starter = store.add_program(
            "Starter 10K",
            ProgramType::OnePhase,
            10_000.0,
            99.0,
            Some(10.0),
            80.0,
        );
        let standard = store.add_program(
            "Standard 50K",
            ProgramType::TwoPhase,
            50_000.0,
            299.0,
            Some(8.0),
            80.0,
        );
        store.add_program("Pro 100K", ProgramType::TwoPhase, 100_000.0, 499.0, Some(8.0), 85.0);
        store.add_program("Instant 25K", ProgramType::InstantFunding, 25_000.0, 399.0, None, 70.0);

        let addon_id = store.next_id();
        if let Some(program) = store.programs.get_mut(&standard) {
            program.addons.push(ProgramAddon {
                id: addon_id,
                program_id: Some(standard),
                name: "Profit split upgrade".to_string(),
                description: Some("Raise the split to 90%".to_string()),
                price: 50.0,
                price_type: Some("fixed".to_string()),
                is_active: true,
            });
        }

        store.add_challenge(trader, standard, ChallengeStatus::Active, 1_200.0, 40.0, true)?;
        store.add_challenge(trader, starter, ChallengeStatus::Passed, 1_050.0, 100.0, true)?;
        store.add_challenge(secure, starter, ChallengeStatus::Failed, -1_000.0, 0.0, true)?;

        let now = Utc::now();
        for (days_ago, trader_id, kind, amount, status) in [
            (2, trader, CommissionType::Enrollment, 29.9, CommissionStatus::Paid),
            (5, secure, CommissionType::Enrollment, 9.9, CommissionStatus::Pending),
            (40, trader, CommissionType::ProfitShare, 120.0, CommissionStatus::Processing),
            (400, trader, CommissionType::Renewal, 15.0, CommissionStatus::Paid),
        ] {
            let id = store.next_id();
            let name = store.account(trader_id)?.user.full_name();
            let date = now - Duration::days(days_ago);
            store.commissions.push((
                agent,
                Commission {
                    id: Some(id),
                    date: Some(date),
                    trader: TraderRef {
                        id: Some(trader_id),
                        name,
                    },
                    kind,
                    program: Some("Standard 50K".to_string()),
                    rate: 10.0,
                    amount,
                    status,
                    payout_date: (status == CommissionStatus::Paid)
                        .then(|| date + Duration::days(7)),
                },
            ));
        }

        store.kyc.insert(
            pending,
            KycSubmission {
                id: pending,
                email: "pending@proptrade.test".to_string(),
                first_name: "Kim".to_string(),
                last_name: "Young".to_string(),
                document_type: Some("passport".to_string()),
                document_number: Some("X1234567".to_string()),
                address: None,
                submitted_at: Some(now - Duration::days(1)),
                status: KycStatus::Pending,
                rejection_reason: None,
                kyc_id_url: Some(format!("/uploads/kyc/{}/passport.png", pending)),
                kyc_address_url: None,
                kyc_selfie_url: None,
                kyc_bank_url: None,
            },
        );

        Ok(store)
    }
}

struct Inner {
    store: Mutex<Store>,
    issuer: String,
    refresh_calls: AtomicUsize,
}

/// Shared handle passed to every handler.
#[derive(Clone)]
pub struct SandboxState {
    inner: Arc<Inner>,
}

impl SandboxState {
    pub fn new(config: &SandboxConfig) -> SandboxResult<Self> {
        Ok(Self::with_store(Store::seeded()?, &config.issuer))
    }

    pub fn with_store(store: Store, issuer: &str) -> Self {
        SandboxState {
            inner: Arc::new(Inner {
                store: Mutex::new(store),
                issuer: issuer.to_string(),
                refresh_calls: AtomicUsize::new(0),
            }),
        }
    }

    pub async fn store(&self) -> MutexGuard<'_, Store> {
        self.inner.store.lock().await
    }

    pub fn issuer(&self) -> &str {
        &self.inner.issuer
    }

    /// Invalidate every access token; refresh tokens stay valid.
    pub async fn expire_access_tokens(&self) {
        self.store().await.access_tokens.clear();
    }

    /// Invalidate every refresh token, so the next refresh is rejected.
    pub async fn revoke_refresh_tokens(&self) {
        self.store().await.refresh_tokens.clear();
    }

    pub fn refresh_calls(&self) -> usize {
        self.inner.refresh_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn record_refresh_call(&self) {
        self.inner.refresh_calls.fetch_add(1, Ordering::SeqCst);
    }

    pub async fn idempotency_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .store()
            .await
            .idempotent
            .keys()
            .map(|scope| scope.key.clone())
            .collect();
        keys.sort();
        keys
    }

    pub async fn received_idempotency_keys(&self) -> Vec<String> {
        self.store().await.idempotency_log.clone()
    }
}
