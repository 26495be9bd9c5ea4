use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

/// Lowercased, trimmed, with spaces and hyphens folded to underscores.
fn wire_key(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .replace(|c: char| c == ' ' || c == '-', "_")
}

/// Enum fields decode through a case-insensitive parser; `null` gives the default.
macro_rules! lenient_deserialize {
    ($($ty:ty => $parse:expr),+ $(,)?) => {
        $(
            impl<'de> Deserialize<'de> for $ty {
                fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
                where
                    D: serde::Deserializer<'de>,
                {
                    let raw: Option<String> = Option::deserialize(deserializer)?;
                    Ok(raw.map(|s| $parse(s.as_str())).unwrap_or_default())
                }
            }
        )+
    };
}

lenient_deserialize!(
    Role => Role::parse,
    KycStatus => KycStatus::parse,
    ProgramType => |s: &str| ProgramType::parse(s).unwrap_or_default(),
    ChallengeStatus => ChallengeStatus::parse,
    PaymentStatus => PaymentStatus::parse,
    CommissionType => CommissionType::parse,
    CommissionStatus => CommissionStatus::parse,
);

/// Lenient timestamp handling: the backend emits naive ISO date-times, some
/// endpoints plain dates, and RFC 3339 shows up from other services. A value
/// that fits none of them decodes as absent.
pub mod timestamp {
    use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer};
    use tracing::warn;

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        let raw = raw.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
                return Some(naive.and_utc());
            }
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    }

    pub fn deserialize_opt<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(s) if s.trim().is_empty() => Ok(None),
            Some(s) => {
                let parsed = parse(&s);
                if parsed.is_none() {
                    warn!("Ignoring unparseable timestamp: {}", s);
                }
                Ok(parsed)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Trader,
    Agent,
    Master,
    Supermaster,
    Admin,
    SuperAdmin,
    #[default]
    Unknown,
}

pub const ADMIN_ROLES: [Role; 2] = [Role::Admin, Role::SuperAdmin];

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Trader => "trader",
            Role::Agent => "agent",
            Role::Master => "master",
            Role::Supermaster => "supermaster",
            Role::Admin => "admin",
            Role::SuperAdmin => "super_admin",
            Role::Unknown => "unknown",
        }
    }

    /// Case-insensitive; anything unrecognised is `Unknown`.
    pub fn parse(raw: &str) -> Self {
        match wire_key(raw).as_str() {
            "trader" => Role::Trader,
            "agent" => Role::Agent,
            "master" => Role::Master,
            "supermaster" => Role::Supermaster,
            "admin" => Role::Admin,
            "super_admin" | "superadmin" => Role::SuperAdmin,
            _ => Role::Unknown,
        }
    }

    pub fn is_admin(&self) -> bool {
        ADMIN_ROLES.contains(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KycStatus {
    #[default]
    NotSubmitted,
    Pending,
    Approved,
    Rejected,
    Unknown,
}

impl KycStatus {
    pub fn parse(raw: &str) -> Self {
        match wire_key(raw).as_str() {
            "not_submitted" | "" => KycStatus::NotSubmitted,
            "pending" => KycStatus::Pending,
            "approved" => KycStatus::Approved,
            "rejected" => KycStatus::Rejected,
            _ => KycStatus::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            KycStatus::NotSubmitted => "not_submitted",
            KycStatus::Pending => "pending",
            KycStatus::Approved => "approved",
            KycStatus::Rejected => "rejected",
            KycStatus::Unknown => "unknown",
        }
    }

    fn pending() -> Self {
        KycStatus::Pending
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub kyc_status: KycStatus,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub two_factor_enabled: bool,
    #[serde(default, deserialize_with = "timestamp::deserialize_opt")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "timestamp::deserialize_opt")]
    pub last_login_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgramType {
    OnePhase,
    TwoPhase,
    InstantFunding,
    #[default]
    Unknown,
}

impl ProgramType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgramType::OnePhase => "one_phase",
            ProgramType::TwoPhase => "two_phase",
            ProgramType::InstantFunding => "instant_funding",
            ProgramType::Unknown => "unknown",
        }
    }

    /// Short label shown on program cards.
    pub fn label(&self) -> &'static str {
        match self {
            ProgramType::OnePhase => "1 Phase",
            ProgramType::TwoPhase => "2 Phase",
            ProgramType::InstantFunding => "Instant",
            ProgramType::Unknown => "Other",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match wire_key(raw).as_str() {
            "one_phase" | "1" | "1phase" => Some(ProgramType::OnePhase),
            "two_phase" | "2" | "2phase" => Some(ProgramType::TwoPhase),
            "instant_funding" | "instant" => Some(ProgramType::InstantFunding),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramAddon {
    pub id: i64,
    #[serde(default)]
    pub program_id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub price_type: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub id: i64,
    #[serde(default)]
    pub tenant_id: Option<i64>,
    pub name: String,
    #[serde(rename = "type", default)]
    pub program_type: ProgramType,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub account_size: f64,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub profit_target: Option<f64>,
    #[serde(default)]
    pub max_daily_loss: Option<f64>,
    #[serde(default)]
    pub max_total_loss: Option<f64>,
    #[serde(default)]
    pub profit_split: f64,
    #[serde(default)]
    pub min_trading_days: Option<u32>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub addons: Vec<ProgramAddon>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeStatus {
    #[default]
    Pending,
    Active,
    Passed,
    Failed,
    Funded,
    Completed,
    Unknown,
}

impl ChallengeStatus {
    pub fn parse(raw: &str) -> Self {
        match wire_key(raw).as_str() {
            "pending" => ChallengeStatus::Pending,
            "active" => ChallengeStatus::Active,
            "passed" => ChallengeStatus::Passed,
            "failed" => ChallengeStatus::Failed,
            "funded" => ChallengeStatus::Funded,
            "completed" => ChallengeStatus::Completed,
            _ => ChallengeStatus::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChallengeStatus::Pending => "pending",
            ChallengeStatus::Active => "active",
            ChallengeStatus::Passed => "passed",
            ChallengeStatus::Failed => "failed",
            ChallengeStatus::Funded => "funded",
            ChallengeStatus::Completed => "completed",
            ChallengeStatus::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Challenge {
    pub id: i64,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub program_id: Option<i64>,
    #[serde(default)]
    pub program: Option<Program>,
    #[serde(default)]
    pub status: ChallengeStatus,
    #[serde(default)]
    pub account_number: Option<String>,
    #[serde(default)]
    pub initial_balance: Option<f64>,
    #[serde(default)]
    pub current_balance: Option<f64>,
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub total_profit: Option<f64>,
    #[serde(default)]
    pub total_loss: Option<f64>,
    #[serde(default)]
    pub current_phase: Option<u32>,
    #[serde(default)]
    pub total_phases: Option<u32>,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default, deserialize_with = "timestamp::deserialize_opt")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Completed,
    Failed,
    Refunded,
    Unknown,
}

impl PaymentStatus {
    pub fn parse(raw: &str) -> Self {
        match wire_key(raw).as_str() {
            "pending" => PaymentStatus::Pending,
            "completed" => PaymentStatus::Completed,
            "failed" => PaymentStatus::Failed,
            "refunded" => PaymentStatus::Refunded,
            _ => PaymentStatus::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub program_id: Option<i64>,
    #[serde(default)]
    pub amount: f64,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub status: PaymentStatus,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default, deserialize_with = "timestamp::deserialize_opt")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommissionType {
    Enrollment,
    ProfitShare,
    Renewal,
    #[default]
    Unknown,
}

impl CommissionType {
    pub fn parse(raw: &str) -> Self {
        match wire_key(raw).as_str() {
            "enrollment" => CommissionType::Enrollment,
            "profit_share" => CommissionType::ProfitShare,
            "renewal" => CommissionType::Renewal,
            _ => CommissionType::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CommissionType::Enrollment => "enrollment",
            CommissionType::ProfitShare => "profit_share",
            CommissionType::Renewal => "renewal",
            CommissionType::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommissionStatus {
    #[default]
    Pending,
    Paid,
    Processing,
    Unknown,
}

impl CommissionStatus {
    pub fn parse(raw: &str) -> Self {
        match wire_key(raw).as_str() {
            "pending" => CommissionStatus::Pending,
            "paid" => CommissionStatus::Paid,
            "processing" => CommissionStatus::Processing,
            _ => CommissionStatus::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CommissionStatus::Pending => "pending",
            CommissionStatus::Paid => "paid",
            CommissionStatus::Processing => "processing",
            CommissionStatus::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TraderRef {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commission {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "timestamp::deserialize_opt")]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub trader: TraderRef,
    #[serde(rename = "type", default)]
    pub kind: CommissionType,
    #[serde(default)]
    pub program: Option<String>,
    #[serde(default)]
    pub rate: f64,
    #[serde(default)]
    pub amount: f64,
    #[serde(default)]
    pub status: CommissionStatus,
    #[serde(default, deserialize_with = "timestamp::deserialize_opt")]
    pub payout_date: Option<DateTime<Utc>>,
}

/// A KYC submission as listed for review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KycSubmission {
    #[serde(alias = "user_id")]
    pub id: i64,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub document_type: Option<String>,
    #[serde(default)]
    pub document_number: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(
        default,
        alias = "kyc_submitted_at",
        deserialize_with = "timestamp::deserialize_opt"
    )]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default = "KycStatus::pending")]
    pub status: KycStatus,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    #[serde(default)]
    pub kyc_id_url: Option<String>,
    #[serde(default)]
    pub kyc_address_url: Option<String>,
    #[serde(default)]
    pub kyc_selfie_url: Option<String>,
    #[serde(default)]
    pub kyc_bank_url: Option<String>,
}

impl KycSubmission {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }

    /// Uploaded document references, in review order.
    pub fn documents(&self) -> Vec<(&'static str, &str)> {
        [
            ("id", &self.kyc_id_url),
            ("address", &self.kyc_address_url),
            ("selfie", &self.kyc_selfie_url),
            ("bank", &self.kyc_bank_url),
        ]
        .into_iter()
        .filter_map(|(label, url)| url.as_deref().map(|u| (label, u)))
        .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub pages: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserList {
    pub users: Vec<User>,
    #[serde(default)]
    pub pagination: Pagination,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentList {
    pub payments: Vec<Payment>,
    #[serde(default)]
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct UserCounts {
    pub total: u64,
    pub active: u64,
    pub pending_kyc: u64,
    pub suspended: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RevenueSummary {
    pub total: f64,
    pub monthly: f64,
    pub average_per_user: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ChallengeCounts {
    pub total: u64,
    pub active: u64,
    pub completed: u64,
    pub failed: u64,
    pub funded: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentUser {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub status: String,
    #[serde(default, deserialize_with = "timestamp::deserialize_opt")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentPayment {
    pub id: i64,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub amount: f64,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub status: PaymentStatus,
    #[serde(default, deserialize_with = "timestamp::deserialize_opt")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AdminDashboardStats {
    #[serde(default)]
    pub users: UserCounts,
    #[serde(default)]
    pub revenue: RevenueSummary,
    #[serde(default)]
    pub challenges: ChallengeCounts,
    #[serde(default)]
    pub recent_users: Vec<RecentUser>,
    #[serde(default)]
    pub recent_payments: Vec<RecentPayment>,
}

/// Trader summary as listed on the agent's traders page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentTrader {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub status: ChallengeStatus,
    #[serde(default)]
    pub current_balance: f64,
    #[serde(default)]
    pub profit_loss: f64,
    #[serde(default)]
    pub total_trades: u32,
    #[serde(default)]
    pub win_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn user_deserializes_backend_shape() {
        let user: User = serde_json::from_value(json!({
            "id": 7,
            "email": "jane@example.com",
            "first_name": "Jane",
            "last_name": "Doe",
            "phone": null,
            "role": "super_admin",
            "kyc_status": "pending",
            "is_verified": true,
            "two_factor_enabled": false,
            "created_at": "2024-03-01T09:30:00.123456",
            "last_login_at": null
        }))
        .unwrap();

        assert_eq!(user.role, Role::SuperAdmin);
        assert!(user.role.is_admin());
        assert_eq!(user.kyc_status, KycStatus::Pending);
        assert!(user.is_active);
        assert_eq!(user.full_name(), "Jane Doe");
        assert_eq!(
            user.created_at.unwrap().format("%Y-%m-%d %H:%M").to_string(),
            "2024-03-01 09:30"
        );
    }

    #[test]
    fn unknown_enum_values_do_not_fail() {
        let user: User = serde_json::from_value(json!({"id": 1, "role": "auditor"})).unwrap();
        assert_eq!(user.role, Role::Unknown);

        let challenge: Challenge =
            serde_json::from_value(json!({"id": 2, "status": "cancelled"})).unwrap();
        assert_eq!(challenge.status, ChallengeStatus::Unknown);
        assert_eq!(challenge.total_profit, None);
    }

    #[test]
    fn program_type_accepts_instant_alias() {
        let program: Program = serde_json::from_value(json!({
            "id": 3, "name": "Rapid", "type": "instant", "account_size": 10000.0, "price": 99.0
        }))
        .unwrap();
        assert_eq!(program.program_type, ProgramType::InstantFunding);
        assert_eq!(program.program_type.label(), "Instant");
        assert_eq!(
            serde_json::to_value(program.program_type).unwrap(),
            json!("instant_funding")
        );
    }

    #[test]
    fn timestamps_accept_several_formats() {
        assert!(timestamp::parse("2024-05-01T10:00:00Z").is_some());
        assert!(timestamp::parse("2024-05-01T10:00:00").is_some());
        assert!(timestamp::parse("2024-05-01 10:00:00.5").is_some());
        assert!(timestamp::parse("2024-05-01").is_some());
        assert!(timestamp::parse("yesterday").is_none());
    }

    #[test]
    fn kyc_submission_reads_pending_list_entry() {
        let sub: KycSubmission = serde_json::from_value(json!({
            "id": 11,
            "email": "k@example.com",
            "first_name": "Kim",
            "last_name": "Lee",
            "kyc_submitted_at": "2024-02-02T08:00:00",
            "kyc_id_url": "/uploads/kyc/11/id.png",
            "kyc_selfie_url": "/uploads/kyc/11/selfie.png"
        }))
        .unwrap();
        assert_eq!(sub.status, KycStatus::Pending);
        assert!(sub.submitted_at.is_some());
        assert_eq!(
            sub.documents(),
            vec![("id", "/uploads/kyc/11/id.png"), ("selfie", "/uploads/kyc/11/selfie.png")]
        );
    }

    #[test]
    fn mixed_case_wire_values_decode() {
        let user: User = serde_json::from_value(json!({
            "id": 1, "role": "Admin", "kyc_status": "Approved"
        }))
        .unwrap();
        assert_eq!(user.role, Role::Admin);
        assert_eq!(user.kyc_status, KycStatus::Approved);
        assert_eq!(crate::routing::dashboard_for(Some(&user)), "/admin");

        let challenge: Challenge =
            serde_json::from_value(json!({"id": 2, "status": "FUNDED"})).unwrap();
        assert_eq!(challenge.status, ChallengeStatus::Funded);

        let commission: Commission = serde_json::from_value(json!({
            "type": "Profit Share", "status": "Paid"
        }))
        .unwrap();
        assert_eq!(commission.kind, CommissionType::ProfitShare);
        assert_eq!(commission.status, CommissionStatus::Paid);

        let payment: Payment =
            serde_json::from_value(json!({"id": 3, "status": null})).unwrap();
        assert_eq!(payment.status, PaymentStatus::Pending);
        assert_eq!(serde_json::to_value(Role::SuperAdmin).unwrap(), json!("super_admin"));
    }

    #[test]
    fn unparseable_timestamp_keeps_the_rest_of_the_list() {
        let users: Vec<User> = serde_json::from_value(json!([
            {"id": 1, "created_at": "2024-01-01T00:00:00"},
            {"id": 2, "created_at": "Mon, 01 Jan 2024 00:00:00 GMT"}
        ]))
        .unwrap();
        assert_eq!(users.len(), 2);
        assert!(users[0].created_at.is_some());
        assert_eq!(users[1].created_at, None);
    }

    #[test]
    fn role_parse_is_case_insensitive() {
        assert_eq!(Role::parse("Admin"), Role::Admin);
        assert_eq!(Role::parse(" AGENT "), Role::Agent);
        assert_eq!(Role::parse("ceo"), Role::Unknown);
    }
}
