pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod routing;
pub mod session;
pub mod stats;
pub mod status;
pub mod storage;
pub mod table;

pub use client::{ApiClient, ApiRequest, SessionEvent};
pub use config::Config;
pub use error::{ApiError, AuthError, ConfigError, StorageError, TableError};
pub use models::*;
pub use routing::{dashboard_for, protected_route, public_route, RoleGuard, RouteDecision};
pub use session::{LoginOutcome, SessionSnapshot, SessionStore};
pub use status::{classify_commission_type, classify_role, classify_status, Tone};
pub use storage::{FileTokenStore, MemoryTokenStore, TokenStore};
pub use table::{Column, ColumnSpec, DataTable, TableRow, TableView};
