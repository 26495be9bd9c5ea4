//! In-process PropTrade backend: the REST surface the client talks to,
//! backed by seeded in-memory records. Used by the integration tests and
//! runnable on its own as the `sandbox` binary.

pub mod config;
pub mod error;
pub mod handlers;
pub mod store;
pub mod totp;

use std::net::SocketAddr;

use axum::routing::{get, post, put};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

pub use config::SandboxConfig;
pub use error::{SandboxError, SandboxResult};
pub use store::{SandboxState, Store};

use handlers::{admin, agent, auth, payments, profile, programs, uploads};

fn auth_routes() -> Router<SandboxState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/login/2fa", post(auth::login_2fa))
        .route("/logout", post(auth::logout))
        .route("/refresh", post(auth::refresh))
        .route("/me", get(auth::me))
        .route("/verify-email/:token", get(auth::verify_email))
        .route("/password/reset-request", post(auth::request_password_reset))
        .route("/password/reset", post(auth::reset_password))
        .route("/2fa/enable", post(auth::enable_2fa))
        .route("/2fa/confirm", post(auth::confirm_2fa))
        .route("/2fa/disable", post(auth::disable_2fa))
}

/// Full paths; the list answers with and without a trailing slash.
fn program_routes() -> Router<SandboxState> {
    Router::new()
        .route("/programs", get(programs::list).post(programs::create))
        .route("/programs/", get(programs::list).post(programs::create))
        .route("/programs/my-challenges", get(programs::my_challenges))
        .route("/programs/challenges/:id", get(programs::challenge))
        .route("/programs/:id", get(programs::get).put(programs::update))
        .route("/programs/:id/addons", post(programs::create_addon))
        .route("/programs/:id/purchase", post(programs::purchase))
}

fn payment_routes() -> Router<SandboxState> {
    Router::new()
        .route("/create-payment-intent", post(payments::create_payment_intent))
        .route("/confirm-payment", post(payments::confirm_payment))
        .route("/refund/:challenge_id", post(payments::refund))
        .route("/status/:intent_id", get(payments::status))
}

fn admin_routes() -> Router<SandboxState> {
    Router::new()
        .route("/users", get(admin::list_users).post(admin::create_user))
        .route(
            "/users/:id",
            get(admin::get_user).put(admin::update_user).delete(admin::delete_user),
        )
        .route("/users/:id/toggle-status", post(admin::toggle_status))
        .route("/dashboard/stats", get(admin::dashboard_stats))
        .route("/settings", get(admin::get_settings).put(admin::update_settings))
        .route("/payments", get(admin::list_payments))
        .route("/kyc/pending", get(admin::pending_kyc))
        .route("/kyc/:user_id/approve", post(admin::approve_kyc))
        .route("/kyc/:user_id/reject", post(admin::reject_kyc))
}

/// Full application router: `/health` plus the versioned API.
pub fn router(state: SandboxState) -> Router {
    let api = Router::new()
        .nest("/auth", auth_routes())
        .merge(program_routes())
        .nest("/payments", payment_routes())
        .route("/uploads/kyc", post(uploads::kyc))
        .route("/uploads/profile-image", post(uploads::profile_image))
        .route("/uploads/tenant-logo", post(uploads::tenant_logo))
        .route("/profile", get(profile::get_profile).put(profile::update_profile))
        .route("/profile/password", put(profile::change_password))
        .nest("/admin", admin_routes())
        .route("/agent/commissions", get(agent::commissions))
        .route("/agent/traders", get(agent::traders));

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Serve the sandbox on an ephemeral local port and return its address.
pub async fn spawn(state: SandboxState) -> anyhow::Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = router(state);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Sandbox server stopped: {}", e);
        }
    });
    info!("Sandbox listening on http://{}", addr);
    Ok(addr)
}
