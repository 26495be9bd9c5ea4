//! Time-based one-time passwords for the two-factor login flow.

use totp_rs::{Algorithm, Secret, TOTP};

use crate::error::{SandboxError, SandboxResult};

/// Build the authenticator for `secret` (base32), labelled with `issuer` and `account`.
pub fn authenticator(secret: &str, issuer: &str, account: &str) -> SandboxResult<TOTP> {
    let bytes = Secret::Encoded(secret.to_string())
        .to_bytes()
        .map_err(|e| SandboxError::Internal(format!("Invalid 2FA secret: {:?}", e)))?;
    TOTP::new(
        Algorithm::SHA1,
        6,
        1,
        30,
        bytes,
        Some(issuer.to_string()),
        account.to_string(),
    )
    .map_err(|e| SandboxError::Internal(format!("Invalid 2FA setup: {:?}", e)))
}

pub fn generate_secret() -> String {
    Secret::generate_secret().to_encoded().to_string()
}

pub fn verify(secret: &str, issuer: &str, account: &str, token: &str) -> SandboxResult<bool> {
    authenticator(secret, issuer, account)?
        .check_current(token.trim())
        .map_err(|e| SandboxError::Internal(format!("Clock error: {}", e)))
}

/// The code an authenticator app would show right now.
pub fn current_code(secret: &str) -> SandboxResult<String> {
    authenticator(secret, "sandbox", "user")?
        .generate_current()
        .map_err(|e| SandboxError::Internal(format!("Clock error: {}", e)))
}

pub fn provisioning_uri(secret: &str, issuer: &str, account: &str) -> SandboxResult<String> {
    Ok(authenticator(secret, issuer, account)?.get_url())
}
