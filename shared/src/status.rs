//! Badge tones for status, role and commission-type values.
//!
//! All lookups are case-insensitive and every view uses the same tables.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tone {
    Success,
    Warning,
    Danger,
    Info,
    Purple,
    Indigo,
    Neutral,
}

impl Tone {
    /// Palette name of the tone.
    pub fn color(&self) -> &'static str {
        match self {
            Tone::Success => "green",
            Tone::Warning => "yellow",
            Tone::Danger => "red",
            Tone::Info => "blue",
            Tone::Purple => "purple",
            Tone::Indigo => "indigo",
            Tone::Neutral => "gray",
        }
    }

    /// ANSI foreground colour for terminal output.
    pub fn ansi(&self) -> &'static str {
        match self {
            Tone::Success => "\x1b[32m",
            Tone::Warning => "\x1b[33m",
            Tone::Danger => "\x1b[31m",
            Tone::Info => "\x1b[34m",
            Tone::Purple => "\x1b[35m",
            Tone::Indigo => "\x1b[94m",
            Tone::Neutral => "\x1b[90m",
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.color())
    }
}

pub fn classify_status(status: &str) -> Tone {
    match status.trim().to_lowercase().as_str() {
        "active" | "approved" | "completed" | "paid" | "passed" => Tone::Success,
        "pending" => Tone::Warning,
        "inactive" | "rejected" | "failed" | "refunded" | "suspended" => Tone::Danger,
        "funded" | "processing" => Tone::Info,
        _ => Tone::Neutral,
    }
}

pub fn classify_role(role: &str) -> Tone {
    match role.trim().to_lowercase().as_str() {
        "admin" | "super_admin" | "supermaster" => Tone::Purple,
        "master" => Tone::Indigo,
        "agent" => Tone::Info,
        "trader" => Tone::Success,
        _ => Tone::Neutral,
    }
}

pub fn classify_commission_type(kind: &str) -> Tone {
    match kind.trim().to_lowercase().as_str() {
        "enrollment" => Tone::Info,
        "profit_share" => Tone::Success,
        "renewal" => Tone::Purple,
        _ => Tone::Neutral,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_lookup_ignores_case() {
        assert_eq!(classify_status("Active"), Tone::Success);
        assert_eq!(classify_status("PENDING"), Tone::Warning);
        assert_eq!(classify_status(" rejected "), Tone::Danger);
        assert_eq!(classify_status("funded"), Tone::Info);
        assert_eq!(classify_status("archived"), Tone::Neutral);
        assert_eq!(classify_status(""), Tone::Neutral);
    }

    #[test]
    fn roles_map_to_accents() {
        assert_eq!(classify_role("super_admin"), Tone::Purple);
        assert_eq!(classify_role("Master"), Tone::Indigo);
        assert_eq!(classify_role("agent"), Tone::Info);
        assert_eq!(classify_role("trader").color(), "green");
        assert_eq!(classify_role("guest"), Tone::Neutral);
    }

    #[test]
    fn commission_types() {
        assert_eq!(classify_commission_type("profit_share"), Tone::Success);
        assert_eq!(classify_commission_type("Renewal").color(), "purple");
    }
}
