use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Field the remap stage writes the normalized level into.
pub const SEVERITY_FIELD: &str = "severity";

/// The normalized log-level vocabulary every application level maps onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Debug,
    Info,
    Notice,
    Warning,
    Error,
    Critical,
    Alert,
    Emergency,
    Fatal,
    #[default]
    Default,
}

impl Severity {
    pub const ALL: [Severity; 10] = [
        Severity::Debug,
        Severity::Info,
        Severity::Notice,
        Severity::Warning,
        Severity::Error,
        Severity::Critical,
        Severity::Alert,
        Severity::Emergency,
        Severity::Fatal,
        Severity::Default,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Notice => "NOTICE",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
            Severity::Alert => "ALERT",
            Severity::Emergency => "EMERGENCY",
            Severity::Fatal => "FATAL",
            Severity::Default => "DEFAULT",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Only the canonical upper-case names parse; anything else is the caller's
/// cue to fall back to [`Severity::Default`].
impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Severity::ALL
            .into_iter()
            .find(|sev| sev.as_str() == s)
            .ok_or_else(|| format!("`{s}` is not a canonical severity"))
    }
}
