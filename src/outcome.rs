use std::fmt;

/// Decision produced by a stage check.
///
/// `Continue` hands the session to the next check with no opinion. `Allow`
/// short-circuits the remaining checks for the current command (recipient
/// accept mode). The two deny variants carry the SMTP rejection text; only
/// the connection stage asks for the session to be dropped as well.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    Allow,
    Deny(String),
    DenyDisconnect(String),
}

impl Outcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Outcome::Continue)
    }

    pub fn reject_message(&self) -> Option<&str> {
        match self {
            Outcome::Deny(msg) | Outcome::DenyDisconnect(msg) => Some(msg),
            _ => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Continue => write!(f, "continue"),
            Outcome::Allow => write!(f, "allow"),
            Outcome::Deny(msg) => write!(f, "deny: {msg}"),
            Outcome::DenyDisconnect(msg) => write!(f, "deny+disconnect: {msg}"),
        }
    }
}
