use std::fmt;

/// Envelope or header mail address split into its two halves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailAddr {
    pub local: String,
    pub host: String,
}

impl MailAddr {
    pub fn new(local: impl Into<String>, host: impl Into<String>) -> Self {
        MailAddr {
            local: local.into(),
            host: host.into(),
        }
    }
}

impl fmt::Display for MailAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.local, self.host)
    }
}

/// Extract an address from an envelope argument or a From header value.
///
/// Accepts `Name <user@host>`, `<user@host>`, and bare `user@host`. The last
/// angle-bracket pair wins so quoted display names containing brackets do not
/// confuse the split. The null path `<>` and anything without a usable
/// `local@host` shape yield `None`.
pub fn parse_address(raw: &str) -> Option<MailAddr> {
    let raw = raw.trim();
    let candidate = match (raw.rfind('<'), raw.rfind('>')) {
        (Some(start), Some(end)) if start < end => &raw[start + 1..end],
        _ => raw,
    };
    let candidate = candidate.trim();
    if candidate.is_empty() {
        return None;
    }

    let at = candidate.rfind('@')?;
    let (local, host) = candidate.split_at(at);
    let host = &host[1..];
    if local.is_empty() || host.is_empty() {
        return None;
    }
    Some(MailAddr::new(local, host))
}
