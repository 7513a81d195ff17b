//! List-entry normalization shared by every store loader.
//!
//! All matching in this crate is case-insensitive; loaders lowercase entries
//! here and the stores lowercase probes, so the two sides always compare in
//! the same form.

/// Trim a raw line and drop blanks and `#` comments.
pub fn clean_line(raw: &str) -> Option<&str> {
    let line = raw.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    Some(line)
}

/// Normalized literal for exact-match lists.
pub fn exact_entry(raw: &str) -> Option<String> {
    clean_line(raw).map(|line| line.to_lowercase())
}

/// Classified entry for the domain list.
///
/// A leading `!` marks a force-allow override and is stripped from the stored
/// text. Entries containing `@` are full-address entries and are kept
/// verbatim; everything else is a bare domain the caller still has to fold to
/// its organizational form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainToken {
    pub text: String,
    pub force_allow: bool,
    pub is_address: bool,
}

pub fn domain_token(raw: &str) -> Option<DomainToken> {
    let line = clean_line(raw)?;
    let (force_allow, rest) = match line.strip_prefix('!') {
        Some(rest) => (true, rest.trim()),
        None => (false, line),
    };
    if rest.is_empty() {
        return None;
    }
    Some(DomainToken {
        text: rest.to_lowercase(),
        force_allow,
        is_address: rest.contains('@'),
    })
}
