use crate::normalize;
use crate::tld::TldLookup;
use std::collections::HashMap;

/// How one stored domain-list entry behaves at query time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomainEntry {
    pub force_allow: bool,
    pub is_address: bool,
}

/// The transaction-wide domain list: force-allow overrides (`!entry`) and
/// blacklisted organizational domains in one map.
///
/// Bare domains are folded to their organizational form at load so queries
/// are a single lookup. Overrides and full addresses are stored as written.
/// When the same text appears both negated and bare, the override wins.
#[derive(Debug, Default)]
pub struct DomainList {
    name: String,
    entries: HashMap<String, DomainEntry>,
    dropped: usize,
}

impl DomainList {
    pub fn load<I, S>(name: impl Into<String>, lines: I, tld: &dyn TldLookup) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut entries: HashMap<String, DomainEntry> = HashMap::new();
        let mut dropped = 0;

        for line in lines {
            let Some(token) = normalize::domain_token(line.as_ref()) else {
                continue;
            };
            let key = if token.force_allow || token.is_address {
                token.text
            } else {
                match tld.organizational_domain(&token.text) {
                    Some(org) => org,
                    None => {
                        dropped += 1;
                        continue;
                    }
                }
            };

            let incoming = DomainEntry {
                force_allow: token.force_allow,
                is_address: token.is_address,
            };
            entries
                .entry(key)
                .and_modify(|existing| existing.force_allow |= incoming.force_allow)
                .or_insert(incoming);
        }

        DomainList {
            name: name.into(),
            entries,
            dropped,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn lookup(&self, key: &str) -> Option<&DomainEntry> {
        self.entries.get(&key.to_lowercase())
    }

    /// Whitelist probe order: full address first, then the organizational
    /// domain, then the literal domain as derived for the current hook.
    /// Returns the stored key that matched.
    pub fn force_allow_match(&self, address: Option<&str>, literal: &str, org: &str) -> Option<&str> {
        let mut probes: Vec<&str> = Vec::with_capacity(3);
        if let Some(addr) = address {
            probes.push(addr);
        }
        probes.push(org);
        probes.push(literal);

        for probe in probes {
            if let Some((key, entry)) = self.entries.get_key_value(&probe.to_lowercase()) {
                if entry.force_allow {
                    return Some(key.as_str());
                }
            }
        }
        None
    }

    pub fn force_allowed(&self, address: Option<&str>, literal: &str, org: &str) -> bool {
        self.force_allow_match(address, literal, org).is_some()
    }

    /// Blacklist probe: organizational domain only, and only entries that are
    /// not force-allow overrides.
    pub fn denied(&self, org: &str) -> bool {
        self.lookup(org).map_or(false, |e| !e.force_allow)
    }
}
