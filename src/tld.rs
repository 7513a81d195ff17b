use std::collections::HashSet;
use std::net::IpAddr;

/// Resolves a hostname to its organizational (registrable) domain.
///
/// The decision engine only needs this one operation; deployments with a full
/// public-suffix dataset can plug their own implementation in behind this
/// trait.
pub trait TldLookup: Send + Sync {
    fn organizational_domain(&self, host: &str) -> Option<String>;
}

/// Table-driven resolver good enough for standalone use: the organizational
/// domain is the last two labels, or the last three when the last two form a
/// known two-level public suffix (`co.uk`, `com.au`, ...).
pub struct SuffixTable {
    two_level: HashSet<String>,
}

const BUILTIN_TWO_LEVEL: &[&str] = &[
    "co.uk", "org.uk", "ac.uk", "gov.uk", "me.uk", "net.uk", "co.nz", "net.nz",
    "org.nz", "com.au", "net.au", "org.au", "id.au", "co.jp", "ne.jp", "or.jp",
    "ac.jp", "com.br", "net.br", "org.br", "com.mx", "com.ar", "com.cn",
    "net.cn", "org.cn", "com.tw", "com.hk", "co.in", "net.in", "org.in",
    "co.za", "co.kr", "com.sg", "com.my", "com.tr", "co.th", "com.vn",
];

impl SuffixTable {
    /// Builtin table plus any extra two-level suffixes from configuration.
    pub fn with_extras<I, S>(extras: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut two_level: HashSet<String> =
            BUILTIN_TWO_LEVEL.iter().map(|s| s.to_string()).collect();
        for extra in extras {
            let suffix = extra.as_ref().trim().to_lowercase();
            if !suffix.is_empty() {
                two_level.insert(suffix);
            }
        }
        SuffixTable { two_level }
    }
}

impl Default for SuffixTable {
    fn default() -> Self {
        SuffixTable::with_extras(Vec::<String>::new())
    }
}

impl TldLookup for SuffixTable {
    fn organizational_domain(&self, host: &str) -> Option<String> {
        let host = host.trim().trim_end_matches('.').to_lowercase();
        if host.is_empty() || !host.contains('.') {
            return None;
        }
        if host.contains(['@', '[', ']', '/', ':']) || host.contains(char::is_whitespace) {
            return None;
        }
        if host.parse::<IpAddr>().is_ok() {
            return None;
        }

        let labels: Vec<&str> = host.split('.').collect();
        if labels.iter().any(|l| l.is_empty()) {
            return None;
        }

        let last_two = labels[labels.len() - 2..].join(".");
        if self.two_level.contains(&last_two) {
            if labels.len() < 3 {
                // The name is itself a public suffix.
                return None;
            }
            return Some(labels[labels.len() - 3..].join("."));
        }
        Some(last_two)
    }
}
