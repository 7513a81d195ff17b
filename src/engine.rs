use crate::address::{parse_address, MailAddr};
use crate::config::Config;
use crate::lists::{AccessLists, Color, Stage};
use crate::outcome::Outcome;
use crate::results::{Annotation, ResultSink};
use crate::tld::TldLookup;
use arc_swap::ArcSwap;
use std::net::IpAddr;
use std::sync::Arc;

const DOMAIN_DENY: &str = "You are not welcome here.";
const HEADER_DOMAIN_DENY: &str = "Email from that domain is not accepted here.";

/// Connection-scoped facts handed in by the transport.
///
/// `remote_host` is whatever reverse DNS the MTA already did; it may carry
/// the usual placeholder strings for "lookup failed", which the checks treat
/// as no hostname at all.
#[derive(Debug)]
pub struct ConnContext {
    pub remote_ip: String,
    pub remote_host: Option<String>,
    pub results: ResultSink,
}

impl ConnContext {
    pub fn new(remote_ip: impl Into<String>, remote_host: Option<String>) -> Self {
        ConnContext {
            remote_ip: remote_ip.into(),
            remote_host,
            results: ResultSink::new(),
        }
    }
}

/// Per-transaction scope. Reset on every new MAIL FROM.
#[derive(Debug, Default)]
pub struct TxnContext {
    pub header_from: Option<String>,
    pub results: ResultSink,
}

impl TxnContext {
    pub fn new() -> Self {
        TxnContext::default()
    }
}

/// Where the transaction-wide domain check should take its domain from.
#[derive(Debug, Clone, Copy)]
pub enum AnyProbe<'a> {
    Connect,
    Helo(&'a str),
    MailFrom(Option<&'a MailAddr>),
    RcptTo(Option<&'a MailAddr>),
}

impl AnyProbe<'_> {
    fn hook(&self) -> &'static str {
        match self {
            AnyProbe::Connect => "connect",
            AnyProbe::Helo(_) => "helo",
            AnyProbe::MailFrom(_) => "mail",
            AnyProbe::RcptTo(_) => "rcpt",
        }
    }
}

enum ListVerdict {
    White,
    Black,
    Unlisted,
}

/// The access decision engine. One instance serves every connection; the
/// list snapshot is swapped wholesale on reload and each check reads exactly
/// one snapshot, so concurrent decisions never see half a reload.
pub struct AccessEngine {
    config: Config,
    lists: ArcSwap<AccessLists>,
    tld: Arc<dyn TldLookup>,
}

impl AccessEngine {
    pub fn new(config: Config, tld: Arc<dyn TldLookup>) -> Self {
        AccessEngine {
            config,
            lists: ArcSwap::from_pointee(AccessLists::default()),
            tld,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Install a freshly built snapshot. In-flight checks keep the one they
    /// started with.
    pub fn install(&self, lists: AccessLists) {
        self.lists.store(Arc::new(lists));
    }

    pub fn snapshot(&self) -> Arc<AccessLists> {
        self.lists.load_full()
    }

    /// Connection check against the remote IP and its reverse-DNS name.
    /// A whitelist hit on either candidate settles the call before any
    /// blacklist is consulted.
    pub fn rdns_access(&self, conn: &ConnContext) -> Outcome {
        if !self.config.check.conn {
            return Outcome::Continue;
        }
        let lists = self.lists.load();

        let host = conn
            .remote_host
            .as_deref()
            .filter(|h| !is_rdns_placeholder(h));
        let mut candidates: Vec<&str> = Vec::with_capacity(2);
        if !conn.remote_ip.is_empty() {
            candidates.push(conn.remote_ip.as_str());
        }
        if let Some(h) = host {
            candidates.push(h);
        }

        for addr in &candidates {
            let hit = lists
                .exact_match(Color::White, Stage::Conn, addr)
                .or_else(|| lists.re_match(Color::White, Stage::Conn, addr));
            if let Some(name) = hit {
                conn.results
                    .add(Annotation::pass(format!("{name}({addr})")).whitelisted());
                return Outcome::Continue;
            }
        }

        for addr in &candidates {
            let hit = lists
                .exact_match(Color::Black, Stage::Conn, addr)
                .or_else(|| lists.re_match(Color::Black, Stage::Conn, addr));
            if let Some(name) = hit {
                conn.results
                    .add(Annotation::fail(format!("{name}({addr})")).blacklisted().emitted());
                let host_disp = conn.remote_host.as_deref().unwrap_or("Unknown");
                log::info!("connection denied: {} [{}] via {}", host_disp, conn.remote_ip, name);
                return Outcome::DenyDisconnect(format!(
                    "{host_disp} [{}] {}",
                    conn.remote_ip, self.config.deny_msg.conn
                ));
            }
        }

        conn.results.add(Annotation::msg("unlisted(rdns)"));
        Outcome::Continue
    }

    /// HELO/EHLO argument check. Pattern blacklist only; there is no HELO
    /// whitelist in this scheme.
    pub fn helo_access(&self, conn: &ConnContext, helo: &str) -> Outcome {
        if !self.config.check.helo {
            return Outcome::Continue;
        }
        let lists = self.lists.load();

        if let Some(name) = lists.re_match(Color::Black, Stage::Helo, helo) {
            conn.results
                .add(Annotation::fail(format!("{name}({helo})")).blacklisted().emitted());
            log::info!("helo denied: {helo} via {name}");
            return Outcome::Deny(format!("{helo} {}", self.config.deny_msg.helo));
        }

        conn.results.add(Annotation::msg("unlisted(helo)"));
        Outcome::Continue
    }

    /// Envelope-sender check. The null sender is a bounce and is never
    /// matched against any list.
    pub fn mail_from_access(&self, txn: &TxnContext, sender: Option<&MailAddr>) -> Outcome {
        if !self.config.check.mail {
            return Outcome::Continue;
        }
        let Some(sender) = sender else {
            txn.results.add(Annotation::skip("null_sender"));
            return Outcome::Continue;
        };

        let addr = sender.to_string().to_lowercase();
        let lists = self.lists.load();
        match self.list_verdict(&lists, Stage::Mail, &addr, &txn.results) {
            ListVerdict::White => Outcome::Continue,
            ListVerdict::Black => {
                Outcome::Deny(format!("{addr} {}", self.config.deny_msg.mail))
            }
            ListVerdict::Unlisted => {
                txn.results.add(Annotation::msg("unlisted(mail)"));
                Outcome::Continue
            }
        }
    }

    /// Envelope-recipient check. With `rcpt.accept` set, a whitelisted
    /// recipient is accepted outright; the flag never touches the unlisted
    /// path, which stays with later relay and validation layers.
    pub fn rcpt_to_access(&self, txn: &TxnContext, rcpt: &MailAddr) -> Outcome {
        if !self.config.check.rcpt {
            return Outcome::Continue;
        }
        let pass_outcome = if self.config.rcpt.accept {
            Outcome::Allow
        } else {
            Outcome::Continue
        };

        let addr = rcpt.to_string().to_lowercase();
        let lists = self.lists.load();
        match self.list_verdict(&lists, Stage::Rcpt, &addr, &txn.results) {
            ListVerdict::White => pass_outcome,
            ListVerdict::Black => {
                Outcome::Deny(format!("{addr} {}", self.config.deny_msg.rcpt))
            }
            ListVerdict::Unlisted => {
                txn.results.add(Annotation::msg("unlisted(rcpt)"));
                Outcome::Continue
            }
        }
    }

    /// White exact, white pattern, black exact, black pattern; first hit
    /// wins and is annotated with the list that produced it.
    fn list_verdict(
        &self,
        lists: &AccessLists,
        stage: Stage,
        probe: &str,
        sink: &ResultSink,
    ) -> ListVerdict {
        let white = lists
            .exact_match(Color::White, stage, probe)
            .or_else(|| lists.re_match(Color::White, stage, probe));
        if let Some(name) = white {
            sink.add(Annotation::pass(format!("{name}({probe})")).whitelisted());
            return ListVerdict::White;
        }

        let black = lists
            .exact_match(Color::Black, stage, probe)
            .or_else(|| lists.re_match(Color::Black, stage, probe));
        if let Some(name) = black {
            sink.add(Annotation::fail(format!("{name}({probe})")).blacklisted().emitted());
            log::info!("{stage} denied: {probe} via {name}");
            return ListVerdict::Black;
        }

        ListVerdict::Unlisted
    }

    /// Transaction-wide domain check, run after the stage check of the same
    /// hook. Annotations go to the transaction sink once one exists.
    pub fn any_access(
        &self,
        conn: &ConnContext,
        txn: Option<&TxnContext>,
        probe: AnyProbe<'_>,
    ) -> Outcome {
        if !self.config.check.any {
            return Outcome::Continue;
        }
        let sink = txn.map(|t| &t.results).unwrap_or(&conn.results);
        let hook = probe.hook();

        let (domain, email) = match probe {
            AnyProbe::Connect => {
                let host = conn
                    .remote_host
                    .as_deref()
                    .filter(|h| !is_rdns_placeholder(h));
                (host.map(|h| h.to_lowercase()), None)
            }
            AnyProbe::Helo(helo) => {
                let helo = helo.trim();
                let usable = !helo.is_empty() && !is_ip_literal(helo);
                (usable.then(|| helo.to_lowercase()), None)
            }
            AnyProbe::MailFrom(addr) | AnyProbe::RcptTo(addr) => match addr {
                Some(a) => (
                    Some(a.host.to_lowercase()),
                    Some(a.to_string().to_lowercase()),
                ),
                None => (None, None),
            },
        };

        let Some(domain) = domain else {
            sink.add(Annotation::msg(format!("any: no domain({hook})")));
            return Outcome::Continue;
        };

        self.domain_verdict(sink, &domain, email.as_deref(), DOMAIN_DENY)
    }

    /// Post-data variant of the domain check, keyed off the (already
    /// decoded) From header. Parse trouble never blocks a message.
    pub fn data_any(&self, txn: &TxnContext) -> Outcome {
        if !self.config.check.any {
            return Outcome::Continue;
        }
        let Some(raw) = txn.header_from.as_deref() else {
            txn.results.add(Annotation::fail("data(from): header missing"));
            return Outcome::Continue;
        };
        let Some(from) = parse_address(raw) else {
            txn.results.add(Annotation::fail("data(from): unparsable"));
            return Outcome::Continue;
        };

        let email = from.to_string().to_lowercase();
        let domain = from.host.to_lowercase();
        self.domain_verdict(&txn.results, &domain, Some(&email), HEADER_DOMAIN_DENY)
    }

    fn domain_verdict(
        &self,
        sink: &ResultSink,
        domain: &str,
        email: Option<&str>,
        deny_msg: &str,
    ) -> Outcome {
        if !domain.contains('.') {
            sink.add(Annotation::fail(format!("any(malformed): {domain}")));
            return Outcome::Continue;
        }
        let Some(org) = self.tld.organizational_domain(domain) else {
            sink.add(Annotation::msg(format!("any: no org domain for {domain}")));
            return Outcome::Continue;
        };

        let lists = self.lists.load();
        let Some(domains) = lists.domain.as_ref() else {
            sink.add(Annotation::msg("unlisted(any)"));
            return Outcome::Continue;
        };

        if let Some(key) = domains.force_allow_match(email, domain, &org) {
            sink.add(
                Annotation::pass(format!("{}(!{key})", domains.name()))
                    .whitelisted()
                    .emitted(),
            );
            return Outcome::Continue;
        }
        if domains.denied(&org) {
            sink.add(
                Annotation::fail(format!("{}({org})", domains.name()))
                    .blacklisted()
                    .emitted(),
            );
            log::info!("domain denied: {org} via {}", domains.name());
            return Outcome::Deny(deny_msg.to_string());
        }

        sink.add(Annotation::msg("unlisted(any)"));
        Outcome::Continue
    }
}

fn is_rdns_placeholder(host: &str) -> bool {
    host.is_empty()
        || host.eq_ignore_ascii_case("unknown")
        || host.eq_ignore_ascii_case("dnserror")
}

/// HELO arguments and connect hostnames can be address literals, bracketed
/// or bare; those never name a domain.
pub(crate) fn is_ip_literal(s: &str) -> bool {
    let inner = s
        .strip_prefix('[')
        .and_then(|r| r.strip_suffix(']'))
        .unwrap_or(s);
    let inner = match inner.get(..5) {
        Some(tag) if tag.eq_ignore_ascii_case("ipv6:") => &inner[5..],
        _ => inner,
    };
    inner.parse::<IpAddr>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CheckConfig;
    use crate::lists::{DomainList, ExactList, PatternList};
    use crate::tld::SuffixTable;

    fn all_checks() -> CheckConfig {
        CheckConfig {
            conn: true,
            helo: true,
            mail: true,
            rcpt: true,
            any: true,
        }
    }

    fn engine(lists: AccessLists) -> AccessEngine {
        engine_with(lists, |_| {})
    }

    fn engine_with(lists: AccessLists, tweak: impl FnOnce(&mut Config)) -> AccessEngine {
        let mut config = Config::default();
        config.check = all_checks();
        tweak(&mut config);
        let engine = AccessEngine::new(config, Arc::new(SuffixTable::default()));
        engine.install(lists);
        engine
    }

    fn conn_lists(white: &[&str], black: &[&str], re_black: &[&str]) -> AccessLists {
        let mut lists = AccessLists::default();
        if !white.is_empty() {
            lists.white.set(
                Stage::Conn,
                Some(ExactList::load("connect.rdns_access.whitelist", white.iter().copied())),
            );
        }
        if !black.is_empty() {
            lists.black.set(
                Stage::Conn,
                Some(ExactList::load("connect.rdns_access.blacklist", black.iter().copied())),
            );
        }
        if !re_black.is_empty() {
            lists.re_black.set(
                Stage::Conn,
                Some(PatternList::compile(
                    "connect.rdns_access.blacklist_regex",
                    re_black.iter().copied(),
                )),
            );
        }
        lists
    }

    fn domain_lists(entries: &[&str]) -> AccessLists {
        AccessLists {
            domain: Some(DomainList::load(
                "access.domains",
                entries.iter().copied(),
                &SuffixTable::default(),
            )),
            ..Default::default()
        }
    }

    fn mail_lists(white: &[&str], black: &[&str]) -> AccessLists {
        let mut lists = AccessLists::default();
        lists.white.set(
            Stage::Mail,
            Some(ExactList::load("mail_from.access.whitelist", white.iter().copied())),
        );
        lists.black.set(
            Stage::Mail,
            Some(ExactList::load("mail_from.access.blacklist", black.iter().copied())),
        );
        lists
    }

    fn connection(ip: &str, host: Option<&str>) -> ConnContext {
        ConnContext::new(ip, host.map(str::to_string))
    }

    #[test]
    fn test_conn_blacklisted_ip_disconnects_with_message() {
        let engine = engine(conn_lists(&[], &["1.1.1.1"], &[]));
        let conn = connection("1.1.1.1", Some("host.example.com"));

        let outcome = engine.rdns_access(&conn);
        assert_eq!(
            outcome,
            Outcome::DenyDisconnect(
                "host.example.com [1.1.1.1] You are not allowed to connect".to_string()
            )
        );
        assert_eq!(conn.results.fails().len(), 1);
        assert!(conn.results.fails()[0].contains("1.1.1.1"));
    }

    #[test]
    fn test_conn_whitelist_beats_blacklist() {
        let engine = engine(conn_lists(
            &["host.example.com"],
            &["host.example.com", "1.1.1.1"],
            &[],
        ));
        let conn = connection("1.1.1.1", Some("host.example.com"));

        // The IP is blacklisted but white wins across all candidates first.
        // Candidate order is IP then host, so this also shows the whitelist
        // pass runs to completion before any blacklist is consulted.
        assert_eq!(engine.rdns_access(&conn), Outcome::Continue);
        assert_eq!(conn.results.passes().len(), 1);
        assert!(conn.results.fails().is_empty());
    }

    #[test]
    fn test_conn_pattern_blacklist() {
        let engine = engine(conn_lists(&[], &[], &[".*\\.spam\\.com"]));
        let conn = connection("192.0.2.9", Some("mx.spam.com"));

        let outcome = engine.rdns_access(&conn);
        assert!(matches!(outcome, Outcome::DenyDisconnect(_)));

        // Anchoring means a lookalike with a suffix is not caught.
        let conn2 = connection("192.0.2.10", Some("mx.spam.com.example.net"));
        assert_eq!(engine.rdns_access(&conn2), Outcome::Continue);
    }

    #[test]
    fn test_conn_pattern_whitelist_skips_blacklist() {
        let mut lists = conn_lists(&[], &["mx.trusted.example"], &[]);
        lists.re_white.set(
            Stage::Conn,
            Some(PatternList::compile(
                "connect.rdns_access.whitelist_regex",
                [".*\\.trusted\\.example"],
            )),
        );
        let engine = engine(lists);
        let conn = connection("198.51.100.3", Some("mx.trusted.example"));

        assert_eq!(engine.rdns_access(&conn), Outcome::Continue);
        assert_eq!(conn.results.passes().len(), 1);
        assert!(conn.results.fails().is_empty());
    }

    #[test]
    fn test_configured_deny_message() {
        let engine = engine_with(conn_lists(&[], &["1.1.1.1"], &[]), |cfg| {
            cfg.deny_msg.conn = "Go away".to_string();
        });
        let conn = connection("1.1.1.1", Some("host.example.com"));

        assert_eq!(
            engine.rdns_access(&conn),
            Outcome::DenyDisconnect("host.example.com [1.1.1.1] Go away".to_string())
        );
    }

    #[test]
    fn test_conn_unlisted_annotates_and_continues() {
        let engine = engine(conn_lists(&["other.example.com"], &["bad.example.com"], &[]));
        let conn = connection("203.0.113.5", Some("fine.example.org"));

        assert_eq!(engine.rdns_access(&conn), Outcome::Continue);
        assert_eq!(conn.results.msgs(), vec!["unlisted(rdns)".to_string()]);
    }

    #[test]
    fn test_conn_check_disabled() {
        let engine = engine_with(conn_lists(&[], &["1.1.1.1"], &[]), |cfg| {
            cfg.check.conn = false;
        });
        let conn = connection("1.1.1.1", Some("host.example.com"));

        assert_eq!(engine.rdns_access(&conn), Outcome::Continue);
        assert!(conn.results.is_empty());
    }

    #[test]
    fn test_conn_decision_is_idempotent() {
        let engine = engine(conn_lists(&[], &["1.1.1.1"], &[]));
        let conn = connection("1.1.1.1", Some("host.example.com"));

        let first = engine.rdns_access(&conn);
        let second = engine.rdns_access(&conn);
        assert_eq!(first, second);
    }

    #[test]
    fn test_helo_pattern_deny() {
        let mut lists = AccessLists::default();
        lists.re_black.set(
            Stage::Helo,
            Some(PatternList::compile("helo.checks.regexps", ["friend", ".*\\.invalid"])),
        );
        let engine = engine(lists);
        let conn = connection("203.0.113.5", None);

        assert_eq!(
            engine.helo_access(&conn, "FRIEND"),
            Outcome::Deny("FRIEND That HELO is not allowed to connect".to_string())
        );
        assert_eq!(conn.results.fails().len(), 1);
    }

    #[test]
    fn test_helo_unlisted_annotation() {
        let engine = engine(AccessLists::default());
        let conn = connection("203.0.113.5", None);

        assert_eq!(engine.helo_access(&conn, "mail.example.com"), Outcome::Continue);
        assert_eq!(conn.results.msgs(), vec!["unlisted(helo)".to_string()]);
    }

    #[test]
    fn test_null_sender_skips() {
        let engine = engine(mail_lists(&[], &["spammer@spam.com"]));
        let txn = TxnContext::new();

        assert_eq!(engine.mail_from_access(&txn, None), Outcome::Continue);
        assert_eq!(txn.results.skips(), vec!["null_sender".to_string()]);
    }

    #[test]
    fn test_sender_blacklist_denies() {
        let engine = engine(mail_lists(&[], &["spammer@spam.com"]));
        let txn = TxnContext::new();
        let sender = MailAddr::new("Spammer", "SPAM.com");

        assert_eq!(
            engine.mail_from_access(&txn, Some(&sender)),
            Outcome::Deny("spammer@spam.com That sender cannot send mail here".to_string())
        );
    }

    #[test]
    fn test_sender_whitelist_beats_blacklist() {
        let engine = engine(mail_lists(&["vip@spam.com"], &["vip@spam.com"]));
        let txn = TxnContext::new();
        let sender = MailAddr::new("vip", "spam.com");

        assert_eq!(engine.mail_from_access(&txn, Some(&sender)), Outcome::Continue);
        assert_eq!(txn.results.passes().len(), 1);
        assert!(txn.results.fails().is_empty());
    }

    #[test]
    fn test_sender_exact_whitelist_beats_pattern_blacklist() {
        let mut lists = mail_lists(&["special@spam.com"], &[]);
        lists.re_black.set(
            Stage::Mail,
            Some(PatternList::compile(
                "mail_from.access.blacklist_regex",
                [".*@spam.com"],
            )),
        );
        let engine = engine(lists);

        // The exact white entry is consulted before the pattern blacklist
        // that would otherwise catch the whole domain.
        let txn = TxnContext::new();
        let listed = MailAddr::new("special", "spam.com");
        assert_eq!(engine.mail_from_access(&txn, Some(&listed)), Outcome::Continue);
        assert_eq!(txn.results.passes().len(), 1);
        assert!(txn.results.fails().is_empty());

        let txn2 = TxnContext::new();
        let caught = MailAddr::new("other", "spam.com");
        assert!(matches!(
            engine.mail_from_access(&txn2, Some(&caught)),
            Outcome::Deny(_)
        ));
    }

    #[test]
    fn test_sender_unlisted() {
        let engine = engine(mail_lists(&[], &[]));
        let txn = TxnContext::new();
        let sender = MailAddr::new("someone", "example.org");

        assert_eq!(engine.mail_from_access(&txn, Some(&sender)), Outcome::Continue);
        assert_eq!(txn.results.msgs(), vec!["unlisted(mail)".to_string()]);
    }

    #[test]
    fn test_rcpt_accept_upgrades_whitelist_hit_only() {
        let mut lists = AccessLists::default();
        lists.white.set(
            Stage::Rcpt,
            Some(ExactList::load("rcpt_to.access.whitelist", ["postmaster@example.com"])),
        );
        let engine = engine_with(lists, |cfg| cfg.rcpt.accept = true);
        let txn = TxnContext::new();

        let listed = MailAddr::new("postmaster", "example.com");
        assert_eq!(engine.rcpt_to_access(&txn, &listed), Outcome::Allow);

        // Unlisted recipients continue to later validation even in accept
        // mode.
        let unlisted = MailAddr::new("nobody", "example.com");
        assert_eq!(engine.rcpt_to_access(&txn, &unlisted), Outcome::Continue);
    }

    #[test]
    fn test_rcpt_blacklist_denies() {
        let mut lists = AccessLists::default();
        lists.black.set(
            Stage::Rcpt,
            Some(ExactList::load("rcpt_to.access.blacklist", ["trap@example.com"])),
        );
        let engine = engine(lists);
        let txn = TxnContext::new();

        let rcpt = MailAddr::new("trap", "example.com");
        assert_eq!(
            engine.rcpt_to_access(&txn, &rcpt),
            Outcome::Deny("trap@example.com That recipient is not allowed".to_string())
        );
    }

    #[test]
    fn test_any_blacklisted_org_domain() {
        let engine = engine(domain_lists(&["spam-central.com"]));
        let conn = connection("203.0.113.5", None);
        let txn = TxnContext::new();
        let sender = MailAddr::new("someone", "mail.spam-central.com");

        let outcome = engine.any_access(&conn, Some(&txn), AnyProbe::MailFrom(Some(&sender)));
        assert_eq!(outcome, Outcome::Deny("You are not welcome here.".to_string()));
        assert_eq!(txn.results.fails().len(), 1);
        assert!(conn.results.is_empty());
    }

    #[test]
    fn test_any_address_override_beats_domain_blacklist() {
        let engine = engine(domain_lists(&["!special@spam.com", "spam.com"]));
        let conn = connection("203.0.113.5", None);
        let txn = TxnContext::new();

        let vip = MailAddr::new("special", "spam.com");
        let outcome = engine.any_access(&conn, Some(&txn), AnyProbe::MailFrom(Some(&vip)));
        assert_eq!(outcome, Outcome::Continue);
        assert_eq!(txn.results.passes().len(), 1);

        let other = MailAddr::new("other", "spam.com");
        let txn2 = TxnContext::new();
        let outcome = engine.any_access(&conn, Some(&txn2), AnyProbe::MailFrom(Some(&other)));
        assert!(matches!(outcome, Outcome::Deny(_)));
    }

    #[test]
    fn test_any_negated_domain_beats_bare_entry() {
        let engine = engine(domain_lists(&["!example.com", "example.com"]));
        let conn = connection("203.0.113.5", None);
        let txn = TxnContext::new();
        let sender = MailAddr::new("user", "example.com");

        let outcome = engine.any_access(&conn, Some(&txn), AnyProbe::MailFrom(Some(&sender)));
        assert_eq!(outcome, Outcome::Continue);
        assert_eq!(txn.results.passes().len(), 1);
    }

    #[test]
    fn test_any_connect_uses_rdns_unless_placeholder() {
        let engine = engine(domain_lists(&["spam-central.com"]));

        let conn = connection("203.0.113.5", Some("mx.spam-central.com"));
        let outcome = engine.any_access(&conn, None, AnyProbe::Connect);
        assert!(matches!(outcome, Outcome::Deny(_)));

        let unknown = connection("203.0.113.5", Some("DNSERROR"));
        let outcome = engine.any_access(&unknown, None, AnyProbe::Connect);
        assert_eq!(outcome, Outcome::Continue);
        assert_eq!(unknown.results.msgs(), vec!["any: no domain(connect)".to_string()]);
    }

    #[test]
    fn test_any_helo_ip_literals_skipped() {
        let engine = engine(domain_lists(&["spam-central.com"]));
        let conn = connection("203.0.113.5", None);

        for helo in ["[203.0.113.5]", "203.0.113.5", "[IPv6:2001:db8::1]"] {
            let outcome = engine.any_access(&conn, None, AnyProbe::Helo(helo));
            assert_eq!(outcome, Outcome::Continue, "helo {helo}");
        }
        assert_eq!(conn.results.msgs().len(), 3);
    }

    #[test]
    fn test_any_dotless_domain_is_malformed_not_denied() {
        let engine = engine(domain_lists(&["spam-central.com"]));
        let conn = connection("203.0.113.5", None);

        let outcome = engine.any_access(&conn, None, AnyProbe::Helo("localhost"));
        assert_eq!(outcome, Outcome::Continue);
        assert_eq!(conn.results.fails(), vec!["any(malformed): localhost".to_string()]);
    }

    #[test]
    fn test_any_unlisted_domain() {
        let engine = engine(domain_lists(&["spam-central.com"]));
        let conn = connection("203.0.113.5", None);
        let outcome = engine.any_access(&conn, None, AnyProbe::Helo("mail.example.org"));
        assert_eq!(outcome, Outcome::Continue);
        assert_eq!(conn.results.msgs(), vec!["unlisted(any)".to_string()]);
    }

    #[test]
    fn test_data_any_header_from() {
        let engine = engine(domain_lists(&["spam-central.com"]));
        let txn = TxnContext {
            header_from: Some("Marketing <blast@phish.spam-central.com>".to_string()),
            results: ResultSink::new(),
        };

        assert_eq!(
            engine.data_any(&txn),
            Outcome::Deny("Email from that domain is not accepted here.".to_string())
        );
    }

    #[test]
    fn test_data_any_missing_or_unparsable_header_is_permissive() {
        let engine = engine(domain_lists(&["spam-central.com"]));

        let missing = TxnContext::new();
        assert_eq!(engine.data_any(&missing), Outcome::Continue);
        assert_eq!(missing.results.fails(), vec!["data(from): header missing".to_string()]);

        let garbled = TxnContext {
            header_from: Some("not an address".to_string()),
            results: ResultSink::new(),
        };
        assert_eq!(engine.data_any(&garbled), Outcome::Continue);
        assert_eq!(garbled.results.fails(), vec!["data(from): unparsable".to_string()]);
    }

    #[test]
    fn test_reload_swaps_whole_snapshot() {
        let engine = engine(domain_lists(&["spam-central.com"]));
        let conn = connection("203.0.113.5", None);
        let txn = TxnContext::new();
        let sender = MailAddr::new("x", "spam-central.com");

        let before = engine.any_access(&conn, Some(&txn), AnyProbe::MailFrom(Some(&sender)));
        assert!(matches!(before, Outcome::Deny(_)));

        let old = engine.snapshot();
        engine.install(domain_lists(&["other.example"]));

        let txn2 = TxnContext::new();
        let after = engine.any_access(&conn, Some(&txn2), AnyProbe::MailFrom(Some(&sender)));
        assert_eq!(after, Outcome::Continue);

        // A reader that grabbed the old snapshot still sees the old world.
        assert!(old.domain.as_ref().unwrap().denied("spam-central.com"));
    }

    #[test]
    fn test_any_check_disabled() {
        let engine = engine_with(domain_lists(&["spam-central.com"]), |cfg| {
            cfg.check.any = false;
        });
        let conn = connection("203.0.113.5", None);
        let txn = TxnContext::new();
        let sender = MailAddr::new("x", "spam-central.com");

        let outcome = engine.any_access(&conn, Some(&txn), AnyProbe::MailFrom(Some(&sender)));
        assert_eq!(outcome, Outcome::Continue);
        assert!(txn.results.is_empty());
    }

    #[test]
    fn test_ip_literal_detection() {
        assert!(is_ip_literal("192.0.2.1"));
        assert!(is_ip_literal("[192.0.2.1]"));
        assert!(is_ip_literal("[IPv6:2001:db8::1]"));
        assert!(is_ip_literal("2001:db8::1"));
        assert!(!is_ip_literal("mail.example.com"));
        assert!(!is_ip_literal("[bracketed.example]"));
    }
}
