use crate::address::parse_address;
use crate::engine::{is_ip_literal, AccessEngine, AnyProbe, ConnContext, TxnContext};
use crate::outcome::Outcome;
use indymilter::{run, Callbacks, Config as IndyConfig, SocketInfo, Status};
use std::sync::Arc;
use tokio::net::UnixListener;

/// Milter front end: receives protocol callbacks, feeds the engine, and
/// translates outcomes into milter status codes.
pub struct Milter {
    engine: Arc<AccessEngine>,
}

/// Per-connection session data stored in the milter context.
struct Session {
    conn: ConnContext,
    txn: Option<TxnContext>,
}

impl Milter {
    pub fn new(engine: Arc<AccessEngine>) -> Self {
        Milter { engine }
    }

    pub async fn run(&self, socket_path: &str) -> anyhow::Result<()> {
        log::info!("Starting milter on: {socket_path}");
        // Remove existing socket if it exists
        if std::path::Path::new(socket_path).exists() {
            std::fs::remove_file(socket_path)?;
        }

        let listener = UnixListener::bind(socket_path)?;
        let callbacks = build_callbacks(self.engine.clone());

        run(listener, callbacks, IndyConfig::default(), tokio::signal::ctrl_c()).await?;
        Ok(())
    }
}

fn build_callbacks(engine: Arc<AccessEngine>) -> Callbacks<Session> {
    Callbacks {
        connect: Some(Box::new({
            let engine = engine.clone();
            move |ctx: &mut indymilter::Context<Session>, hostname, socket| {
                let hostname = hostname.to_string_lossy().to_string();
                let ip = match socket {
                    SocketInfo::Inet(addr) => addr.ip().to_string(),
                    _ => String::new(),
                };
                log::debug!("Connection from: {hostname} [{ip}]");

                let session = Session {
                    conn: ConnContext::new(ip, rdns_host(&hostname)),
                    txn: None,
                };
                let mut outcome = engine.rdns_access(&session.conn);
                if outcome == Outcome::Continue {
                    outcome = engine.any_access(&session.conn, None, AnyProbe::Connect);
                }
                ctx.data = Some(session);

                let status = status_for(&outcome);
                Box::pin(async move { status })
            }
        })),

        helo: Some(Box::new({
            let engine = engine.clone();
            move |ctx: &mut indymilter::Context<Session>, helo| {
                let helo = helo.to_string_lossy().to_string();
                log::debug!("HELO: {helo}");

                let status = match ctx.data.as_ref() {
                    Some(session) => {
                        let mut outcome = engine.helo_access(&session.conn, &helo);
                        if outcome == Outcome::Continue {
                            outcome =
                                engine.any_access(&session.conn, None, AnyProbe::Helo(&helo));
                        }
                        status_for(&outcome)
                    }
                    None => Status::Continue,
                };
                Box::pin(async move { status })
            }
        })),

        mail: Some(Box::new({
            let engine = engine.clone();
            move |ctx: &mut indymilter::Context<Session>, args| {
                let raw = args
                    .first()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_default();
                log::debug!("Mail from: {raw}");

                let status = match ctx.data.as_mut() {
                    Some(session) => {
                        let txn = TxnContext::new();
                        let sender = parse_address(&raw);
                        let mut outcome = engine.mail_from_access(&txn, sender.as_ref());
                        if outcome == Outcome::Continue {
                            outcome = engine.any_access(
                                &session.conn,
                                Some(&txn),
                                AnyProbe::MailFrom(sender.as_ref()),
                            );
                        }
                        session.txn = Some(txn);
                        status_for(&outcome)
                    }
                    None => Status::Continue,
                };
                Box::pin(async move { status })
            }
        })),

        rcpt: Some(Box::new({
            let engine = engine.clone();
            move |ctx: &mut indymilter::Context<Session>, args| {
                let raw = args
                    .first()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_default();
                log::debug!("Rcpt to: {raw}");

                let status = match ctx.data.as_ref() {
                    Some(session) => match session.txn.as_ref() {
                        Some(txn) => {
                            let rcpt = parse_address(&raw);
                            let mut outcome = match rcpt.as_ref() {
                                Some(addr) => engine.rcpt_to_access(txn, addr),
                                None => Outcome::Continue,
                            };
                            if outcome == Outcome::Continue {
                                outcome = engine.any_access(
                                    &session.conn,
                                    Some(txn),
                                    AnyProbe::RcptTo(rcpt.as_ref()),
                                );
                            }
                            status_for(&outcome)
                        }
                        None => Status::Continue,
                    },
                    None => Status::Continue,
                };
                Box::pin(async move { status })
            }
        })),

        header: Some(Box::new(
            move |ctx: &mut indymilter::Context<Session>, name, value| {
                if name.to_string_lossy().eq_ignore_ascii_case("from") {
                    if let Some(session) = ctx.data.as_mut() {
                        if let Some(txn) = session.txn.as_mut() {
                            // First From header wins.
                            if txn.header_from.is_none() {
                                txn.header_from = Some(value.to_string_lossy().to_string());
                            }
                        }
                    }
                }
                Box::pin(async move { Status::Continue })
            },
        )),

        eom: Some(Box::new({
            let engine = engine.clone();
            move |ctx: &mut indymilter::EomContext<Session>| {
                let status = match ctx.data.as_mut() {
                    Some(session) => match session.txn.take() {
                        Some(txn) => status_for(&engine.data_any(&txn)),
                        None => Status::Continue,
                    },
                    None => Status::Continue,
                };
                Box::pin(async move { status })
            }
        })),

        abort: Some(Box::new(move |ctx: &mut indymilter::Context<Session>| {
            if let Some(session) = ctx.data.as_mut() {
                session.txn = None;
            }
            Box::pin(async move { Status::Continue })
        })),

        ..Callbacks::new()
    }
}

/// The milter protocol has no reject-and-disconnect reply, so both deny
/// flavors come out as a rejection; the engine has already logged the
/// disconnect intent.
fn status_for(outcome: &Outcome) -> Status {
    match outcome {
        Outcome::Continue => Status::Continue,
        Outcome::Allow => Status::Accept,
        Outcome::Deny(_) | Outcome::DenyDisconnect(_) => Status::Reject,
    }
}

/// Milters see `[1.2.3.4]` style literals when reverse DNS found nothing.
fn rdns_host(hostname: &str) -> Option<String> {
    let host = hostname.trim();
    if host.is_empty() || is_ip_literal(host) {
        return None;
    }
    Some(host.to_string())
}
