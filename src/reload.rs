use crate::config::{Config, ListFiles};
use crate::engine::AccessEngine;
use crate::lists::{AccessLists, DomainList, ExactList, PatternList, Stage};
use crate::tld::TldLookup;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Builds complete list snapshots from the files named in configuration.
///
/// Loading never fails the process: a named but unreadable file logs a
/// warning and leaves its slot unpopulated, which restricts nothing.
pub struct ListLoader {
    base_dir: PathBuf,
    files: ListFiles,
    tld: Arc<dyn TldLookup>,
}

impl ListLoader {
    pub fn new(config: &Config, tld: Arc<dyn TldLookup>) -> Self {
        ListLoader {
            base_dir: PathBuf::from(&config.list_dir),
            files: config.lists.clone(),
            tld,
        }
    }

    pub fn load_all(&self) -> AccessLists {
        let mut lists = AccessLists::default();

        for stage in Stage::KEYED {
            if let Some(name) = self.files.white.get(stage) {
                lists
                    .white
                    .set(stage, self.read_lines(name).map(|l| ExactList::load(name, l)));
            }
            if let Some(name) = self.files.black.get(stage) {
                lists
                    .black
                    .set(stage, self.read_lines(name).map(|l| ExactList::load(name, l)));
            }
            if let Some(name) = self.files.re_white.get(stage) {
                lists.re_white.set(
                    stage,
                    self.read_lines(name).map(|l| PatternList::compile(name, l)),
                );
            }
            if let Some(name) = self.files.re_black.get(stage) {
                lists.re_black.set(
                    stage,
                    self.read_lines(name).map(|l| PatternList::compile(name, l)),
                );
            }
        }

        if let Some(name) = self.files.domain.as_deref() {
            lists.domain = self
                .read_lines(name)
                .map(|l| DomainList::load(name, l, self.tld.as_ref()));
        }

        let summary = summarize(&lists);
        log::info!(
            "access lists loaded from {}: {} slots populated",
            self.base_dir.display(),
            summary.len()
        );
        lists
    }

    fn read_lines(&self, name: &str) -> Option<Vec<String>> {
        let path = self.base_dir.join(name);
        match std::fs::read_to_string(&path) {
            Ok(content) => Some(content.lines().map(str::to_string).collect()),
            Err(e) => {
                log::warn!("cannot read list {}: {e}", path.display());
                None
            }
        }
    }
}

/// Per-slot load report, keyed `color(stage)`. Rendered as JSON by the
/// config-test command.
#[derive(Debug, Clone, Serialize)]
pub struct SlotSummary {
    pub file: String,
    pub entries: usize,
    pub dropped: usize,
}

pub fn summarize(lists: &AccessLists) -> BTreeMap<String, SlotSummary> {
    let mut out = BTreeMap::new();

    for stage in Stage::KEYED {
        if let Some(list) = lists.white.get(stage) {
            out.insert(
                format!("white({stage})"),
                SlotSummary {
                    file: list.name().to_string(),
                    entries: list.len(),
                    dropped: 0,
                },
            );
        }
        if let Some(list) = lists.black.get(stage) {
            out.insert(
                format!("black({stage})"),
                SlotSummary {
                    file: list.name().to_string(),
                    entries: list.len(),
                    dropped: 0,
                },
            );
        }
        if let Some(list) = lists.re_white.get(stage) {
            out.insert(
                format!("re_white({stage})"),
                SlotSummary {
                    file: list.name().to_string(),
                    entries: list.loaded(),
                    dropped: list.dropped(),
                },
            );
        }
        if let Some(list) = lists.re_black.get(stage) {
            out.insert(
                format!("re_black({stage})"),
                SlotSummary {
                    file: list.name().to_string(),
                    entries: list.loaded(),
                    dropped: list.dropped(),
                },
            );
        }
    }

    if let Some(domains) = lists.domain.as_ref() {
        out.insert(
            "domain(any)".to_string(),
            SlotSummary {
                file: domains.name().to_string(),
                entries: domains.len(),
                dropped: domains.dropped(),
            },
        );
    }

    out
}

/// Rebuild and install the lists every time the process receives SIGHUP.
pub fn spawn_sighup_reload(engine: Arc<AccessEngine>, loader: ListLoader) {
    tokio::spawn(async move {
        let mut hangup =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::hangup()) {
                Ok(signal) => signal,
                Err(e) => {
                    log::error!("cannot install SIGHUP handler: {e}");
                    return;
                }
            };
        while hangup.recv().await.is_some() {
            log::info!("SIGHUP received, reloading access lists");
            engine.install(loader.load_all());
        }
    });
}
