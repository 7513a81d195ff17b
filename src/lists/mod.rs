pub mod domain;
pub mod exact;
pub mod pattern;

pub use domain::{DomainEntry, DomainList};
pub use exact::ExactList;
pub use pattern::PatternList;

use std::fmt;

/// SMTP phases a list can be keyed by. `Any` is the transaction-wide domain
/// check; it has no per-color slots of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Conn,
    Helo,
    Mail,
    Rcpt,
    Any,
}

impl Stage {
    /// The stages that carry per-color list slots.
    pub const KEYED: [Stage; 4] = [Stage::Conn, Stage::Helo, Stage::Mail, Stage::Rcpt];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Conn => "conn",
            Stage::Helo => "helo",
            Stage::Mail => "mail",
            Stage::Rcpt => "rcpt",
            Stage::Any => "any",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn as_str(&self) -> &'static str {
        match self {
            Color::White => "white",
            Color::Black => "black",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One optional list per keyed stage. Slots the configuration does not name
/// stay `None`, which reads as "no restriction".
#[derive(Debug)]
pub struct StageSlots<T> {
    pub conn: Option<T>,
    pub helo: Option<T>,
    pub mail: Option<T>,
    pub rcpt: Option<T>,
}

// Manual impl: empty slots exist for any T, not just T: Default.
impl<T> Default for StageSlots<T> {
    fn default() -> Self {
        StageSlots {
            conn: None,
            helo: None,
            mail: None,
            rcpt: None,
        }
    }
}

impl<T> StageSlots<T> {
    pub fn get(&self, stage: Stage) -> Option<&T> {
        match stage {
            Stage::Conn => self.conn.as_ref(),
            Stage::Helo => self.helo.as_ref(),
            Stage::Mail => self.mail.as_ref(),
            Stage::Rcpt => self.rcpt.as_ref(),
            Stage::Any => None,
        }
    }

    pub fn set(&mut self, stage: Stage, value: Option<T>) {
        match stage {
            Stage::Conn => self.conn = value,
            Stage::Helo => self.helo = value,
            Stage::Mail => self.mail = value,
            Stage::Rcpt => self.rcpt = value,
            Stage::Any => {}
        }
    }
}

/// Immutable snapshot of every loaded list. A decision call grabs one
/// snapshot up front, so a reload in flight can never hand it a mix of
/// generations.
#[derive(Debug, Default)]
pub struct AccessLists {
    pub white: StageSlots<ExactList>,
    pub black: StageSlots<ExactList>,
    pub re_white: StageSlots<PatternList>,
    pub re_black: StageSlots<PatternList>,
    pub domain: Option<DomainList>,
}

impl AccessLists {
    fn exact_slots(&self, color: Color) -> &StageSlots<ExactList> {
        match color {
            Color::White => &self.white,
            Color::Black => &self.black,
        }
    }

    fn pattern_slots(&self, color: Color) -> &StageSlots<PatternList> {
        match color {
            Color::White => &self.re_white,
            Color::Black => &self.re_black,
        }
    }

    /// Exact-match membership; a hit reports the source list name. An
    /// unpopulated slot restricts nothing, but a query against one is worth a
    /// warning since the caller thought a list should be there.
    pub fn exact_match(&self, color: Color, stage: Stage, probe: &str) -> Option<&str> {
        if probe.is_empty() {
            return None;
        }
        match self.exact_slots(color).get(stage) {
            Some(list) if list.contains(probe) => Some(list.name()),
            Some(_) => None,
            None => {
                log::warn!("no {color}({stage}) list loaded");
                None
            }
        }
    }

    pub fn re_match(&self, color: Color, stage: Stage, probe: &str) -> Option<&str> {
        if probe.is_empty() {
            return None;
        }
        match self.pattern_slots(color).get(stage) {
            Some(list) if list.test(probe) => Some(list.name()),
            Some(_) => None,
            None => {
                log::debug!("no {color}_regex({stage}) list loaded");
                None
            }
        }
    }

    pub fn in_list(&self, color: Color, stage: Stage, probe: &str) -> bool {
        self.exact_match(color, stage, probe).is_some()
    }

    pub fn in_re_list(&self, color: Color, stage: Stage, probe: &str) -> bool {
        self.re_match(color, stage, probe).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_snapshot_is_all_empty() {
        let lists = AccessLists::default();
        for stage in Stage::KEYED {
            assert!(lists.white.get(stage).is_none());
            assert!(lists.black.get(stage).is_none());
            assert!(lists.re_white.get(stage).is_none());
            assert!(lists.re_black.get(stage).is_none());
        }
        assert!(lists.domain.is_none());
    }

    #[test]
    fn test_unpopulated_slot_fails_closed() {
        let lists = AccessLists::default();
        assert!(!lists.in_list(Color::White, Stage::Conn, "host.example.com"));
        assert!(!lists.in_re_list(Color::Black, Stage::Helo, "mx.spam.com"));
    }

    #[test]
    fn test_populated_slot_queries() {
        let mut lists = AccessLists::default();
        lists.black.set(
            Stage::Conn,
            Some(ExactList::load("conn.blacklist", ["bad.example.net"])),
        );
        lists.re_black.set(
            Stage::Helo,
            Some(PatternList::compile("helo.regexps", [".*\\.dynamic\\..*"])),
        );

        assert!(lists.in_list(Color::Black, Stage::Conn, "BAD.example.net"));
        assert!(!lists.in_list(Color::Black, Stage::Conn, "good.example.net"));
        assert!(lists.in_re_list(Color::Black, Stage::Helo, "host.dynamic.isp.example"));
    }

    #[test]
    fn test_any_stage_has_no_color_slots() {
        let mut lists = AccessLists::default();
        lists.white.set(Stage::Any, Some(ExactList::load("x", ["a.example"])));
        assert!(lists.white.get(Stage::Any).is_none());
        assert!(!lists.in_list(Color::White, Stage::Any, "a.example"));
    }
}
