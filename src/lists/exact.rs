use crate::normalize;
use std::collections::HashSet;

/// Literal membership list for one (color, stage) slot. Entries are stored
/// lowercased; probes are lowercased at query time.
#[derive(Debug, Default)]
pub struct ExactList {
    name: String,
    entries: HashSet<String>,
}

impl ExactList {
    pub fn load<I, S>(name: impl Into<String>, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entries = lines
            .into_iter()
            .filter_map(|line| normalize::exact_entry(line.as_ref()))
            .collect();
        ExactList {
            name: name.into(),
            entries,
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

    pub fn contains(&self, probe: &str) -> bool {
        if probe.is_empty() {
            return false;
        }
        self.entries.contains(&probe.to_lowercase())
    }
}
