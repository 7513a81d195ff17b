use crate::normalize;
use regex::Regex;

/// All pattern fragments of one (color, stage) slot compiled into a single
/// anchored, case-insensitive alternation.
///
/// Fragments that fail to compile on their own are dropped with a warning so
/// one bad line cannot take the rest of the list down. A slot whose surviving
/// set is empty holds no pattern at all and matches nothing; the empty
/// alternation must never collapse into a match-everything expression.
#[derive(Debug)]
pub struct PatternList {
    name: String,
    pattern: Option<Regex>,
    loaded: usize,
    dropped: usize,
}

impl PatternList {
    pub fn compile<I, S>(name: impl Into<String>, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let name = name.into();
        let mut fragments: Vec<String> = Vec::new();
        let mut dropped = 0;

        for line in lines {
            let Some(fragment) = normalize::clean_line(line.as_ref()) else {
                continue;
            };
            match Regex::new(fragment) {
                Ok(_) => fragments.push(fragment.to_string()),
                Err(e) => {
                    log::warn!("{name}: dropping invalid pattern '{fragment}': {e}");
                    dropped += 1;
                }
            }
        }

        let pattern = if fragments.is_empty() {
            None
        } else {
            let joined = format!("(?i)^({})$", fragments.join("|"));
            match Regex::new(&joined) {
                Ok(re) => Some(re),
                Err(e) => {
                    // Fragments can collide once joined (duplicate group
                    // names, for one). The slot then matches nothing.
                    log::warn!("{name}: combined pattern failed to compile: {e}");
                    None
                }
            }
        };

        PatternList {
            name,
            pattern,
            loaded: fragments.len(),
            dropped,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn loaded(&self) -> usize {
        self.loaded
    }

    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn test(&self, probe: &str) -> bool {
        if probe.is_empty() {
            return false;
        }
        match &self.pattern {
            Some(re) => re.is_match(probe),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchored_alternation() {
        let list = PatternList::compile("test.regex", [".*\\.spam\\.com", "relay[0-9]+"]);
        assert!(list.test("mx.spam.com"));
        assert!(list.test("relay42"));
        // Anchoring: a fragment must cover the whole probe.
        assert!(!list.test("relay42.example.com"));
        assert!(!list.test("spam.com.example.net"));
    }

    #[test]
    fn test_case_insensitive() {
        let list = PatternList::compile("test.regex", ["mx\\.spam\\.com"]);
        assert!(list.test("MX.Spam.COM"));
    }

    #[test]
    fn test_invalid_fragment_dropped() {
        let list = PatternList::compile("test.regex", ["good.*", "broken(", "also-good"]);
        assert_eq!(list.loaded(), 2);
        assert_eq!(list.dropped(), 1);
        assert!(list.test("good-enough"));
        assert!(list.test("also-good"));
    }

    #[test]
    fn test_empty_list_matches_nothing() {
        let list = PatternList::compile("test.regex", Vec::<String>::new());
        assert!(!list.test("anything"));
        assert!(!list.test(""));

        let all_invalid = PatternList::compile("test.regex", ["broken("]);
        assert_eq!(all_invalid.loaded(), 0);
        assert!(!all_invalid.test("anything"));
    }
}
