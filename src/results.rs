use serde::Serialize;
use std::sync::Mutex;

/// One observation recorded while a check runs: a pass/fail/skip verdict or a
/// free-form note, with markers telling downstream reporting whether a
/// whitelist or blacklist produced it and whether it should be surfaced in
/// summary output.
#[derive(Debug, Clone, Serialize)]
pub struct Annotation {
    pub kind: AnnotationKind,
    pub note: String,
    pub whitelist: bool,
    pub blacklist: bool,
    pub emit: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationKind {
    Pass,
    Fail,
    Skip,
    Msg,
}

impl AnnotationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnnotationKind::Pass => "pass",
            AnnotationKind::Fail => "fail",
            AnnotationKind::Skip => "skip",
            AnnotationKind::Msg => "msg",
        }
    }
}

impl Annotation {
    fn new(kind: AnnotationKind, note: impl Into<String>) -> Self {
        Annotation {
            kind,
            note: note.into(),
            whitelist: false,
            blacklist: false,
            emit: false,
        }
    }

    pub fn pass(note: impl Into<String>) -> Self {
        Annotation::new(AnnotationKind::Pass, note)
    }

    pub fn fail(note: impl Into<String>) -> Self {
        Annotation::new(AnnotationKind::Fail, note)
    }

    pub fn skip(note: impl Into<String>) -> Self {
        Annotation::new(AnnotationKind::Skip, note)
    }

    pub fn msg(note: impl Into<String>) -> Self {
        Annotation::new(AnnotationKind::Msg, note)
    }

    pub fn whitelisted(mut self) -> Self {
        self.whitelist = true;
        self
    }

    pub fn blacklisted(mut self) -> Self {
        self.blacklist = true;
        self
    }

    pub fn emitted(mut self) -> Self {
        self.emit = true;
        self
    }
}

/// Append-only annotation collector. One sink lives on the connection scope
/// and one on each mail transaction; checks never remove or rewrite entries.
#[derive(Debug, Default)]
pub struct ResultSink {
    entries: Mutex<Vec<Annotation>>,
}

impl ResultSink {
    pub fn new() -> Self {
        ResultSink::default()
    }

    pub fn add(&self, annotation: Annotation) {
        log::debug!("result: {} {}", annotation.kind.as_str(), annotation.note);
        self.entries.lock().unwrap().push(annotation);
    }

    pub fn snapshot(&self) -> Vec<Annotation> {
        self.entries.lock().unwrap().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }

    fn notes_of(&self, kind: AnnotationKind) -> Vec<String> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.kind == kind)
            .map(|a| a.note.clone())
            .collect()
    }

    pub fn passes(&self) -> Vec<String> {
        self.notes_of(AnnotationKind::Pass)
    }

    pub fn fails(&self) -> Vec<String> {
        self.notes_of(AnnotationKind::Fail)
    }

    pub fn skips(&self) -> Vec<String> {
        self.notes_of(AnnotationKind::Skip)
    }

    pub fn msgs(&self) -> Vec<String> {
        self.notes_of(AnnotationKind::Msg)
    }
}
