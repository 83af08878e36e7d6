use crate::{Error, Result};
use core::{fmt, str::FromStr};

/// Target languages accepted by the daemon, as ISO 639-1 codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Language {
    En,
    It,
    De,
}

impl Language {
    /// Every supported language, in the order they are advertised to users.
    pub const ALL: [Self; 3] = [Self::En, Self::It, Self::De];

    /// The ISO 639-1 code sent to the translation service.
    pub const fn code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::It => "it",
            Self::De => "de",
        }
    }

    pub fn supported_codes() -> Vec<&'static str> {
        Self::ALL.iter().map(|lang| lang.code()).collect()
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|lang| lang.code() == s)
            .ok_or_else(|| Error::UnsupportedLanguage {
                code: s.to_string(),
            })
    }
}

/// A client submission: an ordered, non-empty list of lines and the language
/// they should be translated into.
///
/// Jobs are immutable once built and are consumed exactly once by the
/// dispatcher via [`Job::into_work_items`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Job {
    lines: Vec<String>,
    language: Language,
}

impl Job {
    /// Builds a job, rejecting an empty line list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyJob`] if `lines` is empty.
    pub fn new(lines: Vec<String>, language: Language) -> Result<Self> {
        if lines.is_empty() {
            return Err(Error::EmptyJob);
        }
        Ok(Self { lines, language })
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub const fn language(&self) -> Language {
        self.language
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Always `false`; a job cannot be built without lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Expands the job into one [`WorkItem`] per line, in line order.
    pub fn into_work_items(self) -> impl ExactSizeIterator<Item = WorkItem> {
        let language = self.language;
        self.lines
            .into_iter()
            .map(move |text| WorkItem { text, language })
    }
}

/// One line plus its target language: the unit handed to a single
/// translation call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkItem {
    pub text: String,
    pub language: Language,
}
