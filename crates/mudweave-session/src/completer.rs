//! Tab completion over nouns seen in game output.

use std::collections::BTreeSet;

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref ANSI_ESCAPE: Regex = Regex::new(r"\x1b\[[0-9;?]*[A-Za-z]").unwrap();
}

/// Collects capitalised words from inbound lines and completes the last
/// word of the input against them.
#[derive(Debug, Default, Clone)]
pub struct Completer {
    nouns: BTreeSet<String>,
}

impl Completer {
    /// Create an empty completer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Harvest nouns from a line of game text.
    pub fn parse(&mut self, line: &str) {
        let plain = ANSI_ESCAPE.replace_all(line, "");
        for word in plain.split_whitespace() {
            if !word.starts_with(|c: char| c.is_ascii_uppercase()) {
                continue;
            }
            let noun: String = word
                .chars()
                .filter(|c| c.is_alphabetic())
                .flat_map(char::to_lowercase)
                .collect();
            if !noun.is_empty() {
                self.nouns.insert(noun);
            }
        }
    }

    /// The `state`-th noun extending the last word of `text`, followed by a
    /// space. `None` once candidates run out.
    pub fn complete(&self, text: &str, state: usize) -> Option<String> {
        let last = text.split_whitespace().last()?;
        self.nouns
            .iter()
            .filter(|noun| noun.starts_with(last) && noun.as_str() != last)
            .nth(state)
            .map(|noun| format!("{noun} "))
    }

    /// Number of nouns collected.
    pub fn len(&self) -> usize {
        self.nouns.len()
    }

    /// Whether no noun was collected yet.
    pub fn is_empty(&self) -> bool {
        self.nouns.is_empty()
    }
}
