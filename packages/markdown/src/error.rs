//! Diagnostics produced while parsing.
//!
//! Parsing never fails: every anomaly degrades to literal text or a flattened
//! structure and is reported here for callers that want to know.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseAnomaly {
    #[error("Code fence opened at line {line} is never closed")]
    UnclosedFence { line: usize },

    #[error("Unmatched `{delimiter}` at line {line} kept as text")]
    UnmatchedDelimiter { line: usize, delimiter: String },

    #[error("Nested list item at line {line} flattened into its parent list")]
    NestedListFlattened { line: usize },

    #[error("Continuation line {line} flattened into the previous list item")]
    ContinuationFlattened { line: usize },

    #[error("Heading marker with {hashes} `#` at line {line} kept as text")]
    HeadingTooDeep { line: usize, hashes: usize },
}

impl ParseAnomaly {
    /// 1-based source line the anomaly was found on
    pub fn line(&self) -> usize {
        match self {
            ParseAnomaly::UnclosedFence { line }
            | ParseAnomaly::UnmatchedDelimiter { line, .. }
            | ParseAnomaly::NestedListFlattened { line }
            | ParseAnomaly::ContinuationFlattened { line }
            | ParseAnomaly::HeadingTooDeep { line, .. } => *line,
        }
    }

    fn line_mut(&mut self) -> &mut usize {
        match self {
            ParseAnomaly::UnclosedFence { line }
            | ParseAnomaly::UnmatchedDelimiter { line, .. }
            | ParseAnomaly::NestedListFlattened { line }
            | ParseAnomaly::ContinuationFlattened { line }
            | ParseAnomaly::HeadingTooDeep { line, .. } => line,
        }
    }
}

/// Collection of anomalies from one parse
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ParseAnomalies {
    pub anomalies: Vec<ParseAnomaly>,
}

impl ParseAnomalies {
    pub fn new() -> Self {
        Self {
            anomalies: Vec::new(),
        }
    }

    pub fn push(&mut self, anomaly: ParseAnomaly) {
        self.anomalies.push(anomaly);
    }

    pub fn is_empty(&self) -> bool {
        self.anomalies.is_empty()
    }

    pub fn len(&self) -> usize {
        self.anomalies.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParseAnomaly> {
        self.anomalies.iter()
    }

    pub fn extend(&mut self, other: impl IntoIterator<Item = ParseAnomaly>) {
        self.anomalies.extend(other);
    }

    /// Re-base line numbers of a nested parse onto the enclosing source
    pub(crate) fn shift_lines(&mut self, offset: usize) {
        for anomaly in &mut self.anomalies {
            *anomaly.line_mut() += offset;
        }
    }
}

impl IntoIterator for ParseAnomalies {
    type Item = ParseAnomaly;
    type IntoIter = std::vec::IntoIter<ParseAnomaly>;

    fn into_iter(self) -> Self::IntoIter {
        self.anomalies.into_iter()
    }
}
