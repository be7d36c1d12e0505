//! Content search across every file of an unpacked archive.
//!
//! Files are scanned as bytes, line by line, so binary files are searched too.
//! Symlinks are not followed.

use log::{debug, warn};
use regex::bytes::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::errors::VerifyError;

/// Hits recorded per file; further matches in the same file are only counted.
const MAX_HITS_PER_FILE: usize = 5;
const MAX_LINE_CHARS: usize = 240;

/// Something that can decide whether a line contains a forbidden value.
pub trait ContentMatcher {
    fn is_match(&self, line: &[u8]) -> bool;

    /// Short description for logs and report messages.
    fn describe(&self) -> String;
}

/// Case-insensitive literal that must stand as its own token.
///
/// A candidate is rejected when the byte before it is an ASCII letter or digit,
/// or when the byte after it is. Underscore, hyphen, dot and the like are
/// boundaries, so `host1_eth0` and `host1-vm` match `host1` while `host10`
/// and `xhost1` do not.
#[derive(Debug, Clone)]
pub struct TokenPattern {
    literal: String,
    regex: Regex,
}

impl TokenPattern {
    pub fn new(literal: &str) -> Result<Self, VerifyError> {
        Ok(Self {
            literal: literal.to_string(),
            regex: literal_regex(literal)?,
        })
    }
}

impl ContentMatcher for TokenPattern {
    fn is_match(&self, line: &[u8]) -> bool {
        let mut pos = 0;
        while let Some(m) = self.regex.find_at(line, pos) {
            let before_ok = m.start() == 0 || !line[m.start() - 1].is_ascii_alphanumeric();
            let after_ok = m.end() == line.len() || !line[m.end()].is_ascii_alphanumeric();
            if before_ok && after_ok {
                return true;
            }
            // Occurrences may overlap, so resume one byte later.
            pos = m.start() + 1;
        }
        false
    }

    fn describe(&self) -> String {
        format!("token '{}'", crate::sensitive::loggable(&self.literal))
    }
}

/// Case-insensitive fixed string, matched anywhere.
#[derive(Debug, Clone)]
pub struct LiteralPattern {
    literal: String,
    regex: Regex,
}

impl LiteralPattern {
    pub fn new(literal: &str) -> Result<Self, VerifyError> {
        Ok(Self {
            literal: literal.to_string(),
            regex: literal_regex(literal)?,
        })
    }
}

impl ContentMatcher for LiteralPattern {
    fn is_match(&self, line: &[u8]) -> bool {
        self.regex.is_match(line)
    }

    fn describe(&self) -> String {
        format!("string '{}'", crate::sensitive::loggable(&self.literal))
    }
}

fn literal_regex(literal: &str) -> Result<Regex, VerifyError> {
    if literal.is_empty() {
        return Err(VerifyError::InvalidConfig("cannot search for an empty string".to_string()));
    }
    let pattern = regex::escape(literal);
    RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| VerifyError::Pattern(pattern, e))
}

/// One file containing a forbidden value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentHit {
    /// Relative to the searched root.
    pub path: PathBuf,
    /// 1-based line numbers and text of the first few matching lines.
    pub lines: Vec<(usize, String)>,
    /// Total matching lines in the file.
    pub total: usize,
}

impl ContentHit {
    /// `path:line: text` for the first recorded line, or just the path.
    pub fn summary(&self) -> String {
        match self.lines.first() {
            Some((n, text)) => format!("{}:{}: {}", self.path.display(), n, text),
            None => self.path.display().to_string(),
        }
    }
}

/// Every regular file under `root` with at least one matching line, in file
/// name order.
pub fn search_tree(root: &Path, matcher: &dyn ContentMatcher) -> Vec<ContentHit> {
    let mut hits = Vec::new();
    let mut scanned = 0usize;

    let walker = WalkDir::new(root).follow_links(false).sort_by_file_name();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        scanned += 1;
        match scan_file(entry.path(), matcher) {
            Ok(Some((lines, total))) => {
                let rel = entry.path().strip_prefix(root).unwrap_or(entry.path());
                hits.push(ContentHit {
                    path: rel.to_path_buf(),
                    lines,
                    total,
                });
            }
            Ok(None) => {}
            Err(e) => warn!("Skipping {}: {}", entry.path().display(), e),
        }
    }

    debug!(
        "Searched {} files for {}: {} file(s) matched.",
        scanned,
        matcher.describe(),
        hits.len()
    );
    hits
}

type FileMatches = (Vec<(usize, String)>, usize);

fn scan_file(path: &Path, matcher: &dyn ContentMatcher) -> std::io::Result<Option<FileMatches>> {
    let reader = BufReader::new(File::open(path)?);
    let mut lines = Vec::new();
    let mut total = 0usize;
    for (idx, line) in reader.split(b'\n').enumerate() {
        let line = line?;
        if matcher.is_match(&line) {
            total += 1;
            if lines.len() < MAX_HITS_PER_FILE {
                lines.push((idx + 1, printable(&line)));
            }
        }
    }
    Ok((total > 0).then_some((lines, total)))
}

fn printable(line: &[u8]) -> String {
    let text = String::from_utf8_lossy(line);
    let trimmed = text.trim();
    if trimmed.chars().count() > MAX_LINE_CHARS {
        let cut: String = trimmed.chars().take(MAX_LINE_CHARS).collect();
        format!("{}...", cut)
    } else {
        trimmed.to_string()
    }
}
