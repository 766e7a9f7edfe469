//! Exposition Parsing
//!
//! Parses a snapshot document back into typed metric families. Every non-blank,
//! non-comment line must match
//!
//! ```text
//! name ['{' label '=' "value" (',' label '=' "value")* [','] '}'] value [timestamp]
//! ```
//!
//! A line that does not parse is recorded in [`Exposition::errors`] and skipped;
//! the rest of the document is still used.
//!
//! # Families
//!
//! - The first sample seen for a name creates the family and fixes its ordered
//!   label-name vector.
//! - Later samples are aligned to that vector by label name. A sample carrying a
//!   different set of label names, or repeating a label set already seen, is skipped.
//! - The value kind comes from a `# TYPE` directive anywhere in the document and
//!   defaults to gauge. No inference is made from the family name.
//! - Help text comes from a `# HELP` directive, empty otherwise.

use super::{MetricFamily, MetricSample, ValueKind};
use crate::error::{ParseError, ParseErrorKind};
use std::collections::{HashMap, HashSet};

/// Result of parsing one document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Exposition {
    /// Families in order of first appearance
    pub families: Vec<MetricFamily>,
    /// Lines that were skipped
    pub errors: Vec<ParseError>,
}

impl Exposition {
    pub fn family(&self, name: &str) -> Option<&MetricFamily> {
        self.families.iter().find(|f| f.name == name)
    }

    /// All samples in family order
    pub fn samples(&self) -> impl Iterator<Item = &MetricSample> {
        self.families.iter().flat_map(|f| f.samples.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }
}

/// A syntactically valid sample line, before family alignment
#[derive(Debug)]
struct RawSample {
    name: String,
    labels: Vec<(String, String)>,
    value: f64,
}

struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(' ') | Some('\t')) {
            self.pos += 1;
        }
    }

    fn take_while(&mut self, first: impl Fn(char) -> bool, rest: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        if let Some(c) = self.peek() {
            if first(c) {
                self.pos += c.len_utf8();
                while let Some(c) = self.peek() {
                    if !rest(c) {
                        break;
                    }
                    self.pos += c.len_utf8();
                }
            }
        }
        &self.src[start..self.pos]
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == ':'
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == ':'
}

fn is_label_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_label_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn parse_label_value(cursor: &mut Cursor<'_>) -> Result<String, ParseErrorKind> {
    let mut value = String::new();
    loop {
        match cursor.bump() {
            None => return Err(ParseErrorKind::UnterminatedLabelValue),
            Some('"') => return Ok(value),
            Some('\\') => match cursor.bump() {
                Some('\\') => value.push('\\'),
                Some('"') => value.push('"'),
                Some('n') => value.push('\n'),
                None => return Err(ParseErrorKind::UnterminatedLabelValue),
                Some(_) => return Err(ParseErrorKind::InvalidEscape),
            },
            Some(c) => value.push(c),
        }
    }
}

fn parse_labels(cursor: &mut Cursor<'_>) -> Result<Vec<(String, String)>, ParseErrorKind> {
    let mut labels: Vec<(String, String)> = Vec::new();

    loop {
        cursor.skip_whitespace();
        if cursor.eat('}') {
            return Ok(labels);
        }
        if cursor.peek().is_none() {
            return Err(ParseErrorKind::UnterminatedLabels);
        }

        let name = cursor.take_while(is_label_start, is_label_char);
        if name.is_empty() {
            return Err(ParseErrorKind::InvalidLabelName);
        }

        cursor.skip_whitespace();
        if !cursor.eat('=') {
            return Err(match cursor.peek() {
                None => ParseErrorKind::UnterminatedLabels,
                Some(_) => ParseErrorKind::MissingEquals,
            });
        }

        cursor.skip_whitespace();
        if !cursor.eat('"') {
            return Err(match cursor.peek() {
                None => ParseErrorKind::UnterminatedLabels,
                Some(_) => ParseErrorKind::UnquotedLabelValue,
            });
        }
        let value = parse_label_value(cursor)?;

        if labels.iter().any(|(existing, _)| existing == name) {
            return Err(ParseErrorKind::DuplicateLabelName(name.to_string()));
        }
        labels.push((name.to_string(), value));

        cursor.skip_whitespace();
        if cursor.eat(',') {
            continue;
        }
        if cursor.eat('}') {
            return Ok(labels);
        }
        return Err(ParseErrorKind::UnterminatedLabels);
    }
}

fn parse_value(token: &str) -> Result<f64, ParseErrorKind> {
    // Rust accepts "inf"/"infinity"/"nan" in any case, which covers +Inf, -Inf and NaN.
    token
        .parse::<f64>()
        .map_err(|_| ParseErrorKind::InvalidValue(token.to_string()))
}

fn parse_sample_line(line: &str) -> Result<RawSample, ParseErrorKind> {
    let mut cursor = Cursor::new(line);

    let name = cursor.take_while(is_name_start, is_name_char);
    if name.is_empty() {
        return Err(ParseErrorKind::InvalidName);
    }

    cursor.skip_whitespace();
    let labels = if cursor.eat('{') {
        parse_labels(&mut cursor)?
    } else {
        Vec::new()
    };

    let mut tokens = cursor.rest().split_whitespace();
    let value = match tokens.next() {
        Some(token) => parse_value(token)?,
        None => return Err(ParseErrorKind::MissingValue),
    };

    if let Some(timestamp) = tokens.next() {
        timestamp
            .parse::<i64>()
            .map_err(|_| ParseErrorKind::InvalidTimestamp(timestamp.to_string()))?;
    }

    let trailing: Vec<&str> = tokens.collect();
    if !trailing.is_empty() {
        return Err(ParseErrorKind::TrailingText(trailing.join(" ")));
    }

    Ok(RawSample {
        name: name.to_string(),
        labels,
        value,
    })
}

fn unescape_help(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('\\') => out.push('\\'),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// `# HELP` / `# TYPE` directives; anything else after `#` is a comment.
enum Directive<'a> {
    Help(&'a str, String),
    Type(&'a str, ValueKind),
}

fn parse_directive(comment: &str) -> Option<Directive<'_>> {
    let body = comment.trim_start_matches('#').trim_start();
    let (keyword, rest) = body.split_once(char::is_whitespace)?;
    let rest = rest.trim_start();

    match keyword {
        "HELP" => {
            let (name, text) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            (!name.is_empty()).then(|| Directive::Help(name, unescape_help(text.trim_start())))
        }
        "TYPE" => {
            let mut parts = rest.split_whitespace();
            let name = parts.next()?;
            let kind = parts.next()?;
            Some(Directive::Type(name, ValueKind::from_type_keyword(kind)))
        }
        _ => None,
    }
}

#[derive(Default)]
struct FamilyBuilder {
    families: Vec<MetricFamily>,
    index: HashMap<String, usize>,
    seen: Vec<HashSet<Vec<String>>>,
}

impl FamilyBuilder {
    fn push(&mut self, raw: RawSample) -> Result<(), ParseErrorKind> {
        let Some(&idx) = self.index.get(&raw.name) else {
            let label_names: Vec<String> = raw.labels.iter().map(|(n, _)| n.clone()).collect();
            let values: Vec<String> = raw.labels.iter().map(|(_, v)| v.clone()).collect();

            self.index.insert(raw.name.clone(), self.families.len());
            self.seen.push(HashSet::from([values]));
            self.families.push(MetricFamily {
                name: raw.name.clone(),
                help: String::new(),
                kind: ValueKind::Gauge,
                label_names,
                samples: vec![MetricSample {
                    family_name: raw.name,
                    labels: raw.labels,
                    value: raw.value,
                    kind: ValueKind::Gauge,
                }],
            });
            return Ok(());
        };

        let family = &mut self.families[idx];
        let mismatch = || ParseErrorKind::LabelMismatch {
            family: raw.name.clone(),
        };

        if raw.labels.len() != family.label_names.len() {
            return Err(mismatch());
        }

        let mut aligned = Vec::with_capacity(family.label_names.len());
        for (i, name) in family.label_names.iter().enumerate() {
            // Fast path: same order as the first sample.
            let value = match raw.labels.get(i) {
                Some((n, v)) if n == name => v,
                _ => match raw.labels.iter().find(|(n, _)| n == name) {
                    Some((_, v)) => v,
                    None => return Err(mismatch()),
                },
            };
            aligned.push((name.clone(), value.clone()));
        }

        let values: Vec<String> = aligned.iter().map(|(_, v)| v.clone()).collect();
        if !self.seen[idx].insert(values) {
            return Err(ParseErrorKind::DuplicateSample { family: raw.name });
        }

        family.samples.push(MetricSample {
            family_name: raw.name,
            labels: aligned,
            value: raw.value,
            kind: ValueKind::Gauge,
        });
        Ok(())
    }

    fn finish(
        mut self,
        help: HashMap<String, String>,
        kinds: HashMap<String, ValueKind>,
    ) -> Vec<MetricFamily> {
        for family in &mut self.families {
            if let Some(text) = help.get(&family.name) {
                family.help = text.clone();
            }
            let kind = kinds.get(&family.name).copied().unwrap_or_default();
            family.kind = kind;
            for sample in &mut family.samples {
                sample.kind = kind;
            }
        }
        self.families
    }
}

/// Parse an exposition document.
///
/// Never fails as a whole: malformed lines are collected in
/// [`Exposition::errors`] and every well-formed line is kept.
pub fn parse_exposition(text: &str) -> Exposition {
    let mut builder = FamilyBuilder::default();
    let mut help = HashMap::new();
    let mut kinds = HashMap::new();
    let mut errors = Vec::new();

    for (n, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        if line.starts_with('#') {
            match parse_directive(line) {
                Some(Directive::Help(name, text)) => {
                    help.insert(name.to_string(), text);
                }
                Some(Directive::Type(name, kind)) => {
                    kinds.insert(name.to_string(), kind);
                }
                None => {}
            }
            continue;
        }

        let result = parse_sample_line(line).and_then(|raw| builder.push(raw));
        if let Err(kind) = result {
            errors.push(ParseError { line: n + 1, kind });
        }
    }

    Exposition {
        families: builder.finish(help, kinds),
        errors,
    }
}
