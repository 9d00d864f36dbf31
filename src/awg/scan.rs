//! Line scanner for the INI-like configuration text.
//!
//! The grammar is deliberately loose: configuration written by other clients
//! varies in formatting, so anything that is not a section header or a
//! `Key = Value` pair is dropped instead of failing the whole document.

use std::borrow::Cow;

/// Key/value pairs of one section, in first-seen order. Keys are lower-case.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Section(Vec<(String, String)>);

impl Section {
    /// A repeated key replaces the earlier value in place.
    pub fn insert(&mut self, key: String, value: String) {
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RawDocument {
    /// Shared by `[Interface]` and every other non-peer section tag.
    pub interface: Section,
    pub peers: Vec<Section>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Nothing,
    Interface,
    Peer,
}

#[derive(Debug, PartialEq, Eq)]
enum Line<'a> {
    Blank,
    Header(&'a str),
    Pair(&'a str, &'a str),
    Stray,
}

pub fn scan(text: &str) -> RawDocument {
    let (doc, _) = text.lines().fold(
        (RawDocument::default(), Target::Nothing),
        |(mut doc, target), raw| {
            let line = strip_comment(raw);

            let target = match classify(line.trim()) {
                Line::Header(tag) if tag.eq_ignore_ascii_case("peer") => {
                    doc.peers.push(Section::default());
                    Target::Peer
                }
                Line::Header(_) => Target::Interface,
                Line::Pair(key, value) => {
                    let section = match target {
                        Target::Nothing => None,
                        Target::Interface => Some(&mut doc.interface),
                        Target::Peer => doc.peers.last_mut(),
                    };

                    if let Some(section) = section {
                        section.insert(key.to_ascii_lowercase(), value.to_string());
                    }
                    target
                }
                Line::Blank | Line::Stray => target,
            };

            (doc, target)
        },
    );

    doc
}

/// Cuts the line at the first `#` not preceded by a backslash; `\#` is
/// unescaped to a literal `#`.
fn strip_comment(line: &str) -> Cow<'_, str> {
    if !line.contains('#') {
        return Cow::Borrowed(line);
    }

    let mut out = String::with_capacity(line.len());
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'#') => {
                out.push('#');
                chars.next();
            }
            '#' => break,
            c => out.push(c),
        }
    }

    Cow::Owned(out)
}

/// Inverse of the comment rule: a `#` inside a value is written as `\#`.
pub fn escape_comment(value: &str) -> Cow<'_, str> {
    if value.contains('#') {
        Cow::Owned(value.replace('#', "\\#"))
    } else {
        Cow::Borrowed(value)
    }
}

fn is_word(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

fn classify(line: &str) -> Line<'_> {
    if line.is_empty() {
        return Line::Blank;
    }

    if let Some(tag) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
        return if is_word(tag) {
            Line::Header(tag)
        } else {
            Line::Stray
        };
    }

    match line.split_once('=') {
        Some((key, value)) => {
            let key = key.trim_end();
            let value = value.trim();

            if is_word(key) && !value.is_empty() {
                Line::Pair(key, value)
            } else {
                Line::Stray
            }
        }
        None => Line::Stray,
    }
}
