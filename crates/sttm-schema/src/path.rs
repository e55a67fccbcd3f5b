//! Path expressions over JSON documents
//!
//! A path is rooted at `$` (the document itself) and supports:
//!
//! - `.key` and `['key']` / `["key"]` for object members
//! - `[n]` for array elements, negative `n` counting from the end
//! - `.*` and `[*]` wildcards over array elements or object members
//!
//! Paths are parsed once when the registry is built so that malformed
//! syntax is reported as a configuration error, never per record.

use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// A single step in a path expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Object member access
    Key(String),
    /// Array element access
    Index(i64),
    /// Every child of an array or object
    Wildcard,
}

/// A parsed path expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonPath {
    expression: String,
    segments: Vec<Segment>,
}

impl JsonPath {
    /// Parse a path expression
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPath`] when the expression is not rooted at `$`
    /// or contains malformed segments.
    pub fn parse(expression: &str) -> Result<Self> {
        let segments = Parser::new(expression).parse()?;
        Ok(Self {
            expression: expression.to_string(),
            segments,
        })
    }

    /// The expression as written in the configuration
    pub fn as_str(&self) -> &str {
        &self.expression
    }

    /// Parsed segments, root first
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Whether the path denotes the document root itself
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Member name of the first segment, when it is a plain key
    pub fn top_level_key(&self) -> Option<&str> {
        match self.segments.first() {
            Some(Segment::Key(key)) => Some(key),
            _ => None,
        }
    }

    /// Resolve the path against a document and return the first match.
    ///
    /// `None` means the path matched nothing, which is distinct from a
    /// present JSON `null`.
    pub fn resolve<'a>(&self, document: &'a Value) -> Option<&'a Value> {
        first_match(document, &self.segments)
    }
}

fn first_match<'a>(node: &'a Value, segments: &[Segment]) -> Option<&'a Value> {
    let Some((head, rest)) = segments.split_first() else {
        return Some(node);
    };

    match head {
        Segment::Key(key) => node
            .as_object()?
            .get(key)
            .and_then(|child| first_match(child, rest)),
        Segment::Index(index) => {
            let items = node.as_array()?;
            let position = normalize_index(*index, items.len())?;
            first_match(&items[position], rest)
        }
        Segment::Wildcard => match node {
            Value::Array(items) => items.iter().find_map(|child| first_match(child, rest)),
            Value::Object(members) => members.values().find_map(|child| first_match(child, rest)),
            _ => None,
        },
    }
}

fn normalize_index(index: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let position = if index < 0 { len + index } else { index };
    if (0..len).contains(&position) {
        usize::try_from(position).ok()
    } else {
        None
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression)
    }
}

impl FromStr for JsonPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Hand-written recursive-descent parser over the expression characters
struct Parser<'a> {
    expression: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(expression: &'a str) -> Self {
        Self {
            expression,
            chars: expression.trim().chars().collect(),
            pos: 0,
        }
    }

    fn parse(mut self) -> Result<Vec<Segment>> {
        if self.next() != Some('$') {
            return Err(self.error("path must start with '$'"));
        }

        let mut segments = Vec::new();
        while let Some(c) = self.next() {
            let segment = match c {
                '.' => self.parse_dot()?,
                '[' => self.parse_bracket()?,
                other => return Err(self.error(format!("unexpected character '{other}'"))),
            };
            segments.push(segment);
        }
        Ok(segments)
    }

    fn parse_dot(&mut self) -> Result<Segment> {
        match self.peek() {
            Some('.') => Err(self.error("recursive descent is not supported")),
            Some('*') => {
                self.pos += 1;
                Ok(Segment::Wildcard)
            }
            _ => {
                let start = self.pos;
                while let Some(c) = self.peek() {
                    if c == '.' || c == '[' {
                        break;
                    }
                    self.pos += 1;
                }
                let key: String = self.chars[start..self.pos].iter().collect();
                if key.is_empty() {
                    return Err(self.error("empty member name after '.'"));
                }
                Ok(Segment::Key(key))
            }
        }
    }

    fn parse_bracket(&mut self) -> Result<Segment> {
        let segment = match self.peek() {
            Some(quote @ ('\'' | '"')) => {
                self.pos += 1;
                Segment::Key(self.parse_quoted(quote)?)
            }
            Some('*') => {
                self.pos += 1;
                Segment::Wildcard
            }
            Some(_) => {
                let start = self.pos;
                while matches!(self.peek(), Some(c) if c != ']') {
                    self.pos += 1;
                }
                let raw: String = self.chars[start..self.pos].iter().collect();
                let index = raw
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| self.error(format!("invalid array index '{raw}'")))?;
                Segment::Index(index)
            }
            None => return Err(self.error("unterminated '['")),
        };

        if self.next() != Some(']') {
            return Err(self.error("expected ']'"));
        }
        Ok(segment)
    }

    fn parse_quoted(&mut self, quote: char) -> Result<String> {
        let mut key = String::new();
        loop {
            match self.next() {
                Some('\\') => match self.next() {
                    Some(escaped) => key.push(escaped),
                    None => return Err(self.error("unterminated escape sequence")),
                },
                Some(c) if c == quote => return Ok(key),
                Some(c) => key.push(c),
                None => return Err(self.error("unterminated quoted member name")),
            }
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn error(&self, reason: impl Into<String>) -> Error {
        Error::invalid_path(self.expression, reason)
    }
}
