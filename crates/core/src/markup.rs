//! Reader and writer for the restricted plist dialect used by save files.
//!
//! The dialect has no entity escaping and no attributes that matter, so the
//! reader is a forward-only tag scanner rather than an XML parser. Tags outside
//! the recognized vocabulary are transparent.

use std::fmt::Write as _;

use crate::error::{SaveError, SaveResult};
use crate::migration::Generation;
use crate::node::{lenient_int, Dict, Node};

/// Maximum dict nesting accepted by [`parse`].
pub const DEFAULT_MAX_DEPTH: usize = 128;

const XML_DECLARATION: &str = "<?xml version=\"1.0\"?>";
const PLIST_OPEN_CURRENT: &str = "<plist version=\"1.0\" gjver=\"2.0\">";
const PLIST_OPEN_LEGACY: &str = "<plist version=\"1.0\">";
const PLIST_CLOSE: &str = "</plist>";

/// Parses markup text into its root dict using the default nesting limit.
pub fn parse(text: &str) -> SaveResult<Dict> {
    MarkupParser::default().parse(text)
}

/// Compact form with the current-generation header.
pub fn build(root: &Dict) -> String {
    build_for(root, Generation::Current)
}

/// Compact form with the header matching `generation`.
pub fn build_for(root: &Dict, generation: Generation) -> String {
    let mut out = String::with_capacity(256);
    out.push_str(XML_DECLARATION);
    out.push_str(plist_open(generation));
    out.push_str("<dict>");
    write_entries(&mut out, root);
    out.push_str("</dict>");
    out.push_str(PLIST_CLOSE);
    out
}

/// Indented form for human editing; parses back to the same tree.
pub fn build_pretty(root: &Dict) -> String {
    build_pretty_for(root, Generation::Current)
}

pub fn build_pretty_for(root: &Dict, generation: Generation) -> String {
    let mut out = String::with_capacity(256);
    out.push_str(XML_DECLARATION);
    out.push('\n');
    out.push_str(plist_open(generation));
    out.push_str("\n<dict>");
    write_entries_pretty(&mut out, root, 1);
    out.push_str("\n</dict>\n");
    out.push_str(PLIST_CLOSE);
    out
}

/// Headerless `<d>...</d>` element, as used by packaged single-entry exports.
pub fn build_fragment(dict: &Dict) -> String {
    let mut out = String::new();
    write_value(&mut out, &Node::Dict(dict.clone()));
    out
}

fn plist_open(generation: Generation) -> &'static str {
    match generation {
        Generation::Current => PLIST_OPEN_CURRENT,
        Generation::Legacy => PLIST_OPEN_LEGACY,
    }
}

fn write_entries(out: &mut String, dict: &Dict) {
    for (key, value) in dict.iter() {
        let _ = write!(out, "<k>{key}</k>");
        write_value(out, value);
    }
}

fn write_value(out: &mut String, value: &Node) {
    match value {
        Node::Dict(dict) if dict.is_empty() => out.push_str("<d />"),
        Node::Dict(dict) => {
            out.push_str("<d>");
            write_entries(out, dict);
            out.push_str("</d>");
        }
        Node::Bool(true) => out.push_str("<t />"),
        Node::Bool(false) => out.push_str("<f />"),
        Node::Integer(number) => {
            let _ = write!(out, "<i>{number}</i>");
        }
        Node::Real(number) => {
            let _ = write!(out, "<r>{number}</r>");
        }
        Node::Text(text) => {
            let _ = write!(out, "<s>{text}</s>");
        }
    }
}

fn write_entries_pretty(out: &mut String, dict: &Dict, level: usize) {
    let indent = "  ".repeat(level);
    for (key, value) in dict.iter() {
        let _ = write!(out, "\n{indent}<k>{key}</k>");
        match value {
            Node::Dict(child) if !child.is_empty() => {
                let _ = write!(out, "\n{indent}<d>");
                write_entries_pretty(out, child, level + 1);
                let _ = write!(out, "\n{indent}</d>");
            }
            scalar => {
                out.push('\n');
                out.push_str(&indent);
                write_value(out, scalar);
            }
        }
    }
}

/// Markup reader with a bounded nesting depth.
#[derive(Clone, Copy, Debug)]
pub struct MarkupParser {
    max_depth: usize,
}

impl Default for MarkupParser {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl MarkupParser {
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            max_depth: max_depth.max(1),
        }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Parses `text` into its root dict.
    ///
    /// Everything before the first dict-open tag is ignored. Input that ends
    /// while dicts are still open is closed implicitly.
    pub fn parse(&self, text: &str) -> SaveResult<Dict> {
        let cleaned;
        let source = if text.contains('\0') {
            cleaned = text.replace('\0', "");
            cleaned.as_str()
        } else {
            text
        };
        let mut scanner = Scanner::new(source);

        loop {
            match scanner.next_token() {
                None => return Err(SaveError::malformed("no dict root element found")),
                Some(Token::DictOpen) => break,
                Some(Token::Value(Node::Dict(empty))) => return Ok(empty),
                Some(_) => {}
            }
        }

        let mut current = Frame::new(None);
        let mut parents: Vec<Frame> = Vec::new();
        while let Some(token) = scanner.next_token() {
            match token {
                Token::Key(key) => current.pending = Some(key),
                Token::Value(value) => current.accept(value),
                Token::DictOpen => {
                    let depth = parents.len() + 2;
                    if depth > self.max_depth {
                        return Err(SaveError::malformed(format!(
                            "dict nesting exceeds {} levels",
                            self.max_depth
                        )));
                    }
                    let slot = current.pending.take();
                    parents.push(std::mem::replace(&mut current, Frame::new(slot)));
                }
                Token::DictClose => match parents.pop() {
                    Some(parent) => {
                        let child = std::mem::replace(&mut current, parent);
                        current.attach(child);
                    }
                    None => return Ok(current.dict),
                },
            }
        }

        while let Some(parent) = parents.pop() {
            let child = std::mem::replace(&mut current, parent);
            current.attach(child);
        }
        Ok(current.dict)
    }
}

/// One open dict while parsing.
struct Frame {
    dict: Dict,
    /// Key this dict is stored under in its parent; `None` drops the dict.
    slot: Option<String>,
    pending: Option<String>,
}

impl Frame {
    fn new(slot: Option<String>) -> Self {
        Self {
            dict: Dict::new(),
            slot,
            pending: None,
        }
    }

    fn accept(&mut self, value: Node) {
        if let Some(key) = self.pending.take() {
            self.dict.insert(key, value);
        }
    }

    fn attach(&mut self, child: Frame) {
        if let Some(key) = child.slot {
            self.dict.insert(key, Node::Dict(child.dict));
        }
    }
}

#[derive(Debug)]
enum Token {
    DictOpen,
    DictClose,
    Key(String),
    Value(Node),
}

struct Scanner<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn next_token(&mut self) -> Option<Token> {
        loop {
            let src = self.src;
            let open = self.pos + src[self.pos..].find('<')?;
            let close = open + src[open..].find('>')?;
            let tag = &src[open + 1..close];
            self.pos = close + 1;
            if let Some(token) = self.classify(tag) {
                return Some(token);
            }
        }
    }

    fn classify(&mut self, tag: &str) -> Option<Token> {
        let closing = tag.starts_with('/');
        let self_closing = tag.ends_with('/');
        let name = tag
            .trim_start_matches('/')
            .split(char::is_whitespace)
            .next()
            .unwrap_or_default()
            .trim_end_matches('/');

        if closing {
            return matches!(name, "d" | "dict").then_some(Token::DictClose);
        }

        let token = match name {
            "d" | "dict" if self_closing => Token::Value(Node::Dict(Dict::new())),
            "d" | "dict" => Token::DictOpen,
            "k" | "key" => Token::Key(self.element_text(name, self_closing).to_string()),
            "s" | "string" => {
                Token::Value(Node::Text(self.element_text(name, self_closing).to_string()))
            }
            "i" | "integer" => {
                Token::Value(Node::Integer(lenient_int(self.element_text(name, self_closing))))
            }
            "r" | "real" => {
                let raw = self.element_text(name, self_closing);
                Token::Value(Node::Real(raw.trim().parse().unwrap_or(0.0)))
            }
            "t" | "true" => Token::Value(Node::Bool(true)),
            "f" | "false" => Token::Value(Node::Bool(false)),
            _ => return None,
        };
        Some(token)
    }

    /// Consumes the text up to the matching close tag. A missing close tag
    /// consumes the rest of the input.
    fn element_text(&mut self, name: &str, self_closing: bool) -> &'a str {
        if self_closing {
            return "";
        }
        let end_tag = format!("</{name}>");
        let src = self.src;
        let rest = &src[self.pos..];
        match rest.find(&end_tag) {
            Some(offset) => {
                self.pos += offset + end_tag.len();
                &rest[..offset]
            }
            None => {
                self.pos = self.src.len();
                rest
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/markup_tests.rs"]
mod tests;
