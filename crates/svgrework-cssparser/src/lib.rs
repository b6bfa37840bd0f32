//! # SVG Rework CSS Parser
//!
//! Stylesheet parser and serializer for the svgrework transform.
//!
//! Parses `selector, selector { prop: value; }` rules into an AST, keeps grouping
//! at-rules (`@media`, `@supports`, ...) as containers of nested rules, and writes
//! the AST back out as text once declarations have been rewritten.
//!
//! Declaration values are read quote- and parenthesis-aware, so a value such as
//! `url('data:image/svg+xml;base64,...')` survives intact.

use thiserror::Error;

/// Errors that can occur while parsing CSS.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unexpected end of input")]
    UnexpectedEof,

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// A parsed stylesheet AST.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct StylesheetAst {
    pub rules: Vec<RuleAst>,
}

impl StylesheetAst {
    /// Number of top-level rules.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Serialize the stylesheet back to CSS text.
    pub fn to_css(&self) -> String {
        let mut out = String::new();
        write_rules(&self.rules, "", &mut out);
        out
    }
}

/// A parsed rule.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleAst {
    /// A rule carrying declarations.
    Style(StyleRuleAst),
    /// A grouping at-rule carrying nested rules.
    Container(ContainerRuleAst),
    /// A block-less at-rule such as `@import url(a.css)`, kept verbatim.
    Statement(String),
}

/// A style rule: selectors sharing one declaration block.
///
/// At-rules whose block only holds declarations (`@font-face`, `@page`) are
/// represented as a style rule whose single selector is the at-rule prelude.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleRuleAst {
    pub selectors: Vec<String>,
    pub declarations: Vec<DeclarationAst>,
}

/// A grouping at-rule (`@media screen { ... }`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContainerRuleAst {
    /// The at-rule text before `{`, e.g. `@media (min-width: 600px)`.
    pub prelude: String,
    pub rules: Vec<RuleAst>,
}

/// A parsed declaration AST.
#[derive(Debug, Clone, PartialEq)]
pub struct DeclarationAst {
    pub property: String,
    pub value: String,
    pub important: bool,
}

impl DeclarationAst {
    pub fn new(property: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            value: value.into(),
            important: false,
        }
    }
}

/// Parse a stylesheet into an AST.
///
/// Notes:
/// - This is not a full CSS parser; there is no tokenization beyond what is
///   needed to find rule and declaration boundaries.
/// - Comments are skipped and not preserved.
/// - An unclosed block is an error; trailing text with no block is ignored.
pub fn parse_stylesheet(css: &str) -> Result<StylesheetAst, ParseError> {
    let mut parser = Parser::new(css);
    let rules = parser.parse_rules(false)?;
    Ok(StylesheetAst { rules })
}

/// Split a selector list on top-level commas.
pub fn split_selectors(prelude: &str) -> Vec<String> {
    let mut selectors = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    for c in prelude.chars() {
        if let Some(q) = quote {
            current.push(c);
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => {
                quote = Some(c);
                current.push(c);
            }
            '(' | '[' => {
                depth += 1;
                current.push(c);
            }
            ')' | ']' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 0 => {
                push_selector(&mut selectors, &current);
                current.clear();
            }
            _ => current.push(c),
        }
    }
    push_selector(&mut selectors, &current);
    selectors
}

fn push_selector(selectors: &mut Vec<String>, raw: &str) {
    let selector = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if !selector.is_empty() {
        selectors.push(selector);
    }
}

/// What stopped a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stop {
    OpenBrace,
    CloseBrace,
    Colon,
    Semicolon,
    Eof,
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(css: &str) -> Self {
        Self {
            chars: css.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn at_comment(&self) -> bool {
        self.peek() == Some('/') && self.peek_at(1) == Some('*')
    }

    fn skip_comment(&mut self) {
        // consume "/*"
        self.pos += 2;
        while let Some(c) = self.bump() {
            if c == '*' && self.peek() == Some('/') {
                self.pos += 1;
                break;
            }
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            if self.at_comment() {
                self.skip_comment();
            } else if self.peek().is_some_and(char::is_whitespace) {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    /// Copy a quoted string (including its quotes) into `out`.
    fn read_string(&mut self, out: &mut String) {
        let Some(quote) = self.bump() else {
            return;
        };
        out.push(quote);
        while let Some(c) = self.bump() {
            out.push(c);
            if c == '\\' {
                if let Some(escaped) = self.bump() {
                    out.push(escaped);
                }
            } else if c == quote {
                break;
            }
        }
    }

    /// Read text until one of `stops` appears outside strings and parentheses.
    fn read_until(&mut self, stops: &[Stop]) -> (String, Stop) {
        let mut out = String::new();
        let mut depth = 0usize;

        loop {
            if self.at_comment() {
                self.skip_comment();
                continue;
            }
            let Some(c) = self.peek() else {
                return (out, Stop::Eof);
            };
            if depth == 0 {
                let stop = match c {
                    '{' => Some(Stop::OpenBrace),
                    '}' => Some(Stop::CloseBrace),
                    ':' => Some(Stop::Colon),
                    ';' => Some(Stop::Semicolon),
                    _ => None,
                };
                if let Some(stop) = stop.filter(|s| stops.contains(s)) {
                    self.pos += 1;
                    return (out, stop);
                }
            }
            match c {
                '"' | '\'' => {
                    self.read_string(&mut out);
                    continue;
                }
                '(' => depth += 1,
                ')' => depth = depth.saturating_sub(1),
                _ => {}
            }
            out.push(c);
            self.pos += 1;
        }
    }

    /// Look ahead (without consuming) to see whether the block just opened
    /// contains a nested block before its closing brace.
    fn block_has_nested_block(&self) -> bool {
        let mut pos = self.pos;
        let mut quote: Option<char> = None;
        while let Some(&c) = self.chars.get(pos) {
            pos += 1;
            if let Some(q) = quote {
                if c == '\\' {
                    pos += 1;
                } else if c == q {
                    quote = None;
                }
                continue;
            }
            match c {
                '"' | '\'' => quote = Some(c),
                '{' => return true,
                '}' => return false,
                _ => {}
            }
        }
        false
    }

    fn parse_rules(&mut self, nested: bool) -> Result<Vec<RuleAst>, ParseError> {
        let mut rules = Vec::new();

        loop {
            self.skip_whitespace_and_comments();
            match self.peek() {
                None if nested => return Err(ParseError::UnexpectedEof),
                None => break,
                Some('}') if nested => {
                    self.pos += 1;
                    break;
                }
                Some('}') => {
                    return Err(ParseError::ParseError(format!(
                        "Unexpected '}}' at offset {}",
                        self.pos
                    )));
                }
                Some(_) => {}
            }

            let (prelude, stop) =
                self.read_until(&[Stop::OpenBrace, Stop::Semicolon, Stop::CloseBrace]);
            let prelude = prelude.trim().to_string();
            let is_at_rule = prelude.starts_with('@');

            match stop {
                Stop::OpenBrace if is_at_rule && self.block_has_nested_block() => {
                    let nested_rules = self.parse_rules(true)?;
                    rules.push(RuleAst::Container(ContainerRuleAst {
                        prelude,
                        rules: nested_rules,
                    }));
                }
                Stop::OpenBrace => {
                    let declarations = self.parse_declarations()?;
                    let selectors = if is_at_rule {
                        vec![prelude]
                    } else {
                        split_selectors(&prelude)
                    };
                    if !selectors.is_empty() {
                        rules.push(RuleAst::Style(StyleRuleAst {
                            selectors,
                            declarations,
                        }));
                    }
                }
                Stop::Semicolon if is_at_rule => rules.push(RuleAst::Statement(prelude)),
                // Stray text terminated by ';' is not a rule.
                Stop::Semicolon => {}
                // Leave '}' for the enclosing loop.
                Stop::CloseBrace => self.pos -= 1,
                Stop::Colon | Stop::Eof => break,
            }
        }

        Ok(rules)
    }

    fn parse_declarations(&mut self) -> Result<Vec<DeclarationAst>, ParseError> {
        let mut decls = Vec::new();

        loop {
            self.skip_whitespace_and_comments();
            let (property, stop) =
                self.read_until(&[Stop::Colon, Stop::Semicolon, Stop::CloseBrace]);
            match stop {
                Stop::Colon => {}
                Stop::Semicolon => continue,
                Stop::CloseBrace => return Ok(decls),
                Stop::OpenBrace | Stop::Eof => return Err(ParseError::UnexpectedEof),
            }

            let (value, stop) = self.read_until(&[Stop::Semicolon, Stop::CloseBrace]);
            flush_decl(&property, &value, &mut decls);
            match stop {
                Stop::Semicolon => {}
                Stop::CloseBrace => return Ok(decls),
                _ => return Err(ParseError::UnexpectedEof),
            }
        }
    }
}

fn flush_decl(property: &str, value: &str, decls: &mut Vec<DeclarationAst>) {
    let property = property.trim();
    let value_raw = value.trim();
    if property.is_empty() || value_raw.is_empty() {
        return;
    }

    let (value, important) = strip_important(value_raw);
    decls.push(DeclarationAst {
        property: property.to_string(),
        value: value.to_string(),
        important,
    });
}

fn strip_important(value: &str) -> (&str, bool) {
    let lower = value.to_ascii_lowercase();
    match lower.rfind("!important") {
        Some(idx) if lower[idx..].trim_end() == "!important" => (value[..idx].trim_end(), true),
        _ => (value, false),
    }
}

fn write_rules(rules: &[RuleAst], indent: &str, out: &mut String) {
    for (i, rule) in rules.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        match rule {
            RuleAst::Style(style) => {
                out.push_str(indent);
                out.push_str(&style.selectors.join(&format!(",\n{indent}")));
                out.push_str(" {\n");
                for decl in &style.declarations {
                    out.push_str(indent);
                    out.push_str("  ");
                    out.push_str(&decl.property);
                    out.push_str(": ");
                    out.push_str(&decl.value);
                    if decl.important {
                        out.push_str(" !important");
                    }
                    out.push_str(";\n");
                }
                out.push_str(indent);
                out.push_str("}\n");
            }
            RuleAst::Container(container) => {
                out.push_str(indent);
                out.push_str(&container.prelude);
                out.push_str(" {\n");
                write_rules(&container.rules, &format!("{indent}  "), out);
                out.push_str(indent);
                out.push_str("}\n");
            }
            RuleAst::Statement(statement) => {
                out.push_str(indent);
                out.push_str(statement);
                out.push_str(";\n");
            }
        }
    }
}
