//! Recursive-descent grammar turning configuration text into a raw tree.

use std::iter;
use std::path::{Path, PathBuf};

use super::cursor::Cursor;
use crate::error::{Error, Result};
use crate::merge::ConfigMerger;
use crate::path::ConfigPath;
use crate::value::{
    Concatenation, ConfigObject, ConfigValue, IncludeDirective, IncludeKind, Number, Part,
    SubstitutionRef,
};

/// Maximum nesting of objects and arrays.
pub const MAX_DEPTH: usize = 128;

const INCLUDE_KINDS: [(&str, IncludeKind); 3] = [
    ("file(", IncludeKind::File),
    ("url(", IncludeKind::Url),
    ("classpath(", IncludeKind::Classpath),
];

/// Characters that end an unquoted token.
fn is_forbidden(c: char) -> bool {
    matches!(
        c,
        '$' | '"' | '{' | '}' | '[' | ']' | ':' | '=' | ',' | '+' | '#' | '`' | '^' | '?' | '!'
            | '@' | '*' | '&' | '\\'
    )
}

fn is_inline_space(c: char) -> bool {
    c != '\n' && c.is_whitespace()
}

/// Converts a standalone unquoted token into a keyword or number if it is one.
fn keyword(text: String) -> ConfigValue {
    match text.as_str() {
        "true" => ConfigValue::Bool(true),
        "false" => ConfigValue::Bool(false),
        "null" => ConfigValue::Null,
        _ => match Number::parse(&text) {
            Some(number) => ConfigValue::Number(number),
            None => ConfigValue::String(text),
        },
    }
}

pub(crate) struct Parser {
    cursor: Cursor,
    base_dir: Option<PathBuf>,
    depth: usize,
}

impl Parser {
    pub(crate) fn new(text: &str, base_dir: Option<&Path>) -> Self {
        Self {
            cursor: Cursor::new(text),
            base_dir: base_dir.map(Path::to_path_buf),
            depth: 0,
        }
    }

    pub(crate) fn parse_document(mut self) -> Result<ConfigObject> {
        self.skip_blank();
        let root = match self.cursor.peek() {
            Some('{') => {
                self.cursor.bump();
                self.parse_members(Some('}'), &ConfigPath::root())?
            }
            Some('[') => {
                return Err(self
                    .cursor
                    .error("the document root must be an object, not an array"))
            }
            _ => self.parse_members(None, &ConfigPath::root())?,
        };
        self.skip_blank();
        if !self.cursor.is_eof() {
            return Err(self.cursor.error("unexpected content after the end of the document"));
        }
        Ok(root)
    }

    /// Parses object members up to `close` (or end of input for the braceless root).
    fn parse_members(&mut self, close: Option<char>, prefix: &ConfigPath) -> Result<ConfigObject> {
        self.enter()?;
        let mut object = ConfigObject::new();
        loop {
            self.skip_blank();
            match self.cursor.peek() {
                None if close.is_none() => break,
                None => return Err(self.cursor.error("unterminated object, expected '}'")),
                Some(c) if Some(c) == close => {
                    self.cursor.bump();
                    break;
                }
                Some(',') => return Err(self.cursor.error("unexpected ','")),
                _ => {}
            }

            if self.at_include() {
                let directive = self.parse_include()?;
                object.push_include(directive);
            } else {
                let (key, value) = self.parse_member(prefix)?;
                ConfigMerger::merge_into(&mut object, Self::nest(key, value));
            }

            self.skip_inline();
            match self.cursor.peek() {
                Some(',') => {
                    self.cursor.bump();
                }
                None | Some('\n') => {}
                Some(c) if Some(c) == close => {}
                Some(c) => {
                    return Err(self
                        .cursor
                        .error(format!("expected ',' or a newline after a field, found '{c}'")))
                }
            }
        }
        self.depth -= 1;
        Ok(object)
    }

    /// Expands a dotted key into nested single-key objects.
    fn nest(key: Vec<String>, value: ConfigValue) -> ConfigObject {
        let mut segments = key.into_iter().rev();
        let innermost = segments.next().unwrap_or_default();
        segments.fold(
            iter::once((innermost, value)).collect(),
            |inner: ConfigObject, segment| iter::once((segment, ConfigValue::Object(inner))).collect(),
        )
    }

    fn parse_member(&mut self, prefix: &ConfigPath) -> Result<(Vec<String>, ConfigValue)> {
        let key = self.parse_key()?;
        self.skip_inline_spaces();
        let path = prefix.join(&ConfigPath::from_segments(key.iter().cloned()));
        if path.len() > MAX_DEPTH {
            return Err(self
                .cursor
                .error(format!("key path deeper than {MAX_DEPTH} segments")));
        }

        let value = match self.cursor.peek() {
            Some('{') => self.parse_value(&path)?,
            Some(':' | '=') => {
                self.cursor.bump();
                self.skip_blank();
                self.parse_value(&path)?
            }
            Some('+') if self.cursor.peek_at(1) == Some('=') => {
                self.cursor.bump_n(2);
                self.skip_blank();
                let element = self.parse_value(&path)?;
                ConfigValue::Unresolved(Concatenation::new(vec![
                    Part::Substitution(SubstitutionRef::new(path, true)),
                    Part::Literal(ConfigValue::Array(vec![element])),
                ]))
            }
            Some(c) => {
                return Err(self
                    .cursor
                    .error(format!("expected ':', '=' or '{{' after key, found '{c}'")))
            }
            None => {
                return Err(self
                    .cursor
                    .error("expected ':', '=' or '{' after key, found end of input"))
            }
        };
        Ok((key, value))
    }

    /// Parses a key path. Unquoted dots split segments, quoted ones do not, and
    /// whitespace between key tokens belongs to the key.
    fn parse_key(&mut self) -> Result<Vec<String>> {
        let mut segments = Vec::new();
        let mut current = String::new();
        let mut has_content = false;
        let mut pending_space = String::new();

        loop {
            let text = match self.cursor.peek() {
                Some('"') => {
                    if self.cursor.starts_with("\"\"\"") {
                        return Err(self.cursor.error("triple-quoted strings cannot be keys"));
                    }
                    self.parse_quoted()?
                }
                Some('.') => {
                    if !has_content {
                        return Err(self.cursor.error("empty key segment"));
                    }
                    self.cursor.bump();
                    segments.push(std::mem::take(&mut current));
                    has_content = false;
                    pending_space.clear();
                    continue;
                }
                Some(c) if is_inline_space(c) => {
                    pending_space.push(c);
                    self.cursor.bump();
                    continue;
                }
                Some(_) if self.at_unquoted() => self.read_unquoted(true),
                _ => break,
            };
            if has_content {
                current.push_str(&pending_space);
            }
            pending_space.clear();
            current.push_str(&text);
            has_content = true;
        }

        if !has_content {
            return Err(match (segments.is_empty(), self.cursor.peek()) {
                (false, _) => self.cursor.error("empty key segment"),
                (true, Some(c)) => self.cursor.error(format!("expected a key, found '{c}'")),
                (true, None) => self.cursor.error("expected a key, found end of input"),
            });
        }
        segments.push(current);
        Ok(segments)
    }

    /// Parses the tokens of one value up to the end of the logical line.
    fn parse_value(&mut self, path: &ConfigPath) -> Result<ConfigValue> {
        let mut parts = Vec::new();
        let mut first_unquoted = false;

        loop {
            let space = self.take_inline_spaces();
            if self.at_value_end() {
                break;
            }
            if !space.is_empty() && !parts.is_empty() {
                parts.push(Part::Whitespace(space));
            }

            let part = match self.cursor.peek() {
                Some('{') => {
                    self.cursor.bump();
                    Part::Literal(ConfigValue::Object(self.parse_members(Some('}'), path)?))
                }
                Some('[') => {
                    self.cursor.bump();
                    Part::Literal(ConfigValue::Array(self.parse_array(path)?))
                }
                Some('"') if self.cursor.starts_with("\"\"\"") => {
                    Part::Literal(ConfigValue::String(self.parse_triple_quoted()?))
                }
                Some('"') => Part::Literal(ConfigValue::String(self.parse_quoted()?)),
                Some('$') if self.cursor.peek_at(1) == Some('{') => {
                    Part::Substitution(self.parse_substitution()?)
                }
                Some(_) if self.at_unquoted() => {
                    first_unquoted |= parts.is_empty();
                    Part::Literal(ConfigValue::String(self.read_unquoted(false)))
                }
                Some(c) => return Err(self.cursor.error(format!("unexpected '{c}' in value"))),
                None => break,
            };
            parts.push(part);
        }

        if parts.len() > 1 {
            return Ok(ConfigValue::Unresolved(Concatenation::new(parts)));
        }
        match parts.pop() {
            Some(Part::Literal(ConfigValue::String(text))) if first_unquoted => Ok(keyword(text)),
            Some(Part::Literal(value)) => Ok(value),
            Some(part) => Ok(ConfigValue::Unresolved(Concatenation::new(vec![part]))),
            None => Err(self.cursor.error("expected a value")),
        }
    }

    fn parse_array(&mut self, path: &ConfigPath) -> Result<Vec<ConfigValue>> {
        self.enter()?;
        let mut items = Vec::new();
        loop {
            self.skip_blank();
            match self.cursor.peek() {
                None => return Err(self.cursor.error("unterminated array, expected ']'")),
                Some(']') => {
                    self.cursor.bump();
                    break;
                }
                Some(',') => return Err(self.cursor.error("unexpected ','")),
                _ => {}
            }

            items.push(self.parse_value(path)?);

            self.skip_inline();
            match self.cursor.peek() {
                Some(',') => {
                    self.cursor.bump();
                }
                Some('\n' | ']') => {}
                None => return Err(self.cursor.error("unterminated array, expected ']'")),
                Some(c) => {
                    return Err(self
                        .cursor
                        .error(format!("expected ',' or ']' in array, found '{c}'")))
                }
            }
        }
        self.depth -= 1;
        Ok(items)
    }

    fn parse_quoted(&mut self) -> Result<String> {
        self.cursor.bump();
        let mut text = String::new();
        loop {
            match self.cursor.bump() {
                None | Some('\n') => return Err(self.cursor.error("unterminated quoted string")),
                Some('"') => return Ok(text),
                Some('\\') => {
                    let escaped = match self.cursor.bump() {
                        Some('"') => '"',
                        Some('\\') => '\\',
                        Some('/') => '/',
                        Some('b') => '\u{8}',
                        Some('f') => '\u{c}',
                        Some('n') => '\n',
                        Some('r') => '\r',
                        Some('t') => '\t',
                        Some('u') => self.parse_unicode_escape()?,
                        Some(other) => {
                            return Err(self.cursor.error(format!("invalid escape '\\{other}'")))
                        }
                        None => return Err(self.cursor.error("unterminated quoted string")),
                    };
                    text.push(escaped);
                }
                Some(c) => text.push(c),
            }
        }
    }

    fn parse_hex4(&mut self) -> Result<u32> {
        let mut code = 0;
        for _ in 0..4 {
            let digit = self
                .cursor
                .bump()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| self.cursor.error("invalid unicode escape"))?;
            code = code * 16 + digit;
        }
        Ok(code)
    }

    fn parse_unicode_escape(&mut self) -> Result<char> {
        let high = self.parse_hex4()?;
        let code = if (0xD800..0xDC00).contains(&high) && self.cursor.eat("\\u") {
            let low = self.parse_hex4()?;
            0x10000 + ((high - 0xD800) << 10) + (low.wrapping_sub(0xDC00) & 0x3FF)
        } else {
            high
        };
        char::from_u32(code).ok_or_else(|| self.cursor.error("invalid unicode escape"))
    }

    /// Parses `"""..."""`. No escapes are processed; quotes beyond the
    /// closing three belong to the content.
    fn parse_triple_quoted(&mut self) -> Result<String> {
        self.cursor.bump_n(3);
        let mut text = String::new();
        loop {
            if self.cursor.starts_with("\"\"\"") {
                let mut quotes = 3;
                while self.cursor.peek_at(quotes) == Some('"') {
                    quotes += 1;
                }
                text.extend(iter::repeat('"').take(quotes - 3));
                self.cursor.bump_n(quotes);
                return Ok(text);
            }
            match self.cursor.bump() {
                Some(c) => text.push(c),
                None => return Err(self.cursor.error("unterminated triple-quoted string")),
            }
        }
    }

    fn parse_substitution(&mut self) -> Result<SubstitutionRef> {
        self.cursor.bump_n(2);
        let optional = self.cursor.eat("?");
        let mut expr = String::new();
        let mut in_quotes = false;
        loop {
            match self.cursor.bump() {
                None | Some('\n') => {
                    return Err(self.cursor.error("unterminated substitution, expected '}'"))
                }
                Some('}') if !in_quotes => break,
                Some('"') => {
                    in_quotes = !in_quotes;
                    expr.push('"');
                }
                Some('\\') if in_quotes => {
                    expr.push('\\');
                    if let Some(c) = self.cursor.bump() {
                        expr.push(c);
                    }
                }
                Some(c) => expr.push(c),
            }
        }

        let path = ConfigPath::parse(&expr).map_err(|err| match err {
            Error::InvalidPath { reason, .. } => self
                .cursor
                .error(format!("invalid substitution path '{expr}': {reason}")),
            other => other,
        })?;
        let raw_text = format!("${{{}{}}}", if optional { "?" } else { "" }, expr.trim());
        Ok(SubstitutionRef {
            path,
            optional,
            raw_text,
            root_path: None,
        })
    }

    /// `include` followed by a quoted string or one of the include forms.
    fn at_include(&self) -> bool {
        if !self.cursor.starts_with("include") {
            return false;
        }
        let mut offset = "include".len();
        if !self.cursor.peek_at(offset).is_some_and(is_inline_space) {
            return false;
        }
        while self.cursor.peek_at(offset).is_some_and(is_inline_space) {
            offset += 1;
        }
        self.cursor.peek_at(offset) == Some('"')
            || self.cursor.matches_at(offset, "required(")
            || INCLUDE_KINDS
                .iter()
                .any(|(form, _)| self.cursor.matches_at(offset, form))
    }

    fn parse_include(&mut self) -> Result<IncludeDirective> {
        self.cursor.bump_n("include".len());
        self.skip_inline_spaces();
        let required = self.cursor.eat("required(");
        if required {
            self.skip_inline_spaces();
        }
        let (kind, location) = self.parse_include_target()?;
        if required {
            self.skip_inline_spaces();
            self.expect(')')?;
        }
        Ok(IncludeDirective {
            kind,
            required,
            location,
            base_dir: self.base_dir.clone(),
        })
    }

    fn parse_include_target(&mut self) -> Result<(IncludeKind, String)> {
        for (form, kind) in INCLUDE_KINDS {
            if self.cursor.eat(form) {
                self.skip_inline_spaces();
                let location = self.parse_include_location()?;
                self.skip_inline_spaces();
                self.expect(')')?;
                return Ok((kind, location));
            }
        }
        let location = self.parse_include_location()?;
        let kind = if location.contains("://") {
            IncludeKind::Url
        } else {
            IncludeKind::File
        };
        Ok((kind, location))
    }

    fn parse_include_location(&mut self) -> Result<String> {
        if self.cursor.peek() == Some('"') && !self.cursor.starts_with("\"\"\"") {
            self.parse_quoted()
        } else {
            Err(self.cursor.error("include location must be a quoted string"))
        }
    }

    fn expect(&mut self, expected: char) -> Result<()> {
        match self.cursor.peek() {
            Some(c) if c == expected => {
                self.cursor.bump();
                Ok(())
            }
            Some(c) => Err(self
                .cursor
                .error(format!("expected '{expected}', found '{c}'"))),
            None => Err(self
                .cursor
                .error(format!("expected '{expected}', found end of input"))),
        }
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self
                .cursor
                .error(format!("nesting deeper than {MAX_DEPTH} levels")));
        }
        Ok(())
    }

    fn at_unquoted(&self) -> bool {
        match self.cursor.peek() {
            Some(c) => !c.is_whitespace() && !is_forbidden(c) && !self.cursor.starts_with("//"),
            None => false,
        }
    }

    fn read_unquoted(&mut self, stop_at_dot: bool) -> String {
        let mut text = String::new();
        while let Some(c) = self.cursor.peek() {
            if c.is_whitespace()
                || is_forbidden(c)
                || (stop_at_dot && c == '.')
                || self.cursor.starts_with("//")
            {
                break;
            }
            text.push(c);
            self.cursor.bump();
        }
        text
    }

    fn at_value_end(&self) -> bool {
        matches!(
            self.cursor.peek(),
            None | Some('\n' | ',' | '}' | ']' | '#')
        ) || self.cursor.starts_with("//")
    }

    fn take_inline_spaces(&mut self) -> String {
        let mut space = String::new();
        while let Some(c) = self.cursor.peek().filter(|c| is_inline_space(*c)) {
            space.push(c);
            self.cursor.bump();
        }
        space
    }

    fn skip_inline_spaces(&mut self) {
        self.take_inline_spaces();
    }

    fn skip_comment(&mut self) {
        while let Some(c) = self.cursor.peek() {
            if c == '\n' {
                break;
            }
            self.cursor.bump();
        }
    }

    /// Skips whitespace, newlines and comments.
    fn skip_blank(&mut self) {
        loop {
            match self.cursor.peek() {
                Some(c) if c.is_whitespace() => {
                    self.cursor.bump();
                }
                Some('#') => self.skip_comment(),
                Some('/') if self.cursor.peek_at(1) == Some('/') => self.skip_comment(),
                _ => break,
            }
        }
    }

    /// Skips whitespace and comments without crossing a newline.
    fn skip_inline(&mut self) {
        self.skip_inline_spaces();
        if self.cursor.peek() == Some('#') || self.cursor.starts_with("//") {
            self.skip_comment();
        }
    }
}
