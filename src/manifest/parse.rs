//! Reader for data files
//!
//! Accepts what [`super::serialize`] writes plus the hand-written forms
//! commonly found in manifests and `#Requires` lines:
//! - `#` line comments and `<# ... #>` block comments
//! - `;` as well as newlines between map entries
//! - double-quoted strings with backtick escapes
//! - `a, b, c` inline lists and comma-separated `@( ... )` elements

use super::value::{DataMap, DataValue};
use crate::error::ManifestError;

/// Parse a complete data file; the top level must be a map
pub fn parse(text: &str) -> Result<DataMap, ManifestError> {
    let mut parser = Parser::new(text);
    parser.skip_trivia(true);
    if !parser.starts_with("@{") {
        return Err(parser.error("expected '@{' at start of document"));
    }
    let map = parser.parse_map()?;
    parser.skip_trivia(true);
    if parser.peek().is_some() {
        return Err(parser.error("unexpected content after document"));
    }
    Ok(map)
}

/// Parse a single value such as `@{ ModuleName = 'X' }` or `'text'`
pub fn parse_value(text: &str) -> Result<DataValue, ManifestError> {
    let mut parser = Parser::new(text);
    parser.skip_trivia(true);
    let value = parser.parse_expression()?;
    parser.skip_trivia(true);
    if parser.peek().is_some() {
        return Err(parser.error("unexpected content after value"));
    }
    Ok(value)
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
}

impl Parser {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    fn error(&self, message: impl Into<String>) -> ManifestError {
        ManifestError::ParseError {
            line: self.line,
            column: self.column,
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn starts_with(&self, token: &str) -> bool {
        token
            .chars()
            .enumerate()
            .all(|(i, c)| self.peek_at(i) == Some(c))
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn expect(&mut self, c: char) -> Result<(), ManifestError> {
        if self.peek() == Some(c) {
            self.bump();
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", c)))
        }
    }

    /// Skip blanks and comments, and line breaks too when `newlines` is set
    fn skip_trivia(&mut self, newlines: bool) {
        while let Some(c) = self.peek() {
            match c {
                '\n' | '\r' if newlines => {
                    self.bump();
                }
                c if c.is_whitespace() && c != '\n' && c != '\r' => {
                    self.bump();
                }
                '<' if self.peek_at(1) == Some('#') => self.skip_block_comment(),
                '#' => {
                    while self.peek().is_some_and(|c| c != '\n') {
                        self.bump();
                    }
                }
                _ => break,
            }
        }
    }

    fn skip_block_comment(&mut self) {
        self.bump();
        self.bump();
        while self.peek().is_some() {
            if self.starts_with("#>") {
                self.bump();
                self.bump();
                return;
            }
            self.bump();
        }
    }

    /// Skip line breaks and `;` between entries
    fn skip_separators(&mut self) {
        loop {
            self.skip_trivia(true);
            if self.peek() == Some(';') {
                self.bump();
            } else {
                break;
            }
        }
    }

    fn parse_map(&mut self) -> Result<DataMap, ManifestError> {
        self.bump();
        self.bump();
        let mut map = DataMap::new();
        loop {
            self.skip_separators();
            match self.peek() {
                Some('}') => {
                    self.bump();
                    return Ok(map);
                }
                None => return Err(self.error("unterminated map, expected '}'")),
                _ => {}
            }

            let key = self.parse_key()?;
            self.skip_trivia(false);
            self.expect('=')?;
            self.skip_trivia(true);
            let value = self.parse_expression()?;
            map.insert(key, value);

            self.skip_trivia(false);
            match self.peek() {
                Some('\n') | Some('\r') | Some(';') | Some('}') => {}
                None => return Err(self.error("unterminated map, expected '}'")),
                Some(c) => return Err(self.error(format!("unexpected '{}' after value", c))),
            }
        }
    }

    fn parse_key(&mut self) -> Result<String, ManifestError> {
        match self.peek() {
            Some('\'') => self.parse_single_quoted(),
            Some('"') => self.parse_double_quoted(),
            Some(c) if is_key_char(c) => {
                let mut key = String::new();
                while let Some(c) = self.peek().filter(|c| is_key_char(*c)) {
                    key.push(c);
                    self.bump();
                }
                Ok(key)
            }
            Some(c) => Err(self.error(format!("expected key, found '{}'", c))),
            None => Err(self.error("expected key")),
        }
    }

    /// A value, or several joined by `,` into a list
    fn parse_expression(&mut self) -> Result<DataValue, ManifestError> {
        let first = self.parse_single()?;
        self.skip_trivia(false);
        if self.peek() != Some(',') {
            return Ok(first);
        }

        let mut items = vec![first];
        while self.peek() == Some(',') {
            self.bump();
            self.skip_trivia(true);
            items.push(self.parse_single()?);
            self.skip_trivia(false);
        }
        Ok(DataValue::List(items))
    }

    fn parse_single(&mut self) -> Result<DataValue, ManifestError> {
        match self.peek() {
            Some('@') if self.peek_at(1) == Some('{') => self.parse_map().map(DataValue::Map),
            Some('@') if self.peek_at(1) == Some('(') => self.parse_list(),
            Some('\'') => self.parse_single_quoted().map(DataValue::String),
            Some('"') => self.parse_double_quoted().map(DataValue::String),
            Some('$') => self.parse_variable(),
            Some(c) if c.is_ascii_digit() || matches!(c, '-' | '+' | '.') => self.parse_number(),
            Some(c) => Err(self.error(format!("unexpected '{}', expected a value", c))),
            None => Err(self.error("unexpected end of input, expected a value")),
        }
    }

    fn parse_list(&mut self) -> Result<DataValue, ManifestError> {
        self.bump();
        self.bump();
        let mut items = Vec::new();
        loop {
            self.skip_separators();
            match self.peek() {
                Some(')') => {
                    self.bump();
                    return Ok(DataValue::List(items));
                }
                None => return Err(self.error("unterminated list, expected ')'")),
                _ => {}
            }

            items.push(self.parse_single()?);
            self.skip_trivia(false);
            match self.peek() {
                Some(',') => {
                    self.bump();
                }
                Some('\n') | Some('\r') | Some(';') | Some(')') => {}
                None => return Err(self.error("unterminated list, expected ')'")),
                Some(c) => return Err(self.error(format!("unexpected '{}' in list", c))),
            }
        }
    }

    fn parse_single_quoted(&mut self) -> Result<String, ManifestError> {
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                Some('\'') if self.peek() == Some('\'') => {
                    self.bump();
                    out.push('\'');
                }
                Some('\'') => return Ok(out),
                Some(c) => out.push(c),
                None => return Err(self.error("unterminated string")),
            }
        }
    }

    fn parse_double_quoted(&mut self) -> Result<String, ManifestError> {
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                Some('"') if self.peek() == Some('"') => {
                    self.bump();
                    out.push('"');
                }
                Some('"') => return Ok(out),
                Some('`') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('r') => out.push('\r'),
                    Some('t') => out.push('\t'),
                    Some('0') => out.push('\0'),
                    Some(c) => out.push(c),
                    None => return Err(self.error("unterminated string")),
                },
                Some(c) => out.push(c),
                None => return Err(self.error("unterminated string")),
            }
        }
    }

    fn parse_variable(&mut self) -> Result<DataValue, ManifestError> {
        self.bump();
        let mut name = String::new();
        while let Some(c) = self.peek().filter(|c| c.is_ascii_alphanumeric() || *c == '_') {
            name.push(c);
            self.bump();
        }
        match name.to_ascii_lowercase().as_str() {
            "true" => Ok(DataValue::Bool(true)),
            "false" => Ok(DataValue::Bool(false)),
            "null" => Ok(DataValue::Null),
            _ => Err(self.error(format!("variable '${}' is not allowed in data files", name))),
        }
    }

    fn parse_number(&mut self) -> Result<DataValue, ManifestError> {
        let mut token = String::new();
        while let Some(c) = self
            .peek()
            .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '+'))
        {
            // a sign is only part of the number at the start or after an exponent
            if matches!(c, '-' | '+')
                && !(token.is_empty() || token.ends_with('e') || token.ends_with('E'))
            {
                break;
            }
            token.push(c);
            self.bump();
        }

        if let Ok(integer) = token.parse::<i64>() {
            return Ok(DataValue::Integer(integer));
        }
        match token.parse::<f64>() {
            Ok(decimal) if decimal.is_finite() => Ok(DataValue::Decimal(decimal)),
            _ => Err(self.error(format!("invalid number '{}'", token))),
        }
    }
}

pub(super) fn is_key_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.')
}
