//! Canonical data-file serialization
//!
//! Output rules:
//! - maps render as `@{ ... }` with one `key = value` line per entry in
//!   insertion order; keys of one map are padded to the longest key so the
//!   `=` signs line up
//! - lists render as `@( ... )` with one element per line
//! - empty maps and lists render as `@{}` and `@()`
//! - strings are single-quoted with `'` doubled; nothing else is escaped
//! - booleans and null render as `$true`, `$false` and `$null`
//!
//! [`normalize`] then removes comments and blank lines and guarantees a
//! single trailing newline, so building the same input twice yields
//! byte-identical files.

use super::parse::is_key_char;
use super::value::{DataMap, DataValue};

/// One indentation step
pub const INDENT: &str = "    ";

/// Serialize a document with its entries at indent level 1
pub fn serialize(doc: &DataMap) -> String {
    serialize_with_indent(doc, 1)
}

/// Serialize a document whose entries sit at `indent_level`
pub fn serialize_with_indent(doc: &DataMap, indent_level: usize) -> String {
    normalize(&render_map(doc, indent_level.max(1)))
}

/// Render one value; nested entries are placed at `level`
pub fn render_value(value: &DataValue, level: usize) -> String {
    match value {
        DataValue::Null => "$null".to_string(),
        DataValue::Bool(true) => "$true".to_string(),
        DataValue::Bool(false) => "$false".to_string(),
        DataValue::Integer(i) => i.to_string(),
        DataValue::Decimal(d) => {
            debug_assert!(d.is_finite(), "data files cannot hold non-finite numbers");
            if *d == 0.0 {
                "0".to_string()
            } else {
                d.to_string()
            }
        }
        DataValue::String(s) => quote(s),
        DataValue::List(items) => render_list(items, level),
        DataValue::Map(map) => render_map(map, level),
    }
}

/// Single-quote a string, doubling embedded quotes
pub fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn indent(level: usize) -> String {
    INDENT.repeat(level)
}

fn render_map(map: &DataMap, level: usize) -> String {
    if map.is_empty() {
        return "@{}".to_string();
    }

    let keys: Vec<String> = map.keys().map(render_key).collect();
    let width = keys.iter().map(|k| k.chars().count()).max().unwrap_or(0);
    let mut out = String::from("@{\n");
    for (key, (_, value)) in keys.iter().zip(map.iter()) {
        out.push_str(&indent(level));
        out.push_str(&format!(
            "{:<width$} = {}",
            key,
            render_value(value, level + 1),
            width = width
        ));
        out.push('\n');
    }
    out.push_str(&indent(level - 1));
    out.push('}');
    out
}

/// Keys the parser reads back as a bare word stay bare; anything else is quoted
fn render_key(key: &str) -> String {
    if !key.is_empty() && key.chars().all(is_key_char) {
        key.to_string()
    } else {
        quote(key)
    }
}

fn render_list(items: &[DataValue], level: usize) -> String {
    if items.is_empty() {
        return "@()".to_string();
    }

    let mut out = String::from("@(\n");
    for item in items {
        out.push_str(&indent(level));
        out.push_str(&render_value(item, level + 1));
        out.push('\n');
    }
    out.push_str(&indent(level - 1));
    out.push(')');
    out
}

/// Strip comments and blank lines and end with exactly one newline.
///
/// Quoted strings are left untouched, including any `#` or line breaks
/// inside them.
pub fn normalize(text: &str) -> String {
    let text = text.replace("\r\n", "\n");
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut line_started_in_string = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if let Some(open) = quote {
            if c == '\n' {
                finish_line(&mut lines, &mut current, line_started_in_string, true);
                line_started_in_string = true;
                continue;
            }
            current.push(c);
            if open == '"' && c == '`' {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            } else if c == open {
                quote = None;
            }
            continue;
        }

        match c {
            '\n' => {
                finish_line(&mut lines, &mut current, line_started_in_string, false);
                line_started_in_string = false;
            }
            '\'' | '"' => {
                quote = Some(c);
                current.push(c);
            }
            '<' if chars.peek() == Some(&'#') => {
                chars.next();
                let mut previous = '\0';
                for inner in chars.by_ref() {
                    if previous == '#' && inner == '>' {
                        break;
                    }
                    previous = inner;
                }
            }
            '#' => {
                while chars.peek().is_some_and(|next| *next != '\n') {
                    chars.next();
                }
            }
            _ => current.push(c),
        }
    }
    finish_line(
        &mut lines,
        &mut current,
        line_started_in_string,
        quote.is_some(),
    );

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn finish_line(
    lines: &mut Vec<String>,
    current: &mut String,
    started_in_string: bool,
    ends_in_string: bool,
) {
    let mut line = std::mem::take(current);
    if !ends_in_string {
        line.truncate(line.trim_end().len());
    }
    if line.trim().is_empty() && !started_in_string && !ends_in_string {
        return;
    }
    lines.push(line);
}
