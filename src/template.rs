use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::record::{PropertyValue, Scalar};

/// Culture / formatting hook used when rendering scalar values into the
/// message text.
///
/// Returning `None` falls back to the default rendering.
pub trait FormatProvider: Send + Sync {
    fn format(&self, value: &Scalar, format: Option<&str>) -> Option<String>;
}

/// Render `template` by substituting `{Name}` holes with property values.
///
/// Supported hole syntax: `{Name}`, `{@Name}`, `{$Name}`, `{Name,10}`,
/// `{Name,-10}`, `{Name:format}`. `{{` and `}}` are literal braces. Holes
/// that are malformed or name a missing property are kept verbatim.
pub fn render(
    template: &str,
    properties: &BTreeMap<String, PropertyValue>,
    provider: Option<&dyn FormatProvider>,
) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find(|c: char| c == '{' || c == '}') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if tail.starts_with("{{") {
            out.push('{');
            rest = &tail[2..];
        } else if tail.starts_with("}}") {
            out.push('}');
            rest = &tail[2..];
        } else if tail.starts_with('}') {
            out.push('}');
            rest = &tail[1..];
        } else {
            match tail.find('}') {
                Some(close) => {
                    let hole = &tail[..=close];
                    match render_hole(&tail[1..close], properties, provider) {
                        Some(text) => out.push_str(&text),
                        None => out.push_str(hole),
                    }
                    rest = &tail[close + 1..];
                }
                None => {
                    out.push_str(tail);
                    rest = "";
                }
            }
        }
    }
    out.push_str(rest);
    out
}

fn render_hole(
    token: &str,
    properties: &BTreeMap<String, PropertyValue>,
    provider: Option<&dyn FormatProvider>,
) -> Option<String> {
    let token = token.strip_prefix(['@', '$']).unwrap_or(token);

    let (head, format) = match token.split_once(':') {
        Some((head, format)) => (head, Some(format)),
        None => (token, None),
    };
    let (name, alignment) = match head.split_once(',') {
        Some((name, align)) => (name, Some(align.trim().parse::<i32>().ok()?)),
        None => (head, None),
    };

    if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return None;
    }

    let value = properties.get(name)?;
    let text = value_text(value, format, provider);
    Some(match alignment {
        Some(width) => align(&text, width),
        None => text,
    })
}

fn value_text(value: &PropertyValue, format: Option<&str>, provider: Option<&dyn FormatProvider>) -> String {
    if let PropertyValue::Scalar(scalar) = value {
        if let Some(text) = provider.and_then(|p| p.format(scalar, format)) {
            return text;
        }
        return scalar.to_string();
    }

    let mut out = String::new();
    write_composite(&mut out, value);
    out
}

fn write_composite(out: &mut String, value: &PropertyValue) {
    match value {
        PropertyValue::Scalar(Scalar::String(s)) => {
            let _ = write!(out, "{:?}", s);
        }
        PropertyValue::Scalar(scalar) => {
            let _ = write!(out, "{}", scalar);
        }
        PropertyValue::Sequence(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_composite(out, item);
            }
            out.push(']');
        }
        PropertyValue::Dictionary(entries) => {
            out.push('[');
            for (i, (key, item)) in entries.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                let _ = write!(out, "({:?}: ", key.to_string());
                write_composite(out, item);
                out.push(')');
            }
            out.push(']');
        }
        PropertyValue::Structure { type_tag, fields } => {
            if let Some(tag) = type_tag {
                out.push_str(tag);
                out.push(' ');
            }
            out.push_str("{ ");
            for (i, (name, item)) in fields.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(name);
                out.push_str(": ");
                write_composite(out, item);
            }
            out.push_str(" }");
        }
    }
}

fn align(text: &str, width: i32) -> String {
    let len = text.chars().count();
    let pad = (width.unsigned_abs() as usize).saturating_sub(len);
    if width < 0 {
        format!("{}{}", text, " ".repeat(pad))
    } else {
        format!("{}{}", " ".repeat(pad), text)
    }
}
