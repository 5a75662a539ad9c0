//! Line parsers for the two console syntaxes.
//!
//! # Responsibility
//! - Verb-first: `<verb> <Kind> [<id>] [<args> ...]`.
//! - Dot-call: `<Kind>.<verb>(<args>)` with `<args>` empty, an id,
//!   `id, attribute, value` or `id, {dict}`.
//! - Normalize both into one `Command`; no validation happens here.
//!
//! # Invariants
//! - Blank lines parse to `None`.
//! - Quotes inside value tokens are preserved for coercion.

use crate::console::command::{Args, Command, Verb};
use crate::console::error::ConsoleError;
use once_cell::sync::Lazy;
use regex::Regex;

static DOT_CALL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^([^.\s(]*)\.(\w+)\((.*)\)$").expect("valid dot-call regex")
});

/// Parses one console line into its canonical command.
///
/// Returns `Ok(None)` for blank lines and `UnknownSyntax` for lines that
/// match neither syntax.
pub fn parse_line(line: &str) -> Result<Option<Command>, ConsoleError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    if let Some(command) = parse_verb_first(line) {
        return Ok(Some(command));
    }
    if let Some(command) = parse_dot_call(line)? {
        return Ok(Some(command));
    }

    Err(ConsoleError::UnknownSyntax(line.to_string()))
}

/// Parses `<verb> <Kind> [<id>] [<args> ...]`.
pub fn parse_verb_first(line: &str) -> Option<Command> {
    let mut tokens = tokenize(line).into_iter();
    let verb = Verb::from_word(&tokens.next()?)?;

    let mut command = Command::new(verb);
    command.kind = tokens.next();
    if verb != Verb::Create {
        command.id = tokens.next();
    }
    command.args = Args::Tokens(tokens.collect());
    Some(command)
}

/// Parses `<Kind>.<verb>(<args>)`.
///
/// Returns `Ok(None)` when the line is not shaped like a dot-call, and
/// `UnknownSyntax` when it is but the method or arguments are invalid.
pub fn parse_dot_call(line: &str) -> Result<Option<Command>, ConsoleError> {
    let Some(captures) = DOT_CALL_RE.captures(line) else {
        return Ok(None);
    };
    let unknown = || ConsoleError::UnknownSyntax(line.to_string());

    let kind = captures.get(1).map_or("", |kind| kind.as_str());
    let method = captures.get(2).map_or("", |method| method.as_str());
    let inner = captures.get(3).map_or("", |inner| inner.as_str()).trim();
    let verb = Verb::from_method(method).ok_or_else(unknown)?;

    let mut command = Command::new(verb);
    command.kind = (!kind.is_empty()).then(|| kind.to_string());
    if inner.is_empty() {
        return Ok(Some(command));
    }

    let parts = split_top_level(inner, ',');
    if verb == Verb::Create {
        command.args = Args::Tokens(parts);
        return Ok(Some(command));
    }

    let mut parts = parts.into_iter();
    command.id = parts.next().map(|id| unquote(&id)).filter(|id| !id.is_empty());

    let rest: Vec<String> = parts.collect();
    command.args = match rest.first() {
        Some(first) if first.starts_with('{') => {
            Args::Mapping(parse_dict(first).ok_or_else(unknown)?)
        }
        _ => {
            let mut tokens = Vec::with_capacity(rest.len());
            let mut rest = rest.into_iter();
            if let Some(attribute) = rest.next() {
                tokens.push(unquote(&attribute));
            }
            tokens.extend(rest.map(|value| normalize_value(&value)));
            Args::Tokens(tokens)
        }
    };

    Ok(Some(command))
}

/// Splits on whitespace, keeping double-quoted sections (and their quotes)
/// inside one token.
pub fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escaped = false;

    for ch in line.chars() {
        if escaped {
            current.push(ch);
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_quotes => {
                current.push(ch);
                escaped = true;
            }
            '"' => {
                current.push(ch);
                in_quotes = !in_quotes;
            }
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}

/// Splits on `separator` outside quotes and braces; parts are trimmed.
fn split_top_level(input: &str, separator: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut depth = 0usize;
    let mut escaped = false;

    for ch in input.chars() {
        if escaped {
            current.push(ch);
            escaped = false;
            continue;
        }
        match (ch, quote) {
            ('\\', Some(_)) => {
                current.push(ch);
                escaped = true;
            }
            (c, Some(open)) if c == open => {
                current.push(c);
                quote = None;
            }
            ('"' | '\'', None) => {
                current.push(ch);
                quote = Some(ch);
            }
            ('{', None) => {
                current.push(ch);
                depth += 1;
            }
            ('}', None) => {
                current.push(ch);
                depth = depth.saturating_sub(1);
            }
            (c, None) if c == separator && depth == 0 => {
                parts.push(current.trim().to_string());
                current.clear();
            }
            (c, _) => current.push(c),
        }
    }
    parts.push(current.trim().to_string());

    parts
}

/// Parses `{'key': value, "other": value}` into raw key/value pairs.
fn parse_dict(literal: &str) -> Option<Vec<(String, String)>> {
    let body = literal.trim().strip_prefix('{')?.strip_suffix('}')?.trim();
    if body.is_empty() {
        return Some(Vec::new());
    }

    let mut pairs = Vec::new();
    for entry in split_top_level(body, ',') {
        let mut halves = split_top_level(&entry, ':').into_iter();
        let key = unquote(&halves.next()?);
        let value = halves.collect::<Vec<String>>().join(":");
        if key.is_empty() || value.is_empty() {
            return None;
        }
        pairs.push((key, normalize_value(&value)));
    }
    Some(pairs)
}

/// Strips one pair of matching surrounding quotes.
fn unquote(token: &str) -> String {
    let token = token.trim();
    for quote in ['"', '\''] {
        if token.len() >= 2 && token.starts_with(quote) && token.ends_with(quote) {
            return token[1..token.len() - 1].to_string();
        }
    }
    token.to_string()
}

/// Rewrites a single-quoted value as a double-quoted token.
fn normalize_value(token: &str) -> String {
    let token = token.trim();
    if token.len() >= 2 && token.starts_with('\'') && token.ends_with('\'') {
        let inner = &token[1..token.len() - 1];
        return format!("\"{}\"", inner.replace('"', "\\\""));
    }
    token.to_string()
}

#[cfg(test)]
mod tests {
    use super::{parse_dot_call, parse_line, parse_verb_first, tokenize};
    use crate::console::command::{Args, Verb};
    use crate::console::error::ConsoleError;

    #[test]
    fn tokenize_keeps_quoted_sections_together() {
        assert_eq!(
            tokenize(r#"create Place name="My little house" rooms=4"#),
            vec!["create", "Place", "name=\"My little house\"", "rooms=4"]
        );
        assert_eq!(tokenize("  show   User  42 "), vec!["show", "User", "42"]);
    }

    #[test]
    fn verb_first_create_has_no_id_slot() {
        let command = parse_verb_first("create State name=\"California\"").unwrap();
        assert_eq!(command.verb, Verb::Create);
        assert_eq!(command.kind.as_deref(), Some("State"));
        assert_eq!(command.id, None);
        assert_eq!(
            command.args,
            Args::Tokens(vec!["name=\"California\"".to_string()])
        );
    }

    #[test]
    fn verb_first_update_fills_id_then_args() {
        let command = parse_verb_first("update User 1234 first_name \"Betty\"").unwrap();
        assert_eq!(command.verb, Verb::Update);
        assert_eq!(command.id.as_deref(), Some("1234"));
        assert_eq!(
            command.args,
            Args::Tokens(vec!["first_name".to_string(), "\"Betty\"".to_string()])
        );
    }

    #[test]
    fn dot_call_without_args() {
        let command = parse_dot_call("State.count()").unwrap().unwrap();
        assert_eq!(command.verb, Verb::Count);
        assert_eq!(command.kind.as_deref(), Some("State"));
        assert_eq!(command.id, None);
    }

    #[test]
    fn dot_call_with_quoted_id_attribute_and_value() {
        let command = parse_dot_call(r#"User.update("38f2", "first_name", 'John')"#)
            .unwrap()
            .unwrap();
        assert_eq!(command.id.as_deref(), Some("38f2"));
        assert_eq!(
            command.args,
            Args::Tokens(vec!["first_name".to_string(), "\"John\"".to_string()])
        );
    }

    #[test]
    fn dot_call_with_dict_literal() {
        let command =
            parse_dot_call(r#"User.update(38f2, {'first_name': "John", "age": 89})"#)
                .unwrap()
                .unwrap();
        assert_eq!(
            command.args,
            Args::Mapping(vec![
                ("first_name".to_string(), "\"John\"".to_string()),
                ("age".to_string(), "89".to_string()),
            ])
        );
    }

    #[test]
    fn dot_call_with_empty_kind_keeps_kind_unset() {
        let command = parse_dot_call(".all()").unwrap().unwrap();
        assert_eq!(command.kind, None);
    }

    #[test]
    fn unknown_method_and_garbage_are_unknown_syntax() {
        assert!(matches!(
            parse_line("State.explode()"),
            Err(ConsoleError::UnknownSyntax(_))
        ));
        assert!(matches!(
            parse_line("frobnicate State"),
            Err(ConsoleError::UnknownSyntax(_))
        ));
        assert!(matches!(
            parse_line("User.update(1, {'broken')"),
            Err(ConsoleError::UnknownSyntax(_))
        ));
    }

    #[test]
    fn blank_lines_parse_to_nothing() {
        assert!(parse_line("").unwrap().is_none());
        assert!(parse_line("   \n").unwrap().is_none());
    }

    #[test]
    fn eof_word_is_quit() {
        assert_eq!(parse_line("EOF").unwrap().unwrap().verb, Verb::Quit);
    }
}
