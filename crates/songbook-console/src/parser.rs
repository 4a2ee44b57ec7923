use serde_json::Value;
use songbook_core::{Music, Predicate, SortOrder};

use crate::commands::Command;

/// Tokenize an input line into a vector of string tokens.
///
/// Handles:
/// - Whitespace-separated words
/// - Quoted strings: `"hello world"` becomes a single token (quotes preserved)
/// - JSON bodies: when `{` is encountered, scans to the matching `}` (tracking
///   nesting and string literals inside the JSON), returning the entire `{...}`
///   as one token
fn tokenize(input: &str) -> Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let len = chars.len();
    let mut i = 0;

    while i < len {
        if chars[i].is_whitespace() {
            i += 1;
            continue;
        }

        // JSON body.
        if chars[i] == '{' {
            let start = i;
            let mut depth = 0;
            let mut in_string = false;
            loop {
                if i >= len {
                    return Err("Unterminated JSON object".to_string());
                }
                let c = chars[i];
                if in_string {
                    if c == '\\' {
                        i += 1;
                    } else if c == '"' {
                        in_string = false;
                    }
                } else {
                    match c {
                        '"' => in_string = true,
                        '{' => depth += 1,
                        '}' => {
                            depth -= 1;
                            if depth == 0 {
                                i += 1;
                                break;
                            }
                        }
                        _ => {}
                    }
                }
                i += 1;
            }
            tokens.push(chars[start..i].iter().collect());
            continue;
        }

        // Quoted string.
        if chars[i] == '"' {
            let start = i;
            i += 1;
            while i < len && chars[i] != '"' {
                if chars[i] == '\\' {
                    i += 1;
                }
                i += 1;
            }
            if i >= len {
                return Err("Unterminated quoted string".to_string());
            }
            i += 1;
            tokens.push(chars[start..i].iter().collect());
            continue;
        }

        let start = i;
        while i < len && !chars[i].is_whitespace() && chars[i] != '"' && chars[i] != '{' {
            i += 1;
        }
        tokens.push(chars[start..i].iter().collect());
    }

    Ok(tokens)
}

/// Parse a raw token into a JSON value.
///
/// - If wrapped in `"..."`, strip the quotes and return a JSON string.
/// - If parseable as an integer or `f64`, return a JSON number.
/// - Otherwise, return a JSON string (bare word).
fn parse_value(s: &str) -> Value {
    if s.starts_with('"') && s.ends_with('"') && s.len() >= 2 {
        Value::String(unescape(&s[1..s.len() - 1]))
    } else if let Ok(n) = s.parse::<i64>() {
        Value::from(n)
    } else if let Ok(n) = s.parse::<f64>() {
        serde_json::Number::from_f64(n).map_or_else(|| Value::String(s.to_string()), Value::Number)
    } else {
        Value::String(s.to_string())
    }
}

fn strip_quotes(s: &str) -> String {
    if s.starts_with('"') && s.ends_with('"') && s.len() >= 2 {
        unescape(&s[1..s.len() - 1])
    } else {
        s.to_string()
    }
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Parse a single input line into a command.
pub fn parse(input: &str) -> Result<Command, String> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err("Empty command".to_string());
    }

    let first = tokens[0].to_uppercase();
    match first.as_str() {
        "SAVE" => parse_save(&tokens),
        "GET" => {
            let (artist, song_title) = parse_key(&tokens, "GET")?;
            Ok(Command::Get { artist, song_title })
        }
        "DELETE" => {
            let (artist, song_title) = parse_key(&tokens, "DELETE")?;
            Ok(Command::Delete { artist, song_title })
        }
        "FIND" => parse_find(&tokens[1..]),
        "EXPLAIN" => {
            if tokens.len() < 2 || tokens[1].to_uppercase() != "FIND" {
                return Err("Expected FIND BY after EXPLAIN".to_string());
            }
            match parse_find(&tokens[2..])? {
                Command::FindBy { predicate } => Ok(Command::Explain { predicate }),
                _ => Err("EXPLAIN only supports FIND BY".to_string()),
            }
        }
        "COUNT" => {
            if tokens.len() > 1 {
                return Err(format!("Unexpected token '{}' after COUNT", tokens[1]));
            }
            Ok(Command::Count)
        }
        "HELP" => {
            let topic = if tokens.len() > 1 {
                Some(tokens[1..].join(" "))
            } else {
                None
            };
            Ok(Command::Help(topic))
        }
        "EXIT" | "QUIT" => Ok(Command::Exit),
        _ => Err(format!("Unknown command '{}'", tokens[0])),
    }
}

/// SAVE {json}
fn parse_save(tokens: &[String]) -> Result<Command, String> {
    if tokens.len() != 2 {
        return Err("Usage: SAVE {json}".to_string());
    }
    let song: Music =
        serde_json::from_str(&tokens[1]).map_err(|e| format!("Invalid song document: {e}"))?;
    Ok(Command::Save { song })
}

/// GET|DELETE <artist> <songTitle>
fn parse_key(tokens: &[String], verb: &str) -> Result<(String, String), String> {
    if tokens.len() != 3 {
        return Err(format!("Usage: {verb} <artist> <songTitle>"));
    }
    Ok((strip_quotes(&tokens[1]), strip_quotes(&tokens[2])))
}

/// FIND ALL | FIND BY <attr> [=] <value> [AND ...] [ORDER BY <attr> [ASC|DESC]]
fn parse_find(tokens: &[String]) -> Result<Command, String> {
    let Some(kind) = tokens.first() else {
        return Err("Expected ALL or BY after FIND".to_string());
    };
    match kind.to_uppercase().as_str() {
        "ALL" => {
            if tokens.len() > 1 {
                return Err(format!("Unexpected token '{}' after FIND ALL", tokens[1]));
            }
            Ok(Command::FindAll)
        }
        "BY" => parse_predicate(&tokens[1..]).map(|predicate| Command::FindBy { predicate }),
        _ => Err("Expected ALL or BY after FIND".to_string()),
    }
}

fn parse_predicate(tokens: &[String]) -> Result<Predicate, String> {
    let mut predicate = Predicate::default();
    let mut i = 0;

    loop {
        let attribute = tokens
            .get(i)
            .ok_or("Expected an attribute name after BY")?;
        i += 1;
        if tokens.get(i).is_some_and(|t| t == "=") {
            i += 1;
        }
        let value = tokens
            .get(i)
            .ok_or_else(|| format!("Expected a value for '{attribute}'"))?;
        i += 1;
        predicate = predicate.and_eq(attribute.as_str(), parse_value(value));

        match tokens.get(i).map(|t| t.to_uppercase()) {
            None => return Ok(predicate),
            Some(t) if t == "AND" => {
                i += 1;
                if i >= tokens.len() {
                    return Err("Expected a condition after AND".to_string());
                }
            }
            Some(t) if t == "ORDER" => break,
            Some(_) => {
                return Err(format!(
                    "Unexpected token '{}'. Expected AND or ORDER BY.",
                    tokens[i]
                ));
            }
        }
    }

    // ORDER BY <attr> [ASC|DESC]
    if tokens.get(i + 1).map(|t| t.to_uppercase()).as_deref() != Some("BY") {
        return Err("Expected BY after ORDER".to_string());
    }
    let attribute = tokens
        .get(i + 2)
        .ok_or("Expected an attribute name after ORDER BY")?;
    let order = match tokens.get(i + 3).map(|t| t.to_uppercase()).as_deref() {
        None | Some("ASC") => SortOrder::Ascending,
        Some("DESC") => SortOrder::Descending,
        Some(_) => {
            return Err(format!(
                "Expected ASC or DESC, got '{}'",
                tokens[i + 3]
            ));
        }
    };
    if let Some(extra) = tokens.get(i + 4) {
        return Err(format!("Unexpected token '{extra}' after ORDER BY"));
    }
    Ok(predicate.order_by(attribute.as_str(), order))
}
