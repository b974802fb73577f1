//! URI templating for link hrefs.
//!
//! Two syntaxes are understood:
//! - route patterns with positional parameters (`/items/:id`, `/files/:path*`, `/page/:n?`),
//!   as used when declaring routes;
//! - curly-brace URI templates (`/items/{id}`, `/search{?q}`), as used in published links.
//!
//! Expanding a route pattern with only some of its parameters produces a URI template,
//! so a partially resolved link stays a valid, inspectable `templated` href.

use serde_json::Value;

use crate::link::Params;

/// Substitute `params` into `template`.
///
/// Curly-brace expressions are replaced when every variable they reference is present
/// and are otherwise left verbatim. Route pattern tokens outside those expressions are
/// compiled into a path, with any missing parameter re-expressed as a curly-brace
/// placeholder, so both syntaxes may be mixed in one template.
///
/// ```
/// # use modkit_hal::template::apply_template;
/// # use modkit_hal::Params;
/// let mut params = Params::new();
/// params.insert("id".to_owned(), 42.into());
/// assert_eq!(apply_template("/items/:id/parts/:part", &params), "/items/42/parts/{part}");
/// assert_eq!(apply_template("/items/{id}?q={q}", &params), "/items/42?q={q}");
/// assert_eq!(apply_template("/items/:id{?fields}", &params), "/items/42{?fields}");
/// ```
#[must_use]
pub fn apply_template(template: &str, params: &Params) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some((start, end)) = next_expression(rest) {
        out.push_str(&compile_route_pattern(&rest[..start], params));
        match expand_expression(&rest[start + 1..end], params) {
            Some(expanded) => out.push_str(&expanded),
            None => out.push_str(&rest[start..=end]),
        }
        rest = &rest[end + 1..];
    }
    out.push_str(&compile_route_pattern(rest, params));
    out
}

/// `true` if the href still contains an unresolved `{...}` placeholder.
#[must_use]
pub fn is_templated(href: &str) -> bool {
    href.find('{')
        .is_some_and(|start| href.rfind('}').is_some_and(|end| end > start + 1))
}

/// Convert a curly-brace URI template into the nearest route pattern.
///
/// Only the path portion is kept: query and fragment expressions are dropped because
/// route dispatch cannot match on them.
///
/// ```
/// # use modkit_hal::template::to_route_pattern;
/// assert_eq!(to_route_pattern("/query/{param}?q={value}"), "/query/:param");
/// assert_eq!(to_route_pattern("/files{/path*}{?rev}"), "/files/:path*");
/// ```
#[must_use]
pub fn to_route_pattern(uri_template: &str) -> String {
    let path = path_portion(uri_template);
    let mut out = String::with_capacity(path.len());
    let mut rest = path;
    while let Some((start, end)) = next_expression(rest) {
        out.push_str(&rest[..start]);
        let (op, vars) = split_operator(&rest[start + 1..end]);
        let (lead, sep) = match op {
            None | Some('+') => ("", ","),
            Some('/') => ("/", "/"),
            Some('.') => (".", "."),
            _ => {
                rest = &rest[end + 1..];
                continue;
            }
        };
        out.push_str(lead);
        let mut first = true;
        for var in parse_vars(vars) {
            if !first {
                out.push_str(sep);
            }
            first = false;
            out.push(':');
            out.push_str(var.name);
            if var.explode {
                out.push('*');
            }
        }
        rest = &rest[end + 1..];
    }
    out.push_str(rest);
    out
}

/// Convert a route pattern (either syntax) into the `{name}` / `{*name}` path syntax
/// understood by the router. Optional parameters become required segments and any
/// query portion is dropped.
#[must_use]
pub fn to_axum_path(pattern: &str) -> String {
    let pattern = if has_expressions(pattern) {
        to_route_pattern(pattern)
    } else {
        pattern.to_owned()
    };
    let mut out = String::with_capacity(pattern.len());
    for token in tokenize(&pattern) {
        match token {
            Token::Literal(text) => {
                if let Some(query) = text.find('?') {
                    out.push_str(&text[..query]);
                    break;
                }
                out.push_str(&text);
            }
            Token::Param(param) => {
                if let Some(prefix) = param.prefix {
                    out.push(prefix);
                }
                out.push('{');
                if param.repeat {
                    out.push('*');
                }
                out.push_str(&param.name);
                out.push('}');
            }
        }
    }
    out
}

fn has_expressions(template: &str) -> bool {
    next_expression(template).is_some()
}

/// Byte offsets of the next `{...}` expression with a non-empty body.
fn next_expression(s: &str) -> Option<(usize, usize)> {
    let mut from = 0;
    while let Some(offset) = s[from..].find('{') {
        let start = from + offset;
        let end = start + s[start..].find('}')?;
        if end > start + 1 {
            return Some((start, end));
        }
        from = end + 1;
    }
    None
}

fn path_portion(template: &str) -> &str {
    let mut depth = 0usize;
    for (i, c) in template.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            '?' | '#' if depth == 0 => return &template[..i],
            _ => {}
        }
    }
    template
}

// ---- curly-brace URI templates ----

struct VarSpec<'a> {
    name: &'a str,
    explode: bool,
}

fn split_operator(expr: &str) -> (Option<char>, &str) {
    match expr.chars().next() {
        Some(op @ ('+' | '#' | '.' | '/' | ';' | '?' | '&')) => (Some(op), &expr[1..]),
        _ => (None, expr),
    }
}

fn parse_vars(vars: &str) -> Vec<VarSpec<'_>> {
    vars.split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| match v.strip_suffix('*') {
            Some(name) => VarSpec {
                name,
                explode: true,
            },
            None => VarSpec {
                name: v,
                explode: false,
            },
        })
        .collect()
}

/// Expand one expression, or `None` to leave it untouched.
fn expand_expression(expr: &str, params: &Params) -> Option<String> {
    let (op, vars) = split_operator(expr);
    let vars = parse_vars(vars);
    if vars.is_empty() {
        return None;
    }

    // (leading string, separator between variables, name=value form, keep reserved chars)
    let (first, sep, named, reserved) = match op {
        None => ("", ",", false, false),
        Some('+') => ("", ",", false, true),
        Some('#') => ("#", ",", false, true),
        Some('.') => (".", ".", false, false),
        Some('/') => ("/", "/", false, false),
        Some(';') => (";", ";", true, false),
        Some('?') => ("?", "&", true, false),
        _ => ("&", "&", true, false),
    };

    let mut parts = Vec::with_capacity(vars.len());
    for var in &vars {
        let values = param_values(params, var.name, reserved)?;
        let part = match (var.explode, named) {
            (true, true) => values
                .iter()
                .map(|v| format!("{}={v}", var.name))
                .collect::<Vec<_>>()
                .join(sep),
            (true, false) => values.join(sep),
            (false, true) if op == Some(';') && values.iter().all(String::is_empty) => {
                var.name.to_owned()
            }
            (false, true) => format!("{}={}", var.name, values.join(",")),
            (false, false) => values.join(","),
        };
        parts.push(part);
    }
    Some(format!("{first}{}", parts.join(sep)))
}

// ---- positional route patterns ----

struct ParamToken {
    name: String,
    prefix: Option<char>,
    repeat: bool,
}

enum Token {
    Literal(String),
    Param(ParamToken),
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn tokenize(pattern: &str) -> Vec<Token> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c == '\\' && i + 1 < chars.len() {
            literal.push(chars[i + 1]);
            i += 2;
            continue;
        }
        if c == ':' && chars.get(i + 1).copied().is_some_and(is_name_start) {
            let mut j = i + 1;
            let mut name = String::new();
            while let Some(&n) = chars.get(j).filter(|n| is_name_char(**n)) {
                name.push(n);
                j += 1;
            }
            // custom match group, e.g. `:id(\\d+)`; irrelevant for substitution
            if chars.get(j) == Some(&'(') {
                let mut depth = 0usize;
                while let Some(&g) = chars.get(j) {
                    j += 1;
                    match g {
                        '\\' => j += 1,
                        '(' => depth += 1,
                        ')' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                }
            }
            // `?` optional parameters are rendered like required ones: a missing value stays templated
            let modifier = chars.get(j).copied().filter(|m| matches!(*m, '?' | '*' | '+'));
            if modifier.is_some() {
                j += 1;
            }
            let prefix = match literal.chars().last() {
                Some(p @ ('/' | '.')) => {
                    literal.pop();
                    Some(p)
                }
                _ => None,
            };
            if !literal.is_empty() {
                tokens.push(Token::Literal(std::mem::take(&mut literal)));
            }
            tokens.push(Token::Param(ParamToken {
                name,
                prefix,
                repeat: matches!(modifier, Some('*' | '+')),
            }));
            i = j;
            continue;
        }
        literal.push(c);
        i += 1;
    }
    if !literal.is_empty() {
        tokens.push(Token::Literal(literal));
    }
    tokens
}

fn compile_route_pattern(pattern: &str, params: &Params) -> String {
    let mut out = String::with_capacity(pattern.len());
    for token in tokenize(pattern) {
        match token {
            Token::Literal(text) => out.push_str(&text),
            Token::Param(param) => {
                let values = param_values(params, &param.name, false)
                    .filter(|values| param.repeat || !values.is_empty());
                match values {
                    Some(values) if param.repeat => {
                        for value in values {
                            if let Some(prefix) = param.prefix {
                                out.push(prefix);
                            }
                            out.push_str(&value);
                        }
                    }
                    Some(values) => {
                        if let Some(prefix) = param.prefix {
                            out.push(prefix);
                        }
                        out.push_str(&values.join(","));
                    }
                    None if param.repeat && param.prefix == Some('/') => {
                        out.push_str("{/");
                        out.push_str(&param.name);
                        out.push_str("*}");
                    }
                    None => {
                        if let Some(prefix) = param.prefix {
                            out.push(prefix);
                        }
                        out.push('{');
                        out.push_str(&param.name);
                        if param.repeat {
                            out.push('*');
                        }
                        out.push('}');
                    }
                }
            }
        }
    }
    decode_braces(out)
}

/// Percent-decode the first `%7B...%7D` span so braces produced from
/// encoded values read as a literal template expression.
fn decode_braces(href: String) -> String {
    let Some(start) = href.find("%7B") else {
        return href;
    };
    let Some(end) = href.rfind("%7D").filter(|end| *end > start) else {
        return href;
    };
    let span = &href[start..end + 3];
    match urlencoding::decode(span) {
        Ok(decoded) => format!("{}{decoded}{}", &href[..start], &href[end + 3..]),
        Err(_) => href,
    }
}

/// String forms of a parameter value, or `None` when it is absent or null.
fn param_values(params: &Params, name: &str, reserved: bool) -> Option<Vec<String>> {
    let encode = |raw: String| {
        if reserved {
            raw
        } else {
            urlencoding::encode(&raw).into_owned()
        }
    };
    match params.get(name)? {
        Value::Null => None,
        Value::Array(items) => Some(
            items
                .iter()
                .filter(|item| !item.is_null())
                .map(|item| encode(scalar_to_string(item)))
                .collect(),
        ),
        other => Some(vec![encode(scalar_to_string(other))]),
    }
}

/// Render a JSON value the way it appears in a URL (strings unquoted).
pub(crate) fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
