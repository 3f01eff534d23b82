//! Extraction of the variables a template references.
//!
//! Only enough of the Jinja/Tera grammar is understood to tell variables apart
//! from keywords, literals, filters, tests, attribute names and loop/set
//! locals. Tera itself still does the real parsing and rendering.

use std::collections::HashSet;
use std::sync::LazyLock;

use indexmap::IndexSet;
use regex::Regex;

static TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\{\{-?(?P<expr>.*?)-?\}\}|\{%-?(?P<stmt>.*?)-?%\}|\{#.*?#\}")
        .expect("tag pattern is valid")
});

const KEYWORDS: &[&str] = &[
    "and", "or", "not", "in", "is", "true", "false", "True", "False", "loop", "super",
];

/// Variables referenced by `source`, in order of first appearance.
pub fn declared_placeholders(source: &str) -> IndexSet<String> {
    let mut found = IndexSet::new();
    let mut locals = HashSet::new();

    for caps in TAG.captures_iter(source) {
        if let Some(expr) = caps.name("expr") {
            collect_variables(expr.as_str(), &mut found);
        } else if let Some(stmt) = caps.name("stmt") {
            collect_statement(stmt.as_str(), &mut found, &mut locals);
        }
    }

    found.retain(|name| !locals.contains(name));
    found
}

fn collect_statement(stmt: &str, found: &mut IndexSet<String>, locals: &mut HashSet<String>) {
    let stmt = stmt.trim();
    let (keyword, rest) = stmt.split_once(char::is_whitespace).unwrap_or((stmt, ""));

    match keyword {
        "if" | "elif" => collect_variables(rest, found),
        "for" => {
            // for k, v in expr
            if let Some((targets, iterable)) = rest.split_once(" in ") {
                for target in targets.split(',') {
                    locals.insert(target.trim().to_string());
                }
                collect_variables(iterable, found);
            }
        }
        "set" | "set_global" => {
            if let Some((target, value)) = rest.split_once('=') {
                locals.insert(target.trim().to_string());
                collect_variables(value, found);
            }
        }
        _ => {}
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Prev {
    Start,
    Pipe,
    Dot,
    Is,
    Other,
}

fn collect_variables(expr: &str, found: &mut IndexSet<String>) {
    let chars: Vec<char> = expr.chars().collect();
    let mut prev = Prev::Start;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        if c == '"' || c == '\'' || c == '`' {
            i += 1;
            while i < chars.len() && chars[i] != c {
                i += 1;
            }
            i += 1;
            prev = Prev::Other;
            continue;
        }

        if c.is_ascii_digit() {
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '.') {
                i += 1;
            }
            prev = Prev::Other;
            continue;
        }

        if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let ident: String = chars[start..i].iter().collect();

            let next = chars[i..].iter().copied().find(|c| !c.is_whitespace());
            let after_next = chars[i..]
                .iter()
                .copied()
                .filter(|c| !c.is_whitespace())
                .nth(1);
            let is_call = next == Some('(');
            let is_kwarg = next == Some('=') && after_next != Some('=');

            let skip = matches!(prev, Prev::Pipe | Prev::Dot)
                || (prev == Prev::Is && ident != "not")
                || is_call
                || is_kwarg
                || KEYWORDS.contains(&ident.as_str());

            if !skip {
                found.insert(ident.clone());
            }

            prev = match ident.as_str() {
                "is" => Prev::Is,
                // `x is not defined`: keep treating the next word as a test name
                "not" if prev == Prev::Is => Prev::Is,
                _ => Prev::Other,
            };
            continue;
        }

        prev = match c {
            '|' => Prev::Pipe,
            '.' => Prev::Dot,
            _ => Prev::Other,
        };
        i += 1;
    }
}
