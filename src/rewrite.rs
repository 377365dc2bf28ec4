//! Default-namespace expression rewriting
//!
//! XPath 1.0 has no default namespace for name tests: `/root` only ever
//! matches a `root` element in no namespace. When the document uses a
//! default namespace, the user would have to prefix every step by hand.
//! This module does that for them, injecting the default prefix into bare
//! names that look like node tests.
//!
//! The rewrite is a sequence of pattern passes over the text, not a parse.
//! It is a heuristic and only aims at the common shapes of hand-typed
//! expressions; explicitly prefixed names are always left alone.

use std::sync::LazyLock;

use log::{debug, trace};
use regex::{Captures, Regex};

/// Stands in for a string literal while the passes run
const MASK: char = '\u{E000}';

/// Node-type tests look like function calls but take no name
const NODE_TYPES: [&str; 4] = ["node", "text", "comment", "processing-instruction"];

/// Bare (unprefixed) name as typed in an expression
const NAME: &str = r"[\p{L}_][\p{L}\p{N}_.\-]*";

type Accept = fn(&Captures<'_>, &str) -> bool;

/// One rewrite pass. `pattern` has a `name` group; the prefix is inserted
/// in front of it when `accept` agrees, given the text after the name.
struct Rule {
    label: &'static str,
    pattern: Regex,
    accept: Accept,
}

impl Rule {
    fn new(label: &'static str, pattern: String, accept: Accept) -> Self {
        Rule {
            label,
            pattern: Regex::new(&pattern).expect("Invalid rewrite pattern"),
            accept,
        }
    }
}

static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        Rule::new("start", format!("^(?P<name>{NAME})"), |_, rest| {
            run(rest, &['/', ':', '(']).1 == Some('/')
        }),
        Rule::new("segment", format!("/(?P<name>{NAME})"), |_, rest| {
            let (span, stop) = run(rest, &['/', ':', '*', '(']);
            span.contains('[') || stop == Some('/')
        }),
        Rule::new("axis", format!("::(?P<name>{NAME})"), |_, rest| {
            !rest.starts_with('(') && run(rest, &['/', ':', '*']).1 == Some('/')
        }),
        Rule::new("predicate", format!(r"\[(?P<name>{NAME})"), |_, rest| {
            run(rest, &['/', ':', '*', '(']).0.contains(&['[', ']'][..])
        }),
        Rule::new("end", format!("/(?P<name>{NAME})"), |_, rest| {
            run(rest, &['/', ':', '*', '(']).1.is_none()
        }),
        Rule::new("whole", format!("^(?P<name>{NAME})$"), |_, _| true),
        Rule::new(
            "argument",
            format!(r"(?P<func>[A-Za-z][-A-Za-z]+)\(\s*(?P<name>{NAME})\s*[,)]"),
            |caps, _| !NODE_TYPES.contains(&&caps["func"]),
        ),
    ]
});

/// Prefix the bare node-test names in `raw` with `default_prefix`.
///
/// Returns the expression unchanged when there is no default prefix.
/// String literals are never touched.
pub fn rewrite_expression(raw: &str, default_prefix: Option<&str>) -> String {
    let Some(prefix) = default_prefix.filter(|p| !p.is_empty()) else {
        return raw.to_string();
    };

    let (mut text, literals) = mask_literals(raw);
    for rule in RULES.iter() {
        text = apply(rule, &text, prefix);
    }
    let rewritten = unmask_literals(&text, &literals);

    if rewritten != raw {
        debug!("rewrote {:?} as {:?}", raw, rewritten);
    }
    rewritten
}

fn apply(rule: &Rule, text: &str, prefix: &str) -> String {
    let mut out = String::with_capacity(text.len() + prefix.len() * 2);
    let mut copied = 0;
    let mut hits = 0;
    for caps in rule.pattern.captures_iter(text) {
        let Some(name) = caps.name("name") else {
            continue;
        };
        if !(rule.accept)(&caps, &text[name.end()..]) {
            continue;
        }
        out.push_str(&text[copied..name.start()]);
        out.push_str(prefix);
        out.push(':');
        copied = name.start();
        hits += 1;
    }
    if hits > 0 {
        trace!("{} rule prefixed {} name(s)", rule.label, hits);
    }
    out.push_str(&text[copied..]);
    out
}

/// Text up to the first of `stops`, and the stop character found (None at
/// the end of the text)
fn run<'a>(rest: &'a str, stops: &[char]) -> (&'a str, Option<char>) {
    match rest.find(stops) {
        Some(i) => (&rest[..i], rest[i..].chars().next()),
        None => (rest, None),
    }
}

/// Replace each quoted literal with a single mask character. An
/// unterminated literal runs to the end of the text.
fn mask_literals(raw: &str) -> (String, Vec<&str>) {
    if raw.contains(MASK) {
        return (raw.to_string(), Vec::new());
    }
    let mut masked = String::with_capacity(raw.len());
    let mut literals = Vec::new();
    let mut rest = raw;
    while let Some(open) = rest.find(&['\'', '"'][..]) {
        masked.push_str(&rest[..open]);
        let quote = &rest[open..open + 1];
        let len = rest[open + 1..].find(quote).map_or(rest.len() - open, |close| close + 2);
        literals.push(&rest[open..open + len]);
        masked.push(MASK);
        rest = &rest[open + len..];
    }
    masked.push_str(rest);
    (masked, literals)
}

fn unmask_literals(masked: &str, literals: &[&str]) -> String {
    let mut out = String::with_capacity(masked.len());
    let mut literals = literals.iter();
    for c in masked.chars() {
        if c == MASK {
            if let Some(literal) = literals.next() {
                out.push_str(literal);
                continue;
            }
        }
        out.push(c);
    }
    out
}
