//! XPath 1.0 Functions
//!
//! The core function library:
//!
//! Node Set Functions:
//! - position(), last(), count(), local-name(), namespace-uri(), name()
//!
//! String Functions:
//! - string(), concat(), starts-with(), contains(), substring(),
//!   substring-before(), substring-after(), string-length(),
//!   normalize-space(), translate()
//!
//! Boolean Functions:
//! - boolean(), not(), true(), false(), lang()
//!
//! Number Functions:
//! - number(), sum(), floor(), ceiling(), round()
//!
//! `id()` needs DTD attribute types and is reported as unsupported.

use super::value::{parse_number, XPathValue};
use crate::dom::{node_string_value, DocumentAccess, NodeId};
use crate::error::QueryError;

type FnResult = Result<XPathValue, QueryError>;

/// Evaluate a function call
pub fn call<D: DocumentAccess>(
    name: &str,
    args: Vec<XPathValue>,
    doc: &D,
    context: NodeId,
    position: usize,
    size: usize,
) -> FnResult {
    match name {
        // Node Set Functions
        "position" => {
            arity(name, &args, 0, 0)?;
            Ok(XPathValue::Number(position as f64))
        }
        "last" => {
            arity(name, &args, 0, 0)?;
            Ok(XPathValue::Number(size as f64))
        }
        "count" => {
            arity(name, &args, 1, 1)?;
            let nodes = node_set_arg(&args[0])?;
            Ok(XPathValue::Number(nodes.len() as f64))
        }
        "local-name" => name_function(name, &args, context, |n| doc.node_local_name(n)),
        "namespace-uri" => name_function(name, &args, context, |n| doc.node_namespace(n)),
        "name" => name_function(name, &args, context, |n| doc.node_name(n)),
        "id" => Err(QueryError::Unsupported("id() requires DTD processing".to_string())),

        // String Functions
        "string" => {
            arity(name, &args, 0, 1)?;
            Ok(XPathValue::String(string_or_context(&args, doc, context)))
        }
        "concat" => {
            arity(name, &args, 2, usize::MAX)?;
            Ok(XPathValue::String(args.iter().map(|a| a.string_in(doc)).collect()))
        }
        "starts-with" => {
            arity(name, &args, 2, 2)?;
            let (s, prefix) = (args[0].string_in(doc), args[1].string_in(doc));
            Ok(XPathValue::Boolean(s.starts_with(&prefix)))
        }
        "contains" => {
            arity(name, &args, 2, 2)?;
            let (s, pattern) = (args[0].string_in(doc), args[1].string_in(doc));
            Ok(XPathValue::Boolean(s.contains(&pattern)))
        }
        "substring" => {
            arity(name, &args, 2, 3)?;
            Ok(XPathValue::String(fn_substring(&args, doc)))
        }
        "substring-before" => {
            arity(name, &args, 2, 2)?;
            let (s, pattern) = (args[0].string_in(doc), args[1].string_in(doc));
            let result = s.find(&pattern).map(|pos| s[..pos].to_string());
            Ok(XPathValue::String(result.unwrap_or_default()))
        }
        "substring-after" => {
            arity(name, &args, 2, 2)?;
            let (s, pattern) = (args[0].string_in(doc), args[1].string_in(doc));
            let result = s.find(&pattern).map(|pos| s[pos + pattern.len()..].to_string());
            Ok(XPathValue::String(result.unwrap_or_default()))
        }
        "string-length" => {
            arity(name, &args, 0, 1)?;
            let s = string_or_context(&args, doc, context);
            Ok(XPathValue::Number(s.chars().count() as f64))
        }
        "normalize-space" => {
            arity(name, &args, 0, 1)?;
            let s = string_or_context(&args, doc, context);
            Ok(XPathValue::String(
                s.split_ascii_whitespace().collect::<Vec<_>>().join(" "),
            ))
        }
        "translate" => {
            arity(name, &args, 3, 3)?;
            Ok(XPathValue::String(fn_translate(&args, doc)))
        }

        // Boolean Functions
        "boolean" => {
            arity(name, &args, 1, 1)?;
            Ok(XPathValue::Boolean(args[0].to_boolean()))
        }
        "not" => {
            arity(name, &args, 1, 1)?;
            Ok(XPathValue::Boolean(!args[0].to_boolean()))
        }
        "true" => {
            arity(name, &args, 0, 0)?;
            Ok(XPathValue::Boolean(true))
        }
        "false" => {
            arity(name, &args, 0, 0)?;
            Ok(XPathValue::Boolean(false))
        }
        "lang" => {
            arity(name, &args, 1, 1)?;
            Ok(XPathValue::Boolean(fn_lang(&args[0].string_in(doc), doc, context)))
        }

        // Number Functions
        "number" => {
            arity(name, &args, 0, 1)?;
            let n = match args.first() {
                Some(arg) => arg.number_in(doc),
                None => parse_number(&node_string_value(doc, context)),
            };
            Ok(XPathValue::Number(n))
        }
        "sum" => {
            arity(name, &args, 1, 1)?;
            let nodes = node_set_arg(&args[0])?;
            let total = nodes
                .iter()
                .map(|&n| parse_number(&node_string_value(doc, n)))
                .sum();
            Ok(XPathValue::Number(total))
        }
        "floor" => {
            arity(name, &args, 1, 1)?;
            Ok(XPathValue::Number(args[0].number_in(doc).floor()))
        }
        "ceiling" => {
            arity(name, &args, 1, 1)?;
            Ok(XPathValue::Number(args[0].number_in(doc).ceil()))
        }
        "round" => {
            arity(name, &args, 1, 1)?;
            Ok(XPathValue::Number(xpath_round(args[0].number_in(doc))))
        }

        _ => Err(QueryError::UnknownFunction(name.to_string())),
    }
}

fn arity(name: &str, args: &[XPathValue], min: usize, max: usize) -> Result<(), QueryError> {
    if args.len() < min || args.len() > max {
        return Err(QueryError::Syntax(format!(
            "function {}() has an invalid number of arguments",
            name
        )));
    }
    Ok(())
}

fn node_set_arg(arg: &XPathValue) -> Result<&Vec<NodeId>, QueryError> {
    arg.as_nodeset().ok_or(QueryError::NotANodeSet)
}

/// local-name(), namespace-uri() and name(): applied to the first node of
/// the argument, or the context node without one
fn name_function<'d>(
    name: &str,
    args: &[XPathValue],
    context: NodeId,
    get: impl Fn(NodeId) -> &'d str,
) -> FnResult {
    arity(name, args, 0, 1)?;
    let node = match args.first() {
        None => Some(context),
        Some(arg) => node_set_arg(arg)?.first().copied(),
    };
    Ok(XPathValue::String(node.map(|n| get(n).to_string()).unwrap_or_default()))
}

fn string_or_context<D: DocumentAccess>(args: &[XPathValue], doc: &D, context: NodeId) -> String {
    match args.first() {
        Some(arg) => arg.string_in(doc),
        None => node_string_value(doc, context),
    }
}

/// Characters at 1-based positions p with start <= p < start + length,
/// both bounds rounded; NaN bounds select nothing
fn fn_substring<D: DocumentAccess>(args: &[XPathValue], doc: &D) -> String {
    let s = args[0].string_in(doc);
    let start = xpath_round(args[1].number_in(doc));
    let end = match args.get(2) {
        Some(len) => start + xpath_round(len.number_in(doc)),
        None => f64::INFINITY,
    };
    s.chars()
        .enumerate()
        .filter(|&(i, _)| {
            let p = (i + 1) as f64;
            p >= start && p < end
        })
        .map(|(_, c)| c)
        .collect()
}

fn fn_translate<D: DocumentAccess>(args: &[XPathValue], doc: &D) -> String {
    let s = args[0].string_in(doc);
    let from: Vec<char> = args[1].string_in(doc).chars().collect();
    let to: Vec<char> = args[2].string_in(doc).chars().collect();
    s.chars()
        .filter_map(|c| match from.iter().position(|&f| f == c) {
            Some(pos) => to.get(pos).copied(),
            None => Some(c),
        })
        .collect()
}

/// Nearest `xml:lang` on the node or an ancestor decides; a subtag prefix
/// match counts ("en" matches "en-US")
fn fn_lang<D: DocumentAccess>(target: &str, doc: &D, context: NodeId) -> bool {
    let target = target.to_lowercase();
    let mut node = Some(context);
    while let Some(current) = node {
        let lang = doc
            .attribute_ids(current)
            .find(|&a| doc.node_name(a) == "xml:lang")
            .map(|a| doc.node_value(a).to_lowercase());
        if let Some(lang) = lang {
            return lang == target
                || (lang.starts_with(&target) && lang.as_bytes().get(target.len()) == Some(&b'-'));
        }
        node = doc.parent_of(current);
    }
    false
}

/// round(): halves go towards positive infinity
fn xpath_round(n: f64) -> f64 {
    if n.is_nan() || n.is_infinite() || n == 0.0 {
        n
    } else if (-0.5..0.0).contains(&n) {
        -0.0
    } else {
        (n + 0.5).floor()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{ParseOptions, XmlDocument};

    fn doc(text: &str) -> XmlDocument {
        XmlDocument::parse(text, &ParseOptions::default()).unwrap()
    }

    fn string(s: &str) -> XPathValue {
        XPathValue::String(s.to_string())
    }

    fn num(n: f64) -> XPathValue {
        XPathValue::Number(n)
    }

    fn eval(name: &str, args: Vec<XPathValue>) -> XPathValue {
        call(name, args, &doc("<r/>"), 0, 1, 1).unwrap()
    }

    #[test]
    fn test_concat() {
        let result = eval("concat", vec![string("hello"), string(" "), string("world")]);
        assert_eq!(result.to_string_value(), "hello world");
    }

    #[test]
    fn test_substring() {
        let s = |args: Vec<XPathValue>| eval("substring", args).to_string_value();
        assert_eq!(s(vec![string("hello"), num(2.0), num(3.0)]), "ell");
        assert_eq!(s(vec![string("12345"), num(1.5), num(2.6)]), "234");
        assert_eq!(s(vec![string("12345"), num(0.0), num(3.0)]), "12");
        assert_eq!(s(vec![string("12345"), num(f64::NAN), num(3.0)]), "");
        assert_eq!(s(vec![string("12345"), num(4.0)]), "45");
    }

    #[test]
    fn test_normalize_space_and_translate() {
        let result = eval("normalize-space", vec![string("  hello \n  world  ")]);
        assert_eq!(result.to_string_value(), "hello world");
        let result = eval("translate", vec![string("--aaa--"), string("abc-"), string("ABC")]);
        assert_eq!(result.to_string_value(), "AAA");
    }

    #[test]
    fn test_round() {
        assert_eq!(xpath_round(2.5), 3.0);
        assert_eq!(xpath_round(-2.5), -2.0);
        assert_eq!(xpath_round(-0.2), 0.0);
        assert!(xpath_round(f64::NAN).is_nan());
    }

    #[test]
    fn test_count_requires_node_set() {
        let err = call("count", vec![string("x")], &doc("<r/>"), 0, 1, 1).unwrap_err();
        assert_eq!(err, QueryError::NotANodeSet);
    }

    #[test]
    fn test_wrong_arity_and_unknown_function() {
        let d = doc("<r/>");
        assert!(matches!(call("not", vec![], &d, 0, 1, 1), Err(QueryError::Syntax(_))));
        assert_eq!(
            call("frobnicate", vec![], &d, 0, 1, 1).unwrap_err(),
            QueryError::UnknownFunction("frobnicate".to_string())
        );
        assert!(matches!(call("id", vec![string("a")], &d, 0, 1, 1), Err(QueryError::Unsupported(_))));
    }

    #[test]
    fn test_name_functions_on_namespaced_element() {
        let d = doc(r#"<root xmlns:ns="http://example.com"><ns:child/></root>"#);
        let root = d.root_element_id().unwrap();
        let child = d.children_vec(root)[0];
        let arg = || vec![XPathValue::NodeSet(vec![child])];
        assert_eq!(call("name", arg(), &d, 0, 1, 1).unwrap(), string("ns:child"));
        assert_eq!(call("local-name", arg(), &d, 0, 1, 1).unwrap(), string("child"));
        assert_eq!(
            call("namespace-uri", arg(), &d, 0, 1, 1).unwrap(),
            string("http://example.com")
        );
        assert_eq!(call("name", vec![XPathValue::empty_nodeset()], &d, 0, 1, 1).unwrap(), string(""));
    }

    #[test]
    fn test_lang_walks_ancestors() {
        let d = doc(r#"<root xml:lang="en-US"><child/></root>"#);
        let root = d.root_element_id().unwrap();
        let child = d.children_vec(root)[0];
        assert!(call("lang", vec![string("en")], &d, child, 1, 1).unwrap().to_boolean());
        assert!(!call("lang", vec![string("fr")], &d, child, 1, 1).unwrap().to_boolean());
    }

    #[test]
    fn test_sum_and_number_of_nodes() {
        let d = doc("<r><n>1</n><n>2.5</n></r>");
        let root = d.root_element_id().unwrap();
        let nodes = XPathValue::NodeSet(d.children_vec(root));
        assert_eq!(call("sum", vec![nodes.clone()], &d, 0, 1, 1).unwrap(), XPathValue::Number(3.5));
        assert_eq!(call("number", vec![nodes], &d, 0, 1, 1).unwrap(), XPathValue::Number(1.0));
    }
}
