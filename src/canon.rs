use crate::node::{Node, Property};
use std::fmt::Write;

/// canonicalize renders a Node as deterministic JSON text: object keys are
/// sorted lexicographically, numbers with a zero fractional part render as
/// integers, and no whitespace is emitted. Two nodes are equal as JSON
/// values iff their canonical forms are equal, which is the equality used by
/// "const", "enum", and "uniqueItems".
pub fn canonicalize(node: &Node) -> String {
    let mut out = String::new();
    write_node(&mut out, node);
    out
}

fn write_node(out: &mut String, node: &Node) {
    match node {
        Node::Null { .. } => out.push_str("null"),
        Node::Bool { value, .. } => out.push_str(if *value { "true" } else { "false" }),
        Node::Number { value, .. } => write_number(out, *value),
        Node::String { value, .. } => write_string(out, value),
        Node::Array { items, .. } => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i != 0 {
                    out.push(',');
                }
                write_node(out, item);
            }
            out.push(']');
        }
        Node::Object { properties, .. } => {
            let mut sorted: Vec<&Property> = properties.iter().collect();
            sorted.sort_by(|lhs, rhs| lhs.name.cmp(&rhs.name));

            out.push('{');
            for (i, prop) in sorted.iter().enumerate() {
                if i != 0 {
                    out.push(',');
                }
                write_string(out, &prop.name);
                out.push(':');
                write_node(out, &prop.value);
            }
            out.push('}');
        }
    }
}

// Integral values render without a fractional part so that 1 and 1.0 are
// the same JSON number. 2^53 bounds the range which round-trips through i64
// without loss.
fn write_number(out: &mut String, value: f64) {
    if value.fract() == 0.0 && value.abs() < 9_007_199_254_740_992.0 {
        write!(out, "{}", value as i64).unwrap();
    } else {
        write!(out, "{value}").unwrap();
    }
}

fn write_string(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => write!(out, "\\u{:04x}", c as u32).unwrap(),
            c => out.push(c),
        }
    }
    out.push('"');
}

#[cfg(test)]
mod test {
    use super::canonicalize;
    use crate::node::Node;
    use serde_json::json;

    fn canon(v: serde_json::Value) -> String {
        canonicalize(&Node::build(&v, "").unwrap())
    }

    #[test]
    fn test_canonical_forms() {
        assert_eq!(canon(json!(null)), "null");
        assert_eq!(canon(json!(true)), "true");
        assert_eq!(canon(json!("a\"b\\c\nd")), r#""a\"b\\c\nd""#);
        assert_eq!(canon(json!([1, [2.5, "x"], {}])), r#"[1,[2.5,"x"],{}]"#);
    }

    #[test]
    fn test_numbers_unify_across_representations() {
        assert_eq!(canon(json!(1)), canon(json!(1.0)));
        assert_eq!(canon(json!(0)), canon(json!(-0.0)));
        assert_eq!(canon(json!(-3)), "-3");
        assert_ne!(canon(json!(1)), canon(json!(1.5)));
    }

    #[test]
    fn test_object_keys_sorted() {
        assert_eq!(
            canon(json!({"b": 1, "a": {"d": 2, "c": 3}})),
            r#"{"a":{"c":3,"d":2},"b":1}"#
        );
        // Key order of the source document is irrelevant.
        assert_eq!(
            canon(json!({"x": 1, "y": 2})),
            canon(json!({"y": 2, "x": 1}))
        );
    }
}
