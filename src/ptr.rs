use crate::{node::Node, Error};
use percent_encoding::percent_decode_str;
use std::str::FromStr;

/// Token is a parsed token of a JSON pointer.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Token {
    /// Integer index of a JSON array.
    /// If applied to a JSON object, the index may also serve as a property name.
    Index(usize),
    /// JSON object property name without escaping. Never an integer.
    Property(String),
}

impl Token {
    fn from_str(s: &str) -> Self {
        if s.starts_with('+') || (s.starts_with('0') && s.len() > 1) {
            Token::Property(s.to_string())
        } else if let Ok(ind) = usize::from_str(s) {
            Token::Index(ind)
        } else {
            Token::Property(s.to_string())
        }
    }
}

/// Pointer is a parsed JSON pointer.
#[derive(Debug, Clone, PartialEq)]
pub struct Pointer(Vec<Token>);

impl Pointer {
    /// Builds a Pointer from the given string, which is an encoded JSON pointer.
    pub fn from_str(s: &str) -> Pointer {
        if s.is_empty() {
            return Pointer(Vec::new());
        }
        Pointer(
            s.split('/')
                .skip(if s.starts_with('/') { 1 } else { 0 })
                .map(|t| Token::from_str(&t.replace("~1", "/").replace("~0", "~")))
                .collect(),
        )
    }

    /// Iterate over pointer tokens.
    pub fn iter(&self) -> impl Iterator<Item = &Token> {
        self.0.iter()
    }

    /// Query the value at the pointer location within the document.
    /// Returns None if the pointed location (or a parent thereof) does not exist.
    pub fn query<'n>(&self, mut node: &'n Node) -> Option<&'n Node> {
        for token in self.iter() {
            let next = match node {
                Node::Object { .. } => match token {
                    Token::Index(ind) => node.get(&ind.to_string()),
                    Token::Property(property) => node.get(property),
                },
                Node::Array { items, .. } => match token {
                    Token::Index(ind) => items.get(*ind),
                    Token::Property(_) => None,
                },
                _ => None,
            };

            if let Some(next) = next {
                node = next;
            } else {
                return None;
            }
        }
        Some(node)
    }
}

/// Walk a fragment-encoded JSON pointer from `root`, as resolved from the
/// reference `reference` appearing at `ref_location`. The fragment is
/// percent-decoded before pointer tokens are split and un-escaped.
pub fn walk_fragment<'n>(
    root: &'n Node,
    fragment: &str,
    ref_location: &str,
    reference: &str,
) -> Result<&'n Node, Error> {
    let dangling = || Error::InvalidReference {
        location: ref_location.to_string(),
        reference: reference.to_string(),
    };

    let decoded = percent_decode_str(fragment)
        .decode_utf8()
        .map_err(|_| dangling())?;

    Pointer::from_str(&decoded).query(root).ok_or_else(dangling)
}

#[cfg(test)]
mod test {
    use super::{walk_fragment, Pointer, Token};
    use crate::node::Node;
    use serde_json::json;

    #[test]
    fn test_ptr_parsing() {
        use Token::*;

        // Basic example.
        let ptr = Pointer::from_str("/p1/2/p3");
        assert!(vec![
            Property("p1".to_string()),
            Index(2),
            Property("p3".to_string())
        ]
        .iter()
        .eq(ptr.iter()));

        // Empty pointer.
        let ptr = Pointer::from_str("");
        assert_eq!(ptr.iter().next(), None);

        // Handles escapes.
        let ptr = Pointer::from_str("/p~01/~12");
        assert!(
            vec![Property("p~1".to_string()), Property("/2".to_string())]
                .iter()
                .eq(ptr.iter())
        );

        // Handles disallowed integer representations.
        let ptr = Pointer::from_str("/01/+2/-3/4");
        assert!(vec![
            Property("01".to_string()),
            Property("+2".to_string()),
            Property("-3".to_string()),
            Index(4)
        ]
        .iter()
        .eq(ptr.iter()));
    }

    #[test]
    fn test_ptr_query() {
        // Extended document fixture from RFC-6901.
        let doc = json!({
            "foo": ["bar", "baz"],
            "": 0,
            "a/b": 1,
            "c%d": 2,
            "e^f": 3,
            " ": 7,
            "m~n": 8,
            "9": 10,
        });
        let doc = Node::build(&doc, "").unwrap();

        // Query document locations which exist (cases from RFC-6901).
        for (ptr, expect) in [
            ("/foo/0", json!("bar")),
            ("/foo/1", json!("baz")),
            ("/", json!(0)),
            ("/a~1b", json!(1)),
            ("/c%d", json!(2)),
            ("/e^f", json!(3)),
            ("/ ", json!(7)),
            ("/m~0n", json!(8)),
            ("/9", json!(10)),
        ] {
            let found = Pointer::from_str(ptr).query(&doc).unwrap();
            let expect = Node::build(&expect, "").unwrap();
            assert_eq!(
                crate::canon::canonicalize(found),
                crate::canon::canonicalize(&expect),
                "at {ptr}"
            );
        }

        // Locations which don't exist.
        for ptr in [
            "/bar",      // Missing property.
            "/foo/2",    // Missing index.
            "/foo/prop", // Cannot take property of array.
            "/e^f/3",    // Not an object or array.
        ] {
            assert!(Pointer::from_str(ptr).query(&doc).is_none());
        }
    }

    #[test]
    fn test_walk_fragment() {
        let doc = Node::build(&json!({"e^f": {"g": 1}}), "").unwrap();

        // Percent-encoded fragments decode before the walk.
        let found = walk_fragment(&doc, "/e%5Ef/g", "#/$ref", "#/e%5Ef/g").unwrap();
        assert_eq!(found.as_f64(), Some(1.0));

        let err = walk_fragment(&doc, "/nope", "#/$ref", "#/nope").unwrap_err();
        assert_eq!(
            err.to_string(),
            "reference '#/nope' at '#/$ref' cannot be resolved"
        );
    }
}
