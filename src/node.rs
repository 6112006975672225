use crate::{location, Error};
use serde_json as sj;

/// Node is a JSON value annotated with its location: the base URI of its
/// enclosing document extended with a fragment-encoded JSON pointer.
/// Nodes are built once per document and are immutable thereafter.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Null {
        location: String,
    },
    Bool {
        location: String,
        value: bool,
    },
    Number {
        location: String,
        value: f64,
    },
    String {
        location: String,
        value: String,
    },
    Array {
        location: String,
        items: Vec<Node>,
    },
    Object {
        location: String,
        properties: Vec<Property>,
    },
}

/// Property is a member of an object Node. Its value's location identifies
/// the member's value slot, and doubles as the location of a key-as-string
/// node synthesized by "propertyNames".
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub value: Node,
}

impl Node {
    /// Build a Node tree from a parsed JSON document, rooted at the given
    /// base URI. Children preserve document order, and each child's location
    /// extends its parent's by the escaped segment.
    pub fn build(raw: &sj::Value, base: &str) -> Result<Node, Error> {
        Self::build_at(raw, location::root(base))
    }

    fn build_at(raw: &sj::Value, loc: String) -> Result<Node, Error> {
        Ok(match raw {
            sj::Value::Null => Node::Null { location: loc },
            sj::Value::Bool(b) => Node::Bool {
                location: loc,
                value: *b,
            },
            sj::Value::Number(n) => {
                let value = match n.as_f64() {
                    Some(f) if f.is_finite() => f,
                    _ => return Err(Error::InvalidJson { location: loc }),
                };
                Node::Number {
                    location: loc,
                    value,
                }
            }
            sj::Value::String(s) => Node::String {
                location: loc,
                value: s.clone(),
            },
            sj::Value::Array(items) => {
                let items = items
                    .iter()
                    .enumerate()
                    .map(|(index, child)| Self::build_at(child, location::push_item(&loc, index)))
                    .collect::<Result<Vec<_>, _>>()?;
                Node::Array {
                    location: loc,
                    items,
                }
            }
            sj::Value::Object(members) => {
                let properties = members
                    .iter()
                    .map(|(name, child)| {
                        Ok(Property {
                            name: name.clone(),
                            value: Self::build_at(child, location::push_prop(&loc, name))?,
                        })
                    })
                    .collect::<Result<Vec<_>, Error>>()?;
                Node::Object {
                    location: loc,
                    properties,
                }
            }
        })
    }

    /// Location of this Node.
    pub fn location(&self) -> &str {
        match self {
            Node::Null { location }
            | Node::Bool { location, .. }
            | Node::Number { location, .. }
            | Node::String { location, .. }
            | Node::Array { location, .. }
            | Node::Object { location, .. } => location,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Node::Bool { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Node::Number { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::String { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Node]> {
        match self {
            Node::Array { items, .. } => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&[Property]> {
        match self {
            Node::Object { properties, .. } => Some(properties),
            _ => None,
        }
    }

    /// Value of the named member of an object Node.
    pub fn get(&self, name: &str) -> Option<&Node> {
        self.as_object()?
            .iter()
            .find(|prop| prop.name == name)
            .map(|prop| &prop.value)
    }

    pub fn expect_bool(&self) -> Result<bool, Error> {
        self.as_bool().ok_or_else(|| self.mismatch("a boolean"))
    }

    pub fn expect_f64(&self) -> Result<f64, Error> {
        self.as_f64().ok_or_else(|| self.mismatch("a number"))
    }

    pub fn expect_str(&self) -> Result<&str, Error> {
        self.as_str().ok_or_else(|| self.mismatch("a string"))
    }

    pub fn expect_array(&self) -> Result<&[Node], Error> {
        self.as_array().ok_or_else(|| self.mismatch("an array"))
    }

    pub fn expect_object(&self) -> Result<&[Property], Error> {
        self.as_object().ok_or_else(|| self.mismatch("an object"))
    }

    fn mismatch(&self, expected: &'static str) -> Error {
        Error::InvalidSchema {
            location: self.location().to_string(),
            expected,
        }
    }
}

#[cfg(test)]
mod test {
    use super::Node;
    use serde_json::json;

    #[test]
    fn test_build_locations() {
        let doc = json!({
            "a/b": {"c": 1},
            "arr": [true, null, "s"],
            "m~n": 2.5,
        });
        let root = Node::build(&doc, "http://example/doc").unwrap();

        assert_eq!(root.location(), "http://example/doc#");
        assert_eq!(
            root.get("a/b").unwrap().location(),
            "http://example/doc#/a~1b"
        );
        assert_eq!(
            root.get("a/b").unwrap().get("c").unwrap().location(),
            "http://example/doc#/a~1b/c"
        );
        assert_eq!(
            root.get("arr").unwrap().as_array().unwrap()[1].location(),
            "http://example/doc#/arr/1"
        );
        assert_eq!(
            root.get("m~n").unwrap().location(),
            "http://example/doc#/m~0n"
        );
    }

    #[test]
    fn test_document_order_preserved() {
        let doc = json!({"zebra": 1, "apple": 2, "mango": 3});
        let root = Node::build(&doc, "").unwrap();

        let names: Vec<_> = root
            .as_object()
            .unwrap()
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, vec!["zebra", "apple", "mango"]);
    }

    #[test]
    fn test_accessors() {
        let root = Node::build(&json!({"n": 3.25, "s": "hi", "b": false}), "").unwrap();

        assert_eq!(root.get("n").unwrap().as_f64(), Some(3.25));
        assert_eq!(root.get("s").unwrap().as_str(), Some("hi"));
        assert_eq!(root.get("b").unwrap().as_bool(), Some(false));
        assert!(root.get("missing").is_none());

        let err = root.get("n").unwrap().expect_str().unwrap_err();
        assert_eq!(err.to_string(), "invalid schema at '#/n': expected a string");
    }
}
