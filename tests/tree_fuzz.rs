//! Property tests over arbitrary JSON documents: location round-trips,
//! canonical equality, determinism, and keyword coverage partitions.
use json_trace::{canon::canonicalize, location, ptr, validate, Node};
use quickcheck::quickcheck;
use serde_json::{json, Map, Value};

use arbitrary_value::ArbitraryValue;

quickcheck! {
    fn location_round_trip_fuzz(input: ArbitraryValue) -> bool {
        location_round_trip(input.0)
    }

    fn canonical_equality_fuzz(input: ArbitraryValue) -> bool {
        canonical_equality(input.0)
    }

    fn validation_deterministic_fuzz(input: ArbitraryValue) -> bool {
        validation_deterministic(input.0)
    }

    fn additional_properties_partition_fuzz(input: ArbitraryValue) -> bool {
        additional_properties_partition(input.0)
    }

    fn prefix_items_partition_fuzz(input: ArbitraryValue) -> bool {
        prefix_items_partition(input.0)
    }
}

fn collect<'n>(node: &'n Node, out: &mut Vec<&'n Node>) {
    out.push(node);
    match node {
        Node::Array { items, .. } => {
            for item in items {
                collect(item, out);
            }
        }
        Node::Object { properties, .. } => {
            for prop in properties {
                collect(&prop.value, out);
            }
        }
        _ => (),
    }
}

// Reading any node back through its own location returns that node.
fn location_round_trip(input: Value) -> bool {
    let root = Node::build(&input, "").unwrap();

    let mut nodes = Vec::new();
    collect(&root, &mut nodes);

    nodes.into_iter().all(|node| {
        let (base, fragment) = location::split(node.location());
        base.is_empty()
            && match ptr::walk_fragment(&root, fragment, "#", "#") {
                Ok(found) => {
                    found.location() == node.location()
                        && canonicalize(found) == canonicalize(node)
                }
                Err(_) => false,
            }
    })
}

// Canonicalization is stable, and insensitive to object member order.
fn canonical_equality(input: Value) -> bool {
    let node = Node::build(&input, "").unwrap();
    if canonicalize(&node) != canonicalize(&node) {
        return false;
    }

    let reordered = reverse_members(&input);
    let reordered = Node::build(&reordered, "").unwrap();
    canonicalize(&node) == canonicalize(&reordered)
}

fn reverse_members(v: &Value) -> Value {
    match v {
        Value::Object(m) => Value::Object(Map::from_iter(
            m.iter()
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .map(|(k, v)| (k.clone(), reverse_members(v))),
        )),
        Value::Array(items) => Value::Array(items.iter().map(reverse_members).collect()),
        other => other.clone(),
    }
}

fn validation_deterministic(input: Value) -> bool {
    let schema = json!({
        "type": ["object", "array", "string", "number", "boolean", "null"],
        "properties": {"a": {"type": "number"}},
        "items": {"type": ["number", "string"]},
        "minLength": 1,
    });

    let first = validate(&schema, &input).unwrap();
    let second = validate(&schema, &input).unwrap();
    first == second
}

// "additionalProperties" applies to exactly the members not named by
// "properties" and not matched by "patternProperties".
fn additional_properties_partition(input: Value) -> bool {
    let Value::Object(members) = input else {
        return true;
    };
    let schema = json!({
        "properties": {"known": true},
        "patternProperties": {"^a": true},
        "additionalProperties": false,
    });

    let out = validate(&schema, &Value::Object(members.clone())).unwrap();
    let expect: Vec<String> = members
        .keys()
        .filter(|k| k.as_str() != "known" && !k.starts_with('a'))
        .map(|k| location::push_prop("#", k))
        .collect();

    if expect.is_empty() {
        return out.valid;
    }
    if out.valid {
        return false;
    }
    let actual: Vec<String> = out.errors[1..]
        .iter()
        .map(|u| u.instance_location.clone())
        .collect();
    out.errors[0].instance_location == "#" && actual == expect
}

// Each array index is covered by exactly one of "prefixItems" and "items".
fn prefix_items_partition(input: Value) -> bool {
    let Value::Array(items) = input else {
        return true;
    };
    let schema = json!({"prefixItems": [false, false], "items": false});

    let out = validate(&schema, &Value::Array(items.clone())).unwrap();
    if items.is_empty() {
        return out.valid;
    }

    let mut rejected: Vec<String> = out
        .errors
        .iter()
        .filter(|u| u.instance_location != "#")
        .map(|u| u.instance_location.clone())
        .collect();
    rejected.sort();

    let mut expect: Vec<String> = (0..items.len())
        .map(|i| location::push_item("#", i))
        .collect();
    expect.sort();

    rejected == expect
}
