use arenajson::{Document, Options, TypedValue, ValueId, ValueRef};
use proptest::prelude::*;
use serde_json::Value;

fn json_leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(Value::from),
        (-1000i32..1000).prop_map(|n| Value::from(f64::from(n) + 0.5)),
        "[a-zA-Z0-9 é✓\"\\\\/\n\r\t]{0,8}".prop_map(Value::String),
    ]
}

fn json_value() -> impl Strategy<Value = Value> {
    json_leaf().prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::vec(("[a-z]{0,3}", inner), 0..6)
                .prop_map(|entries| Value::Object(entries.into_iter().collect())),
        ]
    })
}

fn json_root() -> impl Strategy<Value = Value> {
    prop_oneof![
        prop::collection::vec(json_value(), 0..6).prop_map(Value::Array),
        prop::collection::vec(("[a-z]{0,3}", json_value()), 0..6)
            .prop_map(|entries| Value::Object(entries.into_iter().collect())),
    ]
}

fn small_options() -> Options {
    Options {
        page_size: 16,
        container_capacity: 1,
        ..Options::default()
    }
}

proptest! {
    #[test]
    fn parses_what_serde_json_writes(value in json_root()) {
        let text = serde_json::to_string(&value).unwrap();
        let doc = Document::parse(&text).unwrap();
        let back = serde_json::to_string(&doc.root().unwrap()).unwrap();
        prop_assert_eq!(back, text);
    }

    #[test]
    fn compact_output_round_trips(value in json_root()) {
        let doc = Document::parse(&serde_json::to_string(&value).unwrap()).unwrap();
        let once = doc.to_string_compact().unwrap();
        let reparsed = Document::parse(&once).unwrap();
        prop_assert_eq!(reparsed.to_string_compact().unwrap(), once.clone());

        let ours: Value = serde_json::from_str(&once).unwrap();
        prop_assert_eq!(ours, value);
    }

    #[test]
    fn pretty_output_round_trips(value in json_root()) {
        let doc = Document::parse(&serde_json::to_string(&value).unwrap()).unwrap();
        let pretty = doc.to_string_pretty().unwrap();
        prop_assert!(pretty.ends_with('\n'));

        let reparsed = Document::parse(&pretty).unwrap();
        prop_assert_eq!(reparsed.to_string_pretty().unwrap(), pretty);
        prop_assert_eq!(reparsed.to_string_compact().unwrap(), doc.to_string_compact().unwrap());
    }

    #[test]
    fn tiny_pages_and_capacities_change_nothing(value in json_root()) {
        let text = serde_json::to_string(&value).unwrap();
        let small = Document::parse_with_options(&text, small_options()).unwrap();
        let default = Document::parse(&text).unwrap();
        prop_assert_eq!(small.to_string_compact().unwrap(), default.to_string_compact().unwrap());
    }
}

/// A tree to assemble through the builder API.
#[derive(Debug, Clone)]
enum Node {
    Number(f64),
    String(String),
    Bool(bool),
    Null,
    Array(Vec<Node>),
    Object(Vec<(String, Node)>),
}

fn finite_f64() -> impl Strategy<Value = f64> {
    prop_oneof![
        any::<f64>().prop_filter("finite", |n| n.is_finite()),
        Just(f64::MAX),
        Just(f64::MIN),
        Just(f64::MIN_POSITIVE),
        Just(5e-324),
        Just(1e-310),
    ]
}

fn node() -> impl Strategy<Value = Node> {
    let leaf = prop_oneof![
        4 => finite_f64().prop_map(Node::Number),
        1 => "[a-z\"\\\\/\n\t]{0,6}".prop_map(Node::String),
        1 => any::<bool>().prop_map(Node::Bool),
        1 => Just(Node::Null),
    ];
    leaf.prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Node::Array),
            prop::collection::vec(("[a-z]{0,3}", inner), 0..6).prop_map(Node::Object),
        ]
    })
}

fn build(doc: &mut Document, node: &Node) -> ValueId {
    match node {
        Node::Number(n) => doc.new_number(*n).unwrap(),
        Node::String(s) => doc.new_string(s).unwrap(),
        Node::Bool(b) => doc.new_bool(*b),
        Node::Null => doc.new_null(),
        Node::Array(items) => {
            let array = doc.new_array();
            for item in items {
                let item = build(doc, item);
                doc.push(array, item).unwrap();
            }
            array
        }
        Node::Object(entries) => {
            let object = doc.new_object();
            for (key, value) in entries {
                let value = build(doc, value);
                doc.put(object, key, value).unwrap();
            }
            object
        }
    }
}

/// Every number in the tree, depth first in printed order.
fn numbers(value: ValueRef<'_>, out: &mut Vec<f64>) {
    match value.typed() {
        TypedValue::Number(n) => out.push(n),
        TypedValue::Array(arr) => arr.iter().for_each(|v| numbers(v, out)),
        TypedValue::Object(obj) => obj.iter().for_each(|(_, v)| numbers(v, out)),
        _ => {}
    }
}

proptest! {
    #[test]
    fn built_trees_round_trip(items in prop::collection::vec(node(), 0..6)) {
        let mut doc = Document::new();
        let root = build(&mut doc, &Node::Array(items));
        doc.set_root(root).unwrap();

        let text = doc.to_string_compact().unwrap();
        let reparsed = Document::parse(&text).unwrap();
        prop_assert_eq!(reparsed.to_string_compact().unwrap(), text);

        let (mut built, mut parsed) = (Vec::new(), Vec::new());
        numbers(doc.root().unwrap(), &mut built);
        numbers(reparsed.root().unwrap(), &mut parsed);
        prop_assert_eq!(parsed, built);
    }
}

#[test]
fn extreme_built_numbers_survive() {
    for n in [f64::MAX, f64::MIN, f64::MIN_POSITIVE, 5e-324, -1e-310, 1e-310, 1e21, 0.1] {
        let mut doc = Document::new();
        let array = doc.new_array();
        let value = doc.new_number(n).unwrap();
        doc.push(array, value).unwrap();
        doc.set_root(array).unwrap();

        let text = doc.to_string_pretty().unwrap();
        let back = Document::parse(&text).unwrap();
        let parsed = back.root().unwrap().as_array().unwrap().get(0).unwrap();
        assert_eq!(parsed.as_number().unwrap(), n, "printed as {text}");
    }
}
