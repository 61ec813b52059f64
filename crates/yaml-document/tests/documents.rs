use yaml_document::{
    Document, Error, Item, NodeKind, ParseOptions, StringifyOptions, Value, parse, parse_all,
};
use tracing_subscriber::EnvFilter;

/// Route library diagnostics to the test output (`RUST_LOG=yaml_document=debug`).
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn keys(keys: &[&str]) -> Vec<Item> {
    keys.iter().map(|&k| Item::from(k)).collect()
}

fn merge_options() -> ParseOptions {
    ParseOptions { merge_keys: true }
}

#[test]
fn test_edit_parsed_document() {
    let source = "\
server:
  host: localhost
  ports: [80, 443]
";
    let mut doc = parse(source, &ParseOptions::default()).unwrap();

    assert_eq!(
        doc.get_path(&keys(&["server", "host"]), false),
        Some(Item::from("localhost"))
    );
    assert!(doc.has_path(&[Item::from("server"), Item::from("ports"), Item::from(1)]));
    assert!(!doc.has_path(&keys(&["server", "user"])));

    doc.set_path(&keys(&["server", "host"]), "example.com").unwrap();
    doc.add_path(&keys(&["server", "ports"]), 8080).unwrap();
    assert!(doc.delete_path(&[Item::from("server"), Item::from("ports"), Item::from(0)]));

    let text = doc.to_yaml_string(&StringifyOptions::default()).unwrap();
    insta::assert_snapshot!(text, @r"
    server:
      host: example.com
      ports: [ 443, 8080 ]
    ");
}

#[test]
fn test_set_through_scalar_fails() {
    let mut doc = parse("a: 1\n", &ParseOptions::default()).unwrap();
    let err = doc.set_path(&keys(&["a", "b"]), 2).unwrap_err();
    assert!(matches!(err, Error::NotACollection { .. }));
    assert!(!doc.delete_path(&keys(&["a", "b"])));
    assert_eq!(doc.get_path(&keys(&["a", "b"]), false), None);
}

#[test]
fn test_aliases_share_identity() {
    init_tracing();
    let source = "\
defaults: &defaults
  retries: 3
primary: *defaults
backup: *defaults
";
    let doc = parse(source, &ParseOptions::default()).unwrap();
    let value = doc.to_value().unwrap();

    let defaults = value.get("defaults").unwrap();
    assert!(defaults.same_identity(&value.get("primary").unwrap()));
    assert!(defaults.same_identity(&value.get("backup").unwrap()));

    defaults
        .as_map()
        .unwrap()
        .borrow_mut()
        .insert("retries".into(), Value::Int(5));
    assert_eq!(value.get("backup").unwrap().get("retries"), Some(Value::Int(5)));
}

#[test]
fn test_self_referencing_values_compare_equal() {
    let first = parse("&a [*a]\n", &ParseOptions::default()).unwrap().to_value().unwrap();
    let second = parse("&a [*a]\n", &ParseOptions::default()).unwrap().to_value().unwrap();
    assert!(!first.same_identity(&second));
    assert_eq!(first, second);

    let different = parse("&a [*a, 1]\n", &ParseOptions::default()).unwrap().to_value().unwrap();
    assert_ne!(first, different);
}

#[test]
fn test_anchor_names_preserved_on_output() {
    let source = "base: &base\n  x: 1\ncopy: *base\n";
    let doc = parse(source, &ParseOptions::default()).unwrap();
    assert_eq!(doc.to_yaml_string(&StringifyOptions::default()).unwrap(), source);
}

#[test]
fn test_unresolved_alias_is_an_error() {
    let err = parse("a: *missing\n", &ParseOptions::default()).unwrap_err();
    assert!(matches!(err, Error::UnresolvedAlias { ref name, .. } if name == "missing"));
}

#[test]
fn test_duplicate_key_is_an_error() {
    let err = parse("a: 1\na: 2\n", &ParseOptions::default()).unwrap_err();
    assert!(matches!(err, Error::DuplicateKey { ref key } if key == "a"));
}

#[test]
fn test_merge_keys() {
    init_tracing();
    let source = "\
base: &base
  a: 1
  b: 2
extra: &extra
  c: 3
derived:
  <<: [*base, *extra]
  b: 20
";
    let doc = parse(source, &merge_options()).unwrap();
    let derived = doc.to_value().unwrap().get("derived").unwrap();
    assert_eq!(
        derived,
        Value::map([
            ("a", Value::Int(1)),
            ("b", Value::Int(20)),
            ("c", Value::Int(3)),
        ])
    );

    let text = doc.to_yaml_string(&StringifyOptions::default()).unwrap();
    assert!(text.contains("<<: [ *base, *extra ]\n"), "{}", text);
    let again = parse(&text, &merge_options()).unwrap();
    assert_eq!(again.to_value().unwrap(), doc.to_value().unwrap());
}

#[test]
fn test_merge_key_is_plain_without_option() {
    let doc = parse("base: &b {a: 1}\nd:\n  <<: *b\n", &ParseOptions::default()).unwrap();
    let value = doc.to_value().unwrap();
    assert_eq!(
        value.get("d").unwrap().get("<<"),
        Some(Value::map([("a", Value::Int(1))]))
    );
}

#[test]
fn test_merge_of_scalar_is_invalid() {
    let err = parse("s: &s text\nd:\n  <<: *s\n", &merge_options()).unwrap_err();
    assert!(matches!(err, Error::InvalidMerge { .. }));
}

#[test]
fn test_comments_round_trip() {
    let source = "\
# settings file
name: demo # the name

# list of things
items:
  - one
  - two
";
    let doc = parse(source, &ParseOptions::default()).unwrap();
    assert_eq!(doc.comment_before.as_deref(), Some(" settings file"));
    assert_eq!(doc.to_yaml_string(&StringifyOptions::default()).unwrap(), source);
}

#[test]
fn test_multiple_documents() {
    let docs = parse_all("a: 1\n---\n- x\n", &ParseOptions::default()).unwrap();
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[1].to_value().unwrap(), Value::seq([Value::from("x")]));

    let err = parse("a: 1\n---\nb: 2\n", &ParseOptions::default()).unwrap_err();
    assert!(matches!(err, Error::Parse { .. }));
}

#[test]
fn test_syntax_error_has_location() {
    let err = parse("a: [1, 2\n", &ParseOptions::default()).unwrap_err();
    assert!(matches!(err, Error::Parse { .. }));
    assert!(err.range().is_some());
}

#[test]
fn test_standalone_pair_in_sequence() {
    let mut doc = Document::new();
    let pair = doc.pair("k", "v");
    let root = doc.seq([pair]);
    doc.contents = Some(root.into());

    let text = doc.to_yaml_string(&StringifyOptions::default()).unwrap();
    assert_eq!(text, "- k: v\n");

    let reparsed = parse(&text, &ParseOptions::default()).unwrap();
    let first = reparsed.get_path(&[Item::from(0)], true).unwrap();
    let node = reparsed.node(first.as_node().unwrap());
    assert!(matches!(node.kind, NodeKind::Map(_)));
}

#[test]
fn test_value_tree_round_trip_through_json() {
    let doc = parse("a: [1, 2.5, true, null, text]\n", &ParseOptions::default()).unwrap();
    let json = doc.to_json().unwrap();
    assert_eq!(
        json,
        serde_json::json!({ "a": [1, 2.5, true, null, "text"] })
    );
    assert_eq!(Value::from_json(&json), doc.to_value().unwrap());
}
