use super::*;

fn sample_tree() -> Dict {
    let inner: Dict = [
        ("a", Node::Text("x".to_string())),
        ("e", Node::Dict(Dict::new())),
    ]
    .into_iter()
    .collect();
    [
        ("k1", Node::Integer(5)),
        ("LLM", Node::Dict(inner)),
        ("t", Node::Bool(true)),
    ]
    .into_iter()
    .collect()
}

fn nested(levels: usize) -> String {
    let mut text = String::new();
    for _ in 0..levels {
        text.push_str("<d><k>n</k>");
    }
    text.push_str("<i>1</i>");
    text
}

#[test]
fn compact_form_uses_short_tags() {
    assert_eq!(
        build(&sample_tree()),
        "<?xml version=\"1.0\"?><plist version=\"1.0\" gjver=\"2.0\"><dict>\
         <k>k1</k><i>5</i><k>LLM</k><d><k>a</k><s>x</s><k>e</k><d /></d>\
         <k>t</k><t /></dict></plist>"
    );
}

#[test]
fn pretty_form_is_indented() {
    insta::assert_snapshot!(build_pretty(&sample_tree()), @r###"
<?xml version="1.0"?>
<plist version="1.0" gjver="2.0">
<dict>
  <k>k1</k>
  <i>5</i>
  <k>LLM</k>
  <d>
    <k>a</k>
    <s>x</s>
    <k>e</k>
    <d />
  </d>
  <k>t</k>
  <t />
</dict>
</plist>
"###);
}

#[test]
fn both_forms_parse_back() {
    let tree = sample_tree();
    assert_eq!(parse(&build(&tree)).expect("compact"), tree);
    assert_eq!(parse(&build_pretty(&tree)).expect("pretty"), tree);
}

#[test]
fn legacy_header_has_no_generation_marker() {
    let text = build_for(&sample_tree(), Generation::Legacy);
    assert!(text.starts_with("<?xml version=\"1.0\"?><plist version=\"1.0\"><dict>"));
    assert!(!text.contains("gjver"));
}

#[test]
fn long_tag_names_are_accepted() {
    let text = "<plist><dict><key>a</key><integer>3</integer><key>b</key><real>1.5</real>\
                <key>c</key><true/><key>d</key><dict><key>e</key><string>hi</string></dict>\
                <key>f</key><false /></dict></plist>";
    let root = parse(text).expect("parse");
    assert_eq!(root.get("a"), Some(&Node::Integer(3)));
    assert_eq!(root.get("b"), Some(&Node::Real(1.5)));
    assert_eq!(root.get("c"), Some(&Node::Bool(true)));
    assert_eq!(root.get("f"), Some(&Node::Bool(false)));
    assert_eq!(
        root.get("d").and_then(Node::as_dict).and_then(|d| d.get("e")),
        Some(&Node::Text("hi".to_string()))
    );
}

#[test]
fn nul_bytes_are_ignored() {
    let root = parse("<dict><k>a\0</k><s>b\0c</s></dict>\0\0").expect("parse");
    assert_eq!(root.get("a"), Some(&Node::Text("bc".to_string())));
}

#[test]
fn unknown_tags_are_transparent() {
    let root = parse("<plist><dict><k>a</k><array><i>1</i></array><k>b</k><s>x</s></dict>")
        .expect("parse");
    assert_eq!(root.get("a"), Some(&Node::Integer(1)));
    assert_eq!(root.get("b"), Some(&Node::Text("x".to_string())));
}

#[test]
fn truncated_input_closes_open_dicts() {
    let root = parse("<dict><k>a</k><d><k>b</k><i>2</i>").expect("parse");
    let inner = root.get("a").and_then(Node::as_dict).expect("inner dict");
    assert_eq!(inner.get("b"), Some(&Node::Integer(2)));

    let cut = parse("<dict><k>a</k><s>unterminated").expect("parse");
    assert_eq!(cut.get("a"), Some(&Node::Text("unterminated".to_string())));
}

#[test]
fn numbers_parse_leniently() {
    let root = parse("<dict><k>a</k><i>12abc</i><k>b</k><i>x</i><k>c</k><r>oops</r></dict>")
        .expect("parse");
    assert_eq!(root.get("a"), Some(&Node::Integer(12)));
    assert_eq!(root.get("b"), Some(&Node::Integer(0)));
    assert_eq!(root.get("c"), Some(&Node::Real(0.0)));
}

#[test]
fn values_without_keys_are_dropped() {
    let root = parse("<dict><i>1</i><k>a</k><k>b</k><s>v</s><d><k>x</k><i>2</i></d></dict>")
        .expect("parse");
    assert_eq!(root.len(), 1);
    assert_eq!(root.get("b"), Some(&Node::Text("v".to_string())));
}

#[test]
fn self_closing_elements() {
    let root = parse("<dict><k>a</k><s /><k>b</k><d/></dict>").expect("parse");
    assert_eq!(root.get("a"), Some(&Node::Text(String::new())));
    assert_eq!(root.get("b"), Some(&Node::Dict(Dict::new())));
    assert!(parse("<plist><dict/></plist>").expect("empty root").is_empty());
}

#[test]
fn missing_root_is_malformed() {
    let err = parse("<plist><s>no dict</s></plist>").expect_err("must fail");
    assert!(matches!(err, SaveError::MalformedMarkup { .. }), "unexpected: {err}");
}

#[test]
fn nesting_limit_is_enforced() {
    let parser = MarkupParser::with_max_depth(3);
    assert!(parser.parse(&nested(3)).is_ok());
    let err = parser.parse(&nested(4)).expect_err("too deep");
    assert!(matches!(err, SaveError::MalformedMarkup { .. }), "unexpected: {err}");

    assert!(parse(&nested(DEFAULT_MAX_DEPTH)).is_ok());
    assert!(parse(&nested(DEFAULT_MAX_DEPTH + 1)).is_err());
}

#[test]
fn fragment_has_no_header() {
    let dict: Dict = [("k2", Node::Text("Level".to_string()))].into_iter().collect();
    assert_eq!(build_fragment(&dict), "<d><k>k2</k><s>Level</s></d>");
    assert_eq!(parse(&build_fragment(&dict)).expect("parse"), dict);
}
