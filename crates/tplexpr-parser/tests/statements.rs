//! Statement parsing: `if`, `for`, `block`, `declare`, `include`,
//! `discard`, `object` and the binding shorthands.

use tplexpr_ast::{IncludeTarget, Node};
use tplexpr_parser::parse;

fn parse_ok(source: &str) -> Node {
    parse(source).expect("Parse should succeed")
}

fn text(s: &str) -> Node {
    Node::Text(s.to_string())
}

fn var(name: &str) -> Node {
    Node::Var(name.to_string())
}

// =============================================================================
// Control flow
// =============================================================================

#[test]
fn test_if_elseif_else() {
    let node = parse_ok("${if a then}A${elseif b then}B${else}C${endif}");
    let Node::If {
        branches,
        else_body,
    } = node
    else {
        panic!("expected if");
    };
    assert_eq!(branches.len(), 2);
    assert_eq!(branches[0].cond, var("a"));
    assert_eq!(branches[0].body, text("A"));
    assert_eq!(branches[1].cond, var("b"));
    assert_eq!(else_body.as_deref(), Some(&text("C")));
}

#[test]
fn test_if_inline_body() {
    let node = parse_ok("${if x then \"yes\" endif}");
    let Node::If { branches, else_body } = node else {
        panic!("expected if");
    };
    assert_eq!(branches[0].body, text("yes"));
    assert!(else_body.is_none());
}

#[test]
fn test_for_loop() {
    let node = parse_ok("${for x in list(\"1\",\"2\") do \"$x\" endfor}");
    let Node::For {
        var: name,
        iterable,
        body,
    } = node
    else {
        panic!("expected for");
    };
    assert_eq!(name, "x");
    assert!(matches!(*iterable, Node::Call { ref name, .. } if name == "list"));
    assert_eq!(*body, var("x"));
}

#[test]
fn test_break_and_continue() {
    let node = parse_ok("${for x in xs do if x then break else continue endif endfor}");
    let Node::For { body, .. } = node else {
        panic!("expected for");
    };
    let Node::If {
        branches,
        else_body,
    } = *body
    else {
        panic!("expected if");
    };
    assert_eq!(branches[0].body, Node::Break);
    assert_eq!(else_body.as_deref(), Some(&Node::Continue));
}

// =============================================================================
// Bindings
// =============================================================================

#[test]
fn test_block_with_params() {
    let node = parse_ok("${block(tpl, name)}Hello $name${endblock}");
    let Node::Block { name, subprog } = node else {
        panic!("expected block");
    };
    assert_eq!(name, "tpl");
    assert_eq!(subprog.params, vec!["name".to_string()]);
    assert_eq!(
        *subprog.body,
        Node::Compound(vec![text("Hello "), var("name")])
    );
}

#[test]
fn test_declare_and_trim() {
    let node = parse_ok("${declare(name, \"Sina\") %}  Hello $name");
    assert_eq!(
        node,
        Node::Compound(vec![
            Node::Declare {
                name: "name".into(),
                value: Box::new(text("Sina")),
            },
            text("Hello "),
            var("name"),
        ])
    );
}

#[test]
fn test_binding_shorthands() {
    let node = parse_ok("${x := 1 x = 2}");
    assert_eq!(
        node,
        Node::Compound(vec![
            Node::Declare {
                name: "x".into(),
                value: Box::new(Node::Number("1".into())),
            },
            Node::Assign {
                name: "x".into(),
                value: Box::new(Node::Number("2".into())),
            },
        ])
    );
}

// =============================================================================
// Templates and objects
// =============================================================================

#[test]
fn test_static_and_dynamic_include() {
    assert_eq!(
        parse_ok("${include(\"base\")}"),
        Node::Include(IncludeTarget::Static("base".into()))
    );
    assert!(matches!(
        parse_ok("${include(\"page_$n\")}"),
        Node::Include(IncludeTarget::Dynamic(_))
    ));
}

#[test]
fn test_discard_body() {
    let node = parse_ok("${discard}${x := 1}ignored${enddiscard}");
    let Node::Discard(body) = node else {
        panic!("expected discard");
    };
    assert!(matches!(*body, Node::Compound(ref nodes) if nodes.len() == 2));
}

#[test]
fn test_object_literal() {
    let node = parse_ok("${object(a => 1, \"b c\" => 2)}");
    let Node::Object { base, keys } = node else {
        panic!("expected object");
    };
    assert!(base.is_none());
    let names: Vec<_> = keys.iter().map(|k| k.key.as_str()).collect();
    assert_eq!(names, ["a", "b c"]);
}

#[test]
fn test_object_extends_base() {
    let node = parse_ok("${object(x, b => 2)}");
    let Node::Object { base, keys } = node else {
        panic!("expected object");
    };
    assert_eq!(base.as_deref(), Some(&var("x")));
    assert_eq!(keys.len(), 1);
}

#[test]
fn test_empty_object() {
    assert_eq!(
        parse_ok("${object()}"),
        Node::Object {
            base: None,
            keys: vec![]
        }
    );
}

#[test]
fn test_bare_var_then_text() {
    assert_eq!(
        parse_ok("$v.\"$it\""),
        Node::Compound(vec![var("v"), text(".\""), var("it"), text("\"")])
    );
}
