//! Named templates: includes, scoping across templates, loop control,
//! output filters and host hooks.

use std::rc::Rc;
use std::time::{Duration, Instant};

use tplexpr::{builtins, Compiler, Context, Error, HtmlEscapeFilter, Value, Vars, VarsBuilder};

fn context(templates: &[(&str, &str)]) -> Context {
    build(Compiler::new(), templates)
}

fn build(mut compiler: Compiler, templates: &[(&str, &str)]) -> Context {
    for (name, source) in templates {
        compiler
            .parse_template(name, source)
            .unwrap_or_else(|err| panic!("template {name}: {err}"));
    }
    let mut ctx = compiler.finish();
    builtins::install(&mut ctx);
    ctx
}

fn render(ctx: &mut Context, name: &str) -> String {
    ctx.eval_template_to_string(name, &Vars::new())
        .unwrap_or_else(|err| panic!("render {name}: {err}"))
}

// =============================================================================
// Includes
// =============================================================================

#[test]
fn test_include_shares_declarations() {
    let mut ctx = context(&[
        (
            "baseFuncs",
            r#"${discard}
                ${block(hello, name)}Hello $name${endblock}
                ${declare(greet, (name) => "Hello $name")}
            ${enddiscard}"#,
        ),
        (
            "main",
            r#"${include("baseFuncs")%} ${hello("World")} ${greet("Sina")}"#,
        ),
    ]);
    assert_eq!(render(&mut ctx, "main"), "Hello World Hello Sina");
}

#[test]
fn test_dynamic_include() {
    let mut ctx = context(&[
        ("page_a", "A"),
        ("page_b", "B"),
        ("main", r#"${for p in list("a", "b") do include("page_$p") endfor}"#),
    ]);
    assert_eq!(render(&mut ctx, "main"), "AB");
}

#[test]
fn test_include_as_value() {
    let mut ctx = context(&[
        ("title", "Hello ${name}"),
        ("main", r#"${t := include("title")}[${upper(t)}]"#),
    ]);
    let vars = VarsBuilder::new().set_string("name", "you").build();
    assert_eq!(
        ctx.eval_template_to_string("main", &vars).unwrap(),
        "[HELLO YOU]"
    );
}

#[test]
fn test_template_vars_are_scoped() {
    let mut ctx = context(&[("t", "$who")]);
    let vars = VarsBuilder::new().set_string("who", "first").build();
    assert_eq!(ctx.eval_template_to_string("t", &vars).unwrap(), "first");
    assert_eq!(render(&mut ctx, "t"), "");
}

#[test]
fn test_missing_include_is_skipped() {
    let mut ctx = context(&[("main", r#"a${include("nope")}b"#)]);
    assert_eq!(render(&mut ctx, "main"), "ab");
}

#[test]
fn test_template_not_found_hook() {
    let mut ctx = context(&[("main", r#"a${include("nope")}b"#)]);
    ctx.set_template_not_found(|name| Ok(Value::from(format!("<{name}>"))));
    assert_eq!(render(&mut ctx, "main"), "a<nope>b");

    ctx.set_template_not_found(|name| Err(Error::TemplateNotFound(name.to_string())));
    let err = ctx.eval_template_to_string("main", &Vars::new()).unwrap_err();
    assert!(matches!(err, Error::TemplateNotFound(ref name) if name == "nope"));
}

#[test]
fn test_missing_include_writes_nothing() {
    let mut ctx = context(&[(
        "main",
        r#"${x := if true then include("nope") 1 endif}${kind(x)}"#,
    )]);
    assert_eq!(render(&mut ctx, "main"), "number");
}

#[test]
fn test_duplicate_template() {
    let mut compiler = Compiler::new();
    compiler.parse_template("a", "one").unwrap();
    let err = compiler.parse_template("a", "two").unwrap_err();
    assert_eq!(
        err.to_string(),
        "create template 'a': template exists already"
    );
}

#[test]
fn test_syntax_error_registers_nothing() {
    let mut compiler = Compiler::new();
    assert!(matches!(
        compiler.parse_template("bad", "${if x then}"),
        Err(Error::Syntax(_))
    ));
    assert!(!compiler.has_template("bad"));
}

// =============================================================================
// Scoping
// =============================================================================

#[test]
fn test_for_body_does_not_leak() {
    let mut ctx = context(&[(
        "main",
        r#"${x := "outer"}${for x in list(1, 2) do declare(y, x) "$x" endfor}[$x][$y]"#,
    )]);
    assert_eq!(render(&mut ctx, "main"), "12[outer][]");
}

#[test]
fn test_assign_in_loop_persists() {
    let mut ctx = context(&[(
        "main",
        r#"${total := 0}${for x in range(4) do total = total + x endfor}$total"#,
    )]);
    assert_eq!(render(&mut ctx, "main"), "6");
}

#[test]
fn test_block_shadowing_is_restored() {
    let mut ctx = context(&[(
        "main",
        r#"${name := "outer"}${block(t, name)}$name${endblock}${t("inner")} $name"#,
    )]);
    assert_eq!(render(&mut ctx, "main"), "inner outer");
}

#[test]
fn test_closure_sees_definition_scope() {
    let mut ctx = context(&[(
        "main",
        r#"${greeting := "Hi"}${f := (n) => "$greeting $n"}${greeting := "Bye"}${f("you")}"#,
    )]);
    assert_eq!(render(&mut ctx, "main"), "Hi you");
}

// =============================================================================
// Loop control
// =============================================================================

#[test]
fn test_break() {
    let mut ctx = context(&[(
        "main",
        r#"${for x in range(5) do if x == 3 then break endif "$x" endfor}."#,
    )]);
    assert_eq!(render(&mut ctx, "main"), "012.");
}

#[test]
fn test_continue() {
    let mut ctx = context(&[(
        "main",
        r#"${for x in range(5) do if x == 2 then continue endif "$x" endfor}"#,
    )]);
    assert_eq!(render(&mut ctx, "main"), "0134");
}

#[test]
fn test_break_out_of_discard() {
    let mut ctx = context(&[(
        "main",
        r#"${for x in range(3) do discard "hidden" break enddiscard endfor}visible"#,
    )]);
    assert_eq!(render(&mut ctx, "main"), "visible");
}

#[test]
fn test_nested_loop_break_is_inner() {
    let mut ctx = context(&[(
        "main",
        r#"${for a in range(2) do for b in range(3) do if b == 1 then break endif "$a$b" endfor endfor}"#,
    )]);
    assert_eq!(render(&mut ctx, "main"), "0010");
}

#[test]
fn test_break_inside_closure_is_rejected() {
    let mut compiler = Compiler::new();
    let err = compiler
        .parse_template("main", r#"${for x in range(3) do f := () => "${break}" endfor}"#)
        .unwrap_err();
    assert!(matches!(err, Error::LoopControl("break")));
}

// =============================================================================
// Output filters
// =============================================================================

#[test]
fn test_discard_suppresses_output_not_callables() {
    let mut ctx = context(&[(
        "main",
        r#"${discard}noise${block(b)}kept${endblock}${enddiscard}[${b()}]"#,
    )]);
    assert_eq!(render(&mut ctx, "main"), "[kept]");
}

#[test]
fn test_discard_inside_capture() {
    let mut ctx = context(&[(
        "main",
        r#"${x := if true then discard "a" enddiscard "b" endif}[$x]"#,
    )]);
    assert_eq!(render(&mut ctx, "main"), "[b]");
}

#[test]
fn test_html_escape_filter() {
    let compiler = Compiler::new().with_output_filter(Rc::new(HtmlEscapeFilter));
    let mut ctx = build(
        compiler,
        &[("page", r#"<p title="x">${text}</p>${"<i>" + "&"}"#)],
    );
    let vars = VarsBuilder::new()
        .set_string("text", "<b>Tom & 'Jerry'</b>")
        .build();
    assert_eq!(
        ctx.eval_template_to_string("page", &vars).unwrap(),
        r#"<p title="x">&lt;b&gt;Tom &amp; &#39;Jerry&#39;&lt;/b&gt;</p>&lt;i&gt;&amp;"#
    );
}

#[test]
fn test_html_escape_in_closure_bodies() {
    let compiler = Compiler::new().with_output_filter(Rc::new(HtmlEscapeFilter));
    let mut ctx = build(
        compiler,
        &[("page", r#"${f := (x) => "<$x>"}${f("&")}|${upper(f("a&"))}"#)],
    );
    assert_eq!(render(&mut ctx, "page"), "<&amp;>|&lt;A&amp;&gt;");
}

#[test]
fn test_html_escape_keeps_included_markup() {
    let compiler = Compiler::new().with_output_filter(Rc::new(HtmlEscapeFilter));
    let mut ctx = build(
        compiler,
        &[
            ("header", "<h1>${title}</h1>"),
            ("page", r#"${include("header")}<p>${body}</p>"#),
        ],
    );
    let vars = VarsBuilder::new()
        .set_string("title", "A&B")
        .set_string("body", "<x>")
        .build();
    assert_eq!(
        ctx.eval_template_to_string("page", &vars).unwrap(),
        "<h1>A&amp;B</h1><p>&lt;x&gt;</p>"
    );
    assert_eq!(
        ctx.eval_template_to_string("header", &vars).unwrap(),
        "<h1>A&amp;B</h1>"
    );
}

#[test]
fn test_html_escape_keeps_block_markup() {
    let compiler = Compiler::new().with_output_filter(Rc::new(HtmlEscapeFilter));
    let mut ctx = build(
        compiler,
        &[("page", r#"${block(b, x)}<b>$x</b>${endblock}${b("<i>")}"#)],
    );
    assert_eq!(render(&mut ctx, "page"), "<b>&lt;i&gt;</b>");
}

#[test]
fn test_html_escape_include_as_value_escapes_once() {
    let compiler = Compiler::new().with_output_filter(Rc::new(HtmlEscapeFilter));
    let mut ctx = build(
        compiler,
        &[
            ("title", "<h1>${name}</h1>"),
            ("page", r#"${t := include("title")}[${t}]"#),
        ],
    );
    let vars = VarsBuilder::new().set_string("name", "&").build();
    assert_eq!(
        ctx.eval_template_to_string("page", &vars).unwrap(),
        "[&lt;h1&gt;&amp;&lt;/h1&gt;]"
    );
}

#[test]
fn test_html_escape_discarded_include() {
    let compiler = Compiler::new().with_output_filter(Rc::new(HtmlEscapeFilter));
    let mut ctx = build(
        compiler,
        &[
            ("noisy", "<b>${x}</b>"),
            ("page", r#"${discard}${include("noisy")}${enddiscard}ok"#),
        ],
    );
    let vars = VarsBuilder::new().set_string("x", "y").build();
    assert_eq!(ctx.eval_template_to_string("page", &vars).unwrap(), "ok");
}

// =============================================================================
// Hooks and limits
// =============================================================================

#[test]
fn test_name_error_hook() {
    let mut ctx = context(&[("main", "[$missing][${obj.missing}]")]);
    ctx.declare("obj", Value::object(Default::default()));
    ctx.set_name_error(|name| Ok(Value::from(name.to_uppercase())));
    assert_eq!(render(&mut ctx, "main"), "[MISSING][MISSING]");

    ctx.set_name_error(|name| {
        Err(Error::Name {
            name: name.to_string(),
        })
    });
    let err = ctx.eval_template_to_string("main", &Vars::new()).unwrap_err();
    assert_eq!(err.to_string(), "name 'missing' is not defined");
}

#[test]
fn test_deadline_exceeded() {
    let mut ctx = context(&[("main", "${for x in range(1000000) do \"$x\" endfor}")]);
    ctx.set_deadline(Instant::now() - Duration::from_millis(1));
    let err = ctx.eval_template_to_string("main", &Vars::new()).unwrap_err();
    assert!(matches!(err, Error::DeadlineExceeded));

    let mut short = context(&[("main", "ok")]);
    short.set_deadline(Instant::now() + Duration::from_secs(60));
    assert_eq!(render(&mut short, "main"), "ok");
}

#[test]
fn test_failed_render_leaves_context_usable() {
    let mut ctx = context(&[
        ("bad", r#"${for x in list(1) do y := x + list() endfor}"#),
        ("good", "$x"),
    ]);
    ctx.declare("x", "kept");
    assert!(ctx.eval_template_to_string("bad", &Vars::new()).is_err());
    assert_eq!(render(&mut ctx, "good"), "kept");
}

#[test]
fn test_eval_to_writer() {
    let mut ctx = context(&[("main", "${range(3)}")]);
    let mut out = Vec::new();
    ctx.eval_template_to_writer("main", &Vars::new(), &mut out)
        .unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "0 1 2");
}
