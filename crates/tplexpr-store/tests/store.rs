//! Store loading, plugins and watch-mode reloading against real
//! directories.

use std::fs;
use std::path::Path;

use tempfile::TempDir;
use tplexpr::{Compiler, Context, Value, Vars, VarsBuilder};
use tplexpr_store::{Plugin, Store, StoreError};

fn write(dir: &Path, name: &str, content: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn templates(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, content) in files {
        write(dir.path(), name, content);
    }
    dir
}

// =============================================================================
// Loading
// =============================================================================

#[test]
fn test_render_by_file_name() {
    let dir = templates(&[("true.template.txt", "${true}"), ("notes.md", "skip")]);
    let mut store = Store::builder()
        .add_dir(dir.path(), ["template.txt"])
        .build()
        .unwrap();

    assert_eq!(
        store.render_to_string("true.template.txt", &Vars::new()).unwrap(),
        "true"
    );
    let err = store.render_to_string("notes.md", &Vars::new()).unwrap_err();
    assert!(matches!(
        err,
        StoreError::Render(tplexpr::Error::TemplateNotFound(ref name)) if name == "notes.md"
    ));
}

#[test]
fn test_nested_templates_and_includes() {
    let dir = templates(&[
        ("partials/greet.html", "Hello $name"),
        ("index.html", r#"<h1>${include("partials/greet.html")}</h1>"#),
    ]);
    let mut store = Store::builder()
        .add_dir(dir.path(), [".html"])
        .build()
        .unwrap();

    let vars = VarsBuilder::new().set_string("name", "Sina").build();
    assert_eq!(
        store.render_to_string("index.html", &vars).unwrap(),
        "<h1>Hello Sina</h1>"
    );
}

#[test]
fn test_render_to_writer() {
    let dir = templates(&[("list.txt", "${range(3).join(\",\")}")]);
    let mut store = Store::builder()
        .add_dir(dir.path(), ["txt"])
        .build()
        .unwrap();

    let mut out = Vec::new();
    store.render("list.txt", &Vars::new(), &mut out).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "0,1,2");
}

#[test]
fn test_without_builtins() {
    let dir = templates(&[("a.txt", "[${upper(\"x\")}]")]);
    let mut store = Store::builder()
        .add_dir(dir.path(), ["txt"])
        .builtins(false)
        .build()
        .unwrap();
    assert_eq!(store.render_to_string("a.txt", &Vars::new()).unwrap(), "[]");
}

#[test]
fn test_renders_do_not_share_state() {
    let dir = templates(&[("a.txt", "${count := count + 1}$count")]);
    let mut store = Store::builder()
        .add_dir(dir.path(), ["txt"])
        .build()
        .unwrap();
    let vars = VarsBuilder::new().set_number("count", 1.0).build();
    assert_eq!(store.render_to_string("a.txt", &vars).unwrap(), "2");
    assert_eq!(store.render_to_string("a.txt", &vars).unwrap(), "2");
}

#[test]
fn test_syntax_error_names_file() {
    let dir = templates(&[("good.txt", "ok"), ("bad.txt", "${if x then}")]);
    let err = Store::builder()
        .add_dir(dir.path(), ["txt"])
        .build()
        .unwrap_err();

    match err {
        StoreError::Template { path, source } => {
            assert!(path.ends_with("bad.txt"));
            assert!(matches!(source, tplexpr::Error::Syntax(_)));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_missing_directory() {
    let dir = tempfile::tempdir().unwrap();
    let err = Store::builder()
        .add_dir(dir.path().join("nope"), ["txt"])
        .build()
        .unwrap_err();
    assert!(matches!(err, StoreError::Walk(_)));
}

// =============================================================================
// Plugins
// =============================================================================

struct ShoutPlugin;

impl Plugin for ShoutPlugin {
    fn parse_template(
        &self,
        name: &str,
        source: &str,
        compiler: &mut Compiler,
    ) -> tplexpr::Result<bool> {
        if !name.ends_with(".shout") {
            return Ok(false);
        }
        compiler.parse_template(name, &format!("{}!", source.trim()))?;
        Ok(true)
    }

    fn init_context(&self, ctx: &mut Context) {
        ctx.declare("site", Value::from("example.org"));
    }
}

#[test]
fn test_plugin_claims_files_and_inits_context() {
    let dir = templates(&[("hey.shout", "HEY $site"), ("plain.txt", "$site")]);
    let mut store = Store::builder()
        .add_dir(dir.path(), ["shout", "txt"])
        .plugin(Box::new(ShoutPlugin))
        .build()
        .unwrap();

    assert_eq!(
        store.render_to_string("hey.shout", &Vars::new()).unwrap(),
        "HEY example.org!"
    );
    assert_eq!(
        store.render_to_string("plain.txt", &Vars::new()).unwrap(),
        "example.org"
    );
}

// =============================================================================
// Watch mode
// =============================================================================

#[test]
fn test_watch_reloads_changed_file() {
    let dir = templates(&[("watch-test.template.txt", "before")]);
    let mut store = Store::builder()
        .add_dir(dir.path(), ["template.txt"])
        .watch(true)
        .build()
        .unwrap();
    let name = "watch-test.template.txt";
    assert_eq!(store.render_to_string(name, &Vars::new()).unwrap(), "before");

    write(dir.path(), name, "after!");
    assert_eq!(store.render_to_string(name, &Vars::new()).unwrap(), "after!");
}

#[test]
fn test_without_watch_keeps_loaded_templates() {
    let dir = templates(&[("a.txt", "before")]);
    let mut store = Store::builder()
        .add_dir(dir.path(), ["txt"])
        .build()
        .unwrap();

    write(dir.path(), "a.txt", "after!");
    assert_eq!(store.render_to_string("a.txt", &Vars::new()).unwrap(), "before");
}

#[test]
fn test_watch_removed_file() {
    let dir = templates(&[("a.txt", "a"), ("b.txt", "b")]);
    let mut store = Store::builder()
        .add_dir(dir.path(), ["txt"])
        .watch(true)
        .build()
        .unwrap();
    assert_eq!(store.render_to_string("b.txt", &Vars::new()).unwrap(), "b");

    fs::remove_file(dir.path().join("b.txt")).unwrap();
    assert!(matches!(
        store.render_to_string("b.txt", &Vars::new()),
        Err(StoreError::Render(tplexpr::Error::TemplateNotFound(_)))
    ));
    assert_eq!(store.render_to_string("a.txt", &Vars::new()).unwrap(), "a");
}

#[test]
fn test_watch_recovers_from_broken_edit() {
    let dir = templates(&[("a.txt", "ok")]);
    let mut store = Store::builder()
        .add_dir(dir.path(), ["txt"])
        .watch(true)
        .build()
        .unwrap();

    write(dir.path(), "a.txt", "${for}");
    assert!(matches!(
        store.render_to_string("a.txt", &Vars::new()),
        Err(StoreError::Template { .. })
    ));
    assert!(store.render_to_string("a.txt", &Vars::new()).is_err());

    write(dir.path(), "a.txt", "fixed");
    assert_eq!(store.render_to_string("a.txt", &Vars::new()).unwrap(), "fixed");
}
