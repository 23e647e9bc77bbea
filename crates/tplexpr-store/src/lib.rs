// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Directory-backed template store.
//!
//! A [`Store`] compiles every matching file below its configured
//! directories into one [`Context`]. Each file becomes a named template; the
//! name is the file's path relative to its directory, with `/` separators
//! and the extension kept (`partials/header.html`).
//!
//! ```no_run
//! use tplexpr::Vars;
//! use tplexpr_store::Store;
//!
//! let mut store = Store::builder()
//!     .add_dir("templates", ["html"])
//!     .watch(true)
//!     .build()?;
//! let page = store.render_to_string("index.html", &Vars::new())?;
//! # Ok::<(), tplexpr_store::StoreError>(())
//! ```
//!
//! In watch mode the store remembers the modification time and size of
//! every file it loaded and re-parses all directories on the next render
//! after any of them changed or disappeared.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use thiserror::Error;
use tracing::{debug, instrument, warn};
use walkdir::WalkDir;

use tplexpr::{ast, builtins, Compiler, Context, Vars};

/// Store result type
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors raised while loading or rendering a store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{}: {source}", path.display())]
    Template {
        path: PathBuf,
        source: tplexpr::Error,
    },

    #[error("failed to read {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("directory traversal error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error(transparent)]
    Render(#[from] tplexpr::Error),
}

/// Hooks that let a host take over parsing of some files and prepare every
/// context the store builds.
pub trait Plugin {
    /// Offer a file to the plugin. Returning `Ok(true)` claims it; the store
    /// then skips its own parsing for that file.
    fn parse_template(&self, name: &str, source: &str, compiler: &mut Compiler)
        -> tplexpr::Result<bool>;

    /// Called on each freshly built context, after the builtins.
    fn init_context(&self, _ctx: &mut Context) {}
}

#[derive(Debug, Clone)]
struct SourceDir {
    root: PathBuf,
    extensions: Vec<String>,
}

impl SourceDir {
    fn matches(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        self.extensions.iter().any(|ext| {
            file_name.len() > ext.len() + 1
                && file_name.ends_with(ext.as_str())
                && file_name[..file_name.len() - ext.len()].ends_with('.')
        })
    }
}

#[derive(Debug)]
struct WatchedFile {
    path: PathBuf,
    modified: Option<SystemTime>,
    len: u64,
}

impl WatchedFile {
    fn new(path: &Path, metadata: &fs::Metadata) -> Self {
        Self {
            path: path.to_path_buf(),
            modified: metadata.modified().ok(),
            len: metadata.len(),
        }
    }

    fn is_stale(&self) -> bool {
        match fs::metadata(&self.path) {
            Ok(metadata) => {
                metadata.modified().ok() != self.modified || metadata.len() != self.len
            }
            Err(_) => true,
        }
    }
}

/// Configures and builds a [`Store`].
#[derive(Default)]
pub struct StoreBuilder {
    dirs: Vec<SourceDir>,
    watch: bool,
    builtins: bool,
    plugins: Vec<Box<dyn Plugin>>,
}

impl StoreBuilder {
    pub fn new() -> Self {
        Self {
            builtins: true,
            ..Self::default()
        }
    }

    /// Load every file below `root` whose name ends in one of `extensions`
    /// (all files when empty). A leading `.` on an extension is ignored.
    pub fn add_dir<I, S>(mut self, root: impl Into<PathBuf>, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim_start_matches('.').to_string())
            .filter(|ext| !ext.is_empty())
            .collect();
        self.dirs.push(SourceDir {
            root: root.into(),
            extensions,
        });
        self
    }

    /// Re-parse on the next render when a loaded file changes.
    pub fn watch(mut self, watch: bool) -> Self {
        self.watch = watch;
        self
    }

    /// Install the builtin library into each context (on by default).
    pub fn builtins(mut self, builtins: bool) -> Self {
        self.builtins = builtins;
        self
    }

    pub fn plugin(mut self, plugin: Box<dyn Plugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    /// Load all directories. Parse errors surface here.
    pub fn build(self) -> Result<Store> {
        let mut store = Store {
            dirs: self.dirs,
            watch: self.watch,
            builtins: self.builtins,
            plugins: self.plugins,
            base: None,
            watched: Vec::new(),
        };
        let base = store.load()?;
        store.base = Some(base);
        Ok(store)
    }
}

/// Compiled templates loaded from one or more directories.
pub struct Store {
    dirs: Vec<SourceDir>,
    watch: bool,
    builtins: bool,
    plugins: Vec<Box<dyn Plugin>>,
    base: Option<Context>,
    watched: Vec<WatchedFile>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("dirs", &self.dirs)
            .field("watch", &self.watch)
            .field("plugins", &self.plugins.len())
            .field("loaded", &self.base.is_some())
            .finish()
    }
}

impl Store {
    pub fn builder() -> StoreBuilder {
        StoreBuilder::new()
    }

    /// Render template `name` with `vars` into `w`.
    #[instrument(skip(self, vars, w), fields(vars = vars.len()))]
    pub fn render(&mut self, name: &str, vars: &Vars, w: impl io::Write) -> Result<()> {
        let mut ctx = self.context()?;
        ctx.eval_template_to_writer(name, vars, w)?;
        Ok(())
    }

    #[instrument(skip(self, vars), fields(vars = vars.len()))]
    pub fn render_to_string(&mut self, name: &str, vars: &Vars) -> Result<String> {
        let mut ctx = self.context()?;
        Ok(ctx.eval_template_to_string(name, vars)?)
    }

    /// A fresh copy of the loaded context, reloading first if a watched
    /// file changed. Renders never modify the store's own context.
    pub fn context(&mut self) -> Result<Context> {
        let stale = self.watch && self.watched.iter().any(WatchedFile::is_stale);
        let base = match self.base.take() {
            Some(ctx) if !stale => ctx,
            _ => {
                if stale {
                    debug!("watched template changed, reloading");
                }
                self.load()?
            }
        };
        Ok(self.base.insert(base).clone())
    }

    #[instrument(skip(self), fields(dirs = self.dirs.len()))]
    fn load(&mut self) -> Result<Context> {
        let mut compiler = Compiler::new();
        let mut watched = Vec::new();
        let mut includes = Vec::new();

        for dir in &self.dirs {
            for entry in WalkDir::new(&dir.root).sort_by_file_name() {
                let entry = entry?;
                if !entry.file_type().is_file() || !dir.matches(entry.path()) {
                    continue;
                }
                let path = entry.path();
                let metadata = entry.metadata()?;
                let source = fs::read_to_string(path).map_err(|source| StoreError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                let name = template_name(&dir.root, path);

                parse_template(&self.plugins, &name, &source, &mut compiler, &mut includes)
                    .map_err(|source| StoreError::Template {
                        path: path.to_path_buf(),
                        source,
                    })?;
                debug!(template = %name, path = %path.display(), "template loaded");
                watched.push(WatchedFile::new(path, &metadata));
            }
        }

        for (template, target) in &includes {
            if !compiler.has_template(target) {
                warn!(%template, include = %target, "include target is not in the store");
            }
        }

        let mut ctx = compiler.finish();
        if self.builtins {
            builtins::install(&mut ctx);
        }
        for plugin in &self.plugins {
            plugin.init_context(&mut ctx);
        }

        debug!(
            templates = ctx.template_names().count(),
            files = watched.len(),
            "store loaded"
        );
        self.watched = watched;
        Ok(ctx)
    }
}

fn parse_template(
    plugins: &[Box<dyn Plugin>],
    name: &str,
    source: &str,
    compiler: &mut Compiler,
    includes: &mut Vec<(String, String)>,
) -> tplexpr::Result<()> {
    for plugin in plugins {
        if plugin.parse_template(name, source, compiler)? {
            return Ok(());
        }
    }
    let node = tplexpr::parse(source)?;
    includes.extend(
        ast::walk::static_includes(&node)
            .into_iter()
            .map(|target| (name.to_string(), target)),
    );
    compiler.compile_template(name, &node)
}

/// `root/a/b.html` -> `a/b.html`
fn template_name(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
