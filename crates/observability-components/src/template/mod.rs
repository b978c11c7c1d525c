//! Read-only sources of manifest templates.
//!
//! Components address their templates by a directory relative to the root of
//! a [`TemplateSource`]. The source may be backed by the file system, by the
//! bundle compiled into this crate, or by an in-memory map for tests. Only
//! read access is ever needed.

use std::{
    collections::{BTreeMap, BTreeSet},
    path::{Path, PathBuf},
};

use include_dir::{Dir, DirEntry, include_dir};
use snafu::{OptionExt, ResultExt, Snafu};

pub mod render;

static BUILTIN_TEMPLATES: Dir<'static> = include_dir!("$CARGO_MANIFEST_DIR/templates");

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("template directory {dir:?} does not exist"))]
    MissingDirectory { dir: String },

    #[snafu(display("failed to read template directory {path:?}"))]
    ReadDirectory {
        source: std::io::Error,
        path: PathBuf,
    },

    #[snafu(display("failed to read template {path:?}"))]
    ReadTemplate {
        source: std::io::Error,
        path: PathBuf,
    },

    #[snafu(display("template {path:?} is not valid UTF-8"))]
    NotUtf8 { path: String },
}

/// A single template file, addressed by its path relative to the source root.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Template {
    pub path: String,
    pub body: String,
}

/// A read-only tree of manifest templates.
pub trait TemplateSource {
    /// Returns every template below `dir` (recursively), sorted by path.
    ///
    /// A missing directory is an error, an existing but empty one is not.
    fn templates(&self, dir: &str) -> Result<Vec<Template>>;
}

impl<T: TemplateSource + ?Sized> TemplateSource for &T {
    fn templates(&self, dir: &str) -> Result<Vec<Template>> {
        (**self).templates(dir)
    }
}

/// Templates of one component, read once when the component is constructed.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TemplateSet {
    dir: String,
    templates: Vec<Template>,
}

impl TemplateSet {
    pub fn load(source: &impl TemplateSource, dir: &str) -> Result<Self> {
        let templates = source.templates(dir)?;
        tracing::debug!(dir, count = templates.len(), "loaded component templates");

        Ok(Self {
            dir: dir.to_owned(),
            templates,
        })
    }

    pub fn dir(&self) -> &str {
        &self.dir
    }

    pub fn iter(&self) -> impl Iterator<Item = &Template> {
        self.templates.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }
}

fn is_template_file(path: &Path) -> bool {
    path.extension()
        .is_some_and(|extension| extension == "yaml" || extension == "yml")
}

/// Templates read from a directory on disk.
#[derive(Clone, Debug)]
pub struct FileSystemSource {
    root: PathBuf,
}

impl FileSystemSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn collect(&self, dir: &Path, templates: &mut Vec<Template>) -> Result<()> {
        let entries = std::fs::read_dir(dir).context(ReadDirectorySnafu { path: dir })?;

        for entry in entries {
            let path = entry.context(ReadDirectorySnafu { path: dir })?.path();

            if path.is_dir() {
                self.collect(&path, templates)?;
            } else if is_template_file(&path) {
                let body = std::fs::read_to_string(&path)
                    .context(ReadTemplateSnafu { path: &path })?;
                let relative = path.strip_prefix(&self.root).unwrap_or(&path);

                templates.push(Template {
                    path: relative.to_string_lossy().replace('\\', "/"),
                    body,
                });
            }
        }

        Ok(())
    }
}

impl TemplateSource for FileSystemSource {
    fn templates(&self, dir: &str) -> Result<Vec<Template>> {
        let path = self.root.join(dir);
        if !path.is_dir() {
            return MissingDirectorySnafu { dir }.fail();
        }

        let mut templates = Vec::new();
        self.collect(&path, &mut templates)?;
        templates.sort_by(|a, b| a.path.cmp(&b.path));

        Ok(templates)
    }
}

/// Templates compiled into the binary.
#[derive(Clone, Copy, Debug)]
pub struct EmbeddedSource {
    root: &'static Dir<'static>,
}

impl Default for EmbeddedSource {
    /// The templates of the built-in components.
    fn default() -> Self {
        Self {
            root: &BUILTIN_TEMPLATES,
        }
    }
}

impl EmbeddedSource {
    pub fn new(root: &'static Dir<'static>) -> Self {
        Self { root }
    }

    fn collect(dir: &Dir<'_>, templates: &mut Vec<Template>) -> Result<()> {
        for entry in dir.entries() {
            match entry {
                DirEntry::Dir(subdir) => Self::collect(subdir, templates)?,
                DirEntry::File(file) if is_template_file(file.path()) => {
                    let path = file.path().to_string_lossy().replace('\\', "/");
                    let body = file.contents_utf8().context(NotUtf8Snafu { path: &path })?;

                    templates.push(Template {
                        path,
                        body: body.to_owned(),
                    });
                }
                DirEntry::File(_) => {}
            }
        }

        Ok(())
    }
}

impl TemplateSource for EmbeddedSource {
    fn templates(&self, dir: &str) -> Result<Vec<Template>> {
        let component_dir = self
            .root
            .get_dir(dir)
            .context(MissingDirectorySnafu { dir })?;

        let mut templates = Vec::new();
        Self::collect(component_dir, &mut templates)?;
        templates.sort_by(|a, b| a.path.cmp(&b.path));

        Ok(templates)
    }
}

/// Templates held in memory, keyed by their relative path.
#[derive(Clone, Debug, Default)]
pub struct InMemorySource {
    files: BTreeMap<String, String>,
    dirs: BTreeSet<String>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a template, registering all of its parent directories.
    pub fn with_template(mut self, path: impl Into<String>, body: impl Into<String>) -> Self {
        let path = path.into();
        let mut parent = Path::new(&path).parent();
        while let Some(dir) = parent.filter(|dir| !dir.as_os_str().is_empty()) {
            self.dirs.insert(dir.to_string_lossy().into_owned());
            parent = dir.parent();
        }

        self.files.insert(path, body.into());
        self
    }

    /// Registers an empty directory.
    pub fn with_dir(mut self, dir: impl Into<String>) -> Self {
        self.dirs.insert(dir.into());
        self
    }
}

impl TemplateSource for InMemorySource {
    fn templates(&self, dir: &str) -> Result<Vec<Template>> {
        if !self.dirs.contains(dir) {
            return MissingDirectorySnafu { dir }.fail();
        }

        let prefix = format!("{dir}/");
        Ok(self
            .files
            .iter()
            .filter(|(path, _)| path.starts_with(&prefix))
            .map(|(path, body)| Template {
                path: path.clone(),
                body: body.clone(),
            })
            .collect())
    }
}
