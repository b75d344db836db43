//! Template library: categories of reusable text snippets.
//!
//! Stored as `templates.json`:
//!
//! ```json
//! { "categories": [ { "name": "Apology", "templates": [ { "id": "...", "title": "...", "text": "..." } ] } ] }
//! ```
//!
//! The dispatch path only reads through [`TemplateResolver`].

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::write_atomically;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub title: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    #[serde(default)]
    pub templates: Vec<Template>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct LibraryDocument {
    #[serde(default)]
    categories: Vec<Category>,
}

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("name must not be empty")]
    EmptyName,
    #[error("no category at index {0}")]
    NoSuchCategory(usize),
    #[error("no template at index {template} in category {category}")]
    NoSuchTemplate { category: usize, template: usize },
    #[error("failed to save templates: {0}")]
    Io(#[from] io::Error),
    #[error("failed to encode templates: {0}")]
    Json(#[from] serde_json::Error),
}

/// Looks up template text by id.
pub trait TemplateResolver: Send + Sync {
    fn resolve(&self, template_id: &str) -> Option<String>;
}

pub struct TemplateLibrary {
    path: PathBuf,
    doc: LibraryDocument,
}

impl TemplateLibrary {
    /// Load the library from `path`.
    ///
    /// Missing or corrupt files give an empty library.
    #[instrument(name = "load_templates")]
    pub fn load(path: &Path) -> Self {
        let doc = match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<LibraryDocument>(&content) {
                Ok(doc) => doc,
                Err(e) => {
                    warn!(error = %e, "Template file is corrupt, starting empty");
                    LibraryDocument::default()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Template file not found, starting empty");
                LibraryDocument::default()
            }
            Err(e) => {
                warn!(error = %e, "Template file unreadable, starting empty");
                LibraryDocument::default()
            }
        };
        Self {
            path: path.to_path_buf(),
            doc,
        }
    }

    /// Write a sample library to `path` if no file exists yet.
    pub fn ensure_default(path: &Path) -> Result<(), LibraryError> {
        if path.exists() {
            return Ok(());
        }
        let mut library = Self {
            path: path.to_path_buf(),
            doc: LibraryDocument::default(),
        };
        for (category, samples) in SAMPLE_TEMPLATES {
            library.doc.categories.push(Category {
                name: category.to_string(),
                templates: samples
                    .iter()
                    .map(|(title, text)| Template {
                        id: new_id(),
                        title: title.to_string(),
                        text: text.to_string(),
                    })
                    .collect(),
            });
        }
        library.save()?;
        info!(path = %path.display(), "Created sample template library");
        Ok(())
    }

    pub fn save(&self) -> Result<(), LibraryError> {
        let content = serde_json::to_string_pretty(&self.doc)?;
        write_atomically(&self.path, content.as_bytes())?;
        Ok(())
    }

    pub fn categories(&self) -> &[Category] {
        &self.doc.categories
    }

    pub fn add_category(&mut self, name: &str) -> Result<usize, LibraryError> {
        let name = non_empty(name)?;
        self.doc.categories.push(Category {
            name,
            templates: Vec::new(),
        });
        self.save()?;
        Ok(self.doc.categories.len() - 1)
    }

    pub fn rename_category(&mut self, index: usize, name: &str) -> Result<(), LibraryError> {
        let name = non_empty(name)?;
        self.category_mut(index)?.name = name;
        self.save()
    }

    /// Delete a category and all of its templates.
    pub fn delete_category(&mut self, index: usize) -> Result<Category, LibraryError> {
        if index >= self.doc.categories.len() {
            return Err(LibraryError::NoSuchCategory(index));
        }
        let removed = self.doc.categories.remove(index);
        self.save()?;
        Ok(removed)
    }

    pub fn templates(&self, category: usize) -> Result<&[Template], LibraryError> {
        self.doc
            .categories
            .get(category)
            .map(|c| c.templates.as_slice())
            .ok_or(LibraryError::NoSuchCategory(category))
    }

    /// Add a template and return its generated id.
    pub fn add_template(
        &mut self,
        category: usize,
        title: &str,
        text: &str,
    ) -> Result<String, LibraryError> {
        let title = non_empty(title)?;
        let id = new_id();
        self.category_mut(category)?.templates.push(Template {
            id: id.clone(),
            title,
            text: text.to_string(),
        });
        self.save()?;
        Ok(id)
    }

    pub fn edit_template(
        &mut self,
        category: usize,
        index: usize,
        title: &str,
        text: &str,
    ) -> Result<(), LibraryError> {
        let title = non_empty(title)?;
        let template = self
            .category_mut(category)?
            .templates
            .get_mut(index)
            .ok_or(LibraryError::NoSuchTemplate {
                category,
                template: index,
            })?;
        template.title = title;
        template.text = text.to_string();
        self.save()
    }

    pub fn delete_template(
        &mut self,
        category: usize,
        index: usize,
    ) -> Result<Template, LibraryError> {
        let templates = &mut self.category_mut(category)?.templates;
        if index >= templates.len() {
            return Err(LibraryError::NoSuchTemplate {
                category,
                template: index,
            });
        }
        let removed = templates.remove(index);
        self.save()?;
        Ok(removed)
    }

    pub fn get_template_by_id(&self, id: &str) -> Option<&Template> {
        self.doc
            .categories
            .iter()
            .flat_map(|c| c.templates.iter())
            .find(|t| t.id == id)
    }

    fn category_mut(&mut self, index: usize) -> Result<&mut Category, LibraryError> {
        self.doc
            .categories
            .get_mut(index)
            .ok_or(LibraryError::NoSuchCategory(index))
    }
}

/// A library shared between the UI thread (edits) and dispatch threads (reads).
///
/// Resolving clones the text out, so the lock is never held across clipboard
/// or paste calls.
#[derive(Clone)]
pub struct SharedLibrary(Arc<RwLock<TemplateLibrary>>);

impl SharedLibrary {
    pub fn new(library: TemplateLibrary) -> Self {
        Self(Arc::new(RwLock::new(library)))
    }

    pub fn read<T>(&self, f: impl FnOnce(&TemplateLibrary) -> T) -> T {
        f(&self.0.read())
    }

    pub fn write<T>(&self, f: impl FnOnce(&mut TemplateLibrary) -> T) -> T {
        f(&mut self.0.write())
    }
}

impl TemplateResolver for SharedLibrary {
    fn resolve(&self, template_id: &str) -> Option<String> {
        self.0
            .read()
            .get_template_by_id(template_id)
            .map(|t| t.text.clone())
    }
}

fn non_empty(name: &str) -> Result<String, LibraryError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(LibraryError::EmptyName);
    }
    Ok(trimmed.to_string())
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

const SAMPLE_TEMPLATES: &[(&str, &[(&str, &str)])] = &[
    (
        "Cancellation",
        &[
            (
                "Membership cancelled",
                "Hello, your membership has been cancelled as requested. Let us know if there is anything else we can help with.",
            ),
            (
                "Order cancelled",
                "Your order has been cancelled. The refund will reach your account within 1-7 business days depending on your bank.",
            ),
        ],
    ),
    (
        "Complaints",
        &[(
            "Shipping delay",
            "We are sorry for the delay. We have contacted the carrier to speed things up and your package will be delivered as soon as possible.",
        )],
    ),
    (
        "Apologies",
        &[(
            "General apology",
            "We sincerely apologize for the experience you had. We are taking the necessary steps to serve you better.",
        )],
    ),
];

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn library_in(dir: &Path) -> TemplateLibrary {
        TemplateLibrary::load(&dir.join("templates.json"))
    }

    #[test]
    fn missing_file_gives_empty_library() {
        let dir = tempdir().unwrap();
        assert!(library_in(dir.path()).categories().is_empty());
    }

    #[test]
    fn corrupt_file_gives_empty_library() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("templates.json"), "[oops").unwrap();
        assert!(library_in(dir.path()).categories().is_empty());
    }

    #[test]
    fn ensure_default_seeds_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("templates.json");
        TemplateLibrary::ensure_default(&path).unwrap();
        let first = fs::read_to_string(&path).unwrap();

        TemplateLibrary::ensure_default(&path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), first);

        let library = TemplateLibrary::load(&path);
        assert_eq!(library.categories().len(), 3);
        assert_eq!(library.templates(0).unwrap().len(), 2);
    }

    #[test]
    fn add_and_lookup_template() {
        let dir = tempdir().unwrap();
        let mut library = library_in(dir.path());
        let cat = library.add_category("  Greetings ").unwrap();
        let id = library.add_template(cat, " Hi ", "Hello").unwrap();

        let reloaded = library_in(dir.path());
        let template = reloaded.get_template_by_id(&id).expect("saved");
        assert_eq!(template.title, "Hi");
        assert_eq!(template.text, "Hello");
        assert_eq!(reloaded.categories()[0].name, "Greetings");
    }

    #[test]
    fn empty_names_are_rejected() {
        let dir = tempdir().unwrap();
        let mut library = library_in(dir.path());
        assert!(matches!(
            library.add_category("   "),
            Err(LibraryError::EmptyName)
        ));
        let cat = library.add_category("A").unwrap();
        assert!(matches!(
            library.add_template(cat, "", "text"),
            Err(LibraryError::EmptyName)
        ));
        assert!(matches!(
            library.rename_category(cat, ""),
            Err(LibraryError::EmptyName)
        ));
    }

    #[test]
    fn edit_and_delete_template() {
        let dir = tempdir().unwrap();
        let mut library = library_in(dir.path());
        let cat = library.add_category("A").unwrap();
        let id = library.add_template(cat, "t", "one").unwrap();

        library.edit_template(cat, 0, "t2", "two").unwrap();
        assert_eq!(library.get_template_by_id(&id).unwrap().text, "two");

        let removed = library.delete_template(cat, 0).unwrap();
        assert_eq!(removed.id, id);
        assert!(library.get_template_by_id(&id).is_none());
        assert!(matches!(
            library.delete_template(cat, 0),
            Err(LibraryError::NoSuchTemplate { .. })
        ));
    }

    #[test]
    fn delete_category_removes_its_templates() {
        let dir = tempdir().unwrap();
        let mut library = library_in(dir.path());
        let cat = library.add_category("A").unwrap();
        let id = library.add_template(cat, "t", "x").unwrap();

        library.delete_category(cat).unwrap();
        assert!(library.get_template_by_id(&id).is_none());
        assert!(matches!(
            library.delete_category(0),
            Err(LibraryError::NoSuchCategory(0))
        ));
    }

    #[test]
    fn shared_library_resolves_latest_text() {
        let dir = tempdir().unwrap();
        let shared = SharedLibrary::new(library_in(dir.path()));
        let id = shared.write(|lib| {
            let cat = lib.add_category("A").unwrap();
            lib.add_template(cat, "t", "old").unwrap()
        });
        assert_eq!(shared.resolve(&id).as_deref(), Some("old"));

        shared.write(|lib| lib.edit_template(0, 0, "t", "new").unwrap());
        assert_eq!(shared.resolve(&id).as_deref(), Some("new"));
        assert_eq!(shared.resolve("missing"), None);
    }
}
