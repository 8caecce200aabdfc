//! Class categories of a diagram.
//!
//! Both operations compute a [`DiagramPatch`] instead of mutating, so the
//! caller commits it through the workspace like any other edit.

use canvas::doc::{Diagram, DiagramPatch};

#[cfg(test)]
#[path = "categories_test.rs"]
mod tests;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CategoryError {
    #[error("category name must not be blank")]
    Blank,
    #[error("category already exists: {0}")]
    Duplicate(String),
    #[error("category not found: {0}")]
    NotFound(String),
    #[error("cannot remove the last category")]
    LastCategory,
}

/// `"aUDIO"` -> `"Audio"`: first letter upper case, the rest lower case.
#[must_use]
pub fn format_category_name(raw: &str) -> String {
    let mut chars = raw.trim().chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Append a category.
///
/// # Errors
///
/// [`CategoryError::Blank`] or [`CategoryError::Duplicate`] (compared after
/// formatting).
pub fn add_category(diagram: &Diagram, raw: &str) -> Result<DiagramPatch, CategoryError> {
    let name = format_category_name(raw);
    if name.is_empty() {
        return Err(CategoryError::Blank);
    }
    if diagram.categories.contains(&name) {
        return Err(CategoryError::Duplicate(name));
    }
    let mut categories = diagram.categories.clone();
    categories.push(name);
    Ok(DiagramPatch { categories: Some(categories), ..DiagramPatch::default() })
}

/// Remove a category; its classes move to the first remaining category.
///
/// # Errors
///
/// [`CategoryError::LastCategory`] when only one category is left, or
/// [`CategoryError::NotFound`].
pub fn remove_category(diagram: &Diagram, name: &str) -> Result<DiagramPatch, CategoryError> {
    if diagram.categories.len() <= 1 {
        return Err(CategoryError::LastCategory);
    }
    if !diagram.categories.iter().any(|c| c == name) {
        return Err(CategoryError::NotFound(name.to_string()));
    }

    let categories: Vec<String> = diagram.categories.iter().filter(|c| *c != name).cloned().collect();
    let fallback = categories.first().cloned().unwrap_or_default();
    let classes = diagram
        .classes
        .iter()
        .map(|class| {
            let mut class = class.clone();
            if class.category == name {
                class.category.clone_from(&fallback);
            }
            class
        })
        .collect();

    Ok(DiagramPatch { categories: Some(categories), classes: Some(classes), ..DiagramPatch::default() })
}
