/// Extension-based file categorization.
///
/// This module maps a file name's extension to a user-configured category
/// name. Categories come from the YAML configuration (see [`crate::config`])
/// and are held in a `BTreeMap`, so the match order is stable: if the same
/// extension is listed under two categories, the alphabetically-first
/// category wins.
///
/// # Examples
///
/// ```
/// use tidywatch::category::{CategoryRules, Classification};
/// use std::collections::BTreeMap;
///
/// let mut categories = BTreeMap::new();
/// categories.insert("Documents".to_string(), vec![".txt".to_string()]);
/// let rules = CategoryRules::new(categories);
///
/// assert_eq!(
///     rules.classify("notes.TXT"),
///     Classification::Category("Documents".to_string())
/// );
/// assert_eq!(rules.classify("Makefile"), Classification::NoExtension);
/// assert_eq!(rules.classify("blob.xyz"), Classification::Unmatched);
/// ```
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Outcome of classifying a single file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// The extension matched this category.
    Category(String),
    /// The file name has no extension; the caller should skip the file.
    NoExtension,
    /// The extension is not listed under any category.
    Unmatched,
}

/// Maps file extensions to category names.
///
/// Extensions are normalized on construction: lowercased and stored with a
/// leading dot, so the configuration may list either `".txt"` or `"txt"`.
#[derive(Debug, Clone)]
pub struct CategoryRules {
    categories: BTreeMap<String, HashSet<String>>,
}

impl CategoryRules {
    /// Builds rules from a category -> extensions mapping.
    ///
    /// Duplicate extensions across categories are tolerated but logged as a
    /// warning, since only the first category in iteration order will ever
    /// receive such files.
    pub fn new(categories: BTreeMap<String, Vec<String>>) -> Self {
        let mut normalized: BTreeMap<String, HashSet<String>> = BTreeMap::new();
        let mut seen: BTreeMap<String, String> = BTreeMap::new();

        for (name, extensions) in categories {
            let mut set = HashSet::new();
            for ext in extensions {
                let ext = normalize_extension(&ext);
                if let Some(previous) = seen.get(&ext)
                    && previous != &name
                {
                    tracing::warn!(
                        extension = %ext,
                        first = %previous,
                        duplicate = %name,
                        "extension listed under multiple categories; first match wins"
                    );
                }
                seen.entry(ext.clone()).or_insert_with(|| name.clone());
                set.insert(ext);
            }
            normalized.insert(name, set);
        }

        Self {
            categories: normalized,
        }
    }

    /// Returns true if no categories are configured.
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Classifies a file name by its extension.
    ///
    /// Pure function: no filesystem access, no side effects.
    pub fn classify(&self, file_name: &str) -> Classification {
        let Some(extension) = Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
        else {
            return Classification::NoExtension;
        };

        let extension = format!(".{}", extension.to_lowercase());

        for (name, extensions) in &self.categories {
            if extensions.contains(&extension) {
                return Classification::Category(name.clone());
            }
        }

        Classification::Unmatched
    }
}

/// Lowercases an extension and ensures it carries a leading dot.
fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_lowercase();
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{ext}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(pairs: &[(&str, &[&str])]) -> CategoryRules {
        let mut categories = BTreeMap::new();
        for (name, extensions) in pairs {
            categories.insert(
                name.to_string(),
                extensions.iter().map(|e| e.to_string()).collect(),
            );
        }
        CategoryRules::new(categories)
    }

    #[test]
    fn test_classify_known_extension() {
        let rules = rules(&[("Documents", &[".txt", ".pdf"]), ("Images", &[".jpg"])]);
        assert_eq!(
            rules.classify("report.txt"),
            Classification::Category("Documents".to_string())
        );
        assert_eq!(
            rules.classify("photo.jpg"),
            Classification::Category("Images".to_string())
        );
    }

    #[test]
    fn test_classify_is_case_insensitive() {
        let rules = rules(&[("Documents", &[".txt"])]);
        assert_eq!(
            rules.classify("REPORT.TXT"),
            Classification::Category("Documents".to_string())
        );
    }

    #[test]
    fn test_classify_no_extension() {
        let rules = rules(&[("Documents", &[".txt"])]);
        assert_eq!(rules.classify("Makefile"), Classification::NoExtension);
        // A leading dot with nothing after it is not an extension either.
        assert_eq!(rules.classify(".bashrc"), Classification::NoExtension);
    }

    #[test]
    fn test_classify_unmatched_extension() {
        let rules = rules(&[("Documents", &[".txt"])]);
        assert_eq!(rules.classify("data.xyz"), Classification::Unmatched);
    }

    #[test]
    fn test_extensions_normalized_without_leading_dot() {
        let rules = rules(&[("Images", &["jpg", "PNG"])]);
        assert_eq!(
            rules.classify("a.png"),
            Classification::Category("Images".to_string())
        );
        assert_eq!(
            rules.classify("b.jpg"),
            Classification::Category("Images".to_string())
        );
    }

    #[test]
    fn test_duplicate_extension_first_category_wins() {
        // BTreeMap order puts "Alpha" before "Beta", so "Alpha" wins.
        let rules = rules(&[("Beta", &[".txt"]), ("Alpha", &[".txt"])]);
        assert_eq!(
            rules.classify("note.txt"),
            Classification::Category("Alpha".to_string())
        );
    }

    #[test]
    fn test_empty_rules() {
        let rules = CategoryRules::new(BTreeMap::new());
        assert!(rules.is_empty());
        assert_eq!(rules.classify("a.txt"), Classification::Unmatched);
    }
}
