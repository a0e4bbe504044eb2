use super::model::LibraryDescriptor;
use crate::error::{CoreError, Result};
use std::collections::BTreeSet;

/// Ordered, read-only list of library descriptors.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    libraries: Vec<LibraryDescriptor>,
}

impl Catalog {
    /// Build a catalog, rejecting empty fields and duplicate names.
    pub fn new(libraries: Vec<LibraryDescriptor>) -> Result<Self> {
        let mut seen = BTreeSet::new();
        for lib in &libraries {
            if lib.name.trim().is_empty() {
                return Err(CoreError::Configuration(
                    "library entry with an empty name".to_string(),
                ));
            }
            if lib.version.trim().is_empty() {
                return Err(CoreError::Configuration(format!(
                    "library '{}' has an empty version",
                    lib.name
                )));
            }
            if !seen.insert(lib.name.to_ascii_lowercase()) {
                return Err(CoreError::Configuration(format!(
                    "library '{}' is declared more than once",
                    lib.name
                )));
            }
        }
        Ok(Self { libraries })
    }

    pub fn iter(&self) -> impl Iterator<Item = &LibraryDescriptor> {
        self.libraries.iter()
    }

    pub fn len(&self) -> usize {
        self.libraries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.libraries.is_empty()
    }

    /// Case-insensitive lookup.
    pub fn find(&self, name: &str) -> Option<&LibraryDescriptor> {
        self.libraries
            .iter()
            .find(|lib| lib.name.eq_ignore_ascii_case(name))
    }

    pub fn require(&self, name: &str) -> Result<&LibraryDescriptor> {
        self.find(name)
            .ok_or_else(|| CoreError::UnknownDependency(name.to_string()))
    }

    /// Resolve a request list into descriptors.
    ///
    /// `all` selects the whole catalog in declaration order. Otherwise the
    /// requested order is kept, duplicates are dropped and any unknown name
    /// fails the whole selection.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<&LibraryDescriptor>> {
        if names
            .iter()
            .any(|n| n.as_ref().trim().eq_ignore_ascii_case("all"))
        {
            return Ok(self.libraries.iter().collect());
        }

        let mut selected: Vec<&LibraryDescriptor> = Vec::new();
        for name in names {
            let name = name.as_ref().trim();
            if name.is_empty() {
                continue;
            }
            let lib = self.require(name)?;
            if !selected.iter().any(|s| s.name == lib.name) {
                selected.push(lib);
            }
        }
        Ok(selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::new(vec![
            LibraryDescriptor::named("zlib", "1.3"),
            LibraryDescriptor::named("libpng", "1.6.40"),
            LibraryDescriptor::named("LZ4", "1.9.4"),
        ])
        .unwrap()
    }

    #[test]
    fn test_find_is_case_insensitive() {
        let cat = catalog();
        assert_eq!(cat.find("ZLIB").unwrap().name, "zlib");
        assert_eq!(cat.find("lz4").unwrap().name, "LZ4");
        assert!(cat.find("boost").is_none());
    }

    #[test]
    fn test_select_all_keeps_catalog_order() {
        let cat = catalog();
        let names: Vec<_> = cat
            .select(&["all"])
            .unwrap()
            .iter()
            .map(|l| l.name.clone())
            .collect();
        assert_eq!(names, vec!["zlib", "libpng", "LZ4"]);
    }

    #[test]
    fn test_select_unknown_name_is_fatal() {
        let cat = catalog();
        let err = cat.select(&["zlib", "boost"]).unwrap_err();
        assert!(matches!(err, CoreError::UnknownDependency(ref n) if n == "boost"));
    }

    #[test]
    fn test_select_drops_duplicates() {
        let cat = catalog();
        let selected = cat.select(&["zlib", "ZLIB", " libpng "]).unwrap();
        assert_eq!(selected.len(), 2);
    }

    #[test]
    fn test_duplicate_declaration_rejected() {
        let result = Catalog::new(vec![
            LibraryDescriptor::named("zlib", "1.3"),
            LibraryDescriptor::named("ZLib", "1.2"),
        ]);
        assert!(matches!(result, Err(CoreError::Configuration(_))));
    }
}
