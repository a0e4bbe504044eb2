use super::Recipe;
use crate::error::{ForgeError, Result};
use depforge_core::Platform;
use log::debug;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Name-keyed recipe table. Names are matched case-insensitively.
#[derive(Clone, Default)]
pub struct RecipeRegistry {
    recipes: BTreeMap<String, Arc<dyn Recipe>>,
}

impl RecipeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every recipe shipped with depforge.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        super::builtin::register_all(&mut registry);
        registry
    }

    /// Add `recipe`, replacing any recipe registered under the same name.
    pub fn register(&mut self, recipe: impl Recipe + 'static) {
        self.register_arc(Arc::new(recipe));
    }

    pub fn register_arc(&mut self, recipe: Arc<dyn Recipe>) {
        let key = recipe.name().to_ascii_lowercase();
        debug!("Registering recipe {}", key);
        self.recipes.insert(key, recipe);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.recipes.contains_key(&name.to_ascii_lowercase())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.recipes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    /// Recipe for `name` on `platform`.
    pub fn lookup(&self, name: &str, platform: Platform) -> Result<Arc<dyn Recipe>> {
        let recipe = self
            .recipes
            .get(&name.to_ascii_lowercase())
            .ok_or_else(|| {
                ForgeError::Configuration(format!(
                    "no recipe registered for library '{}' on {}",
                    name, platform
                ))
            })?;
        if !recipe.supports(platform) {
            return Err(ForgeError::Configuration(format!(
                "recipe '{}' does not support {}",
                recipe.name(),
                platform
            )));
        }
        Ok(Arc::clone(recipe))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::RecipeContext;
    use depforge_core::LibraryDescriptor;
    use std::path::Path;

    struct LinuxOnly;

    impl Recipe for LinuxOnly {
        fn name(&self) -> &str {
            "LinuxOnly"
        }

        fn supports(&self, platform: Platform) -> bool {
            platform.is_linux()
        }

        fn build_on_linux(
            &self,
            _ctx: &mut RecipeContext<'_>,
            _build_dir: &Path,
            _prefix: &Path,
            _desc: &LibraryDescriptor,
        ) -> Result<()> {
            Ok(())
        }

        fn build_on_windows(
            &self,
            _ctx: &mut RecipeContext<'_>,
            _build_dir: &Path,
            _prefix: &Path,
            _desc: &LibraryDescriptor,
        ) -> Result<()> {
            unreachable!()
        }
    }

    #[test]
    fn test_builtins_are_registered() {
        let registry = RecipeRegistry::with_builtins();
        let names: Vec<_> = registry.names().collect();
        assert_eq!(names, vec!["libpng", "lz4", "zlib"]);
        assert!(registry.lookup("ZLIB", Platform::Windows).is_ok());
    }

    #[test]
    fn test_missing_recipe_names_library_and_platform() {
        let registry = RecipeRegistry::with_builtins();
        let err = registry.lookup("boost", Platform::Linux).err().unwrap();
        match err {
            ForgeError::Configuration(msg) => {
                assert!(msg.contains("boost"));
                assert!(msg.contains("linux"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_platform_restriction() {
        let mut registry = RecipeRegistry::new();
        registry.register(LinuxOnly);
        assert!(registry.contains("linuxonly"));
        assert!(registry.lookup("linuxonly", Platform::Linux).is_ok());
        assert!(matches!(
            registry.lookup("linuxonly", Platform::Windows),
            Err(ForgeError::Configuration(_))
        ));
    }
}
