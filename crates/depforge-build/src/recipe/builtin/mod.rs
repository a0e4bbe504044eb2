//! Recipes shipped with depforge.

mod libpng;
mod lz4;
mod zlib;

pub use libpng::LibpngRecipe;
pub use lz4::Lz4Recipe;
pub use zlib::ZlibRecipe;

use super::RecipeRegistry;

pub fn register_all(registry: &mut RecipeRegistry) {
    zlib::register(registry);
    lz4::register(registry);
    libpng::register(registry);
}
