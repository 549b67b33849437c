pub mod form;
pub mod listing;
pub mod repository;

pub use form::{IngredientLine, RecipeInput};
pub use listing::{list_recipes, RecipePage, RecipeScope, TagFilter, PAGE_SIZE};
pub use repository::{
    create_recipe, delete_recipe, ensure_owner, get_recipe, recipe_amounts, require_recipe,
    update_recipe,
};
