use super::{
    error::CatalogError,
    models::{
        ingredient::{Ingredient, NewIngredient},
        recipe::{NewRecipe, Recipe},
        recipe_ingredient::{NewRecipeIngredient, RecipeIngredient, RecipeIngredientView},
    },
};

/// Work run inside [`Catalog::transaction`].
pub type TransactionWork<'w> = dyn FnMut(&dyn Catalog) -> Result<(), CatalogError> + 'w;

/// Create, read, update and delete for the three catalog entities.
///
/// Every write validates its record first. Listings come back in each
/// entity's default order. Deleting a recipe or an ingredient also removes
/// the recipe ingredients that reference it.
pub trait Catalog {
    fn create_recipe(&self, recipe: NewRecipe) -> Result<Recipe, CatalogError>;
    fn recipe(&self, id: i32) -> Result<Recipe, CatalogError>;
    fn recipes(&self) -> Result<Vec<Recipe>, CatalogError>;
    /// Replaces every writable field and refreshes `updated_at`.
    fn update_recipe(&self, id: i32, recipe: NewRecipe) -> Result<Recipe, CatalogError>;
    fn delete_recipe(&self, id: i32) -> Result<(), CatalogError>;

    fn create_ingredient(&self, ingredient: NewIngredient) -> Result<Ingredient, CatalogError>;
    fn ingredient(&self, id: i32) -> Result<Ingredient, CatalogError>;
    fn find_ingredient(&self, name: &str) -> Result<Option<Ingredient>, CatalogError>;
    fn ingredients(&self) -> Result<Vec<Ingredient>, CatalogError>;
    fn update_ingredient(
        &self,
        id: i32,
        ingredient: NewIngredient,
    ) -> Result<Ingredient, CatalogError>;
    fn delete_ingredient(&self, id: i32) -> Result<(), CatalogError>;

    /// Attaches an ingredient to a recipe. Each pair may be attached once.
    fn add_recipe_ingredient(
        &self,
        entry: NewRecipeIngredient,
    ) -> Result<RecipeIngredient, CatalogError>;
    fn recipe_ingredient(&self, id: i32) -> Result<RecipeIngredient, CatalogError>;
    fn recipe_ingredients(&self) -> Result<Vec<RecipeIngredientView>, CatalogError>;
    fn ingredients_of_recipe(
        &self,
        recipe_id: i32,
    ) -> Result<Vec<RecipeIngredientView>, CatalogError>;
    fn recipes_using_ingredient(
        &self,
        ingredient_id: i32,
    ) -> Result<Vec<RecipeIngredientView>, CatalogError>;
    fn update_recipe_ingredient(
        &self,
        id: i32,
        entry: NewRecipeIngredient,
    ) -> Result<RecipeIngredient, CatalogError>;
    fn delete_recipe_ingredient(&self, id: i32) -> Result<(), CatalogError>;

    /// Runs `work` so that either all of its writes land or none do.
    ///
    /// `work` must go through the catalog it is handed, not the outer one.
    fn transaction(&self, work: &mut TransactionWork<'_>) -> Result<(), CatalogError>;
}
