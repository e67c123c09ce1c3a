use std::{
    cell::RefCell,
    collections::BTreeMap,
    sync::{Arc, Mutex, PoisonError},
};

use chrono::{DateTime, Utc};
use itertools::Itertools;
use tracing::{trace, trace_span};

use super::{
    catalog::{Catalog, TransactionWork},
    error::{CatalogError, INGREDIENT_NAME_KEY, RECIPE_INGREDIENT_PAIR_KEY},
    models::{
        ingredient::{Ingredient, NewIngredient},
        recipe::{NewRecipe, Recipe},
        recipe_ingredient::{NewRecipeIngredient, RecipeIngredient, RecipeIngredientView},
    },
};

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Last id handed out per entity. Survives rollbacks, like a sequence.
#[derive(Debug, Clone, Copy, Default)]
struct Sequences {
    recipe: i32,
    ingredient: i32,
    entry: i32,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    sequences: Sequences,
    recipes: BTreeMap<i32, Recipe>,
    ingredients: BTreeMap<i32, Ingredient>,
    entries: BTreeMap<i32, RecipeIngredient>,
}

impl MemoryState {
    fn recipe(&self, id: i32) -> Result<&Recipe, CatalogError> {
        self.recipes
            .get(&id)
            .ok_or(CatalogError::not_found("recipe", id))
    }

    fn ingredient(&self, id: i32) -> Result<&Ingredient, CatalogError> {
        self.ingredients
            .get(&id)
            .ok_or(CatalogError::not_found("ingredient", id))
    }

    fn check_ingredient_name(&self, name: &str, except: Option<i32>) -> Result<(), CatalogError> {
        let taken = self
            .ingredients
            .values()
            .any(|ingredient| ingredient.name == name && Some(ingredient.id) != except);

        if taken {
            return Err(CatalogError::duplicate(INGREDIENT_NAME_KEY));
        }
        Ok(())
    }

    fn check_entry(
        &self,
        entry: &NewRecipeIngredient,
        except: Option<i32>,
    ) -> Result<(), CatalogError> {
        if !self.recipes.contains_key(&entry.recipe_id) {
            return Err(CatalogError::missing_reference("recipe", entry.recipe_id));
        }
        if !self.ingredients.contains_key(&entry.ingredient_id) {
            return Err(CatalogError::missing_reference(
                "ingredient",
                entry.ingredient_id,
            ));
        }

        let taken = self.entries.values().any(|existing| {
            existing.recipe_id == entry.recipe_id
                && existing.ingredient_id == entry.ingredient_id
                && Some(existing.id) != except
        });
        if taken {
            return Err(CatalogError::duplicate(RECIPE_INGREDIENT_PAIR_KEY));
        }
        Ok(())
    }

    fn views<F>(&self, filter: F) -> Vec<RecipeIngredientView>
    where
        F: Fn(&RecipeIngredient) -> bool,
    {
        self.entries
            .values()
            .filter(|entry| filter(entry))
            .filter_map(|entry| {
                let recipe = self.recipes.get(&entry.recipe_id)?;
                let ingredient = self.ingredients.get(&entry.ingredient_id)?;
                Some(RecipeIngredientView::new(
                    entry.clone(),
                    recipe.name.clone(),
                    ingredient.name.clone(),
                ))
            })
            .sorted_by(RecipeIngredientView::default_order)
            .collect()
    }

    /// Puts back `snapshot` but keeps the ids consumed since it was taken.
    fn roll_back(&mut self, snapshot: MemoryState) {
        let sequences = self.sequences;
        *self = snapshot;
        self.sequences = sequences;
    }
}

/// Where a [`MemoryCatalog`] finds its records.
pub trait WithState {
    fn with_state<T, F>(&self, f: F) -> T
    where
        F: FnOnce(&mut MemoryState) -> T;
}

impl WithState for Mutex<MemoryState> {
    fn with_state<T, F>(&self, f: F) -> T
    where
        F: FnOnce(&mut MemoryState) -> T,
    {
        let mut state = self.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut *state)
    }
}

/// State already locked by an enclosing transaction.
impl WithState for RefCell<&mut MemoryState> {
    fn with_state<T, F>(&self, f: F) -> T
    where
        F: FnOnce(&mut MemoryState) -> T,
    {
        let mut state = self.borrow_mut();
        f(&mut **state)
    }
}

/// In-process catalog holding the same invariants as the relational store.
///
/// Ids are never reused, like a `SERIAL` column, even after a rollback.
pub struct MemoryCatalog<S = Mutex<MemoryState>> {
    state: S,
    clock: Clock,
}

impl Default for MemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::with_clock(Utc::now)
    }

    pub fn with_clock<C>(clock: C) -> Self
    where
        C: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        Self {
            state: Mutex::new(MemoryState::default()),
            clock: Arc::new(clock),
        }
    }
}

impl<S: WithState> Catalog for MemoryCatalog<S> {
    fn create_recipe(&self, recipe: NewRecipe) -> Result<Recipe, CatalogError> {
        let recipe = recipe.validated()?;

        self.state.with_state(|state| {
            state.sequences.recipe += 1;
            let now = (self.clock)();
            let recipe = Recipe {
                id: state.sequences.recipe,
                name: recipe.name,
                description: recipe.description,
                instructions: recipe.instructions,
                prep_time_minutes: recipe.prep_time_minutes,
                cook_time_minutes: recipe.cook_time_minutes,
                servings: recipe.servings,
                created_at: now,
                updated_at: now,
            };

            trace!(id = recipe.id, "created recipe");
            state.recipes.insert(recipe.id, recipe.clone());
            Ok(recipe)
        })
    }

    fn recipe(&self, id: i32) -> Result<Recipe, CatalogError> {
        self.state.with_state(|state| state.recipe(id).cloned())
    }

    fn recipes(&self) -> Result<Vec<Recipe>, CatalogError> {
        self.state.with_state(|state| {
            Ok(state
                .recipes
                .values()
                .cloned()
                .sorted_by(Recipe::default_order)
                .collect())
        })
    }

    fn update_recipe(&self, id: i32, recipe: NewRecipe) -> Result<Recipe, CatalogError> {
        let changes = recipe.validated()?;

        self.state.with_state(|state| {
            let recipe = state
                .recipes
                .get_mut(&id)
                .ok_or(CatalogError::not_found("recipe", id))?;
            recipe.name = changes.name;
            recipe.description = changes.description;
            recipe.instructions = changes.instructions;
            recipe.prep_time_minutes = changes.prep_time_minutes;
            recipe.cook_time_minutes = changes.cook_time_minutes;
            recipe.servings = changes.servings;
            recipe.updated_at = (self.clock)();

            Ok(recipe.clone())
        })
    }

    fn delete_recipe(&self, id: i32) -> Result<(), CatalogError> {
        let span = trace_span!("delete_recipe", id);
        let _guard = span.enter();

        self.state.with_state(|state| {
            state
                .recipes
                .remove(&id)
                .ok_or(CatalogError::not_found("recipe", id))?;

            let before = state.entries.len();
            state.entries.retain(|_, entry| entry.recipe_id != id);
            trace!(removed = before - state.entries.len(), "cascaded");

            Ok(())
        })
    }

    fn create_ingredient(&self, ingredient: NewIngredient) -> Result<Ingredient, CatalogError> {
        let ingredient = ingredient.validated()?;

        self.state.with_state(|state| {
            state.check_ingredient_name(&ingredient.name, None)?;

            state.sequences.ingredient += 1;
            let ingredient = Ingredient {
                id: state.sequences.ingredient,
                name: ingredient.name,
                unit: ingredient.unit,
            };

            state.ingredients.insert(ingredient.id, ingredient.clone());
            Ok(ingredient)
        })
    }

    fn ingredient(&self, id: i32) -> Result<Ingredient, CatalogError> {
        self.state.with_state(|state| state.ingredient(id).cloned())
    }

    fn find_ingredient(&self, name: &str) -> Result<Option<Ingredient>, CatalogError> {
        self.state.with_state(|state| {
            Ok(state
                .ingredients
                .values()
                .find(|ingredient| ingredient.name == name)
                .cloned())
        })
    }

    fn ingredients(&self) -> Result<Vec<Ingredient>, CatalogError> {
        self.state.with_state(|state| {
            Ok(state
                .ingredients
                .values()
                .cloned()
                .sorted_by(Ingredient::default_order)
                .collect())
        })
    }

    fn update_ingredient(
        &self,
        id: i32,
        ingredient: NewIngredient,
    ) -> Result<Ingredient, CatalogError> {
        let changes = ingredient.validated()?;

        self.state.with_state(|state| {
            state.ingredient(id)?;
            state.check_ingredient_name(&changes.name, Some(id))?;

            let ingredient = Ingredient {
                id,
                name: changes.name,
                unit: changes.unit,
            };
            state.ingredients.insert(id, ingredient.clone());
            Ok(ingredient)
        })
    }

    fn delete_ingredient(&self, id: i32) -> Result<(), CatalogError> {
        let span = trace_span!("delete_ingredient", id);
        let _guard = span.enter();

        self.state.with_state(|state| {
            state
                .ingredients
                .remove(&id)
                .ok_or(CatalogError::not_found("ingredient", id))?;

            let before = state.entries.len();
            state.entries.retain(|_, entry| entry.ingredient_id != id);
            trace!(removed = before - state.entries.len(), "cascaded");

            Ok(())
        })
    }

    fn add_recipe_ingredient(
        &self,
        entry: NewRecipeIngredient,
    ) -> Result<RecipeIngredient, CatalogError> {
        let entry = entry.validated()?;

        self.state.with_state(|state| {
            state.check_entry(&entry, None)?;

            state.sequences.entry += 1;
            let entry = RecipeIngredient {
                id: state.sequences.entry,
                recipe_id: entry.recipe_id,
                ingredient_id: entry.ingredient_id,
                quantity: entry.quantity,
                unit: entry.unit,
                notes: entry.notes,
            };

            state.entries.insert(entry.id, entry.clone());
            Ok(entry)
        })
    }

    fn recipe_ingredient(&self, id: i32) -> Result<RecipeIngredient, CatalogError> {
        self.state.with_state(|state| {
            state
                .entries
                .get(&id)
                .cloned()
                .ok_or(CatalogError::not_found("recipe ingredient", id))
        })
    }

    fn recipe_ingredients(&self) -> Result<Vec<RecipeIngredientView>, CatalogError> {
        self.state.with_state(|state| Ok(state.views(|_| true)))
    }

    fn ingredients_of_recipe(
        &self,
        recipe_id: i32,
    ) -> Result<Vec<RecipeIngredientView>, CatalogError> {
        self.state.with_state(|state| {
            state.recipe(recipe_id)?;
            Ok(state.views(|entry| entry.recipe_id == recipe_id))
        })
    }

    fn recipes_using_ingredient(
        &self,
        ingredient_id: i32,
    ) -> Result<Vec<RecipeIngredientView>, CatalogError> {
        self.state.with_state(|state| {
            state.ingredient(ingredient_id)?;
            Ok(state.views(|entry| entry.ingredient_id == ingredient_id))
        })
    }

    fn update_recipe_ingredient(
        &self,
        id: i32,
        entry: NewRecipeIngredient,
    ) -> Result<RecipeIngredient, CatalogError> {
        let changes = entry.validated()?;

        self.state.with_state(|state| {
            if !state.entries.contains_key(&id) {
                return Err(CatalogError::not_found("recipe ingredient", id));
            }
            state.check_entry(&changes, Some(id))?;

            let entry = RecipeIngredient {
                id,
                recipe_id: changes.recipe_id,
                ingredient_id: changes.ingredient_id,
                quantity: changes.quantity,
                unit: changes.unit,
                notes: changes.notes,
            };
            state.entries.insert(id, entry.clone());
            Ok(entry)
        })
    }

    fn delete_recipe_ingredient(&self, id: i32) -> Result<(), CatalogError> {
        self.state.with_state(|state| {
            state
                .entries
                .remove(&id)
                .map(|_| ())
                .ok_or(CatalogError::not_found("recipe ingredient", id))
        })
    }

    /// Holds the state for the whole of `work`, so other callers wait instead
    /// of interleaving with it.
    fn transaction(&self, work: &mut TransactionWork<'_>) -> Result<(), CatalogError> {
        let span = trace_span!("catalog transaction");
        let _guard = span.enter();

        self.state.with_state(|state| {
            let snapshot = state.clone();

            let result = {
                let scoped = MemoryCatalog {
                    state: RefCell::new(&mut *state),
                    clock: Arc::clone(&self.clock),
                };
                work(&scoped)
            };

            if result.is_err() {
                trace!("rolling back memory catalog");
                state.roll_back(snapshot);
            }
            result
        })
    }
}
