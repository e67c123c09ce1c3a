use std::cell::RefCell;

use chrono::Utc;
use diesel::{
    dsl::exists,
    pg::PgConnection,
    prelude::*,
    r2d2::{ConnectionManager, Pool},
    select,
};
use tracing::{trace, trace_span};

use super::{
    catalog::{Catalog, TransactionWork},
    error::CatalogError,
    models::{
        ingredient::{Ingredient, NewIngredient},
        recipe::{NewRecipe, Recipe},
        recipe_ingredient::{NewRecipeIngredient, RecipeIngredient, RecipeIngredientView},
    },
    schema::{ingredients, recipe_ingredients, recipes},
};

pub type PgPool = Pool<ConnectionManager<PgConnection>>;

/// Where a [`DatabaseCatalog`] gets its connection from.
pub trait WithConnection {
    fn with_connection<T, F>(&self, f: F) -> Result<T, CatalogError>
    where
        F: FnOnce(&mut PgConnection) -> Result<T, CatalogError>;
}

impl WithConnection for PgPool {
    fn with_connection<T, F>(&self, f: F) -> Result<T, CatalogError>
    where
        F: FnOnce(&mut PgConnection) -> Result<T, CatalogError>,
    {
        let mut connection = self.get()?;
        f(&mut *connection)
    }
}

/// A connection already inside a transaction.
impl WithConnection for RefCell<&mut PgConnection> {
    fn with_connection<T, F>(&self, f: F) -> Result<T, CatalogError>
    where
        F: FnOnce(&mut PgConnection) -> Result<T, CatalogError>,
    {
        let mut connection = self.borrow_mut();
        f(&mut **connection)
    }
}

/// Catalog backed by Postgres. Uniqueness, cascades and timestamps are
/// enforced by the schema in `migrations/`.
pub struct DatabaseCatalog<S = PgPool> {
    source: S,
}

impl DatabaseCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { source: pool }
    }
}

#[derive(Clone, Copy)]
enum ViewScope {
    All,
    Recipe(i32),
    Ingredient(i32),
}

fn load_views(
    connection: &mut PgConnection,
    scope: ViewScope,
) -> Result<Vec<RecipeIngredientView>, CatalogError> {
    let query = recipe_ingredients::table
        .inner_join(recipes::table)
        .inner_join(ingredients::table)
        .select((
            RecipeIngredient::as_select(),
            recipes::name,
            ingredients::name,
        ))
        .order_by((recipes::name.asc(), recipes::id.asc(), ingredients::name.asc()))
        .into_boxed();

    let query = match scope {
        ViewScope::All => query,
        ViewScope::Recipe(id) => query.filter(recipe_ingredients::recipe_id.eq(id)),
        ViewScope::Ingredient(id) => query.filter(recipe_ingredients::ingredient_id.eq(id)),
    };

    let rows: Vec<(RecipeIngredient, String, String)> = query.load(connection)?;
    Ok(rows
        .into_iter()
        .map(|(entry, recipe_name, ingredient_name)| {
            RecipeIngredientView::new(entry, recipe_name, ingredient_name)
        })
        .collect())
}

fn recipe_exists(connection: &mut PgConnection, id: i32) -> Result<bool, CatalogError> {
    Ok(select(exists(recipes::table.find(id))).get_result(connection)?)
}

fn ingredient_exists(connection: &mut PgConnection, id: i32) -> Result<bool, CatalogError> {
    Ok(select(exists(ingredients::table.find(id))).get_result(connection)?)
}

fn entry_exists(connection: &mut PgConnection, id: i32) -> Result<bool, CatalogError> {
    Ok(select(exists(recipe_ingredients::table.find(id))).get_result(connection)?)
}

fn check_references(
    connection: &mut PgConnection,
    entry: &NewRecipeIngredient,
) -> Result<(), CatalogError> {
    if !recipe_exists(connection, entry.recipe_id)? {
        return Err(CatalogError::missing_reference("recipe", entry.recipe_id));
    }
    if !ingredient_exists(connection, entry.ingredient_id)? {
        return Err(CatalogError::missing_reference(
            "ingredient",
            entry.ingredient_id,
        ));
    }
    Ok(())
}

fn deleted(count: usize, entity: &'static str, id: i32) -> Result<(), CatalogError> {
    if count == 0 {
        return Err(CatalogError::not_found(entity, id));
    }
    Ok(())
}

impl<S: WithConnection> Catalog for DatabaseCatalog<S> {
    fn create_recipe(&self, recipe: NewRecipe) -> Result<Recipe, CatalogError> {
        let recipe = recipe.validated()?;
        let span = trace_span!("create_recipe", name = %recipe.name);
        let _guard = span.enter();

        // Stamped here: `now()` stays frozen for a whole transaction
        let now = Utc::now();
        self.source.with_connection(|connection| {
            Ok(diesel::insert_into(recipes::table)
                .values((
                    &recipe,
                    recipes::created_at.eq(now),
                    recipes::updated_at.eq(now),
                ))
                .returning(Recipe::as_returning())
                .get_result(connection)?)
        })
    }

    fn recipe(&self, id: i32) -> Result<Recipe, CatalogError> {
        self.source.with_connection(|connection| {
            recipes::table
                .find(id)
                .select(Recipe::as_select())
                .first(connection)
                .optional()?
                .ok_or(CatalogError::not_found("recipe", id))
        })
    }

    fn recipes(&self) -> Result<Vec<Recipe>, CatalogError> {
        self.source.with_connection(|connection| {
            Ok(recipes::table
                .select(Recipe::as_select())
                .order_by((recipes::name.asc(), recipes::id.asc()))
                .load(connection)?)
        })
    }

    fn update_recipe(&self, id: i32, recipe: NewRecipe) -> Result<Recipe, CatalogError> {
        let recipe = recipe.validated()?;
        let span = trace_span!("update_recipe", id);
        let _guard = span.enter();

        self.source.with_connection(|connection| {
            diesel::update(recipes::table.find(id))
                .set((&recipe, recipes::updated_at.eq(Utc::now())))
                .returning(Recipe::as_returning())
                .get_result(connection)
                .optional()?
                .ok_or(CatalogError::not_found("recipe", id))
        })
    }

    fn delete_recipe(&self, id: i32) -> Result<(), CatalogError> {
        let span = trace_span!("delete_recipe", id);
        let _guard = span.enter();

        self.source.with_connection(|connection| {
            let count = diesel::delete(recipes::table.find(id)).execute(connection)?;
            trace!(count, "deleted recipe, entries cascade in the database");
            deleted(count, "recipe", id)
        })
    }

    fn create_ingredient(&self, ingredient: NewIngredient) -> Result<Ingredient, CatalogError> {
        let ingredient = ingredient.validated()?;
        let span = trace_span!("create_ingredient", name = %ingredient.name);
        let _guard = span.enter();

        // Savepoint so a rejected name leaves an enclosing transaction usable
        self.source.with_connection(|connection| {
            connection.transaction(|connection| {
                Ok(diesel::insert_into(ingredients::table)
                    .values(&ingredient)
                    .returning(Ingredient::as_returning())
                    .get_result(connection)?)
            })
        })
    }

    fn ingredient(&self, id: i32) -> Result<Ingredient, CatalogError> {
        self.source.with_connection(|connection| {
            ingredients::table
                .find(id)
                .select(Ingredient::as_select())
                .first(connection)
                .optional()?
                .ok_or(CatalogError::not_found("ingredient", id))
        })
    }

    fn find_ingredient(&self, name: &str) -> Result<Option<Ingredient>, CatalogError> {
        self.source.with_connection(|connection| {
            Ok(ingredients::table
                .filter(ingredients::name.eq(name))
                .select(Ingredient::as_select())
                .first(connection)
                .optional()?)
        })
    }

    fn ingredients(&self) -> Result<Vec<Ingredient>, CatalogError> {
        self.source.with_connection(|connection| {
            Ok(ingredients::table
                .select(Ingredient::as_select())
                .order_by(ingredients::name.asc())
                .load(connection)?)
        })
    }

    fn update_ingredient(
        &self,
        id: i32,
        ingredient: NewIngredient,
    ) -> Result<Ingredient, CatalogError> {
        let ingredient = ingredient.validated()?;

        self.source.with_connection(|connection| {
            connection.transaction(|connection| {
                diesel::update(ingredients::table.find(id))
                    .set(&ingredient)
                    .returning(Ingredient::as_returning())
                    .get_result(connection)
                    .optional()?
                    .ok_or(CatalogError::not_found("ingredient", id))
            })
        })
    }

    fn delete_ingredient(&self, id: i32) -> Result<(), CatalogError> {
        let span = trace_span!("delete_ingredient", id);
        let _guard = span.enter();

        self.source.with_connection(|connection| {
            let count = diesel::delete(ingredients::table.find(id)).execute(connection)?;
            trace!(count, "deleted ingredient, entries cascade in the database");
            deleted(count, "ingredient", id)
        })
    }

    fn add_recipe_ingredient(
        &self,
        entry: NewRecipeIngredient,
    ) -> Result<RecipeIngredient, CatalogError> {
        let entry = entry.validated()?;
        let span = trace_span!(
            "add_recipe_ingredient",
            recipe_id = entry.recipe_id,
            ingredient_id = entry.ingredient_id
        );
        let _guard = span.enter();

        self.source.with_connection(|connection| {
            connection.transaction(|connection| {
                check_references(connection, &entry)?;

                Ok(diesel::insert_into(recipe_ingredients::table)
                    .values(&entry)
                    .returning(RecipeIngredient::as_returning())
                    .get_result(connection)?)
            })
        })
    }

    fn recipe_ingredient(&self, id: i32) -> Result<RecipeIngredient, CatalogError> {
        self.source.with_connection(|connection| {
            recipe_ingredients::table
                .find(id)
                .select(RecipeIngredient::as_select())
                .first(connection)
                .optional()?
                .ok_or(CatalogError::not_found("recipe ingredient", id))
        })
    }

    fn recipe_ingredients(&self) -> Result<Vec<RecipeIngredientView>, CatalogError> {
        self.source
            .with_connection(|connection| load_views(connection, ViewScope::All))
    }

    fn ingredients_of_recipe(
        &self,
        recipe_id: i32,
    ) -> Result<Vec<RecipeIngredientView>, CatalogError> {
        self.source.with_connection(|connection| {
            if !recipe_exists(connection, recipe_id)? {
                return Err(CatalogError::not_found("recipe", recipe_id));
            }
            load_views(connection, ViewScope::Recipe(recipe_id))
        })
    }

    fn recipes_using_ingredient(
        &self,
        ingredient_id: i32,
    ) -> Result<Vec<RecipeIngredientView>, CatalogError> {
        self.source.with_connection(|connection| {
            if !ingredient_exists(connection, ingredient_id)? {
                return Err(CatalogError::not_found("ingredient", ingredient_id));
            }
            load_views(connection, ViewScope::Ingredient(ingredient_id))
        })
    }

    fn update_recipe_ingredient(
        &self,
        id: i32,
        entry: NewRecipeIngredient,
    ) -> Result<RecipeIngredient, CatalogError> {
        let entry = entry.validated()?;

        self.source.with_connection(|connection| {
            connection.transaction(|connection| {
                if !entry_exists(connection, id)? {
                    return Err(CatalogError::not_found("recipe ingredient", id));
                }
                check_references(connection, &entry)?;

                Ok(diesel::update(recipe_ingredients::table.find(id))
                    .set(&entry)
                    .returning(RecipeIngredient::as_returning())
                    .get_result(connection)?)
            })
        })
    }

    fn delete_recipe_ingredient(&self, id: i32) -> Result<(), CatalogError> {
        self.source.with_connection(|connection| {
            let count = diesel::delete(recipe_ingredients::table.find(id)).execute(connection)?;
            deleted(count, "recipe ingredient", id)
        })
    }

    fn transaction(&self, work: &mut TransactionWork<'_>) -> Result<(), CatalogError> {
        let span = trace_span!("catalog transaction");
        let _guard = span.enter();

        self.source.with_connection(|connection| {
            connection.transaction(|connection| {
                let scoped = DatabaseCatalog {
                    source: RefCell::new(connection),
                };
                work(&scoped)
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{env, str::FromStr};

    use bigdecimal::BigDecimal;
    use diesel::r2d2::TestCustomizer;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::database::connection::run_migrations;

    /// Every pooled connection opens a test transaction that is never committed.
    fn test_catalog() -> Option<DatabaseCatalog> {
        let Ok(database_url) = env::var("CATALOG_TEST_DATABASE_URL") else {
            eprintln!("CATALOG_TEST_DATABASE_URL not set, skipping database test");
            return None;
        };

        let pool = Pool::builder()
            .max_size(1)
            .connection_customizer(Box::new(TestCustomizer))
            .build(ConnectionManager::<PgConnection>::new(database_url))
            .expect("Failed to create test pool");
        run_migrations(&pool).expect("Failed to run migrations");

        Some(DatabaseCatalog::new(pool))
    }

    fn recipe(name: &str) -> NewRecipe {
        NewRecipe {
            name: name.into(),
            instructions: "Knead and bake.".into(),
            ..Default::default()
        }
    }

    fn entry(recipe: &Recipe, ingredient_id: i32, quantity: &str) -> NewRecipeIngredient {
        NewRecipeIngredient::new(
            recipe.id,
            ingredient_id,
            BigDecimal::from_str(quantity).unwrap(),
            "grams".into(),
            None,
        )
    }

    #[test]
    fn bread_and_flour_against_postgres() {
        let Some(catalog) = test_catalog() else {
            return;
        };

        let flour = catalog
            .create_ingredient(NewIngredient::new("Flour".into(), Some("grams".into())))
            .unwrap();
        assert!(catalog
            .create_ingredient(NewIngredient::new("Flour".into(), None))
            .unwrap_err()
            .is_duplicate());

        let bread = catalog.create_recipe(recipe("Bread")).unwrap();
        assert_eq!(bread.created_at, bread.updated_at);

        let attached = catalog.add_recipe_ingredient(entry(&bread, flour.id, "500")).unwrap();
        assert_eq!(attached.quantity.to_string(), "500.00");
        assert!(catalog
            .add_recipe_ingredient(entry(&bread, flour.id, "20"))
            .unwrap_err()
            .is_duplicate());

        let lines: Vec<_> = catalog
            .recipe_ingredients()
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(lines, ["500.00 grams of Flour for Bread"]);

        catalog.delete_recipe(bread.id).unwrap();
        assert!(catalog.recipe_ingredient(attached.id).is_err());
        assert_eq!(catalog.ingredient(flour.id).unwrap(), flour);
    }

    #[test]
    fn updates_advance_updated_at_inside_one_transaction() {
        let Some(catalog) = test_catalog() else {
            return;
        };

        let created = catalog.create_recipe(recipe("Soup")).unwrap();
        let updated = catalog.update_recipe(created.id, recipe("Tomato soup")).unwrap();
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at > created.updated_at);

        let mut stamps = None;
        catalog
            .transaction(&mut |scoped| {
                let created = scoped.create_recipe(recipe("Stew"))?;
                let updated = scoped.update_recipe(created.id, recipe("Beef stew"))?;
                stamps = Some((created.created_at, updated.created_at, updated.updated_at));
                Ok(())
            })
            .unwrap();

        let (created_at, kept_created_at, updated_at) = stamps.unwrap();
        assert_eq!(kept_created_at, created_at);
        assert!(updated_at > created_at);
    }

    #[test]
    fn constraints_and_cascades_against_postgres() {
        let Some(catalog) = test_catalog() else {
            return;
        };

        let flour = catalog
            .create_ingredient(NewIngredient::new("Flour".into(), None))
            .unwrap();
        let water = catalog
            .create_ingredient(NewIngredient::new("Water".into(), None))
            .unwrap();
        let bread = catalog.create_recipe(recipe("Bread")).unwrap();
        let pizza = catalog.create_recipe(recipe("Pizza")).unwrap();

        catalog.add_recipe_ingredient(entry(&bread, flour.id, "500")).unwrap();
        let bread_water = catalog.add_recipe_ingredient(entry(&bread, water.id, "350")).unwrap();
        catalog.add_recipe_ingredient(entry(&pizza, water.id, "200")).unwrap();

        // Moving an entry onto a taken pair
        assert!(catalog
            .update_recipe_ingredient(bread_water.id, entry(&bread, flour.id, "350"))
            .unwrap_err()
            .is_duplicate());

        // A missing entry wins over a missing reference
        assert!(matches!(
            catalog.update_recipe_ingredient(-1, entry(&bread, -1, "1")),
            Err(CatalogError::NotFound {
                entity: "recipe ingredient",
                ..
            })
        ));

        catalog.delete_ingredient(water.id).unwrap();
        let lines: Vec<_> = catalog
            .recipe_ingredients()
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(lines, ["500.00 grams of Flour for Bread"]);
        assert_eq!(catalog.recipes().unwrap().len(), 2);

        catalog.create_recipe(recipe("apple crumble")).unwrap();
        let names: Vec<_> = catalog
            .recipes()
            .unwrap()
            .into_iter()
            .map(|recipe| recipe.name)
            .collect();
        assert_eq!(names, ["Bread", "Pizza", "apple crumble"]);
    }
}
