pub mod forms;

use std::fmt;

use thiserror::Error;

use crate::database::{
    catalog::Catalog,
    error::CatalogError,
    models::{
        ingredient::Ingredient, recipe::Recipe, recipe_ingredient::RecipeIngredientView,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Recipe,
    Ingredient,
    RecipeIngredient,
}

/// An entity the record browser can list and edit.
pub trait AdminModel: fmt::Display {
    const KIND: EntityKind;
    const VERBOSE_NAME: &'static str;
    const VERBOSE_NAME_PLURAL: &'static str;
    /// Column headers, matching [`AdminModel::cells`].
    const LIST_DISPLAY: &'static [&'static str];

    fn id(&self) -> i32;
    fn cells(&self) -> Vec<String>;

    fn row(&self) -> AdminRow {
        AdminRow {
            id: self.id(),
            display: self.to_string(),
            cells: self.cells(),
        }
    }
}

fn optional_cell<T: ToString>(value: &Option<T>) -> String {
    value.as_ref().map(ToString::to_string).unwrap_or_default()
}

impl AdminModel for Recipe {
    const KIND: EntityKind = EntityKind::Recipe;
    const VERBOSE_NAME: &'static str = "Recipe";
    const VERBOSE_NAME_PLURAL: &'static str = "Recipes";
    const LIST_DISPLAY: &'static [&'static str] = &[
        "name",
        "prep time (min)",
        "cook time (min)",
        "servings",
        "updated",
    ];

    fn id(&self) -> i32 {
        self.id
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            optional_cell(&self.prep_time_minutes),
            optional_cell(&self.cook_time_minutes),
            optional_cell(&self.servings),
            self.updated_at.format("%Y-%m-%d %H:%M").to_string(),
        ]
    }
}

impl AdminModel for Ingredient {
    const KIND: EntityKind = EntityKind::Ingredient;
    const VERBOSE_NAME: &'static str = "Ingredient";
    const VERBOSE_NAME_PLURAL: &'static str = "Ingredients";
    const LIST_DISPLAY: &'static [&'static str] = &["name", "unit"];

    fn id(&self) -> i32 {
        self.id
    }

    fn cells(&self) -> Vec<String> {
        vec![self.name.clone(), optional_cell(&self.unit)]
    }
}

impl AdminModel for RecipeIngredientView {
    const KIND: EntityKind = EntityKind::RecipeIngredient;
    const VERBOSE_NAME: &'static str = "Recipe Ingredient";
    const VERBOSE_NAME_PLURAL: &'static str = "Recipe Ingredients";
    const LIST_DISPLAY: &'static [&'static str] =
        &["recipe", "ingredient", "quantity", "unit", "notes"];

    fn id(&self) -> i32 {
        self.entry.id
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.recipe_name.clone(),
            self.ingredient_name.clone(),
            self.entry.quantity.to_string(),
            self.entry.unit.clone(),
            optional_cell(&self.entry.notes),
        ]
    }
}

/// One listed record: its id, display string and column values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminRow {
    pub id: i32,
    pub display: String,
    pub cells: Vec<String>,
}

/// Registration of one entity with the admin site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelAdmin {
    pub kind: EntityKind,
    pub verbose_name: &'static str,
    pub verbose_name_plural: &'static str,
    pub list_display: &'static [&'static str],
}

impl ModelAdmin {
    fn of<T: AdminModel>() -> Self {
        Self {
            kind: T::KIND,
            verbose_name: T::VERBOSE_NAME,
            verbose_name_plural: T::VERBOSE_NAME_PLURAL,
            list_display: T::LIST_DISPLAY,
        }
    }

    /// Rows in the entity's default order.
    pub fn load_rows(&self, catalog: &dyn Catalog) -> Result<Vec<AdminRow>, CatalogError> {
        Ok(match self.kind {
            EntityKind::Recipe => rows(catalog.recipes()?),
            EntityKind::Ingredient => rows(catalog.ingredients()?),
            EntityKind::RecipeIngredient => rows(catalog.recipe_ingredients()?),
        })
    }

    pub fn delete(&self, catalog: &dyn Catalog, id: i32) -> Result<(), CatalogError> {
        match self.kind {
            EntityKind::Recipe => catalog.delete_recipe(id),
            EntityKind::Ingredient => catalog.delete_ingredient(id),
            EntityKind::RecipeIngredient => catalog.delete_recipe_ingredient(id),
        }
    }
}

fn rows<T: AdminModel>(records: Vec<T>) -> Vec<AdminRow> {
    records.iter().map(T::row).collect()
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AdminError {
    #[error("{0} is already registered")]
    AlreadyRegistered(&'static str),
}

/// The entities exposed to the record browser, in registration order.
#[derive(Debug, Default)]
pub struct AdminSite {
    models: Vec<ModelAdmin>,
}

impl AdminSite {
    pub fn register<T: AdminModel>(&mut self) -> Result<&mut Self, AdminError> {
        if self.models.iter().any(|model| model.kind == T::KIND) {
            return Err(AdminError::AlreadyRegistered(T::VERBOSE_NAME));
        }

        self.models.push(ModelAdmin::of::<T>());
        Ok(self)
    }

    pub fn models(&self) -> &[ModelAdmin] {
        &self.models
    }
}

pub fn site() -> Result<AdminSite, AdminError> {
    let mut site = AdminSite::default();
    site.register::<Recipe>()?
        .register::<Ingredient>()?
        .register::<RecipeIngredientView>()?;
    Ok(site)
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use bigdecimal::BigDecimal;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::database::{
        memory_catalog::MemoryCatalog,
        models::{
            ingredient::NewIngredient, recipe::NewRecipe,
            recipe_ingredient::NewRecipeIngredient,
        },
    };

    #[test]
    fn site_exposes_the_three_entities() {
        let site = site().unwrap();
        let names: Vec<_> = site
            .models()
            .iter()
            .map(|model| model.verbose_name_plural)
            .collect();

        assert_eq!(names, ["Recipes", "Ingredients", "Recipe Ingredients"]);
    }

    #[test]
    fn registering_twice_is_rejected() {
        let mut site = AdminSite::default();
        site.register::<Ingredient>().unwrap();

        assert_eq!(
            site.register::<Ingredient>().unwrap_err(),
            AdminError::AlreadyRegistered("Ingredient")
        );
        assert_eq!(site.models().len(), 1);
    }

    #[test]
    fn rows_follow_list_display() {
        let catalog = MemoryCatalog::new();
        let flour = catalog
            .create_ingredient(NewIngredient::new("Flour".into(), Some("grams".into())))
            .unwrap();
        let bread = catalog
            .create_recipe(NewRecipe {
                name: "Bread".into(),
                instructions: "Bake.".into(),
                servings: Some(8),
                ..Default::default()
            })
            .unwrap();
        catalog
            .add_recipe_ingredient(NewRecipeIngredient::new(
                bread.id,
                flour.id,
                BigDecimal::from_str("500").unwrap(),
                "grams".into(),
                Some("sifted".into()),
            ))
            .unwrap();

        let site = site().unwrap();
        for model in site.models() {
            for row in model.load_rows(&catalog).unwrap() {
                assert_eq!(row.cells.len(), model.list_display.len());
            }
        }

        let entries = site.models()[2].load_rows(&catalog).unwrap();
        assert_eq!(entries[0].display, "500.00 grams of Flour for Bread");
        assert_eq!(
            entries[0].cells,
            ["Bread", "Flour", "500.00", "grams", "sifted"]
        );

        let recipes = site.models()[0].load_rows(&catalog).unwrap();
        assert_eq!(recipes[0].display, "Bread");
        assert_eq!(recipes[0].cells[1..4], ["", "", "8"]);
    }

    #[test]
    fn delete_dispatches_on_kind() {
        let catalog = MemoryCatalog::new();
        let salt = catalog
            .create_ingredient(NewIngredient::new("Salt".into(), None))
            .unwrap();

        let ingredients = ModelAdmin::of::<Ingredient>();
        ingredients.delete(&catalog, salt.id).unwrap();

        assert!(ingredients.load_rows(&catalog).unwrap().is_empty());
        assert!(ingredients.delete(&catalog, salt.id).is_err());
    }
}
