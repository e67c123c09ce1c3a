use std::str::FromStr;

use bigdecimal::BigDecimal;
use thiserror::Error;

use super::EntityKind;
use crate::database::{
    catalog::Catalog,
    error::CatalogError,
    models::{
        ingredient::{Ingredient, NewIngredient},
        recipe::{NewRecipe, Recipe},
        recipe_ingredient::{NewRecipeIngredient, RecipeIngredient},
    },
};

#[derive(Error, Debug)]
pub enum FormError {
    #[error("{field}: '{value}' is not a whole number")]
    InvalidNumber { field: &'static str, value: String },

    #[error("{field}: '{value}' is not a decimal number")]
    InvalidDecimal { field: &'static str, value: String },

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// A text input of an admin form.
pub struct FormField<'a> {
    pub label: &'static str,
    pub value: &'a mut String,
    pub multiline: bool,
}

impl<'a> FormField<'a> {
    fn line(label: &'static str, value: &'a mut String) -> Self {
        Self {
            label,
            value,
            multiline: false,
        }
    }

    fn text(label: &'static str, value: &'a mut String) -> Self {
        Self {
            label,
            value,
            multiline: true,
        }
    }
}

fn optional_text(value: &str) -> Option<String> {
    Some(value.to_owned()).filter(|value| !value.trim().is_empty())
}

fn optional_number(field: &'static str, value: &str) -> Result<Option<i32>, FormError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }

    value
        .parse()
        .map(Some)
        .map_err(|_| FormError::InvalidNumber {
            field,
            value: value.to_owned(),
        })
}

fn number(field: &'static str, value: &str) -> Result<i32, FormError> {
    optional_number(field, value)?
        .ok_or(CatalogError::validation(field, "this field is required").into())
}

fn decimal(field: &'static str, value: &str) -> Result<BigDecimal, FormError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CatalogError::validation(field, "this field is required").into());
    }

    BigDecimal::from_str(value).map_err(|_| FormError::InvalidDecimal {
        field,
        value: value.to_owned(),
    })
}

fn number_text(value: Option<i32>) -> String {
    value.map(|value| value.to_string()).unwrap_or_default()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeForm {
    pub name: String,
    pub description: String,
    pub instructions: String,
    pub prep_time_minutes: String,
    pub cook_time_minutes: String,
    pub servings: String,
}

impl RecipeForm {
    pub fn from_record(recipe: &Recipe) -> Self {
        Self {
            name: recipe.name.clone(),
            description: recipe.description.clone().unwrap_or_default(),
            instructions: recipe.instructions.clone(),
            prep_time_minutes: number_text(recipe.prep_time_minutes),
            cook_time_minutes: number_text(recipe.cook_time_minutes),
            servings: number_text(recipe.servings),
        }
    }

    pub fn to_new(&self) -> Result<NewRecipe, FormError> {
        Ok(NewRecipe {
            name: self.name.clone(),
            description: optional_text(&self.description),
            instructions: self.instructions.clone(),
            prep_time_minutes: optional_number("prep_time_minutes", &self.prep_time_minutes)?,
            cook_time_minutes: optional_number("cook_time_minutes", &self.cook_time_minutes)?,
            servings: optional_number("servings", &self.servings)?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngredientForm {
    pub name: String,
    pub unit: String,
}

impl IngredientForm {
    pub fn from_record(ingredient: &Ingredient) -> Self {
        Self {
            name: ingredient.name.clone(),
            unit: ingredient.unit.clone().unwrap_or_default(),
        }
    }

    pub fn to_new(&self) -> NewIngredient {
        NewIngredient::new(self.name.clone(), optional_text(&self.unit))
    }
}

/// References are entered as record ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeIngredientForm {
    pub recipe_id: String,
    pub ingredient_id: String,
    pub quantity: String,
    pub unit: String,
    pub notes: String,
}

impl RecipeIngredientForm {
    pub fn from_record(entry: &RecipeIngredient) -> Self {
        Self {
            recipe_id: entry.recipe_id.to_string(),
            ingredient_id: entry.ingredient_id.to_string(),
            quantity: entry.quantity.to_string(),
            unit: entry.unit.clone(),
            notes: entry.notes.clone().unwrap_or_default(),
        }
    }

    pub fn to_new(&self) -> Result<NewRecipeIngredient, FormError> {
        Ok(NewRecipeIngredient::new(
            number("recipe", &self.recipe_id)?,
            number("ingredient", &self.ingredient_id)?,
            decimal("quantity", &self.quantity)?,
            self.unit.clone(),
            optional_text(&self.notes),
        ))
    }
}

/// Editable state of one record, blank for a new record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminForm {
    Recipe(RecipeForm),
    Ingredient(IngredientForm),
    RecipeIngredient(RecipeIngredientForm),
}

impl AdminForm {
    pub fn blank(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Recipe => Self::Recipe(RecipeForm::default()),
            EntityKind::Ingredient => Self::Ingredient(IngredientForm::default()),
            EntityKind::RecipeIngredient => {
                Self::RecipeIngredient(RecipeIngredientForm::default())
            }
        }
    }

    /// Reads the stored record `id` into a form.
    pub fn load(kind: EntityKind, catalog: &dyn Catalog, id: i32) -> Result<Self, CatalogError> {
        Ok(match kind {
            EntityKind::Recipe => Self::Recipe(RecipeForm::from_record(&catalog.recipe(id)?)),
            EntityKind::Ingredient => {
                Self::Ingredient(IngredientForm::from_record(&catalog.ingredient(id)?))
            }
            EntityKind::RecipeIngredient => Self::RecipeIngredient(
                RecipeIngredientForm::from_record(&catalog.recipe_ingredient(id)?),
            ),
        })
    }

    pub fn fields(&mut self) -> Vec<FormField<'_>> {
        match self {
            Self::Recipe(form) => vec![
                FormField::line("name", &mut form.name),
                FormField::text("description", &mut form.description),
                FormField::text("instructions", &mut form.instructions),
                FormField::line("prep time (min)", &mut form.prep_time_minutes),
                FormField::line("cook time (min)", &mut form.cook_time_minutes),
                FormField::line("servings", &mut form.servings),
            ],
            Self::Ingredient(form) => vec![
                FormField::line("name", &mut form.name),
                FormField::line("unit", &mut form.unit),
            ],
            Self::RecipeIngredient(form) => vec![
                FormField::line("recipe id", &mut form.recipe_id),
                FormField::line("ingredient id", &mut form.ingredient_id),
                FormField::line("quantity", &mut form.quantity),
                FormField::line("unit", &mut form.unit),
                FormField::line("notes", &mut form.notes),
            ],
        }
    }

    /// Creates a record, or replaces record `id` when one is given. Returns the saved id.
    pub fn save(&self, catalog: &dyn Catalog, id: Option<i32>) -> Result<i32, FormError> {
        let saved = match (self, id) {
            (Self::Recipe(form), None) => catalog.create_recipe(form.to_new()?)?.id,
            (Self::Recipe(form), Some(id)) => catalog.update_recipe(id, form.to_new()?)?.id,
            (Self::Ingredient(form), None) => catalog.create_ingredient(form.to_new())?.id,
            (Self::Ingredient(form), Some(id)) => {
                catalog.update_ingredient(id, form.to_new())?.id
            }
            (Self::RecipeIngredient(form), None) => {
                catalog.add_recipe_ingredient(form.to_new()?)?.id
            }
            (Self::RecipeIngredient(form), Some(id)) => {
                catalog.update_recipe_ingredient(id, form.to_new()?)?.id
            }
        };

        Ok(saved)
    }
}
