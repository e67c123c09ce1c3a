use std::{cmp::Ordering, fmt};

use bigdecimal::BigDecimal;
use diesel::prelude::*;
use lombok::AllArgsConstructor;

use super::{ingredient::Ingredient, recipe::Recipe};
use crate::database::{error::CatalogError, validation};

/// How much of an ingredient, in which unit, a recipe uses.
#[derive(Queryable, Selectable, Identifiable, Associations, Debug, Clone, PartialEq, Eq)]
#[diesel(belongs_to(Recipe))]
#[diesel(belongs_to(Ingredient))]
#[diesel(table_name = crate::database::schema::recipe_ingredients)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct RecipeIngredient {
    pub id: i32,
    pub recipe_id: i32,
    pub ingredient_id: i32,
    pub quantity: BigDecimal,
    pub unit: String,
    pub notes: Option<String>,
}

impl RecipeIngredient {
    pub const UNIT_MAX_LENGTH: usize = 50;
    pub const NOTES_MAX_LENGTH: usize = 255;
}

#[derive(Insertable, AsChangeset, AllArgsConstructor, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = crate::database::schema::recipe_ingredients)]
#[diesel(treat_none_as_null = true)]
pub struct NewRecipeIngredient {
    pub recipe_id: i32,
    pub ingredient_id: i32,
    pub quantity: BigDecimal,
    pub unit: String,
    pub notes: Option<String>,
}

impl NewRecipeIngredient {
    pub fn validated(self) -> Result<Self, CatalogError> {
        Ok(Self {
            quantity: validation::quantity("quantity", self.quantity)?,
            unit: validation::required("unit", self.unit, Some(RecipeIngredient::UNIT_MAX_LENGTH))?,
            notes: validation::optional(
                "notes",
                self.notes,
                Some(RecipeIngredient::NOTES_MAX_LENGTH),
            )?,
            ..self
        })
    }
}

/// An entry together with the names of the records it joins.
#[derive(AllArgsConstructor, Debug, Clone, PartialEq, Eq)]
pub struct RecipeIngredientView {
    pub entry: RecipeIngredient,
    pub recipe_name: String,
    pub ingredient_name: String,
}

impl RecipeIngredientView {
    /// Owning recipe in its own default order, then ingredient name.
    pub fn default_order(&self, other: &Self) -> Ordering {
        self.recipe_name
            .cmp(&other.recipe_name)
            .then_with(|| self.entry.recipe_id.cmp(&other.entry.recipe_id))
            .then_with(|| self.ingredient_name.cmp(&other.ingredient_name))
    }
}

impl fmt::Display for RecipeIngredientView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} of {} for {}",
            self.entry.quantity, self.entry.unit, self.ingredient_name, self.recipe_name
        )
    }
}
