use std::str::FromStr;

use bigdecimal::BigDecimal;
use serde::Deserialize;
use serde_json::Number;

use crate::database::error::CatalogError;

#[derive(Deserialize, Debug, Default)]
pub struct FixtureDto {
    #[serde(default)]
    pub ingredients: Vec<IngredientDto>,
    #[serde(default)]
    pub recipes: Vec<RecipeDto>,
}

#[derive(Deserialize, Debug)]
pub struct IngredientDto {
    pub name: String,
    #[serde(default)]
    pub unit: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct RecipeDto {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub instructions: String,
    #[serde(default)]
    pub prep_time_minutes: Option<i32>,
    #[serde(default)]
    pub cook_time_minutes: Option<i32>,
    #[serde(default)]
    pub servings: Option<i32>,
    #[serde(default)]
    pub ingredients: Vec<RecipeIngredientDto>,
}

#[derive(Deserialize, Debug)]
pub struct RecipeIngredientDto {
    /// Ingredient name
    pub ingredient: String,
    pub quantity: QuantityDto,
    pub unit: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// `"500.00"` or `500`. Strings keep the exact decimal digits.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum QuantityDto {
    Text(String),
    Number(Number),
}

impl QuantityDto {
    pub fn to_decimal(&self) -> Result<BigDecimal, CatalogError> {
        let text = match self {
            Self::Text(text) => text.trim().to_owned(),
            Self::Number(number) => number.to_string(),
        };

        BigDecimal::from_str(&text)
            .map_err(|_| CatalogError::validation("quantity", format!("'{text}' is not a number")))
    }
}
