use std::{cmp::Ordering, fmt};

use diesel::prelude::*;
use lombok::AllArgsConstructor;

use crate::database::{error::CatalogError, validation};

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq, Eq, Hash)]
#[diesel(table_name = crate::database::schema::ingredients)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Ingredient {
    pub id: i32,
    pub name: String,
    // Suggested unit only, never consulted by recipe entries
    pub unit: Option<String>,
}

impl Ingredient {
    pub const NAME_MAX_LENGTH: usize = 100;
    pub const UNIT_MAX_LENGTH: usize = 50;

    pub fn default_order(&self, other: &Self) -> Ordering {
        self.name.cmp(&other.name)
    }
}

impl fmt::Display for Ingredient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Insertable, AsChangeset, AllArgsConstructor, Debug, Clone, Default, PartialEq, Eq)]
#[diesel(table_name = crate::database::schema::ingredients)]
#[diesel(treat_none_as_null = true)]
pub struct NewIngredient {
    pub name: String,
    pub unit: Option<String>,
}

impl NewIngredient {
    pub fn validated(self) -> Result<Self, CatalogError> {
        Ok(Self {
            name: validation::required("name", self.name, Some(Ingredient::NAME_MAX_LENGTH))?,
            unit: validation::optional("unit", self.unit, Some(Ingredient::UNIT_MAX_LENGTH))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validated_normalizes_unit() {
        let ingredient = NewIngredient::new("Salt ".into(), Some(" ".into()))
            .validated()
            .unwrap();
        assert_eq!(ingredient, NewIngredient::new("Salt".into(), None));
    }

    #[test]
    fn name_is_limited_to_100_characters() {
        assert!(NewIngredient::new("x".repeat(100), None).validated().is_ok());
        assert!(NewIngredient::new("x".repeat(101), None).validated().is_err());
    }
}
