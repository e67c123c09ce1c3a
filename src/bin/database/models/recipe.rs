use std::{cmp::Ordering, fmt};

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use lombok::AllArgsConstructor;

use crate::database::{error::CatalogError, validation};

/// A named set of instructions plus optional timing and serving metadata.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = crate::database::schema::recipes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Recipe {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub instructions: String,
    pub prep_time_minutes: Option<i32>,
    pub cook_time_minutes: Option<i32>,
    pub servings: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Recipe {
    pub const NAME_MAX_LENGTH: usize = 255;

    /// Default enumeration order: name by code point, then id for records sharing a name.
    pub fn default_order(&self, other: &Self) -> Ordering {
        self.name
            .cmp(&other.name)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl fmt::Display for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Writable fields of a recipe, used for both inserts and full updates.
#[derive(Insertable, AsChangeset, AllArgsConstructor, Debug, Clone, Default, PartialEq, Eq)]
#[diesel(table_name = crate::database::schema::recipes)]
#[diesel(treat_none_as_null = true)]
pub struct NewRecipe {
    pub name: String,
    pub description: Option<String>,
    pub instructions: String,
    pub prep_time_minutes: Option<i32>,
    pub cook_time_minutes: Option<i32>,
    pub servings: Option<i32>,
}

impl NewRecipe {
    pub fn validated(self) -> Result<Self, CatalogError> {
        Ok(Self {
            name: validation::required("name", self.name, Some(Recipe::NAME_MAX_LENGTH))?,
            description: validation::optional("description", self.description, None)?,
            instructions: validation::required("instructions", self.instructions, None)?,
            ..self
        })
    }
}
