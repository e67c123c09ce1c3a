use diesel::result::{DatabaseErrorKind, Error as DieselError};
use thiserror::Error;

/// Unique constraint on `ingredients.name`.
pub const INGREDIENT_NAME_KEY: &str = "ingredients_name_key";
/// Unique constraint on `(recipe_ingredients.recipe_id, recipe_ingredients.ingredient_id)`.
pub const RECIPE_INGREDIENT_PAIR_KEY: &str = "recipe_ingredients_recipe_id_ingredient_id_key";

/// Errors surfaced by catalog operations
#[derive(Error, Debug)]
pub enum CatalogError {
    /// A field failed its constraint, nothing was written
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    /// A unique constraint rejected the write
    #[error("duplicate value violates unique constraint {constraint}")]
    Duplicate { constraint: String },

    #[error("{entity} {id} does not exist")]
    NotFound { entity: &'static str, id: i32 },

    /// A reference points to a record that does not exist
    #[error("referenced {entity} {key} does not exist")]
    MissingReference { entity: &'static str, key: String },

    #[error("database error: {0}")]
    Database(DieselError),

    #[error("connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl CatalogError {
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: i32) -> Self {
        Self::NotFound { entity, id }
    }

    pub fn missing_reference(entity: &'static str, key: impl ToString) -> Self {
        Self::MissingReference {
            entity,
            key: key.to_string(),
        }
    }

    pub fn duplicate(constraint: &str) -> Self {
        Self::Duplicate {
            constraint: constraint.to_owned(),
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate { .. })
    }
}

impl From<DieselError> for CatalogError {
    fn from(error: DieselError) -> Self {
        match error {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                Self::duplicate(info.constraint_name().unwrap_or("unique"))
            }
            error => Self::Database(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_field() {
        let error = CatalogError::validation("name", "this field is required");
        assert_eq!(error.to_string(), "invalid name: this field is required");

        let error = CatalogError::missing_reference("ingredient", "Saffron");
        assert_eq!(
            error.to_string(),
            "referenced ingredient Saffron does not exist"
        );
    }

    #[test]
    fn diesel_not_found_is_a_database_error() {
        let error = CatalogError::from(DieselError::NotFound);
        assert!(matches!(error, CatalogError::Database(DieselError::NotFound)));
        assert!(!error.is_duplicate());
    }
}
