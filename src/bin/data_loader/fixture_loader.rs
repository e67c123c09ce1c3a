use std::{collections::HashMap, fs, path::Path};

use serde_json::from_str;
use thiserror::Error;
use tracing::{info, trace, trace_span};

use super::fixture_dto::{FixtureDto, IngredientDto, RecipeDto};
use crate::database::{
    catalog::Catalog,
    error::CatalogError,
    models::{ingredient::NewIngredient, recipe::NewRecipe, recipe_ingredient::NewRecipeIngredient},
};

#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("can't read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("can't parse fixture: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// What a fixture load wrote.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FixtureReport {
    pub ingredients_created: usize,
    pub ingredients_reused: usize,
    pub recipes_created: usize,
    pub recipe_ingredients_created: usize,
}

pub fn read_fixture(path: &Path) -> Result<FixtureDto, FixtureError> {
    let json = fs::read_to_string(path).map_err(|source| FixtureError::Read {
        path: path.display().to_string(),
        source,
    })?;

    Ok(from_str(&json)?)
}

/// Loads the whole fixture in one transaction: nothing is kept if any record fails.
pub fn load_fixture(
    catalog: &dyn Catalog,
    fixture: &FixtureDto,
) -> Result<FixtureReport, FixtureError> {
    let span = trace_span!("load_fixture");
    let _guard = span.enter();

    let mut report = FixtureReport::default();
    catalog.transaction(&mut |catalog| {
        report = FixtureReport::default();
        let ingredient_ids = fill_ingredients(catalog, &fixture.ingredients, &mut report)?;
        fill_recipes(catalog, &fixture.recipes, &ingredient_ids, &mut report)
    })?;

    info!(?report, "fixture loaded");
    Ok(report)
}

fn fill_ingredients(
    catalog: &dyn Catalog,
    ingredients: &[IngredientDto],
    report: &mut FixtureReport,
) -> Result<HashMap<String, i32>, CatalogError> {
    trace!("Starting fill_ingredients");

    let mut ids = HashMap::new();
    for dto in ingredients {
        let ingredient = match catalog.find_ingredient(dto.name.trim())? {
            Some(existing) => {
                report.ingredients_reused += 1;
                existing
            }
            None => {
                report.ingredients_created += 1;
                catalog.create_ingredient(NewIngredient::new(dto.name.clone(), dto.unit.clone()))?
            }
        };
        ids.insert(ingredient.name, ingredient.id);
    }

    trace!("End fill_ingredients");
    Ok(ids)
}

fn fill_recipes(
    catalog: &dyn Catalog,
    recipes: &[RecipeDto],
    ingredient_ids: &HashMap<String, i32>,
    report: &mut FixtureReport,
) -> Result<(), CatalogError> {
    trace!("Starting fill_recipes");

    for dto in recipes {
        let recipe = catalog.create_recipe(NewRecipe::new(
            dto.name.clone(),
            dto.description.clone(),
            dto.instructions.clone(),
            dto.prep_time_minutes,
            dto.cook_time_minutes,
            dto.servings,
        ))?;
        report.recipes_created += 1;

        for entry in &dto.ingredients {
            let name = entry.ingredient.trim();
            let ingredient_id = match ingredient_ids.get(name) {
                Some(id) => *id,
                None => catalog
                    .find_ingredient(name)?
                    .map(|ingredient| ingredient.id)
                    .ok_or(CatalogError::missing_reference("ingredient", name))?,
            };

            catalog.add_recipe_ingredient(NewRecipeIngredient::new(
                recipe.id,
                ingredient_id,
                entry.quantity.to_decimal()?,
                entry.unit.clone(),
                entry.notes.clone(),
            ))?;
            report.recipe_ingredients_created += 1;
        }
    }

    trace!("End fill_recipes");
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::database::memory_catalog::MemoryCatalog;

    const BAKERY: &str = r#"{
        "ingredients": [
            { "name": "Flour", "unit": "grams" },
            { "name": "Water", "unit": "ml" },
            { "name": "Salt" }
        ],
        "recipes": [
            {
                "name": "Bread",
                "instructions": "Mix, knead, proof and bake.",
                "prep_time_minutes": 30,
                "cook_time_minutes": 40,
                "servings": 8,
                "ingredients": [
                    { "ingredient": "Flour", "quantity": "500.00", "unit": "grams" },
                    { "ingredient": "Water", "quantity": 350, "unit": "ml" },
                    { "ingredient": "Salt", "quantity": "10", "unit": "grams", "notes": "fine" }
                ]
            }
        ]
    }"#;

    #[test]
    fn loads_ingredients_then_recipes() {
        let catalog = MemoryCatalog::new();
        let fixture: FixtureDto = from_str(BAKERY).unwrap();

        let report = load_fixture(&catalog, &fixture).unwrap();

        assert_eq!(
            report,
            FixtureReport {
                ingredients_created: 3,
                ingredients_reused: 0,
                recipes_created: 1,
                recipe_ingredients_created: 3,
            }
        );
        let lines: Vec<_> = catalog
            .recipe_ingredients()
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(
            lines,
            [
                "500.00 grams of Flour for Bread",
                "10.00 grams of Salt for Bread",
                "350.00 ml of Water for Bread",
            ]
        );
    }

    #[test]
    fn existing_ingredients_are_reused() {
        let catalog = MemoryCatalog::new();
        catalog
            .create_ingredient(NewIngredient::new("Salt".into(), None))
            .unwrap();

        let report = load_fixture(&catalog, &from_str(BAKERY).unwrap()).unwrap();

        assert_eq!(report.ingredients_created, 2);
        assert_eq!(report.ingredients_reused, 1);
        assert_eq!(catalog.ingredients().unwrap().len(), 3);
    }

    #[test]
    fn unknown_ingredient_rolls_back_everything() {
        let catalog = MemoryCatalog::new();
        let fixture: FixtureDto = from_str(
            r#"{
                "ingredients": [{ "name": "Rice" }],
                "recipes": [{
                    "name": "Paella",
                    "instructions": "Simmer.",
                    "ingredients": [
                        { "ingredient": "Rice", "quantity": 400, "unit": "grams" },
                        { "ingredient": "Saffron", "quantity": "0.5", "unit": "grams" }
                    ]
                }]
            }"#,
        )
        .unwrap();

        let error = load_fixture(&catalog, &fixture).unwrap_err();

        assert!(matches!(
            error,
            FixtureError::Catalog(CatalogError::MissingReference {
                entity: "ingredient",
                ..
            })
        ));
        assert!(catalog.ingredients().unwrap().is_empty());
        assert!(catalog.recipes().unwrap().is_empty());
    }

    #[test]
    fn missing_file_names_the_path() {
        let error = read_fixture(Path::new("does/not/exist.json")).unwrap_err();
        assert!(error.to_string().starts_with("can't read does/not/exist.json"));
    }
}
