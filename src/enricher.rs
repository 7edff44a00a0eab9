use std::collections::HashMap;

use crate::models::{CompactRecipe, EnrichedEntry, PlanEntry, RecipeDisplay};

impl From<&CompactRecipe> for RecipeDisplay {
    fn from(recipe: &CompactRecipe) -> Self {
        Self {
            name: recipe.name.clone(),
            image_url: recipe.image_url.clone(),
            thumbnail_url: recipe.thumbnail_url.clone(),
            prep_time: recipe.prep_time,
            cook_time: recipe.cook_time,
            categories: recipe.categories.clone(),
        }
    }
}

/// Joins display fields from the user's recipes onto confirmed entries.
/// Suggestions, and references without a match, pass through with no display data.
pub fn enrich_entries(entries: Vec<PlanEntry>, recipes: &[CompactRecipe]) -> Vec<EnrichedEntry> {
    let by_id: HashMap<&str, &CompactRecipe> = recipes.iter().map(|r| (r.id.as_str(), r)).collect();
    entries
        .into_iter()
        .map(|entry| {
            let recipe = entry
                .recipe_id()
                .and_then(|id| by_id.get(id))
                .map(|recipe| RecipeDisplay::from(*recipe));
            EnrichedEntry { entry, recipe }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MealAssignment, MealType};

    fn entry(assignment: MealAssignment) -> PlanEntry {
        PlanEntry {
            day_of_week: 1,
            meal_type: MealType::Dinner,
            assignment,
            reason: String::new(),
        }
    }

    #[test]
    fn test_confirmed_entries_get_display_fields() {
        let recipes = vec![CompactRecipe {
            id: "r1".into(),
            name: "Tacos".into(),
            image_url: Some("https://cdn.example/tacos.jpg".into()),
            prep_time: Some(15),
            categories: vec!["Fredag".into()],
            ..Default::default()
        }];
        let enriched = enrich_entries(
            vec![
                entry(MealAssignment::Recipe { recipe_id: "r1".into() }),
                entry(MealAssignment::Recipe { recipe_id: "missing".into() }),
                entry(MealAssignment::Suggestion { name: "Soppa".into(), description: None, recipe: None }),
            ],
            &recipes,
        );

        let display = enriched[0].recipe.as_ref().unwrap();
        assert_eq!(display.name, "Tacos");
        assert_eq!(display.prep_time, Some(15));
        assert!(enriched[1].recipe.is_none());
        assert!(enriched[2].recipe.is_none());
    }

    #[test]
    fn test_enriched_entry_serializes_flat() {
        let enriched = enrich_entries(
            vec![entry(MealAssignment::Suggestion { name: "Soppa".into(), description: None, recipe: None })],
            &[],
        );
        let value = serde_json::to_value(&enriched[0]).unwrap();
        assert_eq!(value["suggestedName"], "Soppa");
        assert!(value["recipeId"].is_null());
        assert!(value["recipe"].is_null());
    }
}
