use std::collections::{HashMap, HashSet};
use tracing::warn;

use crate::models::{
    BaseRecipe, CompactRecipe, MealAssignment, PlanEntry, RawPlanEntry, RecipeRef,
    PLACEHOLDER_SUGGESTION_NAME,
};

fn placeholder_suggestion() -> MealAssignment {
    MealAssignment::Suggestion {
        name: PLACEHOLDER_SUGGESTION_NAME.to_string(),
        description: None,
        recipe: None,
    }
}

fn resolve_entry(
    entry: RawPlanEntry,
    recipe_ids: &HashSet<&str>,
    base_recipes: &HashMap<&str, &BaseRecipe>,
) -> PlanEntry {
    let assignment = match entry.recipe_ref {
        RecipeRef::Suggestion => MealAssignment::Suggestion {
            name: entry
                .suggested_name
                .unwrap_or_else(|| PLACEHOLDER_SUGGESTION_NAME.to_string()),
            description: entry.suggested_description,
            recipe: entry.suggested_recipe,
        },
        RecipeRef::Base(base_id) => match base_recipes.get(base_id.as_str()) {
            Some(base) => MealAssignment::Suggestion {
                name: base.name.clone(),
                description: base.description.clone(),
                recipe: Some(base.to_full_recipe()),
            },
            None => {
                warn!(base_id = %base_id, day = entry.day_of_week, meal = %entry.meal_type, "unknown base recipe reference");
                placeholder_suggestion()
            }
        },
        RecipeRef::Existing(recipe_id) if recipe_ids.contains(recipe_id.as_str()) => {
            MealAssignment::Recipe { recipe_id }
        }
        RecipeRef::Existing(recipe_id) => {
            warn!(recipe_id = %recipe_id, day = entry.day_of_week, meal = %entry.meal_type, "model referenced a recipe the user does not have");
            placeholder_suggestion()
        }
    };

    PlanEntry {
        day_of_week: entry.day_of_week,
        meal_type: entry.meal_type,
        assignment,
        reason: entry.reason,
    }
}

/// Keeps the first entry for each day and meal type, in original order.
pub fn deduplicate(entries: Vec<PlanEntry>) -> Vec<PlanEntry> {
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter(|entry| seen.insert(entry.slot_key()))
        .collect()
}

/// Rewrites model references into verified recipe ids or suggestions, then removes slot collisions.
pub fn resolve_entries(
    entries: Vec<RawPlanEntry>,
    recipes: &[CompactRecipe],
    base_recipes: &[BaseRecipe],
) -> Vec<PlanEntry> {
    let recipe_ids: HashSet<&str> = recipes.iter().map(|r| r.id.as_str()).collect();
    let base_by_id: HashMap<&str, &BaseRecipe> =
        base_recipes.iter().map(|b| (b.id.as_str(), b)).collect();

    let resolved = entries
        .into_iter()
        .map(|entry| resolve_entry(entry, &recipe_ids, &base_by_id))
        .collect();
    deduplicate(resolved)
}
