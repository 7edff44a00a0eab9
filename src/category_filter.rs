use std::collections::HashSet;

use crate::models::CompactRecipe;

/// Below this many matches the category filter is abandoned and every candidate is kept.
pub const MIN_FILTERED_RESULTS: usize = 5;

fn normalize(category: &str) -> String {
    category.trim().to_lowercase()
}

/// True when the two tag lists share at least one entry, ignoring case and surrounding whitespace.
pub fn has_category_overlap(tags: &[String], wanted: &[String]) -> bool {
    let wanted: HashSet<String> = wanted.iter().map(|c| normalize(c)).collect();
    tags.iter().any(|tag| wanted.contains(&normalize(tag)))
}

/// Narrows candidates to the requested categories.
///
/// If fewer than [`MIN_FILTERED_RESULTS`] recipes survive, the full set is returned
/// so a niche category never starves the model of choices.
pub fn filter_by_categories(
    recipes: Vec<CompactRecipe>,
    requested_categories: &[String],
) -> Vec<CompactRecipe> {
    let requested: Vec<String> = requested_categories
        .iter()
        .filter(|c| !c.trim().is_empty())
        .cloned()
        .collect();
    if requested.is_empty() {
        return recipes;
    }

    let matching = recipes
        .iter()
        .filter(|recipe| has_category_overlap(&recipe.categories, &requested))
        .count();
    if matching < MIN_FILTERED_RESULTS {
        return recipes;
    }

    recipes
        .into_iter()
        .filter(|recipe| has_category_overlap(&recipe.categories, &requested))
        .collect()
}
