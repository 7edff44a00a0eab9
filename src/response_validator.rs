//! Parsing and structural validation of untrusted model output.
//!
//! Everything here is pure: no I/O, no data-store access. Any deviation from the
//! expected shape rejects the whole response; there is no partial acceptance.

use serde::Deserialize;
use tracing::debug;

use crate::error::GenerationError;
use crate::models::{FullRecipe, MealType, RawPlanEntry, RecipeRef};

/// Removes a surrounding markdown code fence (optionally tagged `json`), if present.
pub fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    if trimmed.len() >= 6 && trimmed.starts_with("```") && trimmed.ends_with("```") {
        let inner = &trimmed[3..trimmed.len() - 3];
        let inner = inner.strip_prefix("json").unwrap_or(inner);
        return inner.trim();
    }
    trimmed
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePlan {
    entries: Vec<WireEntry>,
    summary: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEntry {
    day_of_week: i64,
    meal_type: MealType,
    #[serde(default)]
    recipe_id: Option<String>,
    #[serde(default)]
    suggested_name: Option<String>,
    #[serde(default)]
    suggested_description: Option<String>,
    #[serde(default)]
    suggested_recipe: Option<FullRecipe>,
    reason: String,
}

/// Model output that passed validation. References in it are still unverified.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedPlan {
    pub entries: Vec<RawPlanEntry>,
    pub summary: String,
}

fn invalid(message: impl Into<String>) -> GenerationError {
    GenerationError::InvalidResponse(message.into())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn decode_document<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T, GenerationError> {
    let content = strip_code_fences(raw);
    let value: serde_json::Value = serde_json::from_str(content).map_err(|e| {
        debug!(error = %e, content, "model output is not JSON");
        invalid(format!("not valid JSON: {}", e))
    })?;
    serde_json::from_value(value).map_err(|e| invalid(format!("schema mismatch: {}", e)))
}

fn check_recipe(recipe: &FullRecipe, context: &str) -> Result<(), GenerationError> {
    if recipe.name.trim().is_empty() {
        return Err(invalid(format!("{}: recipe name is blank", context)));
    }
    Ok(())
}

/// Parses a meal plan and checks it against the requested meal types.
pub fn parse_meal_plan(
    raw: &str,
    allowed_meal_types: &[MealType],
    allowed_days: &[u8],
) -> Result<ValidatedPlan, GenerationError> {
    let plan: WirePlan = decode_document(raw)?;
    if plan.entries.is_empty() {
        return Err(invalid("plan has no entries"));
    }

    let mut entries = Vec::with_capacity(plan.entries.len());
    for (index, entry) in plan.entries.into_iter().enumerate() {
        let context = format!("entry {}", index);
        if !(1..=7).contains(&entry.day_of_week) {
            return Err(invalid(format!(
                "{}: dayOfWeek {} is outside 1..=7",
                context, entry.day_of_week
            )));
        }
        if !allowed_days.contains(&(entry.day_of_week as u8)) {
            return Err(invalid(format!(
                "{}: day {} was not requested",
                context, entry.day_of_week
            )));
        }
        if !allowed_meal_types.contains(&entry.meal_type) {
            return Err(invalid(format!(
                "{}: meal type '{}' was not requested",
                context, entry.meal_type
            )));
        }
        if let Some(recipe) = &entry.suggested_recipe {
            check_recipe(recipe, &context)?;
        }

        entries.push(RawPlanEntry {
            day_of_week: entry.day_of_week as u8,
            meal_type: entry.meal_type,
            recipe_ref: RecipeRef::decode(entry.recipe_id.as_deref()),
            suggested_name: non_blank(entry.suggested_name),
            suggested_description: non_blank(entry.suggested_description),
            suggested_recipe: entry.suggested_recipe,
            reason: entry.reason.trim().to_string(),
        });
    }

    Ok(ValidatedPlan {
        entries,
        summary: plan.summary.trim().to_string(),
    })
}

/// Parses a single structured recipe, as produced by recipe import.
pub fn parse_full_recipe(raw: &str) -> Result<FullRecipe, GenerationError> {
    let recipe: FullRecipe = decode_document(raw)?;
    check_recipe(&recipe, "recipe")?;
    if !recipe.ingredient_groups.iter().any(|g| !g.ingredients.is_empty()) {
        return Err(invalid("recipe has no ingredients"));
    }
    if !recipe.instruction_groups.iter().any(|g| !g.steps.is_empty()) {
        return Err(invalid("recipe has no instructions"));
    }
    Ok(recipe)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ALL_DAYS;
    use serde_json::json;

    const DINNER: &[MealType] = &[MealType::Dinner];
    const WEEK: &[u8] = &ALL_DAYS;

    fn valid_plan() -> serde_json::Value {
        json!({
            "entries": [
                { "dayOfWeek": 1, "mealType": "dinner", "recipeId": "r1", "suggestedName": null,
                  "suggestedDescription": null, "suggestedRecipe": null, "reason": "Favorit" },
                { "dayOfWeek": 2, "mealType": "dinner", "recipeId": "BASE:b1", "suggestedName": null,
                  "suggestedDescription": null, "suggestedRecipe": null, "reason": "Snabb" },
                { "dayOfWeek": 3, "mealType": "dinner", "recipeId": null, "suggestedName": "Fisktacos",
                  "suggestedDescription": "Krispig torsk", "suggestedRecipe": {
                      "name": "Fisktacos", "description": "Krispig torsk", "yield": "4",
                      "prepTime": 15, "cookTime": 10, "categories": ["Fisk"],
                      "ingredientGroups": [{ "name": null, "ingredients": [{ "name": "torsk", "quantity": "400", "unit": "g", "notes": null }] }],
                      "instructionGroups": [{ "name": null, "steps": ["Stek fisken."] }],
                      "sourceUrl": null, "sourceSite": null
                  }, "reason": "Något nytt" }
            ],
            "summary": "En varierad vecka."
        })
    }

    #[test]
    fn test_valid_plan_decodes_references() {
        let plan = parse_meal_plan(&valid_plan().to_string(), DINNER, WEEK).unwrap();
        assert_eq!(plan.entries.len(), 3);
        assert_eq!(plan.summary, "En varierad vecka.");
        assert_eq!(plan.entries[0].recipe_ref, RecipeRef::Existing("r1".into()));
        assert_eq!(plan.entries[1].recipe_ref, RecipeRef::Base("b1".into()));
        assert_eq!(plan.entries[2].recipe_ref, RecipeRef::Suggestion);
        let recipe = plan.entries[2].suggested_recipe.as_ref().unwrap();
        assert_eq!(recipe.ingredient_groups[0].ingredients[0].name, "torsk");
    }

    #[test]
    fn test_code_fences_are_stripped() {
        let fenced = format!("```json\n{}\n```", valid_plan());
        assert!(parse_meal_plan(&fenced, DINNER, WEEK).is_ok());
        assert_eq!(strip_code_fences("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("  {} "), "{}");
    }

    #[test]
    fn test_malformed_json_is_rejected() {
        let result = parse_meal_plan("{\"entries\": [", DINNER, WEEK);
        assert!(matches!(result, Err(GenerationError::InvalidResponse(msg)) if msg.contains("not valid JSON")));
    }

    #[test]
    fn test_every_truncation_is_rejected() {
        let text = valid_plan().to_string();
        for end in (0..text.len()).filter(|i| text.is_char_boundary(*i)) {
            assert!(
                parse_meal_plan(&text[..end], DINNER, WEEK).is_err(),
                "prefix of length {} was accepted",
                end
            );
        }
    }

    #[test]
    fn test_missing_reason_is_rejected() {
        let mut plan = valid_plan();
        plan["entries"][0].as_object_mut().unwrap().remove("reason");
        let result = parse_meal_plan(&plan.to_string(), DINNER, WEEK);
        assert!(matches!(result, Err(GenerationError::InvalidResponse(msg)) if msg.contains("schema mismatch")));
    }

    #[test]
    fn test_day_out_of_range_is_rejected() {
        let mut plan = valid_plan();
        plan["entries"][1]["dayOfWeek"] = json!(8);
        assert!(parse_meal_plan(&plan.to_string(), DINNER, WEEK).is_err());

        plan["entries"][1]["dayOfWeek"] = json!(0);
        assert!(parse_meal_plan(&plan.to_string(), DINNER, WEEK).is_err());

        plan["entries"][1]["dayOfWeek"] = json!("2");
        assert!(parse_meal_plan(&plan.to_string(), DINNER, WEEK).is_err());
    }

    #[test]
    fn test_unknown_or_unrequested_meal_type_is_rejected() {
        let mut plan = valid_plan();
        plan["entries"][0]["mealType"] = json!("brunch");
        assert!(parse_meal_plan(&plan.to_string(), DINNER, WEEK).is_err());

        plan["entries"][0]["mealType"] = json!("lunch");
        assert!(parse_meal_plan(&plan.to_string(), DINNER, WEEK).is_err());
        assert!(parse_meal_plan(&plan.to_string(), &[MealType::Lunch, MealType::Dinner], WEEK).is_ok());
    }

    #[test]
    fn test_entries_must_be_an_array_and_non_empty() {
        let result = parse_meal_plan(r#"{"entries": {}, "summary": ""}"#, DINNER, WEEK);
        assert!(result.is_err());
        let result = parse_meal_plan(r#"{"entries": [], "summary": ""}"#, DINNER, WEEK);
        assert!(matches!(result, Err(GenerationError::InvalidResponse(msg)) if msg.contains("no entries")));
    }

    #[test]
    fn test_blank_suggested_recipe_name_is_rejected() {
        let mut plan = valid_plan();
        plan["entries"][2]["suggestedRecipe"]["name"] = json!("  ");
        assert!(parse_meal_plan(&plan.to_string(), DINNER, WEEK).is_err());
    }

    #[test]
    fn test_blank_suggestion_text_becomes_none() {
        let mut plan = valid_plan();
        plan["entries"][2]["suggestedName"] = json!("   ");
        let parsed = parse_meal_plan(&plan.to_string(), DINNER, WEEK).unwrap();
        assert_eq!(parsed.entries[2].suggested_name, None);
    }

    #[test]
    fn test_parse_full_recipe_requires_content() {
        let recipe = valid_plan()["entries"][2]["suggestedRecipe"].clone();
        assert!(parse_full_recipe(&recipe.to_string()).is_ok());

        let mut empty = recipe.clone();
        empty["ingredientGroups"] = json!([]);
        assert!(parse_full_recipe(&empty.to_string()).is_err());

        let mut no_steps = recipe;
        no_steps["instructionGroups"] = json!([{ "name": null, "steps": [] }]);
        assert!(parse_full_recipe(&no_steps.to_string()).is_err());
    }

    #[test]
    fn test_unrequested_day_is_rejected() {
        let plan = valid_plan().to_string();
        assert!(parse_meal_plan(&plan, DINNER, &[1, 2, 3]).is_ok());
        let result = parse_meal_plan(&plan, DINNER, &[1, 2]);
        assert!(matches!(result, Err(GenerationError::InvalidResponse(msg)) if msg.contains("day 3")));
    }
}
