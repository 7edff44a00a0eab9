use tracing::{debug, info, warn};

use crate::api_connection::endpoints::{JsonSchema, JsonSchemaDefinition};
use crate::api_connection::{LanguageModel, ModelPrompt};
use crate::candidates::CandidateSet;
use crate::error::GenerationError;
use crate::models::{MealPlanPreferences, MealType, PantryItem, BASE_REFERENCE_PREFIX};

const DAY_NAMES: [&str; 7] = [
    "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday",
];

/// How many novel suggestions the model may make.
///
/// Never asks the model to reuse more existing recipes than there are: when the slots left
/// for existing recipes exceed what is available, the remainder becomes suggestions.
pub fn suggestion_budget(
    day_count: usize,
    meal_type_count: usize,
    requested_max_suggestions: usize,
    available_recipe_count: usize,
) -> usize {
    let total_slots = day_count * meal_type_count;
    let requested = requested_max_suggestions.min(total_slots);
    let from_existing = total_slots - requested;
    if from_existing > available_recipe_count {
        total_slots - available_recipe_count
    } else {
        requested
    }
}

fn full_recipe_schema() -> JsonSchema {
    let ingredient = JsonSchema::object(vec![
        ("name", JsonSchema::string()),
        ("quantity", JsonSchema::string().nullable()),
        ("unit", JsonSchema::string().nullable()),
        ("notes", JsonSchema::string().nullable()),
    ]);
    let ingredient_group = JsonSchema::object(vec![
        ("name", JsonSchema::string().nullable()),
        ("ingredients", JsonSchema::array(ingredient)),
    ]);
    let instruction_group = JsonSchema::object(vec![
        ("name", JsonSchema::string().nullable()),
        ("steps", JsonSchema::array(JsonSchema::string())),
    ]);

    JsonSchema::object(vec![
        ("name", JsonSchema::string()),
        ("description", JsonSchema::string()),
        ("yield", JsonSchema::string().nullable()),
        ("prepTime", JsonSchema::integer().nullable().describe("Minutes")),
        ("cookTime", JsonSchema::integer().nullable().describe("Minutes")),
        ("categories", JsonSchema::array(JsonSchema::string())),
        ("ingredientGroups", JsonSchema::array(ingredient_group)),
        ("instructionGroups", JsonSchema::array(instruction_group)),
        ("sourceUrl", JsonSchema::string().nullable()),
        ("sourceSite", JsonSchema::string().nullable()),
    ])
}

/// Structured output contract shared by the meal plan model call and recipe import.
pub fn recipe_schema_definition() -> JsonSchemaDefinition {
    JsonSchemaDefinition {
        name: "full_recipe".to_string(),
        strict: Some(true),
        schema: full_recipe_schema(),
    }
}

pub fn meal_plan_schema(meal_types: &[MealType]) -> JsonSchemaDefinition {
    let meal_type_names: Vec<&str> = meal_types.iter().map(MealType::as_str).collect();
    let entry = JsonSchema::object(vec![
        ("dayOfWeek", JsonSchema::integer_range(1, 7).describe("1 = Monday, 7 = Sunday")),
        ("mealType", JsonSchema::string_enum(&meal_type_names)),
        (
            "recipeId",
            JsonSchema::string()
                .nullable()
                .describe("Id of an existing recipe, BASE:<id> for a base recipe, or null for a new suggestion"),
        ),
        ("suggestedName", JsonSchema::string().nullable()),
        ("suggestedDescription", JsonSchema::string().nullable()),
        ("suggestedRecipe", full_recipe_schema().nullable()),
        ("reason", JsonSchema::string()),
    ]);

    JsonSchemaDefinition {
        name: "meal_plan".to_string(),
        strict: Some(true),
        schema: JsonSchema::object(vec![
            ("entries", JsonSchema::array(entry)),
            ("summary", JsonSchema::string()),
        ]),
    }
}

fn describe_pantry(pantry: &[PantryItem]) -> String {
    pantry
        .iter()
        .map(|item| match (item.quantity, item.unit.as_deref()) {
            (Some(quantity), Some(unit)) => format!("- {} ({} {})", item.name, quantity, unit),
            (Some(quantity), None) => format!("- {} ({})", item.name, quantity),
            _ => format!("- {}", item.name),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn describe_candidates(candidates: &CandidateSet) -> String {
    let mut lines = Vec::new();
    for recipe in &candidates.candidates {
        let mut line = format!("- id: {} | {}", recipe.id, recipe.name);
        if !recipe.categories.is_empty() {
            line.push_str(&format!(" | categories: {}", recipe.categories.join(", ")));
        }
        let minutes = recipe.prep_time.unwrap_or(0) + recipe.cook_time.unwrap_or(0);
        if minutes > 0 {
            line.push_str(&format!(" | {} min", minutes));
        }
        lines.push(line);
    }
    for base in &candidates.base_recipes {
        let mut line = format!("- id: {}{} | {}", BASE_REFERENCE_PREFIX, base.id, base.name);
        if !base.categories.is_empty() {
            line.push_str(&format!(" | categories: {}", base.categories.join(", ")));
        }
        if let Some(description) = base.description.as_deref().filter(|d| !d.is_empty()) {
            line.push_str(&format!(" | {}", description));
        }
        lines.push(line);
    }
    lines.join("\n")
}

pub fn build_meal_plan_prompt(
    preferences: &MealPlanPreferences,
    candidates: &CandidateSet,
    budget: usize,
) -> ModelPrompt {
    let days = preferences.effective_days();
    let meal_types = preferences.effective_meal_types();
    let total_slots = days.len() * meal_types.len();

    let system = "/no_thinking
You are a meal planning assistant. Build a weekly meal plan from the user's own recipes and a pool of base recipes.
Return the output as a JSON object that follows the provided schema exactly. Do not include explanatory text or markdown formatting.
Rules:
- Produce exactly one entry per requested day and meal type.
- To use an existing recipe, set \"recipeId\" to its id exactly as listed. Base recipes are listed with a BASE: prefix; keep the prefix.
- Never invent recipe ids. For a new dish, set \"recipeId\" to null and fill \"suggestedName\", \"suggestedDescription\" and \"suggestedRecipe\".
- Give every entry a short \"reason\".
- \"summary\" is one or two sentences describing the week."
        .to_string();

    let day_list = days
        .iter()
        .map(|day| format!("{} ({})", day, DAY_NAMES[(*day as usize) - 1]))
        .collect::<Vec<_>>()
        .join(", ");
    let meal_list = meal_types.iter().map(MealType::as_str).collect::<Vec<_>>().join(", ");

    let mut user = format!(
        "Days: {}\nMeal types: {}\nTotal entries: {}\nNew suggestions: at most {}; use listed recipes for the remaining {} entries.\n",
        day_list,
        meal_list,
        total_slots,
        budget,
        total_slots.saturating_sub(budget),
    );
    if let Some(servings) = preferences.servings {
        user.push_str(&format!("Servings per meal: {}\n", servings));
    }
    if !preferences.categories.is_empty() {
        user.push_str(&format!("Preferred categories: {}\n", preferences.categories.join(", ")));
    }
    if !preferences.diet_types.is_empty() {
        user.push_str(&format!("Diet: {}\n", preferences.diet_types.join(", ")));
    }
    if let Some(notes) = preferences.notes.as_deref().filter(|n| !n.trim().is_empty()) {
        user.push_str(&format!("Notes from the user: {}\n", notes.trim()));
    }
    if !candidates.pantry.is_empty() {
        user.push_str(&format!(
            "\nPrefer dishes that use what is already in the pantry:\n{}\n",
            describe_pantry(&candidates.pantry)
        ));
    }
    user.push_str(&format!("\nAvailable recipes:\n{}\n", describe_candidates(candidates)));

    ModelPrompt {
        system,
        user,
        schema: Some(meal_plan_schema(&meal_types)),
        temperature: 0.4,
        max_tokens: 8192,
    }
}

/// Asks the model for a plan and returns its raw, untrusted text.
pub async fn generate_meal_plan(
    model: &dyn LanguageModel,
    preferences: &MealPlanPreferences,
    candidates: &CandidateSet,
) -> Result<String, GenerationError> {
    let days = preferences.effective_days();
    let meal_types = preferences.effective_meal_types();
    let budget = suggestion_budget(
        days.len(),
        meal_types.len(),
        preferences.max_suggestions,
        candidates.available_recipe_count(),
    );
    info!(
        days = days.len(),
        meal_types = meal_types.len(),
        requested = preferences.max_suggestions,
        budget,
        available = candidates.available_recipe_count(),
        "requesting meal plan from model"
    );

    let prompt = build_meal_plan_prompt(preferences, candidates, budget);
    debug!(prompt = %prompt.user, "meal plan prompt");

    match model.complete(&prompt).await? {
        Some(raw) => Ok(raw),
        None => {
            warn!("model returned no meal plan");
            Err(GenerationError::NoResponse)
        }
    }
}
