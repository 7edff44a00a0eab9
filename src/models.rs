use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Marker the model uses to point at a shared base recipe instead of one of the user's own.
pub const BASE_REFERENCE_PREFIX: &str = "BASE:";

/// Name given to suggestion slots the model left unnamed or pointed at a recipe that does not exist.
pub const PLACEHOLDER_SUGGESTION_NAME: &str = "Receptförslag";

pub const ALL_DAYS: [u8; 7] = [1, 2, 3, 4, 5, 6, 7];

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealType {
    pub const ALL: [MealType; 4] = [
        MealType::Breakfast,
        MealType::Lunch,
        MealType::Dinner,
        MealType::Snack,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
            MealType::Snack => "snack",
        }
    }
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Stored data (rows as the data service returns them) ---

/// A row from the user's recipe table. Only a handful of these columns ever reach the model.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RecipeRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub prep_time: Option<u32>,
    #[serde(default)]
    pub cook_time: Option<u32>,
    #[serde(default, rename = "yield")]
    pub recipe_yield: Option<String>,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub home_id: Option<String>,
}

/// A shared recipe from the base pool. The model refers to these as `BASE:<id>`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct BaseRecipe {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "yield")]
    pub recipe_yield: Option<String>,
    #[serde(default)]
    pub prep_time: Option<u32>,
    #[serde(default)]
    pub cook_time: Option<u32>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub diet_types: Vec<String>,
    #[serde(default)]
    pub ingredient_groups: Vec<IngredientGroup>,
    #[serde(default)]
    pub instruction_groups: Vec<InstructionGroup>,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub source_site: Option<String>,
}

impl BaseRecipe {
    /// Copies the full structure, attribution included, into a recipe a plan can embed.
    pub fn to_full_recipe(&self) -> FullRecipe {
        FullRecipe {
            name: self.name.clone(),
            description: self.description.clone().unwrap_or_default(),
            recipe_yield: self.recipe_yield.clone(),
            prep_time: self.prep_time,
            cook_time: self.cook_time,
            categories: self.categories.clone(),
            ingredient_groups: self.ingredient_groups.clone(),
            instruction_groups: self.instruction_groups.clone(),
            source_url: self.source_url.clone(),
            source_site: self.source_site.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PantryItem {
    pub name: String,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
}

// --- Projections ---

/// Read projection of one of the user's recipes. Immutable for the duration of a job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CompactRecipe {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    pub categories: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prep_time: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cook_time: Option<u32>,
    #[serde(rename = "yield", skip_serializing_if = "Option::is_none")]
    pub recipe_yield: Option<String>,
}

impl From<RecipeRecord> for CompactRecipe {
    fn from(record: RecipeRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            image_url: record.image_url,
            thumbnail_url: record.thumbnail_url,
            categories: record.categories,
            prep_time: record.prep_time,
            cook_time: record.cook_time,
            recipe_yield: record.recipe_yield,
        }
    }
}

// --- Full recipe structure (embedded in suggestions, produced by recipe import) ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Ingredient {
    pub name: String,
    #[serde(default)]
    pub quantity: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct IngredientGroup {
    #[serde(default)]
    pub name: Option<String>,
    pub ingredients: Vec<Ingredient>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct InstructionGroup {
    #[serde(default)]
    pub name: Option<String>,
    pub steps: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct FullRecipe {
    pub name: String,
    pub description: String,
    #[serde(default, rename = "yield")]
    pub recipe_yield: Option<String>,
    #[serde(default)]
    pub prep_time: Option<u32>,
    #[serde(default)]
    pub cook_time: Option<u32>,
    pub categories: Vec<String>,
    pub ingredient_groups: Vec<IngredientGroup>,
    pub instruction_groups: Vec<InstructionGroup>,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub source_site: Option<String>,
}

// --- Requests ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MealPlanPreferences {
    #[serde(default)]
    pub meal_types: Vec<MealType>,
    #[serde(default)]
    pub selected_days: Vec<u8>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub diet_types: Vec<String>,
    #[serde(default = "default_max_suggestions")]
    pub max_suggestions: usize,
    #[serde(default)]
    pub servings: Option<u32>,
    #[serde(default)]
    pub use_pantry: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

fn default_max_suggestions() -> usize {
    3
}

impl Default for MealPlanPreferences {
    fn default() -> Self {
        Self {
            meal_types: vec![MealType::Dinner],
            selected_days: Vec::new(),
            categories: Vec::new(),
            diet_types: Vec::new(),
            max_suggestions: default_max_suggestions(),
            servings: None,
            use_pantry: false,
            notes: None,
        }
    }
}

impl MealPlanPreferences {
    /// Requested meal types, deduplicated, falling back to dinner only.
    pub fn effective_meal_types(&self) -> Vec<MealType> {
        let mut types: Vec<MealType> = Vec::new();
        for meal_type in &self.meal_types {
            if !types.contains(meal_type) {
                types.push(*meal_type);
            }
        }
        if types.is_empty() {
            types.push(MealType::Dinner);
        }
        types
    }

    /// Selected days with duplicates and out-of-range values dropped. An empty
    /// selection, or one that covers the whole week, means all seven days.
    pub fn effective_days(&self) -> Vec<u8> {
        let mut days: Vec<u8> = self
            .selected_days
            .iter()
            .copied()
            .filter(|day| (1..=7).contains(day))
            .collect();
        days.sort_unstable();
        days.dedup();
        if days.is_empty() || days.len() == ALL_DAYS.len() {
            return ALL_DAYS.to_vec();
        }
        days
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HouseholdScope {
    pub account: AccountId,
    pub home_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BaseRecipeFilter {
    pub diet_types: Vec<String>,
    pub categories: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct MealPlanRequest {
    pub account: AccountId,
    pub home_id: Option<String>,
    pub week_start: NaiveDate,
    pub preferences: MealPlanPreferences,
}

// --- Plan entries ---

/// Decoded form of the model's `recipeId` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecipeRef {
    /// Claims to be one of the user's recipes. Unverified until resolution.
    Existing(String),
    /// `BASE:<id>` pointing into the shared pool.
    Base(String),
    /// No recipe id: the model proposes something new.
    Suggestion,
}

impl RecipeRef {
    pub fn decode(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => RecipeRef::Suggestion,
            Some(id) => match id.strip_prefix(BASE_REFERENCE_PREFIX) {
                Some(base_id) => RecipeRef::Base(base_id.trim().to_string()),
                None => RecipeRef::Existing(id.to_string()),
            },
        }
    }
}

/// A plan entry exactly as validated from model output, before any reference is trusted.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPlanEntry {
    pub day_of_week: u8,
    pub meal_type: MealType,
    pub recipe_ref: RecipeRef,
    pub suggested_name: Option<String>,
    pub suggested_description: Option<String>,
    pub suggested_recipe: Option<FullRecipe>,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MealAssignment {
    Recipe {
        recipe_id: String,
    },
    Suggestion {
        name: String,
        description: Option<String>,
        recipe: Option<FullRecipe>,
    },
}

/// A resolved plan slot. Either points at a verified user recipe or carries a named suggestion.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(into = "PlanEntryRecord")]
pub struct PlanEntry {
    pub day_of_week: u8,
    pub meal_type: MealType,
    pub assignment: MealAssignment,
    pub reason: String,
}

impl PlanEntry {
    pub fn recipe_id(&self) -> Option<&str> {
        match &self.assignment {
            MealAssignment::Recipe { recipe_id } => Some(recipe_id),
            MealAssignment::Suggestion { .. } => None,
        }
    }

    pub fn suggested_name(&self) -> Option<&str> {
        match &self.assignment {
            MealAssignment::Recipe { .. } => None,
            MealAssignment::Suggestion { name, .. } => Some(name),
        }
    }

    pub fn suggested_recipe(&self) -> Option<&FullRecipe> {
        match &self.assignment {
            MealAssignment::Suggestion { recipe, .. } => recipe.as_ref(),
            MealAssignment::Recipe { .. } => None,
        }
    }

    pub fn slot_key(&self) -> String {
        slot_key(self.day_of_week, self.meal_type)
    }
}

pub fn slot_key(day_of_week: u8, meal_type: MealType) -> String {
    format!("{}-{}", day_of_week, meal_type)
}

/// Flat wire shape of a plan entry, as stored and returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanEntryRecord {
    pub day_of_week: u8,
    pub meal_type: MealType,
    pub recipe_id: Option<String>,
    pub suggested_name: Option<String>,
    pub suggested_description: Option<String>,
    pub suggested_recipe: Option<FullRecipe>,
    pub reason: String,
}

impl From<PlanEntry> for PlanEntryRecord {
    fn from(entry: PlanEntry) -> Self {
        let (recipe_id, suggested_name, suggested_description, suggested_recipe) =
            match entry.assignment {
                MealAssignment::Recipe { recipe_id } => (Some(recipe_id), None, None, None),
                MealAssignment::Suggestion {
                    name,
                    description,
                    recipe,
                } => (None, Some(name), description, recipe),
            };
        Self {
            day_of_week: entry.day_of_week,
            meal_type: entry.meal_type,
            recipe_id,
            suggested_name,
            suggested_description,
            suggested_recipe,
            reason: entry.reason,
        }
    }
}

/// Display fields joined in from the user's own recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeDisplay {
    pub name: String,
    pub image_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub prep_time: Option<u32>,
    pub cook_time: Option<u32>,
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedEntry {
    #[serde(flatten)]
    pub entry: PlanEntry,
    pub recipe: Option<RecipeDisplay>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MealPlanOutcome {
    pub plan_id: String,
    pub entries: Vec<EnrichedEntry>,
    pub summary: String,
    pub remaining_credits: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeImportOutcome {
    pub recipe: FullRecipe,
    pub remaining_credits: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recipe_ref_decode() {
        assert_eq!(RecipeRef::decode(None), RecipeRef::Suggestion);
        assert_eq!(RecipeRef::decode(Some("  ")), RecipeRef::Suggestion);
        assert_eq!(RecipeRef::decode(Some("BASE:abc")), RecipeRef::Base("abc".to_string()));
        assert_eq!(
            RecipeRef::decode(Some("r-42")),
            RecipeRef::Existing("r-42".to_string())
        );
    }

    #[test]
    fn test_effective_days_defaults_to_whole_week() {
        let mut prefs = MealPlanPreferences::default();
        assert_eq!(prefs.effective_days(), ALL_DAYS.to_vec());

        prefs.selected_days = vec![7, 6, 5, 4, 3, 2, 1, 1];
        assert_eq!(prefs.effective_days(), ALL_DAYS.to_vec());

        prefs.selected_days = vec![5, 1, 9, 0, 1];
        assert_eq!(prefs.effective_days(), vec![1, 5]);
    }

    #[test]
    fn test_effective_meal_types_falls_back_to_dinner() {
        let mut prefs = MealPlanPreferences {
            meal_types: Vec::new(),
            ..Default::default()
        };
        assert_eq!(prefs.effective_meal_types(), vec![MealType::Dinner]);

        prefs.meal_types = vec![MealType::Lunch, MealType::Dinner, MealType::Lunch];
        assert_eq!(
            prefs.effective_meal_types(),
            vec![MealType::Lunch, MealType::Dinner]
        );
    }

    #[test]
    fn test_plan_entry_serializes_flat() {
        let entry = PlanEntry {
            day_of_week: 2,
            meal_type: MealType::Lunch,
            assignment: MealAssignment::Recipe {
                recipe_id: "r1".to_string(),
            },
            reason: "Quick".to_string(),
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["dayOfWeek"], 2);
        assert_eq!(value["mealType"], "lunch");
        assert_eq!(value["recipeId"], "r1");
        assert!(value["suggestedName"].is_null());
    }

    #[test]
    fn test_preferences_from_camel_case_json() {
        let prefs: MealPlanPreferences = serde_json::from_str(
            r#"{"mealTypes":["lunch","dinner"],"selectedDays":[1,2],"maxSuggestions":2,"usePantry":true}"#,
        )
        .unwrap();
        assert_eq!(prefs.meal_types, vec![MealType::Lunch, MealType::Dinner]);
        assert_eq!(prefs.max_suggestions, 2);
        assert!(prefs.use_pantry);
        assert!(prefs.categories.is_empty());
    }
}
