use std::sync::Arc;
use tracing::{error, info, warn};

use crate::api_connection::{LanguageModel, ModelPrompt};
use crate::credits::{CreditLedger, CreditReservation, RefundOutcome, RefundReason};
use crate::error::GenerationError;
use crate::meal_plan_generator::recipe_schema_definition;
use crate::models::{AccountId, FullRecipe, RecipeImportOutcome};
use crate::response_validator::parse_full_recipe;

pub const RECIPE_IMPORT_CREDIT_DESCRIPTION: &str = "AI recipe import";

/// Longest recipe text accepted; anything longer is truncated before it reaches the model.
pub const MAX_RECIPE_TEXT_CHARS: usize = 20_000;

fn recipe_prompt(recipe_text: &str) -> ModelPrompt {
    let system = "/no_thinking
You are a recipe parsing assistant. Your task is to parse the given recipe text into a structured recipe.
Return the output as a JSON object following the provided schema. The JSON object must be the only content in your response. Do not include any explanatory text, comments, or markdown formatting.
- \"name\": the title of the recipe.
- \"description\": one or two sentences describing the dish; use an empty string if nothing fits.
- \"ingredientGroups\": ingredients grouped as in the text (e.g. 'Sauce', 'Dough'); use a single group with a null name if the text has no groups.
  Each ingredient has \"name\", \"quantity\" (as written, e.g. '2', '1/2', '1-2'), \"unit\" (e.g. 'dl', 'g', 'msk') and \"notes\" (e.g. 'finely chopped'); use null when absent.
- \"instructionGroups\": the steps in order, grouped the same way.
- \"prepTime\" and \"cookTime\" in minutes, or null if not stated.
- Keep the language of the original text. Do not invent ingredients or steps."
        .to_string();

    let text: String = recipe_text.chars().take(MAX_RECIPE_TEXT_CHARS).collect();
    ModelPrompt {
        system,
        user: text,
        schema: Some(recipe_schema_definition()),
        temperature: 0.05,
        max_tokens: 4096,
    }
}

/// Turns free recipe text into a structured recipe, spending one credit.
pub struct RecipeImporter {
    ledger: Arc<dyn CreditLedger>,
    model: Arc<dyn LanguageModel>,
}

impl RecipeImporter {
    pub fn new(ledger: Arc<dyn CreditLedger>, model: Arc<dyn LanguageModel>) -> Self {
        Self { ledger, model }
    }

    pub async fn import(
        &self,
        account: &AccountId,
        recipe_text: &str,
    ) -> Result<RecipeImportOutcome, GenerationError> {
        if recipe_text.trim().is_empty() {
            return Err(GenerationError::InvalidRequest("recipe text is empty".to_string()));
        }

        let credit =
            CreditReservation::acquire(self.ledger.clone(), account, RECIPE_IMPORT_CREDIT_DESCRIPTION)
                .await?;

        match self.parse(recipe_text).await {
            Ok(recipe) => {
                info!(account = %account, recipe = %recipe.name, "recipe imported");
                Ok(RecipeImportOutcome {
                    recipe,
                    remaining_credits: credit.commit(),
                })
            }
            Err(err) => {
                let reason = err.refund_reason().unwrap_or(RefundReason::UnexpectedError);
                warn!(account = %account, code = err.code(), error = %err, "recipe import failed");
                if credit.refund(reason).await == RefundOutcome::Failed {
                    error!(target: "credit_alert", account = %account, "recipe import failed and its credit could not be refunded");
                }
                Err(err)
            }
        }
    }

    async fn parse(&self, recipe_text: &str) -> Result<FullRecipe, GenerationError> {
        let prompt = recipe_prompt(recipe_text);
        let raw = self
            .model
            .complete(&prompt)
            .await?
            .ok_or(GenerationError::NoResponse)?;
        parse_full_recipe(&raw)
    }
}
