//! The credit-gated meal plan job.
//!
//! admission -> candidate reads -> model call -> validation -> resolution ->
//! enrichment -> persistence. Every failure after admission is compensated by
//! exactly one refund before the error is returned.

use std::sync::Arc;
use tracing::{error, info, warn};

use crate::api_connection::LanguageModel;
use crate::candidates::{load_candidates, CandidateSet};
use crate::credits::{CreditLedger, CreditReservation, RefundOutcome, RefundReason};
use crate::data_store::{NewMealPlan, PlanStore, RecipeRepository};
use crate::enricher::enrich_entries;
use crate::error::GenerationError;
use crate::meal_plan_generator::generate_meal_plan;
use crate::models::{HouseholdScope, MealPlanOutcome, MealPlanRequest};
use crate::plan_resolver::resolve_entries;
use crate::response_validator::parse_meal_plan;

pub const MEAL_PLAN_CREDIT_DESCRIPTION: &str = "AI meal plan generation";

/// Per-request state. Lives only for the duration of one generation.
struct GenerationJob {
    request: MealPlanRequest,
    credit: CreditReservation,
}

pub struct MealPlanService {
    ledger: Arc<dyn CreditLedger>,
    recipes: Arc<dyn RecipeRepository>,
    plans: Arc<dyn PlanStore>,
    model: Arc<dyn LanguageModel>,
}

impl MealPlanService {
    pub fn new(
        ledger: Arc<dyn CreditLedger>,
        recipes: Arc<dyn RecipeRepository>,
        plans: Arc<dyn PlanStore>,
        model: Arc<dyn LanguageModel>,
    ) -> Self {
        Self {
            ledger,
            recipes,
            plans,
            model,
        }
    }

    pub async fn generate(&self, request: MealPlanRequest) -> Result<MealPlanOutcome, GenerationError> {
        info!(
            account = %request.account,
            week_start = %request.week_start,
            home = ?request.home_id,
            "meal plan generation requested"
        );

        let credit = CreditReservation::acquire(
            self.ledger.clone(),
            &request.account,
            MEAL_PLAN_CREDIT_DESCRIPTION,
        )
        .await?;
        let job = GenerationJob { request, credit };

        match self.run(&job.request).await {
            Ok(mut outcome) => {
                outcome.remaining_credits = job.credit.commit();
                info!(
                    account = %job.request.account,
                    plan_id = %outcome.plan_id,
                    entries = outcome.entries.len(),
                    "meal plan generated"
                );
                Ok(outcome)
            }
            Err(err) => {
                let reason = err.refund_reason().unwrap_or(RefundReason::UnexpectedError);
                warn!(account = %job.request.account, code = err.code(), error = %err, "meal plan generation failed");
                if job.credit.refund(reason).await == RefundOutcome::Failed {
                    error!(
                        target: "credit_alert",
                        account = %job.request.account,
                        code = err.code(),
                        "meal plan failed and its credit could not be refunded"
                    );
                }
                Err(err)
            }
        }
    }

    async fn run(&self, request: &MealPlanRequest) -> Result<MealPlanOutcome, GenerationError> {
        let preferences = &request.preferences;
        let scope = HouseholdScope {
            account: request.account.clone(),
            home_id: request.home_id.clone(),
        };

        let candidates: CandidateSet =
            load_candidates(self.recipes.as_ref(), &scope, preferences).await?;

        let raw = generate_meal_plan(self.model.as_ref(), preferences, &candidates).await?;
        let validated = parse_meal_plan(
            &raw,
            &preferences.effective_meal_types(),
            &preferences.effective_days(),
        )?;
        let proposed = validated.entries.len();

        let entries = resolve_entries(
            validated.entries,
            &candidates.all_recipes,
            &candidates.base_recipes,
        );
        if entries.len() < proposed {
            info!(proposed, kept = entries.len(), "dropped duplicate plan slots");
        }
        let enriched = enrich_entries(entries, &candidates.all_recipes);

        let plan = NewMealPlan {
            account: request.account.clone(),
            week_start: request.week_start,
            preferences: preferences.clone(),
            entries: enriched.iter().map(|e| e.entry.clone()).collect(),
            servings_override: preferences.servings,
            home_id: request.home_id.clone(),
        };
        let plan_id = self
            .plans
            .save_meal_plan(&plan)
            .await?
            .ok_or(GenerationError::PersistenceFailure)?;

        Ok(MealPlanOutcome {
            plan_id,
            entries: enriched,
            summary: validated.summary,
            remaining_credits: 0,
        })
    }
}
