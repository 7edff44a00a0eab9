//! Interfaces to the relational data service, plus two implementations:
//! an HTTP client for the hosted service and an in-process store.

pub mod memory;
pub mod rest;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::models::{
    AccountId, BaseRecipe, BaseRecipeFilter, HouseholdScope, MealPlanPreferences, PantryItem,
    PlanEntry, RecipeRecord,
};

pub use memory::{InMemoryDataStore, LedgerCall, StoreFixture};
pub use rest::RestDataStore;

#[derive(Debug, Error)]
pub enum DataStoreError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Data service error {status}: {body}")]
    Service { status: u16, body: String },
    #[error("Unexpected payload from data service: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Data service unavailable: {0}")]
    Unavailable(String),
}

/// Read-only access to the recipes, pantry and shared base pool a plan is built from.
#[async_trait]
pub trait RecipeRepository: Send + Sync {
    async fn list_recipes(&self, scope: &HouseholdScope) -> Result<Vec<RecipeRecord>, DataStoreError>;

    async fn list_pantry(&self, scope: &HouseholdScope) -> Result<Vec<PantryItem>, DataStoreError>;

    async fn list_base_recipes(
        &self,
        filter: &BaseRecipeFilter,
    ) -> Result<Vec<BaseRecipe>, DataStoreError>;
}

/// A finalized plan handed over for storage.
#[derive(Debug, Clone, Serialize)]
pub struct NewMealPlan {
    pub account: AccountId,
    pub week_start: NaiveDate,
    pub preferences: MealPlanPreferences,
    pub entries: Vec<PlanEntry>,
    pub servings_override: Option<u32>,
    pub home_id: Option<String>,
}

#[async_trait]
pub trait PlanStore: Send + Sync {
    /// Stores the plan in one call. `Ok(None)` means the store accepted the call but produced no id.
    async fn save_meal_plan(&self, plan: &NewMealPlan) -> Result<Option<String>, DataStoreError>;
}
