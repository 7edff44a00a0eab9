use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::{DataStoreError, NewMealPlan, PlanStore, RecipeRepository};
use crate::category_filter::has_category_overlap;
use crate::credits::{CreditLedger, CreditTransactionKind, DeductOutcome};
use crate::models::{AccountId, BaseRecipe, BaseRecipeFilter, HouseholdScope, PantryItem, RecipeRecord};

/// One call made against the ledger, kept in order for inspection.
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerCall {
    Deduct {
        account: AccountId,
        description: String,
        success: bool,
    },
    Credit {
        account: AccountId,
        amount: i64,
        kind: CreditTransactionKind,
        description: String,
        applied: bool,
    },
}

/// Seed data for the in-memory store, as read from a JSON fixture file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreFixture {
    #[serde(default)]
    pub credits: HashMap<String, i64>,
    #[serde(default)]
    pub recipes: Vec<RecipeRecord>,
    /// Pantry contents keyed by home id, or by account id for users without a home.
    #[serde(default)]
    pub pantry: HashMap<String, Vec<PantryItem>>,
    #[serde(default)]
    pub base_recipes: Vec<BaseRecipe>,
}

#[derive(Default)]
struct StoreState {
    balances: HashMap<AccountId, i64>,
    recipes: Vec<RecipeRecord>,
    pantry: HashMap<String, Vec<PantryItem>>,
    base_recipes: Vec<BaseRecipe>,
    plans: Vec<(String, NewMealPlan)>,
    ledger_calls: Vec<LedgerCall>,
    fail_refunds: bool,
    fail_reads: bool,
    save_returns_no_id: bool,
}

/// Single-process stand-in for the data service. Every operation runs under one lock,
/// so deduction is atomic the same way the hosted ledger's is.
#[derive(Default)]
pub struct InMemoryDataStore {
    state: Mutex<StoreState>,
}

impl InMemoryDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fixture(fixture: StoreFixture) -> Self {
        let store = Self::new();
        {
            let mut state = store.lock();
            state.balances = fixture
                .credits
                .into_iter()
                .map(|(account, balance)| (AccountId(account), balance))
                .collect();
            state.recipes = fixture.recipes;
            state.pantry = fixture.pantry;
            state.base_recipes = fixture.base_recipes;
        }
        store
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        // A panic while holding the lock leaves plain data behind; keep serving it.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_balance(&self, account: &AccountId, balance: i64) {
        self.lock().balances.insert(account.clone(), balance);
    }

    pub fn balance(&self, account: &AccountId) -> i64 {
        self.lock().balances.get(account).copied().unwrap_or(0)
    }

    pub fn add_recipe(&self, recipe: RecipeRecord) {
        self.lock().recipes.push(recipe);
    }

    pub fn add_base_recipe(&self, recipe: BaseRecipe) {
        self.lock().base_recipes.push(recipe);
    }

    pub fn set_pantry(&self, key: &str, items: Vec<PantryItem>) {
        self.lock().pantry.insert(key.to_string(), items);
    }

    pub fn fail_refunds(&self, fail: bool) {
        self.lock().fail_refunds = fail;
    }

    pub fn fail_reads(&self, fail: bool) {
        self.lock().fail_reads = fail;
    }

    pub fn save_returns_no_id(&self, enabled: bool) {
        self.lock().save_returns_no_id = enabled;
    }

    pub fn ledger_calls(&self) -> Vec<LedgerCall> {
        self.lock().ledger_calls.clone()
    }

    pub fn deduct_count(&self, account: &AccountId) -> usize {
        self.lock()
            .ledger_calls
            .iter()
            .filter(|call| matches!(call, LedgerCall::Deduct { account: a, success: true, .. } if a == account))
            .count()
    }

    /// Refund attempts for `account`, whether or not the ledger applied them.
    pub fn refund_count(&self, account: &AccountId) -> usize {
        self.lock()
            .ledger_calls
            .iter()
            .filter(|call| {
                matches!(
                    call,
                    LedgerCall::Credit { account: a, kind: CreditTransactionKind::Refund, .. } if a == account
                )
            })
            .count()
    }

    pub fn saved_plans(&self) -> Vec<(String, NewMealPlan)> {
        self.lock().plans.clone()
    }

    fn check_reads(&self) -> Result<(), DataStoreError> {
        if self.lock().fail_reads {
            return Err(DataStoreError::Unavailable("reads disabled".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CreditLedger for InMemoryDataStore {
    async fn deduct_credit(
        &self,
        account: &AccountId,
        description: &str,
    ) -> Result<DeductOutcome, DataStoreError> {
        let mut state = self.lock();
        let balance = state.balances.get(account).copied().unwrap_or(0);
        let outcome = if balance >= crate::credits::CREDIT_COST {
            let remaining = balance - crate::credits::CREDIT_COST;
            state.balances.insert(account.clone(), remaining);
            DeductOutcome {
                success: true,
                remaining_balance: remaining,
            }
        } else {
            DeductOutcome {
                success: false,
                remaining_balance: balance,
            }
        };
        state.ledger_calls.push(LedgerCall::Deduct {
            account: account.clone(),
            description: description.to_string(),
            success: outcome.success,
        });
        Ok(outcome)
    }

    async fn add_credits(
        &self,
        account: &AccountId,
        amount: i64,
        kind: CreditTransactionKind,
        description: &str,
    ) -> Result<(), DataStoreError> {
        let mut state = self.lock();
        let applied = !(state.fail_refunds && kind == CreditTransactionKind::Refund);
        state.ledger_calls.push(LedgerCall::Credit {
            account: account.clone(),
            amount,
            kind,
            description: description.to_string(),
            applied,
        });
        if !applied {
            return Err(DataStoreError::Unavailable("refunds disabled".to_string()));
        }
        *state.balances.entry(account.clone()).or_insert(0) += amount;
        Ok(())
    }
}

#[async_trait]
impl RecipeRepository for InMemoryDataStore {
    async fn list_recipes(&self, scope: &HouseholdScope) -> Result<Vec<RecipeRecord>, DataStoreError> {
        self.check_reads()?;
        let state = self.lock();
        let recipes = state
            .recipes
            .iter()
            .filter(|recipe| match &scope.home_id {
                Some(home) => recipe.home_id.as_deref() == Some(home.as_str()),
                None => recipe.owner_id.as_deref() == Some(scope.account.as_str()),
            })
            .cloned()
            .collect();
        Ok(recipes)
    }

    async fn list_pantry(&self, scope: &HouseholdScope) -> Result<Vec<PantryItem>, DataStoreError> {
        self.check_reads()?;
        let key = scope.home_id.as_deref().unwrap_or(scope.account.as_str());
        Ok(self.lock().pantry.get(key).cloned().unwrap_or_default())
    }

    async fn list_base_recipes(
        &self,
        filter: &BaseRecipeFilter,
    ) -> Result<Vec<BaseRecipe>, DataStoreError> {
        self.check_reads()?;
        let state = self.lock();
        let recipes = state
            .base_recipes
            .iter()
            .filter(|recipe| {
                filter.diet_types.is_empty() || has_category_overlap(&recipe.diet_types, &filter.diet_types)
            })
            .filter(|recipe| {
                filter.categories.is_empty() || has_category_overlap(&recipe.categories, &filter.categories)
            })
            .cloned()
            .collect();
        Ok(recipes)
    }
}

#[async_trait]
impl PlanStore for InMemoryDataStore {
    async fn save_meal_plan(&self, plan: &NewMealPlan) -> Result<Option<String>, DataStoreError> {
        let mut state = self.lock();
        if state.save_returns_no_id {
            return Ok(None);
        }
        let plan_id = format!("plan-{}", state.plans.len() + 1);
        state.plans.push((plan_id.clone(), plan.clone()));
        Ok(Some(plan_id))
    }
}
