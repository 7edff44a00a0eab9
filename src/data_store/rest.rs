use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::debug;

use super::{DataStoreError, NewMealPlan, PlanStore, RecipeRepository};
use crate::credits::{CreditLedger, CreditTransactionKind, DeductOutcome};
use crate::models::{AccountId, BaseRecipe, BaseRecipeFilter, HouseholdScope, PantryItem, RecipeRecord};

const RECIPE_COLUMNS: &str =
    "id,name,description,image_url,thumbnail_url,categories,prep_time,cook_time,yield,owner_id,home_id";
const PANTRY_COLUMNS: &str = "name,quantity,unit";

/// Client for the hosted relational data service (PostgREST-style REST + RPC).
///
/// Requests carry the project key and the signed-in user's token, so row-level
/// security scopes every read and RPC to that user.
#[derive(Clone)]
pub struct RestDataStore {
    client: Client,
    base_url: String,
    api_key: String,
    access_token: String,
}

/// `{a,b}` array literal for `ov.` (overlaps) filters.
fn array_literal(values: &[String]) -> String {
    let quoted: Vec<String> = values
        .iter()
        .map(|v| format!("\"{}\"", v.replace('"', "")))
        .collect();
    format!("{{{}}}", quoted.join(","))
}

impl RestDataStore {
    pub fn new(base_url: &str, api_key: &str, access_token: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            access_token: access_token.to_string(),
        }
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.api_key)
            .bearer_auth(&self.access_token)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Value, DataStoreError> {
        let response = self.authorized(builder).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(DataStoreError::Service {
                status: status.as_u16(),
                body,
            });
        }
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }

    async fn rpc<T: DeserializeOwned>(&self, function: &str, args: Value) -> Result<T, DataStoreError> {
        let url = format!("{}/rest/v1/rpc/{}", self.base_url, function);
        debug!(function, "calling data service rpc");
        let value = self.send(self.client.post(url).json(&args)).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, DataStoreError> {
        let url = format!("{}/rest/v1/{}", self.base_url, table);
        debug!(table, "reading from data service");
        let value = self.send(self.client.get(url).query(query)).await?;
        if value.is_null() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_value(value)?)
    }

    fn scope_filter(scope: &HouseholdScope, owner_column: &str) -> (String, String) {
        match &scope.home_id {
            Some(home) => ("home_id".to_string(), format!("eq.{}", home)),
            None => (owner_column.to_string(), format!("eq.{}", scope.account)),
        }
    }
}

#[async_trait]
impl CreditLedger for RestDataStore {
    async fn deduct_credit(
        &self,
        account: &AccountId,
        description: &str,
    ) -> Result<DeductOutcome, DataStoreError> {
        debug!(account = %account, "deducting credit");
        self.rpc("deduct_credit", json!({ "p_description": description }))
            .await
    }

    async fn add_credits(
        &self,
        account: &AccountId,
        amount: i64,
        kind: CreditTransactionKind,
        description: &str,
    ) -> Result<(), DataStoreError> {
        let _: Value = self
            .rpc(
                "add_credits",
                json!({
                    "p_user_id": account,
                    "p_amount": amount,
                    "p_transaction_type": kind.as_str(),
                    "p_description": description,
                }),
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl RecipeRepository for RestDataStore {
    async fn list_recipes(&self, scope: &HouseholdScope) -> Result<Vec<RecipeRecord>, DataStoreError> {
        let (column, filter) = Self::scope_filter(scope, "owner_id");
        self.select(
            "recipes",
            &[
                ("select", RECIPE_COLUMNS.to_string()),
                (column.as_str(), filter),
                ("order", "name.asc".to_string()),
            ],
        )
        .await
    }

    async fn list_pantry(&self, scope: &HouseholdScope) -> Result<Vec<PantryItem>, DataStoreError> {
        let (column, filter) = Self::scope_filter(scope, "user_id");
        self.select(
            "pantry_items",
            &[("select", PANTRY_COLUMNS.to_string()), (column.as_str(), filter)],
        )
        .await
    }

    async fn list_base_recipes(
        &self,
        filter: &BaseRecipeFilter,
    ) -> Result<Vec<BaseRecipe>, DataStoreError> {
        let mut query = vec![("select", "*".to_string())];
        if !filter.diet_types.is_empty() {
            query.push(("diet_types", format!("ov.{}", array_literal(&filter.diet_types))));
        }
        if !filter.categories.is_empty() {
            query.push(("categories", format!("ov.{}", array_literal(&filter.categories))));
        }
        self.select("base_recipes", &query).await
    }
}

#[async_trait]
impl PlanStore for RestDataStore {
    async fn save_meal_plan(&self, plan: &NewMealPlan) -> Result<Option<String>, DataStoreError> {
        self.rpc(
            "save_meal_plan",
            json!({
                "p_week_start": plan.week_start,
                "p_preferences": plan.preferences,
                "p_entries": plan.entries,
                "p_servings": plan.servings_override,
                "p_home_id": plan.home_id,
            }),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_literal_quotes_values() {
        let literal = array_literal(&["vegan".to_string(), "gluten\"fri".to_string()]);
        assert_eq!(literal, "{\"vegan\",\"glutenfri\"}");
    }

    #[test]
    fn test_scope_filter_prefers_home() {
        let scope = HouseholdScope {
            account: AccountId::new("u1"),
            home_id: Some("h1".into()),
        };
        assert_eq!(
            RestDataStore::scope_filter(&scope, "owner_id"),
            ("home_id".to_string(), "eq.h1".to_string())
        );
    }
}
