use tracing::debug;

use crate::category_filter::filter_by_categories;
use crate::data_store::{DataStoreError, RecipeRepository};
use crate::models::{
    BaseRecipe, BaseRecipeFilter, CompactRecipe, HouseholdScope, MealPlanPreferences, PantryItem,
};

/// Everything a generation job reads before calling the model.
#[derive(Debug, Clone, Default)]
pub struct CandidateSet {
    /// All of the user's recipes. This is the id universe references are checked against.
    pub all_recipes: Vec<CompactRecipe>,
    /// The recipes offered to the model, after category filtering.
    pub candidates: Vec<CompactRecipe>,
    pub base_recipes: Vec<BaseRecipe>,
    pub pantry: Vec<PantryItem>,
}

impl CandidateSet {
    pub fn available_recipe_count(&self) -> usize {
        self.candidates.len() + self.base_recipes.len()
    }
}

/// Reads recipes, pantry and the base pool concurrently and projects them for the job.
pub async fn load_candidates(
    repository: &dyn RecipeRepository,
    scope: &HouseholdScope,
    preferences: &MealPlanPreferences,
) -> Result<CandidateSet, DataStoreError> {
    let base_filter = BaseRecipeFilter {
        diet_types: preferences.diet_types.clone(),
        categories: preferences.categories.clone(),
    };

    let pantry_read = async {
        if preferences.use_pantry {
            repository.list_pantry(scope).await
        } else {
            Ok(Vec::new())
        }
    };

    let (records, pantry, base_recipes) = tokio::try_join!(
        repository.list_recipes(scope),
        pantry_read,
        repository.list_base_recipes(&base_filter),
    )?;

    let all_recipes: Vec<CompactRecipe> = records.into_iter().map(CompactRecipe::from).collect();
    let candidates = filter_by_categories(all_recipes.clone(), &preferences.categories);
    debug!(
        recipes = all_recipes.len(),
        candidates = candidates.len(),
        base = base_recipes.len(),
        pantry = pantry.len(),
        "candidates loaded"
    );

    Ok(CandidateSet {
        all_recipes,
        candidates,
        base_recipes,
        pantry,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_store::InMemoryDataStore;
    use crate::models::{AccountId, RecipeRecord};

    fn store() -> InMemoryDataStore {
        let store = InMemoryDataStore::new();
        for i in 0..6 {
            store.add_recipe(RecipeRecord {
                id: format!("r{}", i),
                name: format!("Gryta {}", i),
                description: Some("lång beskrivning som inte ska med".into()),
                categories: vec!["Huvudrätt".into()],
                owner_id: Some("u1".into()),
                ..Default::default()
            });
        }
        store.add_recipe(RecipeRecord {
            id: "s1".into(),
            name: "Tomatsoppa".into(),
            categories: vec!["Soppa".into()],
            owner_id: Some("u1".into()),
            ..Default::default()
        });
        store.set_pantry("u1", vec![PantryItem { name: "ris".into(), quantity: None, unit: None }]);
        store
    }

    fn scope() -> HouseholdScope {
        HouseholdScope {
            account: AccountId::new("u1"),
            home_id: None,
        }
    }

    #[tokio::test]
    async fn test_category_filter_applies_to_candidates_only() {
        let store = store();
        let prefs = MealPlanPreferences {
            categories: vec!["huvudrätt".into()],
            ..Default::default()
        };
        let set = load_candidates(&store, &scope(), &prefs).await.unwrap();
        assert_eq!(set.all_recipes.len(), 7);
        assert_eq!(set.candidates.len(), 6);
        assert!(set.all_recipes.iter().any(|r| r.id == "s1"));
    }

    #[tokio::test]
    async fn test_pantry_only_read_when_requested() {
        let store = store();
        let mut prefs = MealPlanPreferences::default();
        assert!(load_candidates(&store, &scope(), &prefs).await.unwrap().pantry.is_empty());

        prefs.use_pantry = true;
        assert_eq!(load_candidates(&store, &scope(), &prefs).await.unwrap().pantry.len(), 1);
    }

    #[tokio::test]
    async fn test_read_failure_propagates() {
        let store = store();
        store.fail_reads(true);
        let result = load_candidates(&store, &scope(), &MealPlanPreferences::default()).await;
        assert!(matches!(result, Err(DataStoreError::Unavailable(_))));
    }
}
