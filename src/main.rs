use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use meal_planner::api_connection::LanguageModel;
use meal_planner::cli::{parse_args, Cli, Command};
use meal_planner::credits::CreditLedger;
use meal_planner::data_store::{InMemoryDataStore, PlanStore, RecipeRepository, StoreFixture};
use meal_planner::error::GenerationError;
use meal_planner::models::{AccountId, MealPlanPreferences, MealPlanRequest};
use meal_planner::orchestrator::MealPlanService;
use meal_planner::recipe_import::RecipeImporter;

/// The three data-service seams, backed by one store.
struct Backend {
    ledger: Arc<dyn CreditLedger>,
    recipes: Arc<dyn RecipeRepository>,
    plans: Arc<dyn PlanStore>,
}

impl Backend {
    fn from_store<S>(store: Arc<S>) -> Self
    where
        S: CreditLedger + RecipeRepository + PlanStore + 'static,
    {
        Self {
            ledger: store.clone(),
            recipes: store.clone(),
            plans: store,
        }
    }

    async fn connect(cli: &Cli) -> Result<Self> {
        match &cli.fixture {
            Some(path) => {
                let fixture: StoreFixture = read_json(path).await?;
                info!(fixture = %path.display(), "using in-memory data store");
                Ok(Self::from_store(Arc::new(InMemoryDataStore::from_fixture(fixture))))
            }
            None => {
                let store = cli
                    .config
                    .rest_data_store()
                    .context("Data service is not configured")?;
                Ok(Self::from_store(Arc::new(store)))
            }
        }
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse JSON from: {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Prints the error in the shape an HTTP caller would see, then exits non-zero.
fn exit_with(err: GenerationError) -> ! {
    error!(code = err.code(), status = err.http_status(), "{}", err);
    let body = json!({
        "error": err.code(),
        "status": err.http_status(),
        "message": err.to_string(),
    });
    eprintln!("{}", body);
    std::process::exit(1)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = parse_args();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("meal_planner={},info", cli.config.log_level).into()),
        )
        .with(fmt::layer())
        .init();

    cli.config.validate().context("Invalid configuration")?;
    let model: Arc<dyn LanguageModel> = Arc::new(cli.config.language_model());
    let backend = Backend::connect(&cli).await?;

    match &cli.command {
        Command::Plan {
            account,
            week_start,
            preferences,
            home,
        } => {
            let preferences = match preferences {
                Some(path) => read_json::<MealPlanPreferences>(path).await?,
                None => MealPlanPreferences::default(),
            };
            let request = MealPlanRequest {
                account: AccountId::new(account.clone()),
                home_id: home.clone(),
                week_start: *week_start,
                preferences,
            };
            let service = MealPlanService::new(backend.ledger, backend.recipes, backend.plans, model);
            match service.generate(request).await {
                Ok(outcome) => print_json(&outcome)?,
                Err(err) => exit_with(err),
            }
        }
        Command::ImportRecipe {
            account,
            recipe_file,
        } => {
            let text = fs::read_to_string(recipe_file)
                .await
                .with_context(|| format!("Failed to read recipe file: {}", recipe_file.display()))?;
            let importer = RecipeImporter::new(backend.ledger, model);
            match importer.import(&AccountId::new(account.clone()), &text).await {
                Ok(outcome) => print_json(&outcome)?,
                Err(err) => exit_with(err),
            }
        }
    }

    Ok(())
}
