pub mod connection;
pub mod endpoints;
pub mod model;

pub use connection::ApiConnectionError;
pub use endpoints::{JsonSchema, JsonSchemaDefinition, Provider};
pub use model::{LanguageModel, ModelPrompt, OpenRouterModel};
