pub mod compatible;
pub mod factory;
pub mod http_client;
pub mod scrub;
pub mod traits;

pub use compatible::OpenAiCompatibleProvider;
pub use factory::{create_provider, resolve_api_key};
pub use scrub::{sanitize_api_error, scrub_secret_patterns};
pub use traits::{CompletionMessage, CompletionProvider};
