pub mod completion;
pub mod http;
pub mod retrieval;

pub use completion::{
    ChatMessage, ChatRole, CompletionClient, CompletionError, CompletionOptions,
};
pub use http::{HttpCompletionClient, HttpRetrievalClient};
pub use retrieval::{RetrievalClient, RetrievalError, RetrievalOptions, SourceHit};
