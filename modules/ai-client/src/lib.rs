pub mod backend;
pub mod types;

pub use backend::{CompletionBackend, HttpBackend};
pub use types::{ChatMessage, ChatRequest, ChatResponse, ResponseFormat};
