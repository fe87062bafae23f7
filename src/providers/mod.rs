//! Text-generation backends.

pub mod chat_completion;
pub mod mock;
pub mod traits;

pub use chat_completion::{ChatCompletionClient, ChatCompletionConfig};
pub use mock::MockBackend;
pub use traits::{Backend, BackendChoice};
