pub mod db;
pub mod ollama_llm;
pub mod openai_llm;
pub mod session_store;

pub use db::DbAdapter;
pub use ollama_llm::OllamaChatAdapter;
pub use openai_llm::OpenAiChatAdapter;
pub use session_store::InMemorySessionStore;
