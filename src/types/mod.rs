// Public modules
pub mod chat_request;
pub mod message;
pub mod stream_delta;

// Re-exports
pub use chat_request::ChatRequest;
pub use message::{Message, MessageRole};
pub use stream_delta::StreamDelta;
