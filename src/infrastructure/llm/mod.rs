mod nvidia;

pub use nvidia::{ChatCompletionRequest, ChatMessage, NvidiaLlm};
