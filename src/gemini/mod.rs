mod client;
mod core;

pub use client::{AssetKind, GeneratedAsset, GeminiClient};
pub use self::core::{
    Candidate, Content, GenerateContentResponse, InlineData, Operation, OperationError, Part,
    Role, download, generate_content, get_operation, predict_long_running,
};
