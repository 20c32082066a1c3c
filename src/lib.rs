pub mod config;
pub mod engine;
pub mod errors;
pub mod function;
pub mod handlers;
pub mod metadata;
pub mod scope;
pub mod value;

// Re-export the host-facing surface
pub use config::RuntimeConfig;
pub use engine::{bind, Engine};
pub use errors::{ParseError, RuntimeError};
pub use handlers::HandlerSet;
pub use metadata::ScriptMeta;
pub use value::{from_native, to_native, Value};
