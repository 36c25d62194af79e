pub mod config;
pub mod error;
pub mod hashing;
pub mod text;
pub mod types;

pub use config::Config;
pub use error::TahrirError;
pub use hashing::*;
pub use text::*;
pub use types::*;
