pub mod auth;
pub mod config;
pub mod content;
pub mod error;
pub mod event;
pub mod message;
pub mod session;


pub use error::{ErrorKind, TutorError};
pub type Result<T> = std::result::Result<T, TutorError>;
