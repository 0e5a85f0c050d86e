/// HTTP request handlers
pub mod posts;

pub use posts::*;
