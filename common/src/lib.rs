pub mod challenge;
pub mod config;
pub mod messages;
pub mod models;
pub mod utils;

pub use self::challenge::*;
pub use self::config::*;
pub use self::messages::*;
pub use self::utils::*;
