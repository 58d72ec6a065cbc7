mod routes;
pub mod utils;

pub use utils::*;
