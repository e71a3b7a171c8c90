pub mod amounts;
pub mod config_loader;
pub mod constants;
pub mod token;

pub use amounts::{close_values, f64_to_u256, u256_to_f64};
pub use config_loader::*;
pub use constants::*;
pub use token::Token;
