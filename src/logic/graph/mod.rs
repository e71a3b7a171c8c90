pub mod path_builder;
pub mod swap_path;
pub mod swap_path_hash;
pub mod swap_path_set;
pub mod token_graph;

pub use path_builder::find_all_paths;
pub use swap_path::SwapPath;
pub use swap_path_hash::SwapPathHash;
pub use swap_path_set::SwapPathSet;
pub use token_graph::{FastHashMap, PoolEdge, TokenGraph, TokenNode};
