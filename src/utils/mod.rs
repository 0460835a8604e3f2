pub mod analysis;
pub mod data;
pub mod fallback;
pub mod generation;
pub mod store;
