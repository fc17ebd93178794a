pub mod index;
pub mod stats;
