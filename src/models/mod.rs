pub mod providers;
pub mod stats;
