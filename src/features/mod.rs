pub mod generate;
pub mod usage;
