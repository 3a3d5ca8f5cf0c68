pub mod generator;
pub mod linking;
pub mod recorder;
pub mod streak;
