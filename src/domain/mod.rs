pub mod baseline;
pub mod collector;
pub mod drift;
pub mod normalize;
pub mod process;
pub mod recommend;
pub mod rules;
pub mod scoring;
pub mod snapshot;
