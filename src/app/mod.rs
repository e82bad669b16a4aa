pub mod analysis;
pub mod output;
pub mod pipelines;
