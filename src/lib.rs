pub mod aggregate;
pub mod cli;
pub mod enumerate;
pub mod error;
pub mod generate;
pub mod model;
pub mod pipeline;
pub mod profile;
pub mod report;
pub mod runner;
pub mod workspace;
