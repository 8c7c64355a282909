pub mod actors;
pub mod card;
pub mod chart;
pub mod enrichment;
pub mod error;
pub mod format;
pub mod github;
pub mod query;
pub mod server;
pub mod suggest;
pub mod types;
