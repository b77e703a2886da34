pub mod config;

pub use config::FactsConfig;
