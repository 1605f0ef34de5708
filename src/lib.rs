pub mod assist;
pub mod domain;
pub mod engine;
pub mod error;
pub mod history;
pub mod logger;
