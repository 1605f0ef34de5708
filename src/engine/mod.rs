pub mod benchmark;
pub mod builder;
pub mod http;
pub mod script;
