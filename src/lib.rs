pub mod config;
pub mod console;
pub mod convert;
pub mod error;
pub mod event;
pub mod execution;
pub mod highlight;
pub mod input;
pub mod parser;
pub mod shell;
