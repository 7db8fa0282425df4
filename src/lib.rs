pub mod cli;
pub mod client;
pub mod config;
pub mod errors;
pub mod indicators;
pub mod lookup;
pub mod models;
pub mod selection;
pub mod session;
pub mod storage;
pub mod utils;
