pub mod bumpers;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod filter;
pub mod guided;
pub mod output;
pub mod scoring;
pub mod server;
pub mod shuffle;
