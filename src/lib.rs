pub mod app;
pub mod cli;
pub mod config;
pub mod controller;
pub mod dom;
pub mod fetch;
pub mod model;
pub mod output;
pub mod page;
pub mod render;
pub mod server;
pub mod storage;

#[cfg(test)]
mod tests;
