// Library root: exposes the app modules to the binary and integration tests.

pub mod app;
pub mod catalog;
pub mod config;
pub mod db;
pub mod protocol;
pub mod ws_server;
