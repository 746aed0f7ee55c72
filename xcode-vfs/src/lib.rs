pub mod config;
pub mod editor;
pub mod error;
pub mod exec;
pub mod node;
pub mod persistence;
pub mod protocol;
pub mod server;
pub mod session;
pub mod shell;
pub mod transport;
pub mod tree;
