//! IPC module for controlling the listener from other processes

mod protocol;
mod server;

pub use server::Server;
