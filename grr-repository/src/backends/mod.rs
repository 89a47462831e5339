pub mod dir;
pub mod http;
pub mod inmemory;
