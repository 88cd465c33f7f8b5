pub mod body;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod latency;
pub mod metrics;
pub mod proxy;
pub mod region;
pub mod response;
pub mod server;
pub mod upstream;
pub mod validate;
