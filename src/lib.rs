pub mod app;
pub mod config;
pub mod error;
pub mod handlers;
pub mod response;
pub mod stream_decoder;
pub mod upstream;
