/// HTTP transport with retries and line streaming - Gateway
mod client;
mod lines;
mod retry;

pub use client::HttpTransport;
pub use retry::RetryPolicy;
