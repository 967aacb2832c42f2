pub mod config;
pub mod logging;

pub mod api;
pub mod error;
pub mod fetch;
pub mod job;
pub mod normalize;
pub mod pipeline;
pub mod poll;
pub mod storage;
pub mod transport;
