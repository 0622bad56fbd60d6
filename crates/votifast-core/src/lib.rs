pub mod config;
pub mod logging;

pub mod endpoints;
pub mod error;
pub mod http;
pub mod job;
pub mod license;
pub mod media_ref;
pub mod metadata;
pub mod otp;
pub mod pipeline;
pub mod queue;
pub mod session;
pub mod storage;
pub mod worker;
