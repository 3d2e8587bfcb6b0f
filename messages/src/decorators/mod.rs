pub mod attachment;
pub mod please_ack;
pub mod service;
pub mod thread;
pub mod timing;
