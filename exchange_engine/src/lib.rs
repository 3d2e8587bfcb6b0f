//! Transport-agnostic engine for credential issuance and proof presentation
//! exchanges.
//!
//! The engine keeps one [`records`] record per exchange thread, drives it
//! through the pure transition tables in [`protocols::machine`], and builds
//! and parses the wire messages of both protocol versions through the
//! per-version services under [`protocols`]. [`dispatch::Dispatcher`] ties it
//! together: it is the single ingress for inbound wire messages and the
//! surface callers accept, decline and initiate exchanges through. Delivery
//! is delegated to the caller's [`transport::OutboundSender`]; payload
//! encodings are pluggable through [`formats`].

pub mod autoaccept;
pub mod dispatch;
pub mod errors;
pub mod events;
pub mod formats;
pub mod protocols;
pub mod records;
pub mod storage;
pub mod transport;
pub mod utils;
