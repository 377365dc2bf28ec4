//! XML Reader Module
//!
//! - SliceReader: zero-copy pull reader over a `&str`
//! - Events: XML event types carrying source offsets

pub mod events;
pub mod slice;
