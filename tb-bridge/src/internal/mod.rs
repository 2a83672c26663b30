//! Internal implementation details.
//!
//! Connection setup and frame I/O shared by the stream transport and the test
//! server. Not part of the public API.

pub(crate) mod connection;
