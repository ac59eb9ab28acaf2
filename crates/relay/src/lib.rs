//! # reqforge relay
//!
//! Sends HTTP requests composed in the browser to arbitrary targets, sidestepping CORS, and
//! reports transport failures with a small fixed taxonomy (`host_not_found`,
//! `connection_refused`, `timeout`, `request_failed`).
//!
//! Also parses raw HTTP request text and substitutes payloads at injection points, so a request
//! copied from devtools can be replayed with each generated payload.

mod client;
mod error;
mod inject;
mod raw;

pub use client::{Relay, RelayConfig};
pub use error::{RelayError, Result};
pub use inject::{inject, Location};
pub use raw::{parse_raw_request, render_raw_request};
