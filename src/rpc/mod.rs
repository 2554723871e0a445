//! Newline-delimited JSON transport toward the controlling frontend.
//!
//! The frontend speaks a JSON-RPC-shaped protocol without the `jsonrpc`
//! version tag: one JSON value per `\n`-terminated line in each direction.
//!
//! - `codec`: [`LinesCodec`](tokio_util::codec::LinesCodec)-based framing.
//! - `message`: frame classification (request / notification / response).
//! - `outbound`: the shared handle every component uses to emit frames, plus
//!   the pending table for requests this side issues.
//! - `reader`: inbound loop feeding the router.
//! - `writer`: single task serialising outbound frames.

pub mod codec;
pub mod message;
pub mod outbound;
pub mod reader;
pub mod writer;
