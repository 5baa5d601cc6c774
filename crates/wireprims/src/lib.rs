//! Binary wire framing with pluggable interceptors and pooled primitives.
//!
//! wireprims turns an application-defined message state into bytes and back
//! over any `std::io` stream, with optional length-prefixed framing and
//! ordered send/recv interceptor chains.
//!
//! # Crate Structure
//!
//! - [`codec`]: codec, interceptor pipelines, primitive reader/writer and pools
//!
//! The `cli` feature builds the `wireprims` binary for framing and unframing
//! payloads from the shell.

/// Re-export codec types.
pub mod codec {
    pub use wireprims_codec::*;
}

pub use wireprims_codec::{Codec, CodecConfig, CodecError, Reader, Writer};
