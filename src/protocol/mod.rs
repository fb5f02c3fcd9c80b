//! RESP Protocol Module
//!
//! Frame types and a tokio-util codec for talking RESP2 to the backing store.

mod codec;
mod frame;

pub use codec::{ProtocolError, RespCodec, MAX_BULK_LEN, MAX_DEPTH};
pub use frame::Frame;
