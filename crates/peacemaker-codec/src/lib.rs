//! Wire codec for the runtime boundary.
//!
//! - Inbound: `{ "Id": string, "Request": string }`, where `Request` is itself
//!   a JSON string specific to the operation (`OnLogin`, `OnLogout`,
//!   `OnQuery`, `OnExecute`).
//! - Outbound: `{ "Id": string, "Response": string, "Error": string }`.

pub mod decode;
pub mod encode;
mod wire;

pub use decode::{decode_envelope, decode_event, decode_kind, decode_operation};
pub use encode::{decode_response, encode_request, encode_response, login_response, query_response};
