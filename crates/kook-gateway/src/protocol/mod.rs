//! Gateway protocol
//!
//! Signal envelope codec, signal and result codes, frame decompression.

mod frame;
mod payloads;
mod result_codes;
mod signal;
mod signal_codes;

pub use frame::{describe_close, frame_text, inflate};
pub use payloads::{HelloPayload, ReconnectPayload, ResumeAckPayload};
pub use result_codes::{HelloCode, ReconnectCode};
pub use signal::{ping_frame, resume_frame, Signal};
pub use signal_codes::SignalCode;
