//! SSE parser for the agent run stream.
//!
//! Two stages turn the upstream body into event blocks:
//!
//! ```text
//! byte chunks ──► LineDecoder ──► text lines ──► BlockParser ──► EventBlock
//! ```
//!
//! Both stages are tolerant readers: malformed payloads are wrapped rather
//! than rejected, and unrecognised lines are skipped.

mod decoder;
mod parser;
mod types;

pub use decoder::LineDecoder;
pub use parser::{BlockParser, parse_block, parse_lines};
pub use types::EventBlock;
