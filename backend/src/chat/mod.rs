//! Real-time chat: one room per video, backlog on join, persist-then-broadcast.

pub mod protocol;
pub mod registry;
pub mod relay;
pub mod socket;

pub use protocol::{ClientCommand, ServerEvent};
pub use registry::{ConnectionId, RoomRegistry};
pub use relay::{ChatRelay, RelayError};
