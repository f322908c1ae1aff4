// Messaging module - Frame classification and routing
pub mod event;
pub mod router;

pub use event::FrameType;
pub use router::{FrameRouter, Route};
