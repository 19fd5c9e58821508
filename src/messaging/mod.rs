// Messaging module - event registry, message routing and wire shapes
pub mod message;
pub mod registry;
pub mod router;

pub use message::{
    ClientAction, FlagSubmittedFrame, IncomingNotification, NotificationFrame, PresenceFrame,
    TeamStatus, TeamStatusFrame,
};
pub use registry::{EventRegistry, HandlerId};
pub use router::MessageRouter;
