pub mod actor;
pub mod messages;

pub use actor::{BackendActor, BackendComponents, DOWNLOAD_TIMEOUT};
pub use messages::{BackendCommand, BackendEvent};
