mod session;
mod spawn_config;

pub use session::{PtySession, ReadEvent, SessionState, DEFAULT_TIMEOUT};
pub use spawn_config::SpawnConfig;
