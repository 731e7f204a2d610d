//! # Session
//!
//! World session management: simulator connection, the [`Session`]
//! aggregate, town/weather cursors and the ordered teardown-and-respawn of a
//! reload.
//!
//! ```ignore
//! let mut manager = SessionManager::connect(client, blueprint, options).await?;
//! manager.load_session().await?;
//! let sample = manager.tick(control).await?;
//! manager.advance_town().await?;
//! manager.shutdown().await;
//! ```

mod cursor;
mod error;
mod manager;
mod session;

pub use cursor::{next_index, Cursor};
pub use error::{Result, SessionError, Severity};
pub use manager::{SessionManager, SessionOptions, TickSample};
pub use session::{Session, SessionSummary, TrafficReport};

