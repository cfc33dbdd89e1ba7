pub mod context;
pub mod prompt;
pub mod session;

pub use context::{SessionContext, SessionId};
pub use prompt::{Prompter, WatchSource};
pub use session::{Session, SessionOutcome, SessionReport};
