//! fntally-core: verdict classification and session tallying.
//! Turns free-text harness output into a deduplicated per-function tally.
//! Pure logic with no IO; the runtime crate drives it.

pub mod classify;
pub mod error;
pub mod filter;
pub mod progress;
pub mod registry;
pub mod session;
pub mod types;

pub use classify::MessageClassifier;
pub use error::TallyError;
pub use filter::LogFilter;
pub use progress::{DEFAULT_TOTAL_EXPECTED, Progress, percentage};
pub use registry::FunctionRegistry;
pub use session::{EventSink, Session, SessionAggregator};
pub use types::{Classification, LogEntry, SessionEvent, Stats, Verdict};
