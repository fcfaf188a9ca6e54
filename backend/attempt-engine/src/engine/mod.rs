//! Timed attempt engine: countdown, answer and flag stores, the exactly-once
//! submission coordinator, the attempt resolver, and the session event loop
//! that ties them together for one mounted attempt.

pub mod answers;
pub mod coordinator;
pub mod countdown;
pub mod flags;
pub mod resolver;
pub mod session;

pub use coordinator::{SubmissionCoordinator, Transition, Trigger};
pub use resolver::{AttemptResolver, Entry};
pub use session::{AttemptHandle, ManualSubmitOutcome, SessionSettings};
