//! Seams shared across crates.

pub mod cancellation;
pub mod clock;
pub mod notify;
pub mod retry;

pub use cancellation::{Cancellable, CancellationToken};
pub use clock::{Clock, ManualClock, SystemClock};
pub use notify::{Notification, NotificationSink};
pub use retry::{with_backoff, RetryPolicy};
