//! Live execution statistics
//!
//! # Architecture
//!
//! ```text
//! Browser <-- SSE body <-- mpsc <-- feed task --> StatsProvider (Redis)
//!                 |                     ^
//!                 +-- drop guard -------+ (cancellation on disconnect)
//! ```

pub mod feed;
pub mod provider;
pub mod streaming;

pub use feed::{run_feed, AdaptiveInterval, FeedMessage, FeedOutcome};
pub use provider::{RedisStatsProvider, StatsError, StatsProvider};
pub use streaming::{spawn_feed, sse_headers, FeedEventStream};
