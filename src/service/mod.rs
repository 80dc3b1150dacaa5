pub mod activity;
pub mod aggregator;
pub mod classifier;
pub mod context;
pub mod dashboard;
pub mod date_range;
pub mod realtime;
pub mod safe;

pub use activity::ActivityMonitor;
pub use aggregator::StatsAggregator;
pub use classifier::{StatusClassifier, SynonymTable};
pub use context::EngineContext;
pub use dashboard::{DashboardSnapshot, LiveDashboard};
pub use date_range::{Clock, DateRangeCalculator, DayZone, FixedClock, SystemClock};
pub use realtime::{
    ChangeHandler, ChangeSource, ChannelHandle, InMemoryChangeSource, RealtimeCoordinator, RecomputeScheduler,
    RecomputeTrigger, SubscriptionGuard,
};
pub use safe::safe_compute;
