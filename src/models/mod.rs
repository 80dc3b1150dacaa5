pub mod activity;
pub mod event;
pub mod order;
pub mod range;
pub mod stats;
pub mod status;

pub use activity::{ActionDescriptor, ActivityItem, Severity};
pub use event::{ChangeEvent, ChangeTable, RowChange};
pub use order::{OrderItemRecord, OrderRecord};
pub use range::DateRange;
pub use stats::{CustomersStats, OrdersStats, PopularItem, SalesStats, StatsSnapshot};
pub use status::CanonicalStatus;
