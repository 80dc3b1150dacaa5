pub mod listener;
pub mod memory;
pub mod pg;
pub mod pool;
pub mod queries;
pub mod repository;

pub use listener::PgChangeSource;
pub use memory::MemoryOrderRepository;
pub use pg::{PgOrderRepository, PgOrderWriter};
pub use pool::create_pool;
pub use repository::{with_deadline, OrderQuery, OrderRepository, OrderWriter, StatusFilter};
