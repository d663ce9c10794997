//! 数据访问层
//!
//! 服务层通过 `TransactionManager` 开启工作单元，PostgreSQL 与内存两种实现。

mod memory;
mod order_repo;
mod pg_unit_of_work;
mod promotion_repo;
mod traits;
mod user_repo;

pub use memory::{MemoryStore, MemoryUnitOfWork};
pub use order_repo::{BranchRepository, OrderRepository};
pub use pg_unit_of_work::{PgTransactionManager, PgUnitOfWork};
pub use promotion_repo::{PromotionRepository, UserPromotionRepository};
pub use traits::{TransactionManager, UnitOfWork};
pub use user_repo::{TierRepository, UserRepository};
