// ==========================================
// 供应商价格表同步系统 - 数据仓储层
// ==========================================
// 职责: 数据访问接口与 SQLite 实现
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

pub mod catalog_repo;
pub mod error;
pub mod price_list_repo;
pub mod price_list_repo_impl;

pub use catalog_repo::{CatalogRepository, SqliteCatalogRepository};
pub use error::{RepositoryError, RepositoryResult};
pub use price_list_repo::PriceListRepository;
pub use price_list_repo_impl::PriceListRepositoryImpl;
