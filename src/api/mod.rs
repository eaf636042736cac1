// ==========================================
// 供应商价格表同步系统 - API 层
// ==========================================
// 职责: 面向外围系统的业务接口
// ==========================================

pub mod error;
pub mod price_list_api;

pub use error::{ApiError, ApiResult};
pub use price_list_api::PriceListApi;
