// ==========================================
// 供应商价格表同步系统 - 配置层
// ==========================================
// 职责: 解析语法配置（调用方传入）与运行参数（config_kv 表）
// ==========================================

pub mod parse_config;
pub mod settings;

pub use parse_config::{
    ColumnMapping, FixedWidthColumn, ParseConfig, TransformSpec, DEFAULT_DELIMITER,
    FIELD_COST_PRICE, FIELD_CURRENCY_CODE, FIELD_DESCRIPTION, FIELD_LEAD_TIME_DAYS,
    FIELD_QUANTITY, FIELD_SUPPLIER_SKU, FIELD_VARIANT_SKU,
};
pub use settings::SyncSettings;
