// ==========================================
// 供应商价格表同步系统 - 导入层
// ==========================================
// 职责: 供应商价格文件 → 结构化价格表记录
// 支持: 分隔符文本、定宽列文本
// ==========================================

// 模块声明
pub mod error;
pub mod field_mapper;
pub mod line_parser;
pub mod preview;
pub mod price_list_importer_impl;
pub mod price_list_importer_trait;
pub mod transformer;

// 重导出核心类型
pub use error::{ImportError, ImportResult};
pub use field_mapper::{map_row, map_rows, parse_money_minor, to_raw_record, MappedRow};
pub use line_parser::{parse, serialize_row, ParseOutput, ParsedRow};
pub use preview::{detect_delimiter, preview, PreviewResult, PreviewStats};
pub use price_list_importer_impl::PriceListImporterImpl;

// 重导出 Trait 接口
pub use price_list_importer_trait::PriceListImporter;
