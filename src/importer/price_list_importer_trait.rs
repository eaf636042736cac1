// ==========================================
// 供应商价格表同步系统 - 价格表导入 Trait
// ==========================================
// 职责: 定义价格表提交接口（不包含实现）
// ==========================================

use crate::config::{ColumnMapping, ParseConfig};
use crate::domain::price_list::{CommitOutcome, PriceListMeta};
use async_trait::async_trait;
use std::error::Error;

// ==========================================
// PriceListImporter Trait
// ==========================================
// 用途: 价格表提交主接口
// 实现者: PriceListImporterImpl
#[async_trait]
pub trait PriceListImporter: Send + Sync {
    /// 提交一份供应商价格文件
    ///
    /// # 参数
    /// - supplier_id: 供应商（须已登记）
    /// - parse_config: 解析语法
    /// - column_mapping: 列映射
    /// - file_content: 文件全文
    /// - meta: 价格表元数据（名称/生效窗口/币种/优先级）
    ///
    /// # 返回
    /// - Ok(CommitOutcome): 提交结果（落库数/错误行/警告）
    /// - Err: 配置非法、供应商未登记、数据库错误
    ///
    /// # 提交流程
    /// 1. 行解析（行级错误不中断整批）
    /// 2. 字段映射 + 变换（字段级失败置空并记警告）
    /// 3. 必填校验（supplier_sku / cost_price 缺失的行拒收）
    /// 4. 取代同名旧表（置非活动）
    /// 5. 表头 + 条目事务化落库（条目初始状态 PENDING）
    async fn commit_price_list(
        &self,
        supplier_id: &str,
        parse_config: &ParseConfig,
        column_mapping: &ColumnMapping,
        file_content: &str,
        meta: PriceListMeta,
    ) -> Result<CommitOutcome, Box<dyn Error>>;
}
