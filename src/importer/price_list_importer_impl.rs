// ==========================================
// 供应商价格表同步系统 - 价格表导入器实现
// ==========================================
// 职责: 整合提交流程，从文件文本到价格表落库
// 流程: 解析 → 映射/变换 → 必填校验 → 取代旧表 → 落库
// ==========================================

use crate::config::{ColumnMapping, ParseConfig};
use crate::domain::price_list::{
    CommitOutcome, PriceList, PriceListItem, PriceListMeta, RawPriceRecord,
};
use crate::domain::types::SyncStatus;
use crate::importer::error::ImportError;
use crate::importer::field_mapper::{map_rows, to_raw_record};
use crate::importer::line_parser::parse;
use crate::importer::price_list_importer_trait::PriceListImporter;
use crate::repository::PriceListRepository;
use chrono::Utc;
use std::error::Error;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// PriceListImporterImpl - 价格表导入器实现
// ==========================================
pub struct PriceListImporterImpl<R>
where
    R: PriceListRepository,
{
    repo: R,
}

impl<R> PriceListImporterImpl<R>
where
    R: PriceListRepository,
{
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// 必填校验 + 缺省填充，转换为待落库条目
    ///
    /// supplier_sku / cost_price 缺失的行拒收（计入 errors）；
    /// 币种缺省取价格表币种，起订量缺省 1
    fn build_item(
        record: &RawPriceRecord,
        price_list_id: &str,
        supplier_id: &str,
        default_currency: &str,
    ) -> Result<PriceListItem, ImportError> {
        let supplier_sku =
            record
                .supplier_sku
                .clone()
                .ok_or_else(|| ImportError::RequiredFieldMissing {
                    row: record.row_number,
                    field: "supplier_sku".to_string(),
                })?;

        let cost_price_minor =
            record
                .cost_price_minor
                .ok_or_else(|| ImportError::RequiredFieldMissing {
                    row: record.row_number,
                    field: "cost_price".to_string(),
                })?;

        let now = Utc::now();
        Ok(PriceListItem {
            item_id: Uuid::new_v4().to_string(),
            price_list_id: price_list_id.to_string(),
            supplier_id: supplier_id.to_string(),
            supplier_sku,
            variant_sku: record.variant_sku.clone(),
            product_variant_id: None,
            cost_price_minor,
            currency_code: record
                .currency_code
                .clone()
                .unwrap_or_else(|| default_currency.to_string()),
            quantity: record.quantity.unwrap_or(1),
            lead_time_days: record.lead_time_days,
            sync_status: SyncStatus::Pending,
            sync_note: None,
            row_number: record.row_number,
            created_at: now,
            updated_at: now,
        })
    }
}

#[async_trait::async_trait]
impl<R> PriceListImporter for PriceListImporterImpl<R>
where
    R: PriceListRepository + Send + Sync,
{
    #[instrument(skip(self, parse_config, column_mapping, file_content, meta), fields(price_list_id))]
    async fn commit_price_list(
        &self,
        supplier_id: &str,
        parse_config: &ParseConfig,
        column_mapping: &ColumnMapping,
        file_content: &str,
        meta: PriceListMeta,
    ) -> Result<CommitOutcome, Box<dyn Error>> {
        let start_time = std::time::Instant::now();
        let price_list_id = Uuid::new_v4().to_string();

        info!(
            price_list_id = %price_list_id,
            supplier_id = %supplier_id,
            name = %meta.name,
            "开始提交价格表"
        );

        // 供应商必须已登记（条目外键依赖）
        self.repo
            .get_supplier(supplier_id)
            .await?
            .ok_or_else(|| format!("供应商未登记: {}", supplier_id))?;

        // === 步骤 1: 行解析 ===
        debug!("步骤 1: 行解析");
        let output = parse(file_content, parse_config)?;
        let total_rows = output.rows.len();
        let mut errors = output.errors.clone();
        info!(
            total_rows = total_rows,
            parse_errors = errors.len(),
            "行解析完成"
        );

        // === 步骤 2: 字段映射 + 变换 ===
        debug!("步骤 2: 字段映射");
        let mapped = map_rows(&output.rows, column_mapping, &parse_config.transformations);
        let records: Vec<RawPriceRecord> = mapped.iter().map(to_raw_record).collect();
        let warnings: Vec<String> = records
            .iter()
            .flat_map(|r| r.warnings.iter().cloned())
            .collect();
        info!(warnings = warnings.len(), "字段映射完成");

        // === 步骤 3: 必填校验 + 条目构造 ===
        debug!("步骤 3: 必填校验");
        let mut items = Vec::new();
        for record in &records {
            match Self::build_item(record, &price_list_id, supplier_id, &meta.currency_code) {
                Ok(item) => items.push(item),
                Err(reason) => {
                    warn!(row = record.row_number, reason = %reason, "行被拒收");
                    errors.push(reason.to_string());
                }
            }
        }
        let error_rows = total_rows - items.len();
        info!(accepted = items.len(), rejected = error_rows, "必填校验完成");

        // === 步骤 4: 取代同名旧表 ===
        debug!("步骤 4: 取代同名旧表");
        let superseded_lists = self
            .repo
            .supersede_price_lists(supplier_id, &meta.name)
            .await?;
        if superseded_lists > 0 {
            info!(superseded = superseded_lists, "旧价格表已置为非活动");
        }

        // === 步骤 5: 落库（表头 + 条目）===
        debug!("步骤 5: 落库");
        let list = PriceList {
            price_list_id: price_list_id.clone(),
            supplier_id: supplier_id.to_string(),
            name: meta.name.clone(),
            effective_date: meta.effective_date,
            expiry_date: meta.expiry_date,
            is_active: true,
            currency_code: meta.currency_code.clone(),
            priority_rank: meta.priority_rank,
            upload_filename: meta.upload_filename.clone(),
            created_at: Utc::now(),
        };
        self.repo.insert_price_list(list).await?;
        let stored_items = self.repo.batch_insert_items(items).await?;

        let elapsed_ms = start_time.elapsed().as_millis() as i64;
        info!(
            price_list_id = %price_list_id,
            stored = stored_items,
            rejected = error_rows,
            elapsed_ms = elapsed_ms,
            "价格表提交完成"
        );

        Ok(CommitOutcome {
            price_list_id,
            total_rows,
            stored_items,
            error_rows,
            superseded_lists,
            errors,
            warnings,
            elapsed_ms,
        })
    }
}
