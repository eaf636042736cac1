// ==========================================
// 供应商价格表同步系统 - 冲突裁决器
// ==========================================
// 职责: 多供应商对同一品类报价时，按确定性策略裁出唯一胜者
// 策略顺序（契约，不得改动）:
//   1) 剔除 非活动 / 已过期 / 未生效 价格表上的候选
//   2) 优选供应商优先（force_sync 时整步跳过）
//   3) priority_rank 小者优先
//   4) cost_price 低者优先
//   5) effective_date 晚者优先，再按 item_id 升序（稳定兜底）
// 实现为全序比较器: 胜者与输入顺序无关
// ==========================================

use crate::domain::sync::{ConflictCandidate, SyncDecision};
use chrono::NaiveDate;
use std::cmp::Ordering;

// ==========================================
// ConflictResolver - 冲突裁决器
// ==========================================
pub struct ConflictResolver {
    // 无状态引擎，不需要注入依赖
}

impl ConflictResolver {
    pub fn new() -> Self {
        Self {}
    }

    /// 裁决单个品类的候选集合
    ///
    /// # 参数
    /// - variant_id: 品类 ID
    /// - candidates: 引用该品类的全部条目（含失效表上的，由本步剔除）
    /// - force_sync: 跳过优选供应商判定（运维强制覆盖）
    /// - today: 生效窗口判定基准日
    ///
    /// # 返回
    /// - Some(SyncDecision): 恰好一个胜者 + 落选集合
    /// - None: 剔除后无候选（全部失效，属合法的"无裁决"结果）
    pub fn resolve_conflicts(
        &self,
        variant_id: &str,
        candidates: &[ConflictCandidate],
        force_sync: bool,
        today: NaiveDate,
    ) -> Option<SyncDecision> {
        // 步骤 1: 生效窗口过滤
        let mut active: Vec<&ConflictCandidate> = candidates
            .iter()
            .filter(|c| Self::in_effect(c, today))
            .collect();

        if active.is_empty() {
            return None;
        }

        // 步骤 2-5: 全序比较，首位即胜者
        active.sort_by(|a, b| self.compare(a, b, force_sync));

        let winner = active[0];
        let losing_item_ids = active[1..]
            .iter()
            .map(|c| c.item.item_id.clone())
            .collect();

        Some(SyncDecision {
            variant_id: variant_id.to_string(),
            winning_item_id: winner.item.item_id.clone(),
            amount_minor: winner.item.cost_price_minor,
            currency_code: winner.item.currency_code.clone(),
            losing_item_ids,
        })
    }

    /// 候选是否处于生效窗口
    ///
    /// 过期: expiry_date < today；未生效: effective_date > today
    fn in_effect(candidate: &ConflictCandidate, today: NaiveDate) -> bool {
        if !candidate.list_is_active {
            return false;
        }
        if candidate.effective_date > today {
            return false;
        }
        if let Some(expiry) = candidate.expiry_date {
            if expiry < today {
                return false;
            }
        }
        true
    }

    /// 比较两个候选的优先级
    ///
    /// # 返回
    /// Ordering::Less 表示 a 优先于 b
    fn compare(
        &self,
        a: &ConflictCandidate,
        b: &ConflictCandidate,
        force_sync: bool,
    ) -> Ordering {
        // 2. 优选供应商优先（force_sync 时整步跳过）
        if !force_sync {
            match b.supplier_preferred.cmp(&a.supplier_preferred) {
                Ordering::Equal => {}
                other => return other,
            }
        }

        // 3. priority_rank 升序（越小越优先）
        match a.priority_rank.cmp(&b.priority_rank) {
            Ordering::Equal => {}
            other => return other,
        }

        // 4. cost_price 升序（越低越优先）
        match a.item.cost_price_minor.cmp(&b.item.cost_price_minor) {
            Ordering::Equal => {}
            other => return other,
        }

        // 5. effective_date 降序（越新越优先）
        match b.effective_date.cmp(&a.effective_date) {
            Ordering::Equal => {}
            other => return other,
        }

        // 稳定兜底: item_id 升序
        a.item.item_id.cmp(&b.item.item_id)
    }
}

impl Default for ConflictResolver {
    fn default() -> Self {
        Self::new()
    }
}
