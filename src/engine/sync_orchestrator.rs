// ==========================================
// 供应商价格表同步系统 - 同步编排器 (Saga)
// ==========================================
// 状态机: Resolving → Diffing → Applying(dry_run 跳过) → Reporting → Done
//         Applying 部分失败 → Compensating → Reporting → Failed
// 补偿设计: 每次成功改价先把逆操作(旧价)压入运行内撤销日志，
//           失败时逆序执行撤销日志；绝不留下半套已应用的价格
// 并发模型: Resolving/Diffing 只读，有界并发；Applying 同一品类串行
//           （每品类恰一条裁决）、不同品类有界并发；首个失败立即
//           停止派发新更新，已排队未执行的直接丢弃
// ==========================================

use crate::config::SyncSettings;
use crate::domain::price_list::PriceListItem;
use crate::domain::sync::{PriceUndo, SyncDecision, SyncRun, SyncRunReport, SyncSummary};
use crate::domain::types::{SyncRunState, SyncStatus};
use crate::engine::conflict_resolver::ConflictResolver;
use crate::engine::error::{SyncError, SyncResult};
use crate::engine::variant_resolver::VariantResolver;
use crate::repository::{CatalogRepository, PriceListRepository};
use chrono::Utc;
use futures::future::join_all;
use std::collections::{BTreeSet, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

// ==========================================
// 内部结构
// ==========================================

/// 单品类比对结果
enum DiffOutcome {
    /// 生效窗口过滤后无候选（合法的"无裁决"结果）
    NoDecision { candidate_item_ids: Vec<String> },
    /// 恰一胜者 + 目录当前价
    Decided {
        decision: SyncDecision,
        current_minor: i64,
    },
}

/// 单条裁决的应用结果
enum ApplyOutcome {
    Applied { decision: SyncDecision },
    Failed { decision: SyncDecision, message: String },
    /// 失败发生后已排队未执行的更新: 直接丢弃（条目保持 PENDING 可重试）
    Dropped { decision: SyncDecision },
}

/// Reporting 阶段待落盘的条目状态
struct StatusUpdate {
    item_id: String,
    status: SyncStatus,
    note: String,
}

// ==========================================
// SyncOrchestrator - 同步编排器
// ==========================================
pub struct SyncOrchestrator {
    repo: Arc<dyn PriceListRepository>,
    catalog: Arc<dyn CatalogRepository>,
    resolver: VariantResolver,
    conflicts: ConflictResolver,
    settings: SyncSettings,
}

impl SyncOrchestrator {
    pub fn new(
        repo: Arc<dyn PriceListRepository>,
        catalog: Arc<dyn CatalogRepository>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            resolver: VariantResolver::new(
                catalog.clone(),
                repo.clone(),
                settings.resolve_concurrency,
            ),
            conflicts: ConflictResolver::new(),
            repo,
            catalog,
            settings,
        }
    }

    /// 执行一次同步运行
    ///
    /// # 参数
    /// - price_list_id: 目标价格表
    /// - force_sync: 冲突裁决跳过优选供应商判定
    /// - dry_run: 只计算裁决，不改目录价、不补偿
    ///
    /// # 返回
    /// - Ok(SyncRunReport): 预期失败（SKU 无匹配、全部失效、更新失败已补偿）
    ///   一律以结构化报告返回，success 标记结果
    /// - Err(SyncError): 基础设施错误或补偿失败（需人工复核）
    pub async fn sync(
        &self,
        price_list_id: &str,
        force_sync: bool,
        dry_run: bool,
    ) -> SyncResult<SyncRunReport> {
        let run_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();

        info!(
            run_id = %run_id,
            price_list_id = %price_list_id,
            force_sync = force_sync,
            dry_run = dry_run,
            "同步运行开始"
        );

        // 目标价格表与条目装载
        self.repo
            .get_price_list(price_list_id)
            .await
            .map_err(|e| SyncError::Repository(e.to_string()))?
            .ok_or_else(|| SyncError::PriceListNotFound(price_list_id.to_string()))?;

        let mut items = self
            .repo
            .get_items_by_list(price_list_id)
            .await
            .map_err(|e| SyncError::Repository(e.to_string()))?;
        let total_items = items.len();

        // ==========================================
        // 阶段 1: Resolving - 品类解析 + 孤儿建品
        // ==========================================
        info!(run_id = %run_id, state = %SyncRunState::Resolving, "状态推进");
        let resolve_outcome = self.resolver.resolve_items(&mut items).await?;
        debug!(
            run_id = %run_id,
            matched = resolve_outcome.matched,
            provisioned = resolve_outcome.provisioned,
            failed = resolve_outcome.failed,
            "品类解析阶段结束"
        );

        // ==========================================
        // 阶段 2: Diffing - 冲突裁决 + 与目录价比对
        // ==========================================
        info!(run_id = %run_id, state = %SyncRunState::Diffing, "状态推进");
        let today = Utc::now().date_naive();

        // 去重品类集合（BTreeSet 保证处理顺序确定）
        // 以"已关联品类"为准: 本轮解析失败的条目无关联被自然排除；
        // 上轮运行失败遗留的 ERROR 条目仍可重新参与裁决
        let variant_ids: BTreeSet<String> = items
            .iter()
            .filter_map(|item| item.product_variant_id.clone())
            .collect();

        let diff_results = self
            .diff_variants(&variant_ids, force_sync, today)
            .await?;

        // 裁决汇编（顺序处理，输出确定）
        let mut updates: Vec<StatusUpdate> = Vec::new();
        let mut to_apply: Vec<SyncDecision> = Vec::new();
        let mut seen_variants: HashSet<String> = HashSet::new();

        for (variant_id, outcome) in diff_results {
            match outcome {
                DiffOutcome::NoDecision { candidate_item_ids } => {
                    for item_id in candidate_item_ids {
                        updates.push(StatusUpdate {
                            item_id,
                            status: SyncStatus::Skipped,
                            note: "无处于生效窗口的价格表".to_string(),
                        });
                    }
                }
                DiffOutcome::Decided {
                    decision,
                    current_minor,
                } => {
                    // 不变式: 每品类至多一条裁决；违反即策略缺陷，致命
                    if !seen_variants.insert(decision.variant_id.clone()) {
                        return Err(SyncError::ConflictPolicyViolation {
                            variant_id: decision.variant_id.clone(),
                            message: "同一品类出现多条裁决".to_string(),
                        });
                    }

                    for loser in &decision.losing_item_ids {
                        updates.push(StatusUpdate {
                            item_id: loser.clone(),
                            status: SyncStatus::Skipped,
                            note: format!("冲突落选，胜出条目: {}", decision.winning_item_id),
                        });
                    }

                    if decision.amount_minor == current_minor {
                        // 目录价已一致: 幂等路径，无需更新
                        updates.push(StatusUpdate {
                            item_id: decision.winning_item_id.clone(),
                            status: SyncStatus::Synced,
                            note: "价格一致，无需更新".to_string(),
                        });
                    } else {
                        debug!(
                            variant_id = %variant_id,
                            current = current_minor,
                            proposed = decision.amount_minor,
                            "检测到价格差异"
                        );
                        to_apply.push(decision);
                    }
                }
            }
        }

        // 品类序固定，应用顺序可复现
        to_apply.sort_by(|a, b| a.variant_id.cmp(&b.variant_id));
        let variants_to_update = to_apply.len();

        // ==========================================
        // 阶段 3: Applying - 应用价格更新（dry_run 跳过）
        // ==========================================
        let mut updated_count = 0usize;
        let mut failure_reason: Option<String> = None;

        if dry_run {
            info!(
                run_id = %run_id,
                state = %SyncRunState::Applying,
                pending_updates = variants_to_update,
                "dry_run: 跳过应用阶段"
            );
            // 保持 PENDING 并落备注，保留可重放性
            for decision in &to_apply {
                updates.push(StatusUpdate {
                    item_id: decision.winning_item_id.clone(),
                    status: SyncStatus::Pending,
                    note: format!("dry_run: 待更新为 {}", decision.amount_minor),
                });
            }
        } else if !to_apply.is_empty() {
            info!(
                run_id = %run_id,
                state = %SyncRunState::Applying,
                count = variants_to_update,
                "状态推进"
            );
            let (applied, apply_updates, reason) =
                self.apply_decisions(&run_id, &to_apply).await?;
            updated_count = applied;
            updates.extend(apply_updates);
            failure_reason = reason;
        }

        // ==========================================
        // 阶段 4: Reporting - 条目状态落盘（dry_run 同样执行）
        // ==========================================
        info!(run_id = %run_id, state = %SyncRunState::Reporting, "状态推进");
        for update in &updates {
            self.repo
                .update_item_status(&update.item_id, update.status, Some(&update.note))
                .await
                .map_err(|e| SyncError::Repository(e.to_string()))?;
        }

        // 汇总统计: 以目标价格表条目的最终状态为准
        let final_items = self
            .repo
            .get_items_by_list(price_list_id)
            .await
            .map_err(|e| SyncError::Repository(e.to_string()))?;
        let summary = Self::summarize(&final_items, total_items, variants_to_update);

        let success = failure_reason.is_none();
        let final_state = if success {
            SyncRunState::Done
        } else {
            SyncRunState::Failed
        };

        let run = SyncRun {
            run_id: run_id.clone(),
            price_list_id: price_list_id.to_string(),
            dry_run,
            force_sync,
            final_state,
            updated_count,
            summary: summary.clone(),
            started_at,
            finished_at: Utc::now(),
        };
        self.repo
            .insert_sync_run(run)
            .await
            .map_err(|e| SyncError::Repository(e.to_string()))?;

        info!(
            run_id = %run_id,
            state = %final_state,
            updated = updated_count,
            synced = summary.synced,
            skipped = summary.skipped,
            errors = summary.errors,
            "同步运行结束"
        );

        Ok(SyncRunReport {
            run_id,
            success,
            updated_count,
            items_processed: total_items,
            dry_run,
            summary,
            failure_reason,
        })
    }

    /// Diffing: 逐品类聚合候选、裁决、取目录当前价（有界并发，只读）
    async fn diff_variants(
        &self,
        variant_ids: &BTreeSet<String>,
        force_sync: bool,
        today: chrono::NaiveDate,
    ) -> SyncResult<Vec<(String, DiffOutcome)>> {
        let semaphore = Arc::new(Semaphore::new(self.settings.resolve_concurrency.max(1)));

        let futures = variant_ids.iter().cloned().map(|variant_id| {
            let repo = self.repo.clone();
            let catalog = self.catalog.clone();
            let conflicts = &self.conflicts;
            let semaphore = semaphore.clone();
            async move {
                let _permit = semaphore.acquire().await;

                let candidates = repo
                    .find_candidates_by_variant(&variant_id)
                    .await
                    .map_err(|e| SyncError::Repository(e.to_string()))?;

                match conflicts.resolve_conflicts(&variant_id, &candidates, force_sync, today) {
                    None => Ok((
                        variant_id.clone(),
                        DiffOutcome::NoDecision {
                            candidate_item_ids: candidates
                                .iter()
                                .map(|c| c.item.item_id.clone())
                                .collect(),
                        },
                    )),
                    Some(decision) => {
                        let (current_minor, _) = catalog
                            .get_variant_price(&variant_id)
                            .await
                            .map_err(|e| SyncError::Catalog(e.to_string()))?;
                        Ok((
                            variant_id.clone(),
                            DiffOutcome::Decided {
                                decision,
                                current_minor,
                            },
                        ))
                    }
                }
            }
        });

        join_all(futures)
            .await
            .into_iter()
            .collect::<SyncResult<Vec<_>>>()
    }

    /// Applying: 有界并发应用裁决，失败即止并补偿
    ///
    /// # 返回
    /// - (生效更新数, 状态落盘集, 失败原因)
    ///   成功路径: (applied, winner=SYNCED, None)
    ///   失败路径: (0, 已回滚/失败条目=ERROR, Some(原因))
    async fn apply_decisions(
        &self,
        run_id: &str,
        decisions: &[SyncDecision],
    ) -> SyncResult<(usize, Vec<StatusUpdate>, Option<String>)> {
        let semaphore = Arc::new(Semaphore::new(self.settings.apply_concurrency.max(1)));
        let abort = Arc::new(AtomicBool::new(false));
        // 撤销日志: 登记顺序 = 实际应用完成顺序，补偿时逆序执行
        let undo_log: Arc<Mutex<Vec<PriceUndo>>> = Arc::new(Mutex::new(Vec::new()));

        // 每品类恰一条裁决 → 单任务内更新即满足"同品类串行"
        let futures = decisions.iter().cloned().map(|decision| {
            let catalog = self.catalog.clone();
            let semaphore = semaphore.clone();
            let abort = abort.clone();
            let undo_log = undo_log.clone();
            async move {
                let _permit = semaphore.acquire().await;

                // 已有失败: 排队中的更新直接丢弃，不再尝试
                if abort.load(Ordering::SeqCst) {
                    return ApplyOutcome::Dropped { decision };
                }

                match catalog
                    .set_variant_price(
                        &decision.variant_id,
                        decision.amount_minor,
                        &decision.currency_code,
                    )
                    .await
                {
                    Ok(previous_minor) => {
                        let undo = PriceUndo {
                            variant_id: decision.variant_id.clone(),
                            item_id: decision.winning_item_id.clone(),
                            previous_minor,
                            applied_minor: decision.amount_minor,
                            currency_code: decision.currency_code.clone(),
                        };
                        if let Ok(mut log) = undo_log.lock() {
                            log.push(undo);
                        }
                        ApplyOutcome::Applied { decision }
                    }
                    Err(e) => {
                        abort.store(true, Ordering::SeqCst);
                        ApplyOutcome::Failed {
                            decision,
                            message: e.to_string(),
                        }
                    }
                }
            }
        });

        let outcomes = join_all(futures).await;

        let failed: Vec<(&SyncDecision, &String)> = outcomes
            .iter()
            .filter_map(|o| match o {
                ApplyOutcome::Failed { decision, message } => Some((decision, message)),
                _ => None,
            })
            .collect();

        let mut updates = Vec::new();

        if failed.is_empty() {
            let mut applied = 0usize;
            for outcome in &outcomes {
                if let ApplyOutcome::Applied { decision } = outcome {
                    applied += 1;
                    updates.push(StatusUpdate {
                        item_id: decision.winning_item_id.clone(),
                        status: SyncStatus::Synced,
                        note: format!("价格已更新为 {}", decision.amount_minor),
                    });
                }
            }
            info!(run_id = %run_id, applied = applied, "应用阶段完成");
            return Ok((applied, updates, None));
        }

        // ==========================================
        // Compensating - 逆序回滚本次已应用的更新
        // ==========================================
        let (first_variant, first_message) = {
            let (d, m) = failed[0];
            (d.variant_id.clone(), m.clone())
        };
        warn!(
            run_id = %run_id,
            state = %SyncRunState::Compensating,
            failed_variant = %first_variant,
            "应用失败，开始补偿"
        );

        let undo_entries: Vec<PriceUndo> = {
            let mut log = undo_log
                .lock()
                .map_err(|e| SyncError::Repository(format!("撤销日志锁获取失败: {}", e)))?;
            std::mem::take(&mut *log)
        };

        for undo in undo_entries.iter().rev() {
            if let Err(e) = self
                .catalog
                .set_variant_price(&undo.variant_id, undo.previous_minor, &undo.currency_code)
                .await
            {
                // 撤销本身失败: 系统无法再保证一致性，必须升级人工复核
                error!(
                    run_id = %run_id,
                    variant_id = %undo.variant_id,
                    error = %e,
                    "补偿失败"
                );
                return Err(SyncError::CompensationFailure {
                    variant_id: undo.variant_id.clone(),
                    message: e.to_string(),
                });
            }
            debug!(
                run_id = %run_id,
                variant_id = %undo.variant_id,
                restored = undo.previous_minor,
                "已回滚"
            );
            updates.push(StatusUpdate {
                item_id: undo.item_id.clone(),
                status: SyncStatus::Error,
                note: format!(
                    "同步失败后已回滚 ({} → {} → {})",
                    undo.previous_minor, undo.applied_minor, undo.previous_minor
                ),
            });
        }

        for (decision, message) in &failed {
            updates.push(StatusUpdate {
                item_id: decision.winning_item_id.clone(),
                status: SyncStatus::Error,
                note: format!("价格更新失败: {}", message),
            });
        }

        // Dropped 的裁决不落状态: 条目保持 PENDING，重跑时重新裁决
        for outcome in &outcomes {
            if let ApplyOutcome::Dropped { decision } = outcome {
                debug!(
                    run_id = %run_id,
                    variant_id = %decision.variant_id,
                    "更新已丢弃（未尝试）"
                );
            }
        }

        let reason = format!("品类 {} 价格更新失败: {}", first_variant, first_message);
        Ok((0, updates, Some(reason)))
    }

    /// 按目标价格表条目的最终状态汇总
    fn summarize(
        final_items: &[PriceListItem],
        total_items: usize,
        variants_to_update: usize,
    ) -> SyncSummary {
        let mut summary = SyncSummary {
            total_items,
            variants_to_update,
            ..Default::default()
        };
        for item in final_items {
            match item.sync_status {
                SyncStatus::Synced => summary.synced += 1,
                SyncStatus::Skipped => summary.skipped += 1,
                SyncStatus::Error => summary.errors += 1,
                SyncStatus::Pending => {}
            }
        }
        summary
    }
}
