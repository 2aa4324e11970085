//! 分发器核心：按规则顺序为种子设置完成后移动的目标目录
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, error, info, warn};

use super::evaluator::{Evaluation, RuleEvaluator};
use crate::compiler::{RuleSet, SortRule};
use crate::error::{FileSortError, FileSortResult};
use crate::torrent::{Torrent, TorrentRegistry};

/// 单次分发结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// 第 rule_index 条规则命中并已设置移动目录
    Moved { rule_index: usize, move_location: PathBuf },
    /// 无规则命中，种子原有设置保持不变
    NoMatch,
    /// torrent id 未知
    UnknownTorrent,
    /// 第 rule_index 条规则处理过程中宿主实现发生 panic
    Failed { rule_index: usize },
}

/// 规则分发器
#[derive(Debug)]
pub struct RuleDispatcher<R> {
    registry: Arc<R>,
    rules: RwLock<RuleSet>,
}

impl<R: TorrentRegistry> RuleDispatcher<R> {
    /// 创建分发器（空规则列表）
    pub fn new(registry: Arc<R>) -> Self {
        Self::with_rules(registry, RuleSet::default())
    }

    pub fn with_rules(registry: Arc<R>, rules: RuleSet) -> Self {
        Self {
            registry,
            rules: RwLock::new(rules),
        }
    }

    pub fn registry(&self) -> &Arc<R> {
        &self.registry
    }

    /// 当前规则列表快照
    pub fn rules(&self) -> RuleSet {
        self.rules.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// 整体替换规则列表，返回旧列表；正在进行的分发仍使用旧快照
    pub fn replace_rules(&self, rules: RuleSet) -> RuleSet {
        let mut guard = self.rules.write().unwrap_or_else(PoisonError::into_inner);
        debug!("Replacing sort rules: {} -> {}", guard.len(), rules.len());
        std::mem::replace(&mut *guard, rules)
    }

    /// 清空规则列表
    pub fn clear(&self) {
        self.replace_rules(RuleSet::default());
    }

    /// 按 id 查找种子
    pub fn lookup(&self, torrent_id: &str) -> FileSortResult<&R::Handle> {
        self.registry
            .lookup(torrent_id)
            .ok_or_else(|| FileSortError::TorrentNotFound(torrent_id.to_string()))
    }

    /// 事件入口：查找种子并分发，任何失败都只记录日志
    pub fn on_torrent_event(&self, torrent_id: &str) -> DispatchOutcome {
        match self.lookup(torrent_id) {
            Ok(torrent) => self.dispatch(torrent_id, torrent),
            Err(e) => {
                warn!("Skipping sort: {}", e);
                DispatchOutcome::UnknownTorrent
            }
        }
    }

    /// 对给定种子执行一次分发
    pub fn dispatch<T: Torrent + ?Sized>(&self, torrent_id: &str, torrent: &T) -> DispatchOutcome {
        let rules = self.rules();

        match RuleEvaluator::first_match(&rules, torrent) {
            Evaluation::Matched { rule_index, rule } => Self::apply(torrent_id, torrent, rule_index, rule),
            Evaluation::NoMatch => {
                debug!("No sort rule matched torrent {} ({} rules)", torrent_id, rules.len());
                DispatchOutcome::NoMatch
            }
            Evaluation::Panicked { rule_index, message } => {
                error!(
                    "Sort rule #{} panicked for torrent {}: {}",
                    rule_index, torrent_id, message
                );
                DispatchOutcome::Failed { rule_index }
            }
        }
    }

    fn apply<T: Torrent + ?Sized>(
        torrent_id: &str,
        torrent: &T,
        rule_index: usize,
        rule: &SortRule,
    ) -> DispatchOutcome {
        let path = rule.move_location().to_string_lossy();
        let applied = panic::catch_unwind(AssertUnwindSafe(|| {
            torrent.set_move_completed(true);
            torrent.set_move_completed_path(&path);
        }));

        if applied.is_err() {
            error!(
                "Failed to set move-completed path for torrent {} (rule #{})",
                torrent_id, rule_index
            );
            return DispatchOutcome::Failed { rule_index };
        }

        info!(
            "Torrent {} matched sort rule #{} ({}), moving to {}",
            torrent_id, rule_index, rule, path
        );
        DispatchOutcome::Moved {
            rule_index,
            move_location: rule.move_location().to_path_buf(),
        }
    }
}
