//! 规则加载管理器
//! 负责从配置存储的 sorts 记录构建有序规则列表

use std::time::Instant;

use serde_json::Value;
use tracing::{debug, warn};

use super::model::SORTS_KEY;
use super::store::ConfigStore;
use crate::compiler::{RuleSet, SortRule};
use crate::config::InvalidRulePolicy;
use crate::error::{FileSortError, FileSortResult};

/// 规则加载管理器
pub struct RuleLoader;

impl RuleLoader {
    /// 从配置存储加载规则（缺少 sorts 键时得到空列表）
    pub fn load<C: ConfigStore + ?Sized>(store: &C, policy: InvalidRulePolicy) -> FileSortResult<RuleSet> {
        match store.get(SORTS_KEY) {
            Some(sorts) => Self::from_value(&sorts, policy),
            None => {
                debug!("No `{}` key in config, rule list is empty", SORTS_KEY);
                Ok(RuleSet::default())
            }
        }
    }

    /// 从 sorts 的 JSON 值构建规则列表
    pub fn from_value(sorts: &Value, policy: InvalidRulePolicy) -> FileSortResult<RuleSet> {
        let start = Instant::now();
        let items = match sorts {
            Value::Array(items) => items.as_slice(),
            Value::Null => &[][..],
            other => {
                return Err(FileSortError::InvalidRecord(format!(
                    "`{}` must be an array, got {}",
                    SORTS_KEY, other
                )));
            }
        };

        let mut rules = Vec::with_capacity(items.len());
        let mut skipped = 0;
        for (index, item) in items.iter().enumerate() {
            match SortRule::from_value(item) {
                Ok(rule) => rules.push(rule),
                Err(e) => match policy {
                    InvalidRulePolicy::Abort => {
                        return Err(FileSortError::RuleSetBuild {
                            index,
                            source: Box::new(e),
                        });
                    }
                    InvalidRulePolicy::Skip => {
                        warn!("Skipping sort rule #{}: {}", index, e);
                        skipped += 1;
                    }
                },
            }
        }

        debug!(
            "Sort rules built in {:?}: {} loaded, {} skipped",
            start.elapsed(),
            rules.len(),
            skipped
        );
        Ok(RuleSet::new(rules))
    }
}
