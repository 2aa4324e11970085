//! 规则编译器核心
//! 负责按操作符注册表将配置记录编译为可执行的排序规则

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Instant;

use once_cell::sync::Lazy;
use regex::RegexBuilder;
use tracing::debug;

use super::pattern::{RuleSet, SortMatcher, SortRule};
use crate::error::{FileSortError, FileSortResult};
use crate::rule::SortRuleRecord;

/// 操作符构造函数：操作数 -> 匹配器
type MatcherBuilder = fn(&str) -> FileSortResult<SortMatcher>;

/// 操作符注册表（进程内唯一，只读）
static OPERATOR_REGISTRY: Lazy<HashMap<&'static str, MatcherBuilder>> = Lazy::new(|| {
    let mut registry: HashMap<&'static str, MatcherBuilder> = HashMap::new();
    registry.insert("matches", build_regex_matcher);
    registry.insert("contains", build_contains_matcher);
    registry
});

fn build_regex_matcher(operand: &str) -> FileSortResult<SortMatcher> {
    RegexBuilder::new(operand)
        .case_insensitive(true)
        .build()
        .map(SortMatcher::Regex)
        .map_err(|source| FileSortError::InvalidPattern {
            operand: operand.to_string(),
            source,
        })
}

fn build_contains_matcher(operand: &str) -> FileSortResult<SortMatcher> {
    Ok(SortMatcher::Contains(operand.to_lowercase()))
}

/// 规则编译器
pub struct RuleCompiler;

impl RuleCompiler {
    /// 操作符是否已注册
    pub fn is_known_operator(operator: &str) -> bool {
        OPERATOR_REGISTRY.contains_key(operator)
    }

    /// 已注册的操作符（排序后）
    pub fn operators() -> Vec<&'static str> {
        let mut operators: Vec<_> = OPERATOR_REGISTRY.keys().copied().collect();
        operators.sort_unstable();
        operators
    }

    /// 编译单条规则
    pub fn compile_rule(record: &SortRuleRecord) -> FileSortResult<SortRule> {
        let builder = OPERATOR_REGISTRY
            .get(record.operator.as_str())
            .ok_or_else(|| FileSortError::UnknownOperator {
                operator: record.operator.clone(),
            })?;
        let matcher = builder(&record.operand)?;

        Ok(SortRule::from_parts(
            record.attribute.clone(),
            record.operator.clone(),
            record.operand.clone(),
            PathBuf::from(&record.move_location),
            matcher,
        ))
    }

    /// 编译规则列表，任意一条失败即整体失败
    pub fn compile(records: &[SortRuleRecord]) -> FileSortResult<RuleSet> {
        let start = Instant::now();
        let rules = records
            .iter()
            .enumerate()
            .map(|(index, record)| {
                Self::compile_rule(record).map_err(|e| FileSortError::RuleSetBuild {
                    index,
                    source: Box::new(e),
                })
            })
            .collect::<FileSortResult<Vec<_>>>()?;

        debug!("Compiled {} sort rules in {:?}", rules.len(), start.elapsed());
        Ok(RuleSet::new(rules))
    }
}
