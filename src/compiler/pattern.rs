//! 编译后规则模型
//! 操作符编译后的匹配器、不可变的排序规则与有序规则列表

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use regex::Regex;
use serde_json::Value;

use super::compiler::RuleCompiler;
use crate::error::FileSortResult;
use crate::rule::SortRuleRecord;
use crate::torrent::TorrentMeta;

/// tracker 属性名
pub const TRACKER_ATTRIBUTE: &str = "tracker";

#[derive(Debug, Clone)]
pub enum SortMatcher {
    Regex(Regex),     // 正则搜索（忽略大小写，不锚定）
    Contains(String), // 包含匹配（忽略大小写），存小写
}

impl SortMatcher {
    /// 匹配器适用的属性；不适用时规则恒不匹配
    pub fn applies_to(&self, attribute: &str) -> bool {
        match self {
            SortMatcher::Regex(_) | SortMatcher::Contains(_) => attribute == TRACKER_ATTRIBUTE,
        }
    }

    /// 对单个值做匹配判断
    pub fn is_match(&self, input: &str) -> bool {
        match self {
            SortMatcher::Regex(regex) => regex.is_match(input),
            SortMatcher::Contains(needle) => input.to_lowercase().contains(needle.as_str()),
        }
    }

    /// 任一 tracker URL 命中即匹配
    pub fn matches<T: TorrentMeta + ?Sized>(&self, attribute: &str, torrent: &T) -> bool {
        if !self.applies_to(attribute) {
            return false;
        }
        torrent.trackers().iter().any(|tracker| self.is_match(&tracker.url))
    }
}

/// 排序规则：构造后不可变
#[derive(Debug, Clone)]
pub struct SortRule {
    attribute: String,
    operator: String,
    operand: String,
    move_location: PathBuf,
    matcher: SortMatcher,
}

impl SortRule {
    pub(crate) fn from_parts(
        attribute: String,
        operator: String,
        operand: String,
        move_location: PathBuf,
        matcher: SortMatcher,
    ) -> Self {
        Self {
            attribute,
            operator,
            operand,
            move_location,
            matcher,
        }
    }

    /// 从配置记录构造规则（未知操作符 / 非法模式直接失败）
    pub fn from_config(record: &SortRuleRecord) -> FileSortResult<Self> {
        RuleCompiler::compile_rule(record)
    }

    /// 从原始 JSON 记录构造规则
    pub fn from_value(value: &Value) -> FileSortResult<Self> {
        let record = SortRuleRecord::from_value(value)?;
        Self::from_config(&record)
    }

    /// 序列化为配置记录，与 from_config 互逆
    pub fn to_config(&self) -> SortRuleRecord {
        SortRuleRecord {
            attribute: self.attribute.clone(),
            operator: self.operator.clone(),
            operand: self.operand.clone(),
            move_location: self.move_location.to_string_lossy().into_owned(),
        }
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn operator(&self) -> &str {
        &self.operator
    }

    pub fn operand(&self) -> &str {
        &self.operand
    }

    pub fn move_location(&self) -> &Path {
        &self.move_location
    }

    pub fn matcher(&self) -> &SortMatcher {
        &self.matcher
    }

    /// 纯判断，无副作用
    pub fn matches<T: TorrentMeta + ?Sized>(&self, torrent: &T) -> bool {
        self.matcher.matches(&self.attribute, torrent)
    }
}

impl PartialEq for SortRule {
    fn eq(&self, other: &Self) -> bool {
        self.attribute == other.attribute
            && self.operator == other.operator
            && self.operand == other.operand
            && self.move_location == other.move_location
    }
}

impl Eq for SortRule {}

impl fmt::Display for SortRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {:?} -> {}",
            self.attribute,
            self.operator,
            self.operand,
            self.move_location.display()
        )
    }
}

/// 有序规则列表：顺序即优先级，允许重复
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    rules: Arc<[SortRule]>,
}

impl RuleSet {
    pub fn new(rules: Vec<SortRule>) -> Self {
        Self { rules: rules.into() }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SortRule> {
        self.rules.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SortRule> {
        self.rules.iter()
    }

    /// 序列化回配置记录列表
    pub fn to_records(&self) -> Vec<SortRuleRecord> {
        self.rules.iter().map(SortRule::to_config).collect()
    }
}

impl From<Vec<SortRule>> for RuleSet {
    fn from(rules: Vec<SortRule>) -> Self {
        Self::new(rules)
    }
}

impl FromIterator<SortRule> for RuleSet {
    fn from_iter<I: IntoIterator<Item = SortRule>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a SortRule;
    type IntoIter = std::slice::Iter<'a, SortRule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}
