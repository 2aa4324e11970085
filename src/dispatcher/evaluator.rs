//! 规则求值：按顺序寻找第一条命中的规则

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use crate::compiler::{RuleSet, SortRule};
use crate::torrent::TorrentMeta;

/// 求值结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluation<'a> {
    /// 命中的规则及其下标
    Matched { rule_index: usize, rule: &'a SortRule },
    NoMatch,
    /// 第 N 条规则求值时宿主实现发生 panic
    Panicked { rule_index: usize, message: String },
}

/// 规则求值器
pub struct RuleEvaluator;

impl RuleEvaluator {
    /// 顺序求值，命中即停止；后续规则不会被求值
    pub fn first_match<'a, T: TorrentMeta + ?Sized>(rules: &'a RuleSet, torrent: &T) -> Evaluation<'a> {
        for (index, rule) in rules.iter().enumerate() {
            match panic::catch_unwind(AssertUnwindSafe(|| rule.matches(torrent))) {
                Ok(true) => return Evaluation::Matched { rule_index: index, rule },
                Ok(false) => {}
                Err(payload) => {
                    return Evaluation::Panicked {
                        rule_index: index,
                        message: panic_message(payload.as_ref()).to_string(),
                    };
                }
            }
        }
        Evaluation::NoMatch
    }
}

/// 提取 panic 负载中的文本
fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
