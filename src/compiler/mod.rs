//! 编译模块：将规则配置记录编译为可执行的排序规则
pub mod pattern;
pub mod compiler;

pub use self::pattern::{RuleSet, SortMatcher, SortRule, TRACKER_ATTRIBUTE};
pub use self::compiler::RuleCompiler;
