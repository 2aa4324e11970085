//! 分发模块：种子事件到规则动作的核心逻辑
pub mod evaluator;
pub mod dispatcher;

// 导出核心接口
pub use self::evaluator::{Evaluation, RuleEvaluator};
pub use self::dispatcher::{DispatchOutcome, RuleDispatcher};
