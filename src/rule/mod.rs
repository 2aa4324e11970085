//! 规则模块：负责规则配置的数据模型、存储与加载
pub mod model;
pub mod store;
pub mod loader;

// 导出核心接口
pub use self::model::{FileSortPrefs, SortRuleRecord, SORTS_KEY};
pub use self::store::{ConfigStore, JsonFileConfigStore, MemoryConfigStore};
pub use self::loader::RuleLoader;
