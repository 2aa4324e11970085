//! rsfilesort - 基于规则的种子完成后移动目录分发引擎

// 导出全局错误类型
pub use self::error::{FileSortError, FileSortResult};

// 导出配置模块
pub use self::config::{ConfigManager, CustomConfigBuilder, InvalidRulePolicy, PluginConfig};

// 导出规则模块核心接口
pub use self::rule::{
    ConfigStore, FileSortPrefs, JsonFileConfigStore, MemoryConfigStore, RuleLoader, SortRuleRecord,
    SORTS_KEY,
};

// 导出编译模块核心接口
pub use self::compiler::{RuleCompiler, RuleSet, SortMatcher, SortRule, TRACKER_ATTRIBUTE};

// 导出分发模块核心接口
pub use self::dispatcher::{DispatchOutcome, Evaluation, RuleDispatcher, RuleEvaluator};

// 导出宿主接口
pub use self::events::{EventBus, EventHandler, EventManager, HandlerId, TorrentEventKind};
pub use self::torrent::{Torrent, TorrentMeta, TorrentRegistry, TrackerEntry};

// 导出插件核心
pub use self::plugin::FileSortCore;

// 导出工具模块核心接口
pub use self::utils::ConfigPatcher;

// 声明所有子模块
pub mod config;
pub mod error;
pub mod rule;
pub mod compiler;
pub mod dispatcher;
pub mod events;
pub mod torrent;
pub mod plugin;
pub mod utils;
