//! 工具模块
pub mod config_patcher;

pub use self::config_patcher::ConfigPatcher;
