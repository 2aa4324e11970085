//! 插件配置管理，存储所有可配置项

use std::path::PathBuf;

use crate::events::TorrentEventKind;

/// 非法规则处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InvalidRulePolicy {
    /// 任意一条规则非法则整体放弃本次构建，保留旧规则列表
    #[default]
    Abort,
    /// 跳过非法规则并记录日志，其余规则按原顺序加载
    Skip,
}

/// 插件配置
#[derive(Debug, Clone)]
pub struct PluginConfig {
    // 持久化配置文件路径
    pub config_file: PathBuf,
    // 需要订阅的种子事件
    pub events: Vec<TorrentEventKind>,
    // 非法规则处理策略
    pub invalid_rule_policy: InvalidRulePolicy,
    // set_config 修改 sorts 后是否立即重建规则列表
    pub reload_on_set_config: bool,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            config_file: PathBuf::from("filesort.conf"),
            events: vec![TorrentEventKind::TorrentAdded, TorrentEventKind::TorrentFinished],
            invalid_rule_policy: InvalidRulePolicy::Abort,
            reload_on_set_config: true,
        }
    }
}

/// 配置管理器
pub struct ConfigManager;

impl ConfigManager {
    /// 获取默认配置
    pub fn get_default() -> PluginConfig {
        PluginConfig::default()
    }

    /// 自定义配置
    pub fn custom() -> CustomConfigBuilder {
        CustomConfigBuilder::new()
    }
}

/// 配置构建器（便于自定义配置）
#[derive(Debug, Clone, Default)]
pub struct CustomConfigBuilder {
    config: PluginConfig,
}

impl CustomConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: PluginConfig::default(),
        }
    }

    pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.config_file = path.into();
        self
    }

    /// 覆盖订阅事件列表（重复项会被去除）
    pub fn events(mut self, events: impl IntoIterator<Item = TorrentEventKind>) -> Self {
        let mut kinds = Vec::new();
        for kind in events {
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        self.config.events = kinds;
        self
    }

    pub fn invalid_rule_policy(mut self, policy: InvalidRulePolicy) -> Self {
        self.config.invalid_rule_policy = policy;
        self
    }

    pub fn reload_on_set_config(mut self, reload: bool) -> Self {
        self.config.reload_on_set_config = reload;
        self
    }

    pub fn build(self) -> PluginConfig {
        self.config
    }
}
