//! 插件核心：生命周期管理、事件注册与对外配置接口
//!
//! `FileSortCore` 持有分发器与配置存储，二者都在构造时注入。
//! 启用时从配置的 `sorts` 构建规则列表并注册事件回调；
//! `set_config` 修改 `sorts` 时先构建新规则列表，成功后才持久化并整体替换。

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde_json::{Map, Value};
use tracing::{debug, error, info};

use crate::config::PluginConfig;
use crate::dispatcher::{DispatchOutcome, RuleDispatcher};
use crate::error::FileSortResult;
use crate::events::{EventManager, HandlerId, TorrentEventKind};
use crate::rule::{ConfigStore, FileSortPrefs, JsonFileConfigStore, RuleLoader, SORTS_KEY};
use crate::torrent::TorrentRegistry;
use crate::utils::ConfigPatcher;

/// 插件核心
pub struct FileSortCore<R, C> {
    dispatcher: RuleDispatcher<R>,
    store: Mutex<C>,
    config: PluginConfig,
    handlers: Mutex<Vec<(TorrentEventKind, HandlerId)>>,
}

impl<R, C> FileSortCore<R, C>
where
    R: TorrentRegistry + Send + Sync + 'static,
    C: ConfigStore + 'static,
{
    pub fn new(registry: Arc<R>, store: C, config: PluginConfig) -> Self {
        Self {
            dispatcher: RuleDispatcher::new(registry),
            store: Mutex::new(store),
            config,
            handlers: Mutex::new(Vec::new()),
        }
    }

    pub fn dispatcher(&self) -> &RuleDispatcher<R> {
        &self.dispatcher
    }

    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    /// 是否已注册事件回调
    pub fn is_enabled(&self) -> bool {
        !lock(&self.handlers).is_empty()
    }

    /// 启用插件：注册事件回调并从配置构建规则列表
    ///
    /// 规则构建失败时回调仍保持注册（规则列表为空），错误返回给调用方。
    pub fn enable<E>(self: &Arc<Self>, events: &mut E) -> FileSortResult<()>
    where
        E: EventManager + ?Sized,
    {
        {
            let mut handlers = lock(&self.handlers);
            if handlers.is_empty() {
                for &kind in &self.config.events {
                    let core: Weak<Self> = Arc::downgrade(self);
                    let id = events.register_event_handler(
                        kind,
                        Box::new(move |torrent_id: &str| {
                            if let Some(core) = core.upgrade() {
                                core.on_torrent_event(torrent_id);
                            }
                        }),
                    );
                    handlers.push((kind, id));
                }
            } else {
                debug!("FileSort already enabled, reloading rules only");
            }
        }

        match self.reload_rules() {
            Ok(count) => {
                info!("FileSort enabled with {} sort rules", count);
                Ok(())
            }
            Err(e) => {
                error!("FileSort enabled without sort rules: {}", e);
                Err(e)
            }
        }
    }

    /// 停用插件：注销回调并清空规则列表
    pub fn disable<E>(&self, events: &mut E)
    where
        E: EventManager + ?Sized,
    {
        let handlers = std::mem::take(&mut *lock(&self.handlers));
        for (kind, id) in handlers {
            if !events.deregister_event_handler(kind, id) {
                debug!("Handler {:?} for {} was already removed", id, kind);
            }
        }
        self.dispatcher.clear();
        info!("FileSort disabled");
    }

    /// 事件回调入口
    pub fn on_torrent_event(&self, torrent_id: &str) -> DispatchOutcome {
        debug!("Sorting torrent {}", torrent_id);
        self.dispatcher.on_torrent_event(torrent_id)
    }

    /// 从已持久化的 sorts 重新构建规则列表，返回规则数量
    /// 构建失败时保留当前规则列表
    pub fn reload_rules(&self) -> FileSortResult<usize> {
        let rules = {
            let store = lock(&self.store);
            RuleLoader::load(&*store, self.config.invalid_rule_policy)?
        };
        let count = rules.len();
        self.dispatcher.replace_rules(rules);
        Ok(count)
    }

    /// 返回完整配置
    pub fn get_config(&self) -> Map<String, Value> {
        lock(&self.store).snapshot()
    }

    /// 合并配置并持久化；补丁包含 sorts 时同步重建规则列表
    /// 规则构建或保存失败时配置与规则列表均保持原样
    pub fn set_config(&self, patch: Map<String, Value>) -> FileSortResult<()> {
        let mut store = lock(&self.store);

        let rebuilt = match patch.get(SORTS_KEY) {
            Some(sorts) if self.config.reload_on_set_config => {
                Some(RuleLoader::from_value(sorts, self.config.invalid_rule_policy)?)
            }
            _ => None,
        };

        let previous = ConfigPatcher::capture(&*store, &patch);
        let written = ConfigPatcher::apply(&mut *store, &patch);
        if let Err(e) = store.save() {
            ConfigPatcher::restore(&mut *store, previous);
            error!("Failed to save config, patch rolled back: {}", e);
            return Err(e);
        }
        debug!("Config updated, {} keys written", written);

        if let Some(rules) = rebuilt {
            info!("Sort rules reloaded from config: {} rules", rules.len());
            self.dispatcher.replace_rules(rules);
        }
        Ok(())
    }
}

impl<R> FileSortCore<R, JsonFileConfigStore>
where
    R: TorrentRegistry + Send + Sync + 'static,
{
    /// 使用 config_file 指向的 JSON 配置文件创建插件核心
    pub fn open(registry: Arc<R>, config: PluginConfig) -> FileSortResult<Self> {
        let store = JsonFileConfigStore::open(&config.config_file, &FileSortPrefs::default_map())?;
        Ok(Self::new(registry, store, config))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigManager, InvalidRulePolicy};
    use crate::error::FileSortError;
    use crate::events::EventBus;
    use crate::rule::{MemoryConfigStore, SortRuleRecord};
    use crate::torrent::mock::{MockRegistry, MockTorrent, MoveCall};
    use serde_json::json;

    type TestCore = FileSortCore<MockRegistry, MemoryConfigStore>;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("rsfilesort=debug")
            .with_test_writer()
            .try_init();
    }

    fn prefs(records: Vec<SortRuleRecord>) -> Map<String, Value> {
        FileSortPrefs { sorts: records }.to_patch()
    }

    fn core_with(values: Map<String, Value>, config: PluginConfig) -> Arc<TestCore> {
        init_tracing();
        let registry = Arc::new(MockRegistry::with("t_1", MockTorrent::ubuntu()));
        Arc::new(FileSortCore::new(registry, MemoryConfigStore::new(values), config))
    }

    fn ubuntu_record() -> SortRuleRecord {
        SortRuleRecord::new("tracker", "matches", r".*torrent\.ubuntu\.com", "/ubuntu/torrent")
    }

    fn debian_record() -> SortRuleRecord {
        SortRuleRecord::new("tracker", "matches", r".*torrent\.debian\.com", "/debian/torrent")
    }

    #[test]
    fn test_enable_registers_events_and_dispatches() {
        let core = core_with(prefs(vec![ubuntu_record()]), ConfigManager::get_default());
        let mut bus = EventBus::new();

        core.enable(&mut bus).unwrap();
        assert!(core.is_enabled());
        assert_eq!(bus.handler_count(TorrentEventKind::TorrentAdded), 1);
        assert_eq!(bus.handler_count(TorrentEventKind::TorrentFinished), 1);

        bus.emit(TorrentEventKind::TorrentAdded, "t_1");
        assert_eq!(
            core.dispatcher().registry().torrent("t_1").calls(),
            vec![
                MoveCall::MoveCompleted(true),
                MoveCall::MoveCompletedPath("/ubuntu/torrent".to_string()),
            ]
        );
    }

    #[test]
    fn test_enable_twice_does_not_duplicate_handlers() {
        let core = core_with(prefs(vec![ubuntu_record()]), ConfigManager::get_default());
        let mut bus = EventBus::new();

        core.enable(&mut bus).unwrap();
        core.enable(&mut bus).unwrap();
        assert_eq!(bus.handler_count(TorrentEventKind::TorrentAdded), 1);
    }

    #[test]
    fn test_non_matching_rule_leaves_torrent_alone() {
        let core = core_with(prefs(vec![debian_record()]), ConfigManager::get_default());
        let mut bus = EventBus::new();
        core.enable(&mut bus).unwrap();

        bus.emit(TorrentEventKind::TorrentFinished, "t_1");
        bus.emit(TorrentEventKind::TorrentAdded, "unknown");
        assert!(core.dispatcher().registry().torrent("t_1").calls().is_empty());
    }

    #[test]
    fn test_disable_deregisters_and_clears_rules() {
        let core = core_with(prefs(vec![ubuntu_record()]), ConfigManager::get_default());
        let mut bus = EventBus::new();
        core.enable(&mut bus).unwrap();

        core.disable(&mut bus);

        assert!(!core.is_enabled());
        assert!(core.dispatcher().rules().is_empty());
        assert_eq!(bus.emit(TorrentEventKind::TorrentAdded, "t_1"), 0);
        assert!(core.dispatcher().registry().torrent("t_1").calls().is_empty());
    }

    #[test]
    fn test_enable_with_invalid_rule_keeps_handlers_and_reports_error() {
        let mut values = prefs(vec![ubuntu_record()]);
        values.insert(
            SORTS_KEY.to_string(),
            json!([{"attribute": "tracker", "operator": "equals", "operand": "x", "move_location": "/x"}]),
        );
        let core = core_with(values, ConfigManager::get_default());
        let mut bus = EventBus::new();

        let err = core.enable(&mut bus).unwrap_err();
        assert!(err.is_validation());
        assert!(core.is_enabled());
        assert!(core.dispatcher().rules().is_empty());
    }

    #[test]
    fn test_skip_policy_loads_remaining_rules() {
        let values = prefs(vec![
            SortRuleRecord::new("tracker", "matches", "(", "/broken"),
            ubuntu_record(),
        ]);
        let config = ConfigManager::custom()
            .invalid_rule_policy(InvalidRulePolicy::Skip)
            .build();
        let core = core_with(values, config);
        let mut bus = EventBus::new();

        core.enable(&mut bus).unwrap();
        assert_eq!(core.dispatcher().rules().to_records(), vec![ubuntu_record()]);
        assert!(matches!(
            core.on_torrent_event("t_1"),
            DispatchOutcome::Moved { rule_index: 0, .. }
        ));
    }

    #[test]
    fn test_get_config_returns_everything() {
        let mut values = prefs(vec![ubuntu_record()]);
        values.insert("test".to_string(), json!("NiNiNi"));
        let core = core_with(values.clone(), ConfigManager::get_default());

        assert_eq!(core.get_config(), values);
    }

    #[test]
    fn test_set_config_rebuilds_rules() {
        let core = core_with(prefs(vec![debian_record()]), ConfigManager::get_default());
        let mut bus = EventBus::new();
        core.enable(&mut bus).unwrap();

        core.set_config(prefs(vec![ubuntu_record()])).unwrap();

        assert_eq!(core.get_config()[SORTS_KEY], json!([ubuntu_record().to_value()]));
        assert_eq!(lock(&core.store).save_count(), 1);
        assert_eq!(core.dispatcher().rules().to_records(), vec![ubuntu_record()]);
        assert!(matches!(
            core.on_torrent_event("t_1"),
            DispatchOutcome::Moved { rule_index: 0, .. }
        ));
    }

    #[test]
    fn test_set_config_with_invalid_rule_changes_nothing() {
        let core = core_with(prefs(vec![debian_record()]), ConfigManager::get_default());
        let mut bus = EventBus::new();
        core.enable(&mut bus).unwrap();
        let before = core.get_config();

        let patch = prefs(vec![
            ubuntu_record(),
            SortRuleRecord::new("tracker", "matches", "(", "/broken"),
        ]);
        let err = core.set_config(patch).unwrap_err();

        assert!(matches!(err, FileSortError::RuleSetBuild { index: 1, .. }));
        assert_eq!(core.get_config(), before);
        assert_eq!(lock(&core.store).save_count(), 0);
        assert_eq!(core.dispatcher().rules().to_records(), vec![debian_record()]);
    }

    /// save 总是失败的配置存储
    struct UnsavableStore(MemoryConfigStore);

    impl ConfigStore for UnsavableStore {
        fn get(&self, key: &str) -> Option<Value> {
            self.0.get(key)
        }

        fn set(&mut self, key: &str, value: Value) {
            self.0.set(key, value);
        }

        fn remove(&mut self, key: &str) -> Option<Value> {
            self.0.remove(key)
        }

        fn save(&mut self) -> FileSortResult<()> {
            Err(FileSortError::ConfigError("disk full".to_string()))
        }

        fn snapshot(&self) -> Map<String, Value> {
            self.0.snapshot()
        }
    }

    #[test]
    fn test_set_config_save_failure_rolls_back() {
        init_tracing();
        let registry = Arc::new(MockRegistry::with("t_1", MockTorrent::ubuntu()));
        let store = UnsavableStore(MemoryConfigStore::new(prefs(vec![debian_record()])));
        let core = Arc::new(FileSortCore::new(registry, store, ConfigManager::get_default()));
        let mut bus = EventBus::new();
        core.enable(&mut bus).unwrap();
        let before = core.get_config();

        let mut patch = prefs(vec![ubuntu_record()]);
        patch.insert("added".to_string(), json!("x"));
        let err = core.set_config(patch).unwrap_err();

        assert!(matches!(err, FileSortError::ConfigError(_)));
        assert_eq!(core.get_config(), before);
        assert_eq!(core.dispatcher().rules().to_records(), vec![debian_record()]);

        // 重新加载仍得到原规则
        assert_eq!(core.reload_rules().unwrap(), 1);
        assert_eq!(core.dispatcher().rules().to_records(), vec![debian_record()]);
        assert!(matches!(core.on_torrent_event("t_1"), DispatchOutcome::NoMatch));
    }

    #[test]
    fn test_set_config_without_reload_keeps_rules_until_reload() {
        let config = ConfigManager::custom().reload_on_set_config(false).build();
        let core = core_with(prefs(vec![debian_record()]), config);
        let mut bus = EventBus::new();
        core.enable(&mut bus).unwrap();

        core.set_config(prefs(vec![ubuntu_record()])).unwrap();
        assert_eq!(core.dispatcher().rules().to_records(), vec![debian_record()]);

        assert_eq!(core.reload_rules().unwrap(), 1);
        assert_eq!(core.dispatcher().rules().to_records(), vec![ubuntu_record()]);
    }

    #[test]
    fn test_set_config_other_keys_keeps_rules() {
        let core = core_with(prefs(vec![ubuntu_record()]), ConfigManager::get_default());
        let mut bus = EventBus::new();
        core.enable(&mut bus).unwrap();
        let rules = core.dispatcher().rules();

        let mut patch = Map::new();
        patch.insert("test".to_string(), json!("Ni"));
        core.set_config(patch).unwrap();

        assert_eq!(core.get_config()["test"], json!("Ni"));
        assert_eq!(core.dispatcher().rules(), rules);
    }

    #[test]
    fn test_json_store_roundtrip_through_core() -> anyhow::Result<()> {
        init_tracing();
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("filesort.conf");
        let config = ConfigManager::custom().config_file(&path).build();
        let registry = Arc::new(MockRegistry::with("t_1", MockTorrent::ubuntu()));

        let core = Arc::new(FileSortCore::open(Arc::clone(&registry), config.clone())?);
        let mut bus = EventBus::new();
        core.enable(&mut bus)?;
        core.set_config(prefs(vec![ubuntu_record()]))?;
        core.disable(&mut bus);

        // 重新打开配置文件，规则仍然生效
        // open 不加载规则，enable 时才从配置构建
        let core = Arc::new(FileSortCore::open(registry, config)?);
        assert!(core.dispatcher().rules().is_empty());
        core.enable(&mut bus)?;
        assert_eq!(core.dispatcher().rules().to_records(), vec![ubuntu_record()]);
        bus.emit(TorrentEventKind::TorrentAdded, "t_1");

        let calls = core.dispatcher().registry().torrent("t_1").calls();
        assert_eq!(calls.last(), Some(&MoveCall::MoveCompletedPath("/ubuntu/torrent".to_string())));
        Ok(())
    }

    #[test]
    fn test_handler_does_nothing_after_core_dropped() {
        let core = core_with(prefs(vec![ubuntu_record()]), ConfigManager::get_default());
        let registry = Arc::clone(core.dispatcher().registry());
        let mut bus = EventBus::new();
        core.enable(&mut bus).unwrap();

        drop(core);
        assert_eq!(bus.emit(TorrentEventKind::TorrentAdded, "t_1"), 1);
        assert!(registry.torrent("t_1").calls().is_empty());
    }
}
