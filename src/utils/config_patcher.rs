//! 配置合并工具
//! 负责把补丁或默认值合并进配置键值表

use serde_json::map::Entry;
use serde_json::{Map, Value};

use crate::rule::ConfigStore;

/// 配置合并工具
pub struct ConfigPatcher;

impl ConfigPatcher {
    /// 逐键覆盖写入（不做深度合并），返回写入的键数量
    pub fn apply<C: ConfigStore + ?Sized>(store: &mut C, patch: &Map<String, Value>) -> usize {
        for (key, value) in patch {
            store.set(key, value.clone());
        }
        patch.len()
    }

    /// 记录补丁将覆盖的键的当前值（None 表示原本不存在）
    pub fn capture<C: ConfigStore + ?Sized>(store: &C, patch: &Map<String, Value>) -> Vec<(String, Option<Value>)> {
        patch.keys().map(|key| (key.clone(), store.get(key))).collect()
    }

    /// 按 capture 的结果回滚，原本不存在的键被删除
    pub fn restore<C: ConfigStore + ?Sized>(store: &mut C, previous: Vec<(String, Option<Value>)>) {
        for (key, value) in previous {
            match value {
                Some(value) => store.set(&key, value),
                None => {
                    store.remove(&key);
                }
            }
        }
    }

    /// 仅为缺失的键补上默认值，返回补入的键数量
    pub fn merge_defaults(values: &mut Map<String, Value>, defaults: &Map<String, Value>) -> usize {
        let mut merged = 0;
        for (key, value) in defaults {
            if let Entry::Vacant(entry) = values.entry(key.clone()) {
                entry.insert(value.clone());
                merged += 1;
            }
        }
        merged
    }
}
