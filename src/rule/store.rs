//! 配置存储
//! 宿主键值配置接口，以及内存 / JSON 文件两种实现

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{FileSortError, FileSortResult};
use crate::utils::ConfigPatcher;

/// 宿主键值配置接口
pub trait ConfigStore: Send {
    fn get(&self, key: &str) -> Option<Value>;

    fn set(&mut self, key: &str, value: Value);

    /// 删除键，返回原值
    fn remove(&mut self, key: &str) -> Option<Value>;

    /// 持久化当前配置
    fn save(&mut self) -> FileSortResult<()>;

    /// 完整配置的拷贝
    fn snapshot(&self) -> Map<String, Value>;
}

/// 内存配置存储，save 只计数
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigStore {
    values: Map<String, Value>,
    saves: usize,
}

impl MemoryConfigStore {
    pub fn new(values: Map<String, Value>) -> Self {
        Self { values, saves: 0 }
    }

    pub fn save_count(&self) -> usize {
        self.saves
    }
}

impl ConfigStore for MemoryConfigStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
    }

    fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    fn save(&mut self) -> FileSortResult<()> {
        self.saves += 1;
        Ok(())
    }

    fn snapshot(&self) -> Map<String, Value> {
        self.values.clone()
    }
}

/// JSON 文件配置存储
/// 打开时为缺失的键补默认值，保存时先写临时文件再改名
#[derive(Debug, Clone)]
pub struct JsonFileConfigStore {
    path: PathBuf,
    values: Map<String, Value>,
}

impl JsonFileConfigStore {
    /// 打开配置文件；文件不存在时使用默认值
    pub fn open(path: impl Into<PathBuf>, defaults: &Map<String, Value>) -> FileSortResult<Self> {
        let path = path.into();
        let mut values = if path.exists() {
            Self::read_file(&path)?
        } else {
            warn!("Config file {} not found, using defaults", path.display());
            Map::new()
        };

        let merged = ConfigPatcher::merge_defaults(&mut values, defaults);
        debug!(
            "Loaded config {} ({} keys, {} from defaults)",
            path.display(),
            values.len(),
            merged
        );

        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_file(path: &Path) -> FileSortResult<Map<String, Value>> {
        let data = fs::read(path)?;
        let value: Value = serde_json::from_slice(&data)?;
        match value {
            Value::Object(map) => Ok(map),
            other => Err(FileSortError::ConfigError(format!(
                "{} 必须是 JSON 对象，实际为 {}",
                path.display(),
                json_kind(&other)
            ))),
        }
    }
}

impl ConfigStore for JsonFileConfigStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
    }

    fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    fn save(&mut self) -> FileSortResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let data = serde_json::to_vec_pretty(&self.values)?;
        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        fs::write(&tmp_path, &data)?;
        fs::rename(&tmp_path, &self.path)?;

        debug!("Config saved to {}, {} bytes", self.path.display(), data.len());
        Ok(())
    }

    fn snapshot(&self) -> Map<String, Value> {
        self.values.clone()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "布尔值",
        Value::Number(_) => "数字",
        Value::String(_) => "字符串",
        Value::Array(_) => "数组",
        Value::Object(_) => "对象",
    }
}
