//! 种子抽象：由宿主下载器提供，核心逻辑只读取 tracker 并调用两个完成后移动的设置接口

use serde::{Deserialize, Serialize};

/// tracker 记录（宿主 tracker 字典中除 url/tier 外的字段全部忽略）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerEntry {
    pub url: String,
    #[serde(default)]
    pub tier: u32,
}

impl TrackerEntry {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            tier: 0,
        }
    }
}

impl From<&str> for TrackerEntry {
    fn from(url: &str) -> Self {
        Self::new(url)
    }
}

/// 规则匹配所需的只读视图
pub trait TorrentMeta {
    /// 按宿主顺序返回 tracker 列表
    fn trackers(&self) -> &[TrackerEntry];
}

/// 宿主种子对象：在只读视图之上暴露完成后移动的两个设置接口
///
/// 宿主句柄通常自带内部可变性，因此设置接口只需要 `&self`。
pub trait Torrent: TorrentMeta {
    fn set_move_completed(&self, enabled: bool);
    fn set_move_completed_path(&self, path: &str);
}

/// 宿主种子注册表：按 torrent id 查找种子
pub trait TorrentRegistry {
    type Handle: Torrent + ?Sized;

    fn lookup(&self, torrent_id: &str) -> Option<&Self::Handle>;
}
