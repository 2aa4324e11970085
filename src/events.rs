//! 种子生命周期事件：事件类型定义、宿主事件管理接口与进程内同步事件总线

use std::collections::HashMap;
use std::fmt;

use tracing::debug;

/// 插件关心的种子事件
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TorrentEventKind {
    TorrentAdded,
    TorrentFinished,
}

impl TorrentEventKind {
    /// 宿主侧的事件名称
    pub fn event_name(&self) -> &'static str {
        match self {
            TorrentEventKind::TorrentAdded => "TorrentAddedEvent",
            TorrentEventKind::TorrentFinished => "TorrentFinishedEvent",
        }
    }
}

impl fmt::Display for TorrentEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.event_name())
    }
}

/// 事件回调，参数为 torrent id
pub type EventHandler = Box<dyn Fn(&str) + Send + Sync>;

/// 注册句柄，用于注销
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

/// 宿主事件管理接口
pub trait EventManager {
    fn register_event_handler(&mut self, kind: TorrentEventKind, handler: EventHandler) -> HandlerId;

    /// 注销回调，返回是否确实移除
    fn deregister_event_handler(&mut self, kind: TorrentEventKind, id: HandlerId) -> bool;
}

/// 进程内同步事件总线：一次只投递一个事件，按注册顺序调用回调
#[derive(Default)]
pub struct EventBus {
    handlers: HashMap<TorrentEventKind, Vec<(HandlerId, EventHandler)>>,
    next_id: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// 投递事件，返回被调用的回调数量
    pub fn emit(&self, kind: TorrentEventKind, torrent_id: &str) -> usize {
        let Some(handlers) = self.handlers.get(&kind) else {
            debug!("No handler registered for {}, torrent={}", kind, torrent_id);
            return 0;
        };

        for (_, handler) in handlers {
            handler(torrent_id);
        }
        handlers.len()
    }

    pub fn handler_count(&self, kind: TorrentEventKind) -> usize {
        self.handlers.get(&kind).map_or(0, Vec::len)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: HashMap<_, _> = self
            .handlers
            .iter()
            .map(|(kind, handlers)| (*kind, handlers.len()))
            .collect();
        f.debug_struct("EventBus")
            .field("handlers", &counts)
            .field("next_id", &self.next_id)
            .finish()
    }
}

impl EventManager for EventBus {
    fn register_event_handler(&mut self, kind: TorrentEventKind, handler: EventHandler) -> HandlerId {
        let id = HandlerId(self.next_id);
        self.next_id += 1;
        self.handlers.entry(kind).or_default().push((id, handler));
        debug!("Registered handler {:?} for {}", id, kind);
        id
    }

    fn deregister_event_handler(&mut self, kind: TorrentEventKind, id: HandlerId) -> bool {
        let Some(handlers) = self.handlers.get_mut(&kind) else {
            return false;
        };
        let before = handlers.len();
        handlers.retain(|(handler_id, _)| *handler_id != id);
        before != handlers.len()
    }
}
