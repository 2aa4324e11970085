//! 全局错误类型定义

use thiserror::Error;
use regex::Error as RegexError;
use serde_json::Error as SerdeJsonError;
use std::io::Error as IoError;

#[derive(Error, Debug)]
pub enum FileSortError {
    // 规则构建相关错误
    #[error("未知的排序操作符：{operator:?}")]
    UnknownOperator { operator: String },
    #[error("正则编译失败 {operand:?}：{source}")]
    InvalidPattern {
        operand: String,
        #[source]
        source: RegexError,
    },
    #[error("排序规则记录无效：{0}")]
    InvalidRecord(String),
    #[error("第 {index} 条规则构建失败：{source}")]
    RuleSetBuild {
        index: usize,
        #[source]
        source: Box<FileSortError>,
    },

    // 分发相关错误
    #[error("种子不存在：{0}")]
    TorrentNotFound(String),

    // 配置相关错误
    #[error("配置错误：{0}")]
    ConfigError(String),

    // 序列化/反序列化错误
    #[error("JSON解析失败：{0}")]
    JsonError(#[from] SerdeJsonError),

    // 基础错误
    #[error("IO操作失败：{0}")]
    IoError(#[from] IoError),
}

impl FileSortError {
    /// 是否为规则校验类错误（未知操作符 / 非法正则 / 非法记录）
    pub fn is_validation(&self) -> bool {
        match self {
            FileSortError::UnknownOperator { .. }
            | FileSortError::InvalidPattern { .. }
            | FileSortError::InvalidRecord(_) => true,
            FileSortError::RuleSetBuild { source, .. } => source.is_validation(),
            _ => false,
        }
    }
}

// 全局Result类型
pub type FileSortResult<T> = Result<T, FileSortError>;
