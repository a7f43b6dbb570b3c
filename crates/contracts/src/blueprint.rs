//! LoggerBlueprint - Config Loader 输出
//!
//! 描述完整的 logger 配置：名称、数据源、标签表、各导出器开关与连接参数。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::{PublishContext, TagMetadata};

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// 完整的 logger 配置蓝图
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggerBlueprint {
    /// 配置版本
    #[serde(default)]
    pub version: ConfigVersion,

    /// Logger 标识
    pub logger: LoggerConfig,

    /// 监控数据源
    pub source: SourceConfig,

    /// 标签元数据表
    #[serde(default)]
    pub tags: Vec<TagMetadata>,

    /// 导出器配置
    #[serde(default)]
    pub exporters: ExportersConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggerConfig {
    /// Logger 名称，去掉空格后作为 namespace
    pub name: String,
}

/// 数据源配置 (OPC-UA 客户端本身不在本工作区内)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// 服务器 endpoint URL
    pub url: String,

    /// 是否需要引导生成自签名证书 (由外部引导程序处理)
    #[serde(default)]
    pub generate_cert: bool,
}

/// 四个导出器
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportersConfig {
    pub metrics: MetricsExporterConfig,
    pub http: HttpExporterConfig,
    pub broadcast: BroadcastExporterConfig,
    pub document_store: DocumentStoreConfig,
}

/// Prometheus 拉取端点
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsExporterConfig {
    pub enabled: bool,
    /// 监听地址，路径为 `/{namespace}/metrics`
    pub bind: SocketAddr,
}

impl Default for MetricsExporterConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind: SocketAddr::from(([0, 0, 0, 0], 9100)),
        }
    }
}

/// HTTP 推送
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpExporterConfig {
    pub enabled: bool,
    /// 目标 URL
    pub url: String,
    pub auth: HttpAuth,
    /// 单次请求超时 (秒)
    pub timeout_secs: u64,
    /// 队列容量
    pub queue_capacity: usize,
}

impl Default for HttpExporterConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: String::new(),
            auth: HttpAuth::None,
            timeout_secs: 5,
            queue_capacity: 256,
        }
    }
}

/// HTTP 认证方式
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HttpAuth {
    #[default]
    None,
    Basic { username: String, password: String },
    Bearer { token: String },
}

// 不在日志中输出凭据
impl fmt::Debug for HttpAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"***")
                .finish(),
            Self::Bearer { .. } => f.debug_struct("Bearer").field("token", &"***").finish(),
        }
    }
}

/// Websocket 广播
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BroadcastExporterConfig {
    pub enabled: bool,
    /// 监听地址，路径为 `/ws`
    pub bind: SocketAddr,
    /// 广播通道容量，慢订阅者超出后丢消息
    pub channel_capacity: usize,
}

impl Default for BroadcastExporterConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind: SocketAddr::from(([0, 0, 0, 0], 9101)),
            channel_capacity: 1024,
        }
    }
}

/// 文档存储
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentStoreConfig {
    pub enabled: bool,
    /// 存储根目录，每个 namespace 一个集合文件
    pub base_path: PathBuf,
    /// 队列容量
    pub queue_capacity: usize,
}

impl Default for DocumentStoreConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_path: PathBuf::from("./data"),
            queue_capacity: 256,
        }
    }
}

/// 启用的 sink 集合，启动时确定，之后只读
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EnabledSinks {
    pub metrics: bool,
    pub http: bool,
    pub broadcast: bool,
    pub document_store: bool,
}

impl EnabledSinks {
    pub fn count(&self) -> usize {
        [self.metrics, self.http, self.broadcast, self.document_store]
            .into_iter()
            .filter(|enabled| *enabled)
            .count()
    }
}

impl LoggerBlueprint {
    pub fn enabled_sinks(&self) -> EnabledSinks {
        EnabledSinks {
            metrics: self.exporters.metrics.enabled,
            http: self.exporters.http.enabled,
            broadcast: self.exporters.broadcast.enabled,
            document_store: self.exporters.document_store.enabled,
        }
    }

    pub fn publish_context(&self) -> PublishContext {
        PublishContext::new(&self.logger.name, &self.source.url)
    }
}
