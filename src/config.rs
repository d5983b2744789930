//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `ACTCHAIN__*` 覆盖（双下划线表示嵌套，如 `ACTCHAIN__CHAIN__PLACEHOLDER=unknown`）。

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::chain::PermissionMap;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub chain: ChainSection,
}

/// [app] 段
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppSection {
    pub name: Option<String>,
}

/// [chain] 段：占位符、可选调用超时、审计日志参数预览长度、默认权限表
#[derive(Debug, Clone, Deserialize)]
pub struct ChainSection {
    /// 参数中表示「需从上下文解析」的保留值
    #[serde(default = "default_placeholder")]
    pub placeholder: String,
    /// 单次动作调用超时（秒）；未设置时等待动作自然结束。超时记为 InvocationFailure，不重试
    #[serde(default)]
    pub invocation_timeout_secs: Option<u64>,
    #[serde(default = "default_args_preview_chars")]
    pub args_preview_chars: usize,
    /// 动作名 -> 是否允许；未列出的动作一律拒绝
    #[serde(default)]
    pub permissions: HashMap<String, bool>,
}

fn default_placeholder() -> String {
    "unknown".to_string()
}

fn default_args_preview_chars() -> usize {
    200
}

impl Default for ChainSection {
    fn default() -> Self {
        Self {
            placeholder: default_placeholder(),
            invocation_timeout_secs: None,
            args_preview_chars: default_args_preview_chars(),
            permissions: HashMap::new(),
        }
    }
}

impl ChainSection {
    pub fn permission_map(&self) -> PermissionMap {
        self.permissions
            .iter()
            .map(|(name, allowed)| (name.clone(), *allowed))
            .collect()
    }
}

/// 从 config 目录加载配置，环境变量 ACTCHAIN__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 ACTCHAIN__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("ACTCHAIN")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
