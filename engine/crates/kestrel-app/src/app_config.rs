use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

/// graph-dump 的配置，对应 `config/graph_dump.toml`
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub frame: FrameConfig,
    pub passes: PassConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    pub width: u32,
    pub height: u32,
    /// 录制的帧数
    pub frames: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            frames: 3,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PassConfig {
    /// 是否在 lighting 之后叠加 debug overlay
    pub debug_overlay: bool,
    /// gbuffer pass 绘制的 index 数量
    pub index_count: u32,
}

impl Default for PassConfig {
    fn default() -> Self {
        Self {
            debug_overlay: true,
            index_count: 36,
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        toml::from_str(text).context("failed to parse app config")
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml_str(&text)
    }

    /// 读取失败时使用默认配置
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            log::warn!("{:#}, fallback to default app config", e);
            Self::default()
        })
    }
}
