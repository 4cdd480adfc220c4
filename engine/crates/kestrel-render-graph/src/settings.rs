use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::RgSettingsError;

/// RenderGraph 的运行时配置
///
/// 可以从 toml 加载，缺省字段使用默认值：
/// ```toml
/// label_passes = true
/// print_plan_on_process = false
/// warn_on_skipped_pass = true
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RgSettings {
    /// 在每个 pass 前后插入 debug label
    pub label_passes: bool,
    /// process 结束后打印执行计划
    pub print_plan_on_process: bool,
    /// pass 被跳过时使用 warn 级别日志，否则使用 debug
    pub warn_on_skipped_pass: bool,
}

impl Default for RgSettings {
    fn default() -> Self {
        Self {
            label_passes: true,
            print_plan_on_process: false,
            warn_on_skipped_pass: true,
        }
    }
}

impl RgSettings {
    pub fn from_toml_str(text: &str) -> Result<Self, RgSettingsError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, RgSettingsError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}
