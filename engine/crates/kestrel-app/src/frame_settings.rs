use ash::vk;

use crate::app_config::FrameConfig;

/// 渲染器默认配置
pub struct DefaultRendererSettings;
impl DefaultRendererSettings {
    // shader 输出会被自动改变： liner -> sRGB
    pub const DEFAULT_COLOR_FORMAT: vk::Format = vk::Format::R8G8B8A8_SRGB;
    pub const DEFAULT_DEPTH_FORMAT: vk::Format = vk::Format::D32_SFLOAT;
    /// 光照结果
    pub const HDR_FORMAT: vk::Format = vk::Format::R16G16B16A16_SFLOAT;
}

/// 帧级渲染配置
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FrameSettings {
    pub color_format: vk::Format,
    pub depth_format: vk::Format,
    pub frame_extent: vk::Extent2D,
}

impl From<&FrameConfig> for FrameSettings {
    fn from(config: &FrameConfig) -> Self {
        Self {
            color_format: DefaultRendererSettings::DEFAULT_COLOR_FORMAT,
            depth_format: DefaultRendererSettings::DEFAULT_DEPTH_FORMAT,
            frame_extent: vk::Extent2D {
                width: config.width,
                height: config.height,
            },
        }
    }
}
