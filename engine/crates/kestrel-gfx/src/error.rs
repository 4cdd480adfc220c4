use ash::vk;

/// GFX 层的错误
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GfxError {
    #[error("vulkan call failed: {0}")]
    Vk(#[from] vk::Result),

    #[error("format {format:?} does not support usage {usage:?}")]
    UnsupportedFormat {
        format: vk::Format,
        usage: vk::ImageUsageFlags,
    },

    #[error("image extent {0:?} has a zero dimension")]
    InvalidExtent(vk::Extent3D),

    #[error("buffer size must be greater than zero")]
    ZeroSizedBuffer,
}
