use ash::vk;

use crate::basic::format::GfxFormat;

/// 创建 `vk::Image` 所需的信息
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GfxImageCreateInfo {
    pub extent: vk::Extent3D,
    pub format: vk::Format,
    pub usage: vk::ImageUsageFlags,
    pub mip_levels: u32,
    pub array_layers: u32,
    pub samples: vk::SampleCountFlags,
    pub image_type: vk::ImageType,
}

impl Default for GfxImageCreateInfo {
    fn default() -> Self {
        Self {
            extent: vk::Extent3D {
                width: 1,
                height: 1,
                depth: 1,
            },
            format: vk::Format::R8G8B8A8_UNORM,
            usage: vk::ImageUsageFlags::SAMPLED,
            mip_levels: 1,
            array_layers: 1,
            samples: vk::SampleCountFlags::TYPE_1,
            image_type: vk::ImageType::TYPE_2D,
        }
    }
}

// new & init & builder
impl GfxImageCreateInfo {
    #[inline]
    pub fn new_2d(width: u32, height: u32, format: vk::Format, usage: vk::ImageUsageFlags) -> Self {
        Self {
            extent: vk::Extent3D { width, height, depth: 1 },
            format,
            usage,
            ..Default::default()
        }
    }

    /// builder
    #[inline]
    pub fn with_mip_levels(mut self, mip_levels: u32) -> Self {
        self.mip_levels = mip_levels;
        self
    }

    /// builder
    #[inline]
    pub fn with_array_layers(mut self, array_layers: u32) -> Self {
        self.array_layers = array_layers;
        self
    }

    /// builder
    #[inline]
    pub fn with_samples(mut self, samples: vk::SampleCountFlags) -> Self {
        self.samples = samples;
        self
    }

    /// builder
    #[inline]
    pub fn with_usage(mut self, usage: vk::ImageUsageFlags) -> Self {
        self.usage |= usage;
        self
    }
}

// tools
impl GfxImageCreateInfo {
    pub fn to_vk(&self) -> vk::ImageCreateInfo<'static> {
        vk::ImageCreateInfo::default()
            .image_type(self.image_type)
            .format(self.format)
            .extent(self.extent)
            .mip_levels(self.mip_levels)
            .array_layers(self.array_layers)
            .samples(self.samples)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(self.usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED)
    }

    #[inline]
    pub fn full_subresource_range(&self) -> vk::ImageSubresourceRange {
        vk::ImageSubresourceRange {
            aspect_mask: GfxFormat::infer_aspect(self.format),
            base_mip_level: 0,
            level_count: self.mip_levels,
            base_array_layer: 0,
            layer_count: self.array_layers,
        }
    }

    #[inline]
    pub fn default_view_type(&self) -> vk::ImageViewType {
        GfxFormat::infer_view_type(self.image_type, self.array_layers)
    }
}

/// 一个已经存在的 image 及其默认 view
///
/// 只是句柄的集合，不拥有资源；谁创建谁销毁。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GfxImage {
    handle: vk::Image,
    default_view: vk::ImageView,
    format: vk::Format,
    extent: vk::Extent3D,
    mip_levels: u32,
    array_layers: u32,
    samples: vk::SampleCountFlags,
}

// new & init
impl GfxImage {
    pub fn new(handle: vk::Image, default_view: vk::ImageView, info: &GfxImageCreateInfo) -> Self {
        Self {
            handle,
            default_view,
            format: info.format,
            extent: info.extent,
            mip_levels: info.mip_levels,
            array_layers: info.array_layers,
            samples: info.samples,
        }
    }

    /// 由外部（例如 swapchain）持有的 2D image
    pub fn external_2d(handle: vk::Image, view: vk::ImageView, format: vk::Format, extent: vk::Extent2D) -> Self {
        Self {
            handle,
            default_view: view,
            format,
            extent: vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            },
            mip_levels: 1,
            array_layers: 1,
            samples: vk::SampleCountFlags::TYPE_1,
        }
    }
}

// getters
impl GfxImage {
    #[inline]
    pub fn handle(&self) -> vk::Image {
        self.handle
    }
    #[inline]
    pub fn default_view(&self) -> vk::ImageView {
        self.default_view
    }
    #[inline]
    pub fn format(&self) -> vk::Format {
        self.format
    }
    #[inline]
    pub fn extent(&self) -> vk::Extent3D {
        self.extent
    }
    #[inline]
    pub fn extent_2d(&self) -> vk::Extent2D {
        vk::Extent2D {
            width: self.extent.width,
            height: self.extent.height,
        }
    }
    #[inline]
    pub fn mip_levels(&self) -> u32 {
        self.mip_levels
    }
    #[inline]
    pub fn array_layers(&self) -> u32 {
        self.array_layers
    }
    #[inline]
    pub fn samples(&self) -> vk::SampleCountFlags {
        self.samples
    }
    #[inline]
    pub fn aspect(&self) -> vk::ImageAspectFlags {
        GfxFormat::infer_aspect(self.format)
    }
}
