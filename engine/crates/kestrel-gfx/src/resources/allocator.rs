use std::collections::HashSet;

use ash::vk;
use ash::vk::Handle;

use crate::{
    error::GfxError,
    resources::{
        buffer::{GfxBuffer, GfxBufferCreateInfo},
        image::{GfxImage, GfxImageCreateInfo},
    },
};

/// 资源分配接口
///
/// render graph 通过这个 trait 创建自己持有的 image 和 buffer，
/// 分配失败时返回错误而不是 panic，由调用方决定如何降级。
pub trait GfxResourceAllocator {
    /// 创建 image 以及覆盖全部 subresource 的默认 view
    fn create_image(&mut self, info: &GfxImageCreateInfo, debug_name: &str) -> Result<GfxImage, GfxError>;

    /// 销毁 image 以及它的默认 view
    fn destroy_image(&mut self, image: &GfxImage);

    /// 为 image 的一部分 subresource 创建额外的 view
    fn create_image_view(
        &mut self,
        image: &GfxImage,
        view_type: vk::ImageViewType,
        range: vk::ImageSubresourceRange,
        debug_name: &str,
    ) -> Result<vk::ImageView, GfxError>;

    fn destroy_image_view(&mut self, view: vk::ImageView);

    fn create_buffer(&mut self, info: &GfxBufferCreateInfo, debug_name: &str) -> Result<GfxBuffer, GfxError>;

    fn destroy_buffer(&mut self, buffer: &GfxBuffer);
}

/// 不依赖 GPU 的分配器
///
/// 返回递增的伪句柄，只做参数校验和存活计数。用于 dry run 和测试。
/// 可以通过 [`Self::reject_format`] 模拟“格式不支持”之类的创建失败。
#[derive(Default)]
pub struct GfxHeadlessAllocator {
    next_handle: u64,
    rejected_formats: HashSet<vk::Format>,

    live_images: HashSet<vk::Image>,
    live_views: HashSet<vk::ImageView>,
    live_buffers: HashSet<vk::Buffer>,
}

// new & init
impl GfxHeadlessAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// builder
    ///
    /// 之后用这个格式创建 image 都会失败
    pub fn reject_format(mut self, format: vk::Format) -> Self {
        self.rejected_formats.insert(format);
        self
    }
}

// getters
impl GfxHeadlessAllocator {
    #[inline]
    pub fn live_image_count(&self) -> usize {
        self.live_images.len()
    }

    #[inline]
    pub fn live_view_count(&self) -> usize {
        self.live_views.len()
    }

    #[inline]
    pub fn live_buffer_count(&self) -> usize {
        self.live_buffers.len()
    }
}

impl GfxHeadlessAllocator {
    #[inline]
    fn next_raw_handle(&mut self) -> u64 {
        // 0 是 null handle
        self.next_handle += 1;
        self.next_handle
    }
}

impl GfxResourceAllocator for GfxHeadlessAllocator {
    fn create_image(&mut self, info: &GfxImageCreateInfo, debug_name: &str) -> Result<GfxImage, GfxError> {
        let extent = info.extent;
        if extent.width == 0 || extent.height == 0 || extent.depth == 0 || info.mip_levels == 0 || info.array_layers == 0
        {
            return Err(GfxError::InvalidExtent(extent));
        }
        if self.rejected_formats.contains(&info.format) {
            return Err(GfxError::UnsupportedFormat {
                format: info.format,
                usage: info.usage,
            });
        }

        let image = vk::Image::from_raw(self.next_raw_handle());
        let view = vk::ImageView::from_raw(self.next_raw_handle());
        self.live_images.insert(image);
        self.live_views.insert(view);

        log::trace!("headless image created: {} {:?}", debug_name, image);
        Ok(GfxImage::new(image, view, info))
    }

    fn destroy_image(&mut self, image: &GfxImage) {
        self.live_views.remove(&image.default_view());
        self.live_images.remove(&image.handle());
    }

    fn create_image_view(
        &mut self,
        image: &GfxImage,
        _view_type: vk::ImageViewType,
        range: vk::ImageSubresourceRange,
        debug_name: &str,
    ) -> Result<vk::ImageView, GfxError> {
        if image.handle() == vk::Image::null() {
            return Err(GfxError::Vk(vk::Result::ERROR_INITIALIZATION_FAILED));
        }
        if range.level_count == 0 || range.layer_count == 0 {
            return Err(GfxError::Vk(vk::Result::ERROR_FORMAT_NOT_SUPPORTED));
        }

        let view = vk::ImageView::from_raw(self.next_raw_handle());
        self.live_views.insert(view);
        log::trace!("headless image view created: {} {:?}", debug_name, view);
        Ok(view)
    }

    fn destroy_image_view(&mut self, view: vk::ImageView) {
        self.live_views.remove(&view);
    }

    fn create_buffer(&mut self, info: &GfxBufferCreateInfo, debug_name: &str) -> Result<GfxBuffer, GfxError> {
        if info.size == 0 {
            return Err(GfxError::ZeroSizedBuffer);
        }

        let buffer = vk::Buffer::from_raw(self.next_raw_handle());
        self.live_buffers.insert(buffer);
        log::trace!("headless buffer created: {} {:?}", debug_name, buffer);
        Ok(GfxBuffer::new(buffer, info.size))
    }

    fn destroy_buffer(&mut self, buffer: &GfxBuffer) {
        self.live_buffers.remove(&buffer.handle());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_create_and_destroy() {
        let mut allocator = GfxHeadlessAllocator::new();
        let info = GfxImageCreateInfo::new_2d(16, 16, vk::Format::R8G8B8A8_UNORM, vk::ImageUsageFlags::SAMPLED);
        let image = allocator.create_image(&info, "color").unwrap();
        let buffer = allocator.create_buffer(&GfxBufferCreateInfo::new(256, vk::BufferUsageFlags::TRANSFER_DST), "rb").unwrap();

        assert_ne!(image.handle(), vk::Image::null());
        assert_ne!(image.default_view(), vk::ImageView::null());
        assert_eq!(allocator.live_image_count(), 1);
        assert_eq!(allocator.live_buffer_count(), 1);

        allocator.destroy_image(&image);
        allocator.destroy_buffer(&buffer);
        assert_eq!(allocator.live_image_count(), 0);
        assert_eq!(allocator.live_view_count(), 0);
        assert_eq!(allocator.live_buffer_count(), 0);
    }

    #[test]
    fn test_headless_rejects_format() {
        let mut allocator = GfxHeadlessAllocator::new().reject_format(vk::Format::R32G32B32_SFLOAT);
        let info = GfxImageCreateInfo::new_2d(4, 4, vk::Format::R32G32B32_SFLOAT, vk::ImageUsageFlags::STORAGE);
        assert!(matches!(allocator.create_image(&info, "bad"), Err(GfxError::UnsupportedFormat { .. })));
        assert_eq!(allocator.live_image_count(), 0);
    }

    #[test]
    fn test_headless_rejects_zero_extent() {
        let mut allocator = GfxHeadlessAllocator::new();
        let info = GfxImageCreateInfo::new_2d(0, 4, vk::Format::R8G8B8A8_UNORM, vk::ImageUsageFlags::SAMPLED);
        assert!(matches!(allocator.create_image(&info, "empty"), Err(GfxError::InvalidExtent(_))));
        assert!(matches!(
            allocator.create_buffer(&GfxBufferCreateInfo::new(0, vk::BufferUsageFlags::STORAGE_BUFFER), "empty"),
            Err(GfxError::ZeroSizedBuffer)
        ));
    }
}
