use std::collections::HashMap;

use ash::vk;
use vk_mem::Alloc;

use crate::{
    error::GfxError,
    resources::{
        allocator::GfxResourceAllocator,
        buffer::{GfxBuffer, GfxBufferCreateInfo},
        image::{GfxImage, GfxImageCreateInfo},
    },
};

/// 基于 vk-mem 的资源分配器
///
/// 由于 vma 的生命周期设定：需要引用 Instance 以及 Device，
/// 调用方需要保证 Instance 和 Device 在分配器销毁之前一直有效。
pub struct GfxVmaAllocator {
    device: ash::Device,
    vma: vk_mem::Allocator,

    image_allocations: HashMap<vk::Image, vk_mem::Allocation>,
    buffer_allocations: HashMap<vk::Buffer, vk_mem::Allocation>,
}

// new & init
impl GfxVmaAllocator {
    pub fn new(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        device: &ash::Device,
    ) -> Result<Self, GfxError> {
        let mut vma_ci = vk_mem::AllocatorCreateInfo::new(instance, device, physical_device);
        vma_ci.vulkan_api_version = vk::API_VERSION_1_3;

        let vma = unsafe { vk_mem::Allocator::new(vma_ci)? };

        Ok(Self {
            device: device.clone(),
            vma,
            image_allocations: HashMap::new(),
            buffer_allocations: HashMap::new(),
        })
    }
}

impl GfxResourceAllocator for GfxVmaAllocator {
    fn create_image(&mut self, info: &GfxImageCreateInfo, debug_name: &str) -> Result<GfxImage, GfxError> {
        let alloc_info = vk_mem::AllocationCreateInfo {
            usage: vk_mem::MemoryUsage::AutoPreferDevice,
            ..Default::default()
        };
        let (image, mut alloc) = unsafe { self.vma.create_image(&info.to_vk(), &alloc_info)? };

        let view_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(info.default_view_type())
            .format(info.format)
            .subresource_range(info.full_subresource_range());
        let view = match unsafe { self.device.create_image_view(&view_info, None) } {
            Ok(view) => view,
            Err(e) => {
                unsafe { self.vma.destroy_image(image, &mut alloc) };
                return Err(e.into());
            }
        };

        log::debug!("vma image created: {} {:?}", debug_name, image);
        self.image_allocations.insert(image, alloc);
        Ok(GfxImage::new(image, view, info))
    }

    fn destroy_image(&mut self, image: &GfxImage) {
        unsafe { self.device.destroy_image_view(image.default_view(), None) };
        if let Some(mut alloc) = self.image_allocations.remove(&image.handle()) {
            unsafe { self.vma.destroy_image(image.handle(), &mut alloc) };
        } else {
            log::warn!("destroy an image not created by this allocator: {:?}", image.handle());
        }
    }

    fn create_image_view(
        &mut self,
        image: &GfxImage,
        view_type: vk::ImageViewType,
        range: vk::ImageSubresourceRange,
        debug_name: &str,
    ) -> Result<vk::ImageView, GfxError> {
        let view_info = vk::ImageViewCreateInfo::default()
            .image(image.handle())
            .view_type(view_type)
            .format(image.format())
            .subresource_range(range);
        let view = unsafe { self.device.create_image_view(&view_info, None)? };
        log::debug!("image view created: {} {:?}", debug_name, view);
        Ok(view)
    }

    fn destroy_image_view(&mut self, view: vk::ImageView) {
        unsafe { self.device.destroy_image_view(view, None) };
    }

    fn create_buffer(&mut self, info: &GfxBufferCreateInfo, debug_name: &str) -> Result<GfxBuffer, GfxError> {
        if info.size == 0 {
            return Err(GfxError::ZeroSizedBuffer);
        }
        let alloc_info = vk_mem::AllocationCreateInfo {
            usage: vk_mem::MemoryUsage::AutoPreferDevice,
            flags: if info.host_visible {
                vk_mem::AllocationCreateFlags::HOST_ACCESS_RANDOM
            } else {
                vk_mem::AllocationCreateFlags::empty()
            },
            ..Default::default()
        };
        let (buffer, alloc) = unsafe { self.vma.create_buffer(&info.to_vk(), &alloc_info)? };

        log::debug!("vma buffer created: {} {:?}", debug_name, buffer);
        self.buffer_allocations.insert(buffer, alloc);
        Ok(GfxBuffer::new(buffer, info.size))
    }

    fn destroy_buffer(&mut self, buffer: &GfxBuffer) {
        if let Some(mut alloc) = self.buffer_allocations.remove(&buffer.handle()) {
            unsafe { self.vma.destroy_buffer(buffer.handle(), &mut alloc) };
        } else {
            log::warn!("destroy a buffer not created by this allocator: {:?}", buffer.handle());
        }
    }
}

impl Drop for GfxVmaAllocator {
    fn drop(&mut self) {
        debug_assert!(self.image_allocations.is_empty(), "images leaked: {}", self.image_allocations.len());
        debug_assert!(self.buffer_allocations.is_empty(), "buffers leaked: {}", self.buffer_allocations.len());
    }
}
