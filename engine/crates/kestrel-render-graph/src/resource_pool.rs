//! graph 的资源表
//!
//! 外部资源只登记句柄，从不销毁；graph 创建的资源由池负责创建和销毁。

use ash::vk;
use kestrel_gfx::{
    error::GfxError,
    resources::{allocator::GfxResourceAllocator, buffer::GfxBuffer, image::GfxImage},
};
use slotmap::SlotMap;

use crate::{
    resource::{RgAccess, RgResourceCreateInfo, RgResourceId, RgResourceKind, RgResourceRef},
    resource_state::{RgBufferState, RgImageState},
    subresource::RgSubresourceRange,
};

/// 物理资源
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RgPhysicalResource {
    Image(GfxImage),
    Buffer(GfxBuffer),
}

impl RgPhysicalResource {
    #[inline]
    pub fn kind(&self) -> RgResourceKind {
        match self {
            Self::Image(_) => RgResourceKind::Image,
            Self::Buffer(_) => RgResourceKind::Buffer,
        }
    }

    /// 整个资源的子资源范围
    #[inline]
    pub fn full_range(&self) -> RgSubresourceRange {
        match self {
            Self::Image(image) => RgSubresourceRange::full(image.aspect(), image.mip_levels(), image.array_layers()),
            Self::Buffer(_) => RgSubresourceRange::WHOLE_BUFFER,
        }
    }
}

#[derive(Debug)]
pub enum RgResourceStatus {
    /// 外部持有
    External(RgPhysicalResource),
    /// 等待 process 时创建
    Pending(RgResourceCreateInfo),
    /// 已由池创建
    Created {
        info: RgResourceCreateInfo,
        physical: RgPhysicalResource,
    },
    /// 创建失败，引用它的 descriptor 会解析为空引用
    Failed {
        info: RgResourceCreateInfo,
        error: GfxError,
    },
}

#[derive(Debug)]
pub struct RgResourceEntry {
    pub(crate) name: String,
    pub(crate) kind: RgResourceKind,
    pub(crate) status: RgResourceStatus,
    /// 每帧开始时（或第一次使用前）资源所处的状态
    pub(crate) initial_access: RgAccess,
}

// getters
impl RgResourceEntry {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn kind(&self) -> RgResourceKind {
        self.kind
    }

    #[inline]
    pub fn physical(&self) -> Option<RgPhysicalResource> {
        match &self.status {
            RgResourceStatus::External(physical) | RgResourceStatus::Created { physical, .. } => Some(*physical),
            RgResourceStatus::Pending(_) | RgResourceStatus::Failed { .. } => None,
        }
    }

    #[inline]
    pub fn is_pool_owned(&self) -> bool {
        !matches!(self.status, RgResourceStatus::External(_))
    }

    #[inline]
    pub fn is_failed(&self) -> bool {
        matches!(self.status, RgResourceStatus::Failed { .. })
    }
}

/// [`RgResourcePool::realize`] 的结果
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RgRealizeReport {
    pub created: usize,
    pub failed: Vec<RgResourceId>,
}

#[derive(Default)]
pub struct RgResourcePool {
    entries: SlotMap<RgResourceId, RgResourceEntry>,
}

// new & init
impl RgResourcePool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn import_image(&mut self, name: impl Into<String>, image: GfxImage, initial_state: RgImageState) -> RgResourceRef {
        let id = self.entries.insert(RgResourceEntry {
            name: name.into(),
            kind: RgResourceKind::Image,
            status: RgResourceStatus::External(RgPhysicalResource::Image(image)),
            initial_access: initial_state.into(),
        });
        RgResourceRef::new(RgResourceKind::Image, id)
    }

    pub fn import_buffer(
        &mut self,
        name: impl Into<String>,
        buffer: GfxBuffer,
        initial_state: RgBufferState,
    ) -> RgResourceRef {
        let id = self.entries.insert(RgResourceEntry {
            name: name.into(),
            kind: RgResourceKind::Buffer,
            status: RgResourceStatus::External(RgPhysicalResource::Buffer(buffer)),
            initial_access: initial_state.into(),
        });
        RgResourceRef::new(RgResourceKind::Buffer, id)
    }

    /// 登记一个创建请求，真正的创建发生在 [`Self::realize`]
    pub fn request(&mut self, name: impl Into<String>, info: RgResourceCreateInfo) -> RgResourceRef {
        let kind = info.kind();
        let initial_access = match kind {
            RgResourceKind::Image => RgImageState::UNDEFINED.into(),
            RgResourceKind::Buffer => RgBufferState::UNDEFINED.into(),
        };
        let id = self.entries.insert(RgResourceEntry {
            name: name.into(),
            kind,
            status: RgResourceStatus::Pending(info),
            initial_access,
        });
        RgResourceRef::new(kind, id)
    }
}

// getters
impl RgResourcePool {
    #[inline]
    pub fn get(&self, id: RgResourceId) -> Option<&RgResourceEntry> {
        self.entries.get(id)
    }

    #[inline]
    pub fn physical(&self, id: RgResourceId) -> Option<RgPhysicalResource> {
        self.entries.get(id).and_then(|e| e.physical())
    }

    #[inline]
    pub fn name(&self, id: RgResourceId) -> &str {
        self.entries.get(id).map(|e| e.name.as_str()).unwrap_or("<unknown>")
    }

    #[inline]
    pub fn is_failed(&self, id: RgResourceId) -> bool {
        self.entries.get(id).is_some_and(|e| e.is_failed())
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (RgResourceId, &RgResourceEntry)> {
        self.entries.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// 创建与销毁
impl RgResourcePool {
    /// 创建所有等待中的资源
    ///
    /// 失败不会中断：失败的资源被标记为 Failed，由调用方把依赖它的 pass 降级为跳过。
    pub fn realize(&mut self, allocator: &mut dyn GfxResourceAllocator) -> RgRealizeReport {
        let mut report = RgRealizeReport::default();

        for (id, entry) in self.entries.iter_mut() {
            let RgResourceStatus::Pending(info) = &entry.status else {
                continue;
            };
            let info = info.clone();

            let result = match &info {
                RgResourceCreateInfo::Image(image_info) => {
                    allocator.create_image(image_info, &entry.name).map(RgPhysicalResource::Image)
                }
                RgResourceCreateInfo::Buffer(buffer_info) => {
                    allocator.create_buffer(buffer_info, &entry.name).map(RgPhysicalResource::Buffer)
                }
            };

            entry.status = match result {
                Ok(physical) => {
                    report.created += 1;
                    RgResourceStatus::Created { info, physical }
                }
                Err(error) => {
                    log::warn!("RenderGraph: failed to create resource \"{}\": {}", entry.name, error);
                    report.failed.push(id);
                    RgResourceStatus::Failed { info, error }
                }
            };
        }

        report
    }

    /// 销毁所有由池创建的资源，并恢复为等待创建的状态
    ///
    /// 外部资源保持不变。
    pub fn release(&mut self, allocator: &mut dyn GfxResourceAllocator) {
        for (_, entry) in self.entries.iter_mut() {
            let status = std::mem::replace(&mut entry.status, RgResourceStatus::External(placeholder()));
            entry.status = match status {
                RgResourceStatus::Created { info, physical } => {
                    match physical {
                        RgPhysicalResource::Image(image) => allocator.destroy_image(&image),
                        RgPhysicalResource::Buffer(buffer) => allocator.destroy_buffer(&buffer),
                    }
                    RgResourceStatus::Pending(info)
                }
                RgResourceStatus::Failed { info, .. } => RgResourceStatus::Pending(info),
                other => other,
            };
        }
    }

    /// 销毁池中的资源并清空资源表
    pub fn clear(&mut self, allocator: &mut dyn GfxResourceAllocator) {
        self.release(allocator);
        self.entries.clear();
    }
}

/// `std::mem::replace` 时临时占位
#[inline]
fn placeholder() -> RgPhysicalResource {
    RgPhysicalResource::Buffer(GfxBuffer::new(vk::Buffer::null(), 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_gfx::resources::{
        allocator::GfxHeadlessAllocator, buffer::GfxBufferCreateInfo, image::GfxImageCreateInfo,
    };

    fn color_info(format: vk::Format) -> RgResourceCreateInfo {
        RgResourceCreateInfo::Image(GfxImageCreateInfo::new_2d(
            8,
            8,
            format,
            vk::ImageUsageFlags::COLOR_ATTACHMENT,
        ))
    }

    #[test]
    fn test_realize_and_release() {
        let mut allocator = GfxHeadlessAllocator::new();
        let mut pool = RgResourcePool::new();
        let image = pool.request("color", color_info(vk::Format::R8G8B8A8_UNORM));
        let buffer = pool.request(
            "readback",
            RgResourceCreateInfo::Buffer(GfxBufferCreateInfo::new(64, vk::BufferUsageFlags::TRANSFER_DST)),
        );

        assert!(pool.physical(image.id().unwrap()).is_none());
        let report = pool.realize(&mut allocator);
        assert_eq!(report.created, 2);
        assert!(report.failed.is_empty());
        assert!(pool.physical(image.id().unwrap()).is_some());
        assert!(pool.physical(buffer.id().unwrap()).is_some());
        assert_eq!(allocator.live_image_count(), 1);

        pool.release(&mut allocator);
        assert_eq!(allocator.live_image_count(), 0);
        assert_eq!(allocator.live_buffer_count(), 0);
        assert!(pool.physical(image.id().unwrap()).is_none());
    }

    #[test]
    fn test_failed_creation_is_marked() {
        let mut allocator = GfxHeadlessAllocator::new().reject_format(vk::Format::R16G16B16_SFLOAT);
        let mut pool = RgResourcePool::new();
        let bad = pool.request("bad", color_info(vk::Format::R16G16B16_SFLOAT));
        let good = pool.request("good", color_info(vk::Format::R8G8B8A8_UNORM));

        let report = pool.realize(&mut allocator);
        assert_eq!(report.created, 1);
        assert_eq!(report.failed, vec![bad.id().unwrap()]);
        assert!(pool.is_failed(bad.id().unwrap()));
        assert!(!pool.is_failed(good.id().unwrap()));
    }

    #[test]
    fn test_external_resources_are_never_destroyed() {
        let mut allocator = GfxHeadlessAllocator::new();
        let swapchain_image = allocator
            .create_image(
                &GfxImageCreateInfo::new_2d(4, 4, vk::Format::B8G8R8A8_SRGB, vk::ImageUsageFlags::COLOR_ATTACHMENT),
                "swapchain",
            )
            .unwrap();

        let mut pool = RgResourcePool::new();
        let external = pool.import_image("swapchain", swapchain_image, RgImageState::UNDEFINED);
        pool.clear(&mut allocator);

        assert_eq!(allocator.live_image_count(), 1);
        assert!(pool.get(external.id().unwrap()).is_none());
    }
}
