//! sync2 barrier 的轻量封装
//!
//! 录制器（[`super::recorder::GfxCommandRecorder::pipeline_barrier`]）只接收这两种类型，
//! queue family 固定为 IGNORED，不做 ownership transfer。

use ash::vk;

/// 一张图像一段 subresource 上的 barrier
#[derive(Copy, Clone, Debug)]
pub struct GfxImageBarrier {
    inner: vk::ImageMemoryBarrier2<'static>,
}

impl GfxImageBarrier {
    /// 不做 layout 转换，mask 为空
    pub fn new(image: vk::Image, range: vk::ImageSubresourceRange) -> Self {
        Self {
            inner: vk::ImageMemoryBarrier2 {
                image,
                subresource_range: range,
                old_layout: vk::ImageLayout::UNDEFINED,
                new_layout: vk::ImageLayout::UNDEFINED,
                src_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
                dst_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
                ..Default::default()
            },
        }
    }

    #[inline]
    pub fn inner(&self) -> &vk::ImageMemoryBarrier2<'_> {
        &self.inner
    }

    /// builder
    #[inline]
    pub fn transition(mut self, old_layout: vk::ImageLayout, new_layout: vk::ImageLayout) -> Self {
        self.inner.old_layout = old_layout;
        self.inner.new_layout = new_layout;
        self
    }

    /// builder
    #[inline]
    pub fn src(mut self, stage: vk::PipelineStageFlags2, access: vk::AccessFlags2) -> Self {
        self.inner.src_stage_mask = stage;
        self.inner.src_access_mask = access;
        self
    }

    /// builder
    #[inline]
    pub fn dst(mut self, stage: vk::PipelineStageFlags2, access: vk::AccessFlags2) -> Self {
        self.inner.dst_stage_mask = stage;
        self.inner.dst_access_mask = access;
        self
    }
}

/// 整个 buffer 上的 barrier
#[derive(Copy, Clone, Debug)]
pub struct GfxBufferBarrier {
    inner: vk::BufferMemoryBarrier2<'static>,
}

impl GfxBufferBarrier {
    pub fn whole(buffer: vk::Buffer) -> Self {
        Self {
            inner: vk::BufferMemoryBarrier2 {
                buffer,
                offset: 0,
                size: vk::WHOLE_SIZE,
                src_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
                dst_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
                ..Default::default()
            },
        }
    }

    #[inline]
    pub fn inner(&self) -> &vk::BufferMemoryBarrier2<'_> {
        &self.inner
    }

    /// builder
    #[inline]
    pub fn src(mut self, stage: vk::PipelineStageFlags2, access: vk::AccessFlags2) -> Self {
        self.inner.src_stage_mask = stage;
        self.inner.src_access_mask = access;
        self
    }

    /// builder
    #[inline]
    pub fn dst(mut self, stage: vk::PipelineStageFlags2, access: vk::AccessFlags2) -> Self {
        self.inner.dst_stage_mask = stage;
        self.inner.dst_access_mask = access;
        self
    }
}
