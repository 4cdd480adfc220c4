//! barrier 描述
//!
//! [`RgBarrier`] 由 [`crate::usage_track::RgResourceUsageTrack`] 在记录 usage 时生成，
//! 执行时转换为 [`GfxImageBarrier`] / [`GfxBufferBarrier`] 并在 pass 之前一次性录制。

use ash::vk;
use kestrel_gfx::commands::barrier::{GfxBufferBarrier, GfxImageBarrier};

use crate::{
    resource::{RgResourceId, RgResourceKind},
    resource_state::src_access_of,
    subresource::RgSubresourceRange,
};

/// 一条需要插入的 barrier
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RgBarrier {
    pub resource: RgResourceId,
    pub kind: RgResourceKind,
    /// buffer 为 [`RgSubresourceRange::WHOLE_BUFFER`]
    pub range: RgSubresourceRange,

    /// 被覆盖的所有更早 usage 的 stage 并集
    pub src_stage: vk::PipelineStageFlags2,
    /// 被覆盖的所有更早 usage 的 access 并集
    pub src_access: vk::AccessFlags2,
    pub dst_stage: vk::PipelineStageFlags2,
    pub dst_access: vk::AccessFlags2,

    pub old_layout: vk::ImageLayout,
    pub new_layout: vk::ImageLayout,

    /// 造成 hazard 的 pass 在执行顺序中的位置，None 表示资源的初始状态
    pub src_pass: Option<usize>,
}

impl RgBarrier {
    #[inline]
    pub fn has_layout_transition(&self) -> bool {
        self.kind == RgResourceKind::Image && self.old_layout != self.new_layout
    }

    /// 转换为 GfxImageBarrier
    ///
    /// src access 只保留写操作
    pub fn to_gfx_image_barrier(&self, image: vk::Image) -> GfxImageBarrier {
        GfxImageBarrier::new(image, self.range.to_vk())
            .transition(self.old_layout, self.new_layout)
            .src(self.src_stage, src_access_of(self.src_access))
            .dst(self.dst_stage, self.dst_access)
    }

    /// 转换为 GfxBufferBarrier
    pub fn to_gfx_buffer_barrier(&self, buffer: vk::Buffer) -> GfxBufferBarrier {
        GfxBufferBarrier::whole(buffer)
            .src(self.src_stage, src_access_of(self.src_access))
            .dst(self.dst_stage, self.dst_access)
    }
}

/// Pass 执行前需要的 Barrier 集合
#[derive(Clone, Debug, Default)]
pub struct PassBarriers {
    pub image_barriers: Vec<RgBarrier>,
    pub buffer_barriers: Vec<RgBarrier>,
}

impl PassBarriers {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按资源类型放入对应的列表
    pub fn add(&mut self, barrier: RgBarrier) {
        match barrier.kind {
            RgResourceKind::Image => self.image_barriers.push(barrier),
            RgResourceKind::Buffer => self.buffer_barriers.push(barrier),
        }
    }

    pub fn extend(&mut self, barriers: impl IntoIterator<Item = RgBarrier>) {
        barriers.into_iter().for_each(|b| self.add(b));
    }

    /// 检查是否有 barrier
    #[inline]
    pub fn has_barriers(&self) -> bool {
        !self.image_barriers.is_empty() || !self.buffer_barriers.is_empty()
    }

    #[inline]
    pub fn image_barrier_count(&self) -> usize {
        self.image_barriers.len()
    }

    #[inline]
    pub fn buffer_barrier_count(&self) -> usize {
        self.buffer_barriers.len()
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &RgBarrier> {
        self.image_barriers.iter().chain(self.buffer_barriers.iter())
    }

    pub fn clear(&mut self) {
        self.image_barriers.clear();
        self.buffer_barriers.clear();
    }
}
