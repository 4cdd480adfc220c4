//! RenderGraph
//!
//! # 使用流程
//!
//! 1. 创建 graph: `RenderGraph::new(settings)`
//! 2. 导入外部资源: `graph.import_image(...)`
//! 3. 添加 Pass: `graph.add_node(...)` 或 `graph.add_pass(...)`
//! 4. 连接 port: `graph.connect(...)`
//! 5. 编译: `graph.process(allocator)`，结构变化后需要重新调用
//! 6. 每帧执行: `graph.execute(cmd, frame_label)`
//!
//! # 生命周期
//!
//! `'a` 是 Pass 回调可以借用的外部数据的生命周期。

mod connect;
mod execute;
mod process;

#[cfg(test)]
mod tests;

use kestrel_gfx::resources::{allocator::GfxResourceAllocator, buffer::GfxBuffer, image::GfxImage};
use slotmap::{SecondaryMap, SlotMap};

use crate::{
    pass::{RgClosureExecutor, RgPass, RgPassBuilder, RgPassContext, RgPassExecutorWrapper, RgPassHandle, RgPassNode},
    render_pass::RgSubpass,
    resource::{RgResourceDescriptor, RgResourceId, RgResourceRef},
    resource_pool::RgResourcePool,
    resource_state::{RgBufferState, RgImageState},
    settings::RgSettings,
    usage_track::{RgResourceUsageTrack, RgUsage},
};

pub use execute::RgFrameStats;
pub use process::RgProcessReport;

pub struct RenderGraph<'a> {
    settings: RgSettings,

    passes: SlotMap<RgPassHandle, RgPassNode<'a>>,
    /// 添加顺序，depth 相同时按这个顺序执行
    insertion_order: Vec<RgPassHandle>,

    pool: RgResourcePool,

    /// 当前帧每个资源的使用历史
    tracks: SecondaryMap<RgResourceId, RgResourceUsageTrack>,
    /// 上一帧结束时池中资源的状态
    carry_over: SecondaryMap<RgResourceId, Vec<RgUsage>>,

    /// process 计算出的执行顺序
    execution_order: Vec<RgPassHandle>,
    /// 结构变化后需要重新 process
    processed: bool,
}

impl Default for RenderGraph<'_> {
    fn default() -> Self {
        Self::new(RgSettings::default())
    }
}

// new & init
impl<'a> RenderGraph<'a> {
    pub fn new(settings: RgSettings) -> Self {
        Self {
            settings,
            passes: SlotMap::with_key(),
            insertion_order: Vec::new(),
            pool: RgResourcePool::new(),
            tracks: SecondaryMap::new(),
            carry_over: SecondaryMap::new(),
            execution_order: Vec::new(),
            processed: false,
        }
    }

    /// 导入外部图像资源
    ///
    /// # 参数
    /// - `initial_state`: 每帧开始时图像所处的状态
    ///
    /// graph 不会销毁外部资源。
    pub fn import_image(&mut self, name: impl Into<String>, image: GfxImage, initial_state: RgImageState) -> RgResourceRef {
        self.pool.import_image(name, image, initial_state)
    }

    /// 导入外部缓冲区资源
    pub fn import_buffer(
        &mut self,
        name: impl Into<String>,
        buffer: GfxBuffer,
        initial_state: RgBufferState,
    ) -> RgResourceRef {
        self.pool.import_buffer(name, buffer, initial_state)
    }

    /// 添加一个以闭包为回调的 pass
    ///
    /// 回调接收命令录制器以及按 handle 查询物理资源的上下文。
    /// 光栅 pass（`subpasses` 非空）的回调在每个 subpass 的 begin/end rendering 之间各调用一次。
    pub fn add_node(
        &mut self,
        name: impl Into<String>,
        descriptors: Vec<RgResourceDescriptor>,
        subpasses: Vec<RgSubpass>,
        callback: impl FnMut(&mut RgPassContext<'_>) + 'a,
    ) -> RgPassHandle {
        let node = RgPassNode::new(
            name.into(),
            descriptors,
            subpasses,
            Box::new(RgClosureExecutor(callback)),
            &mut self.pool,
        );
        self.insert_node(node)
    }

    /// 添加实现了 [`RgPass`] 的 pass
    pub fn add_pass<P: RgPass + 'a>(&mut self, name: impl Into<String>, mut pass: P) -> RgPassHandle {
        let mut builder = RgPassBuilder::default();
        pass.setup(&mut builder);

        let node = RgPassNode::new(
            name.into(),
            builder.descriptors,
            builder.subpasses,
            Box::new(RgPassExecutorWrapper { pass }),
            &mut self.pool,
        );
        self.insert_node(node)
    }

    fn insert_node(&mut self, node: RgPassNode<'a>) -> RgPassHandle {
        log::debug!("RenderGraph: add pass \"{}\"", node.name());
        let handle = self.passes.insert(node);
        self.insertion_order.push(handle);
        self.processed = false;
        handle
    }
}

// getters
impl<'a> RenderGraph<'a> {
    #[inline]
    pub fn settings(&self) -> &RgSettings {
        &self.settings
    }

    #[inline]
    pub fn pass(&self, handle: RgPassHandle) -> Option<&RgPassNode<'a>> {
        self.passes.get(handle)
    }

    #[inline]
    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    #[inline]
    pub fn passes(&self) -> impl Iterator<Item = (RgPassHandle, &RgPassNode<'a>)> {
        self.insertion_order.iter().map(|&h| (h, &self.passes[h]))
    }

    /// 最近一次 process 计算出的执行顺序
    #[inline]
    pub fn execution_order(&self) -> &[RgPassHandle] {
        &self.execution_order
    }

    #[inline]
    pub fn resource_pool(&self) -> &RgResourcePool {
        &self.pool
    }

    #[inline]
    pub fn is_processed(&self) -> bool {
        self.processed
    }
}

// destroy
impl RenderGraph<'_> {
    /// 销毁 graph 创建的所有资源并移除所有 pass
    ///
    /// 用于 swapchain 重建等结构变化：清空后重新构建整个 graph。
    pub fn clear(&mut self, allocator: &mut dyn GfxResourceAllocator) {
        self.release_compiled(allocator);
        self.pool.clear(allocator);
        self.passes.clear();
        self.insertion_order.clear();
        self.tracks.clear();
        self.carry_over.clear();
        self.execution_order.clear();
        self.processed = false;
    }

    pub fn destroy(mut self, allocator: &mut dyn GfxResourceAllocator) {
        self.clear(allocator);
    }

    fn release_compiled(&mut self, allocator: &mut dyn GfxResourceAllocator) {
        for (_, node) in self.passes.iter_mut() {
            if let Some(mut compiled) = node.compiled.take() {
                compiled.destroy(allocator);
            }
        }
    }
}
