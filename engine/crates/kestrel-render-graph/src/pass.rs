//! Pass 定义
//!
//! 一个 pass 由资源 descriptor、可选的 subpass 布局和执行回调组成。
//! 回调既可以是闭包（[`crate::graph::RenderGraph::add_node`]），
//! 也可以是实现了 [`RgPass`] 的对象（[`crate::graph::RenderGraph::add_pass`]）。

use std::collections::HashMap;

use ash::vk;
use itertools::Itertools;
use kestrel_gfx::{
    commands::recorder::GfxCommandRecorder,
    frame::FrameLabel,
    resources::{
        buffer::GfxBuffer,
        image::{GfxImage, GfxImageCreateInfo},
    },
};

use crate::{
    barrier::PassBarriers,
    error::RgCompileError,
    port::{RgPort, RgPortDirection},
    render_pass::{RgCompiledRenderPass, RgSubpass},
    resource::{
        RgAccess, RgResourceDescriptor, RgResourceHandle, RgResourceId, RgResourceKind, RgResourceRef,
        RgResourceSource,
    },
    resource_pool::RgResourcePool,
    resource_state::{RgBufferState, RgImageState},
    subresource::RgSubresourceRange,
};

slotmap::new_key_type! {
    /// graph 中 pass 的句柄
    pub struct RgPassHandle;
}

/// 解析后的物理资源，供 pass 回调使用
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RgResolvedResource {
    Image { image: GfxImage, view: vk::ImageView },
    Buffer(GfxBuffer),
}

/// Pass 执行时的上下文
pub struct RgPassContext<'r> {
    /// 命令录制器
    pub cmd: &'r mut dyn GfxCommandRecorder,
    pub frame_label: FrameLabel,
    /// 光栅 pass 当前所在的 subpass
    pub subpass_index: Option<usize>,

    pub(crate) pass_name: &'r str,
    pub(crate) resources: &'r HashMap<RgResourceHandle, RgResolvedResource>,
}

impl RgPassContext<'_> {
    #[inline]
    pub fn pass_name(&self) -> &str {
        self.pass_name
    }

    /// 获取图像，可选资源为空时返回 None
    #[inline]
    pub fn image(&self, handle: RgResourceHandle) -> Option<GfxImage> {
        match self.resources.get(&handle)? {
            RgResolvedResource::Image { image, .. } => Some(*image),
            RgResolvedResource::Buffer(_) => None,
        }
    }

    #[inline]
    pub fn image_view(&self, handle: RgResourceHandle) -> Option<vk::ImageView> {
        match self.resources.get(&handle)? {
            RgResolvedResource::Image { view, .. } => Some(*view),
            RgResolvedResource::Buffer(_) => None,
        }
    }

    #[inline]
    pub fn buffer(&self, handle: RgResourceHandle) -> Option<GfxBuffer> {
        match self.resources.get(&handle)? {
            RgResolvedResource::Buffer(buffer) => Some(*buffer),
            RgResolvedResource::Image { .. } => None,
        }
    }
}

/// RgPass trait
///
/// 定义渲染图中的一个 Pass。
///
/// # 示例
///
/// ```ignore
/// struct BlurPass {
///     pipeline: vk::Pipeline,
/// }
///
/// impl RgPass for BlurPass {
///     fn setup(&mut self, builder: &mut RgPassBuilder) {
///         builder.read_image(RgResourceHandle(0), "src", RgImageState::SHADER_READ_COMPUTE);
///         builder.create_image(RgResourceHandle(1), "dst", info, RgImageState::STORAGE_WRITE_COMPUTE);
///     }
///
///     fn execute(&mut self, ctx: &mut RgPassContext) {
///         ctx.cmd.bind_pipeline(vk::PipelineBindPoint::COMPUTE, self.pipeline);
///         ctx.cmd.dispatch([8, 8, 1]);
///     }
/// }
/// ```
///
/// Pass 不需要是 Send + Sync，graph 只在单线程中录制。
pub trait RgPass {
    /// 声明 Pass 的资源和 subpass
    fn setup(&mut self, builder: &mut RgPassBuilder);

    /// 录制 Pass 的命令，barrier 已经在之前插入
    fn execute(&mut self, ctx: &mut RgPassContext<'_>);
}

/// Pass 构建器
///
/// 在 `RgPass::setup()` 中使用。
#[derive(Default)]
pub struct RgPassBuilder {
    pub(crate) descriptors: Vec<RgResourceDescriptor>,
    pub(crate) subpasses: Vec<RgSubpass>,
}

impl RgPassBuilder {
    /// 添加任意 descriptor
    pub fn descriptor(&mut self, descriptor: RgResourceDescriptor) -> RgResourceHandle {
        let handle = descriptor.handle();
        self.descriptors.push(descriptor);
        handle
    }

    /// 通过 input port 读取图像
    pub fn read_image(
        &mut self,
        handle: RgResourceHandle,
        name: &str,
        state: RgImageState,
    ) -> RgResourceHandle {
        self.descriptor(RgResourceDescriptor::image(handle, name).state(state))
    }

    /// 通过 input port 读取缓冲区
    pub fn read_buffer(
        &mut self,
        handle: RgResourceHandle,
        name: &str,
        state: RgBufferState,
    ) -> RgResourceHandle {
        self.descriptor(RgResourceDescriptor::buffer(handle, name).state(state))
    }

    /// 创建由 graph 管理的图像，并通过 output port 导出
    pub fn create_image(
        &mut self,
        handle: RgResourceHandle,
        name: &str,
        info: GfxImageCreateInfo,
        state: RgImageState,
    ) -> RgResourceHandle {
        self.descriptor(RgResourceDescriptor::image(handle, name).create_image(info).state(state))
    }

    pub fn subpass(&mut self, subpass: RgSubpass) -> &mut Self {
        self.subpasses.push(subpass);
        self
    }
}

/// 类型擦除的 Pass 执行器
pub(crate) trait RgPassExecutor {
    fn execute(&mut self, ctx: &mut RgPassContext<'_>);
}

/// 包装闭包的执行器
pub(crate) struct RgClosureExecutor<F>(pub F);

impl<F> RgPassExecutor for RgClosureExecutor<F>
where
    F: FnMut(&mut RgPassContext<'_>),
{
    fn execute(&mut self, ctx: &mut RgPassContext<'_>) {
        (self.0)(ctx);
    }
}

/// 包装用户 Pass 实现的执行器
pub(crate) struct RgPassExecutorWrapper<P: RgPass> {
    pub pass: P,
}

impl<P: RgPass> RgPassExecutor for RgPassExecutorWrapper<P> {
    fn execute(&mut self, ctx: &mut RgPassContext<'_>) {
        self.pass.execute(ctx);
    }
}

/// compile 之后 pass 的状态
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RgPassState {
    /// 尚未 process
    Pending,
    Ready,
    /// 本帧跳过：不录制命令，不产生 usage
    Skipped(RgCompileError),
}

/// pass 在 preprocess 阶段登记的一次使用
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RgPassUsage {
    pub handle: RgResourceHandle,
    pub resource: RgResourceId,
    pub access: RgAccess,
    pub range: RgSubresourceRange,
}

/// Pass 节点
pub struct RgPassNode<'a> {
    pub(crate) name: String,
    pub(crate) descriptors: Vec<RgResourceDescriptor>,
    pub(crate) inputs: Vec<RgPort>,
    pub(crate) outputs: Vec<RgPort>,
    pub(crate) subpasses: Vec<RgSubpass>,

    /// 执行回调
    pub(crate) executor: Box<dyn RgPassExecutor + 'a>,

    /// Create 类型的 descriptor 在资源池中对应的资源
    pub(crate) created: HashMap<RgResourceHandle, RgResourceRef>,

    // process 的结果
    pub(crate) state: RgPassState,
    pub(crate) resolved: HashMap<RgResourceHandle, RgResolvedResource>,
    pub(crate) usages: Vec<RgPassUsage>,
    pub(crate) compiled: Option<RgCompiledRenderPass>,

    /// 最近一次 execute 插入的 barrier
    pub(crate) last_barriers: PassBarriers,
}

// new & init
impl<'a> RgPassNode<'a> {
    /// # Panics
    /// - descriptor 的 handle 重复
    /// - forward 指向不存在的 handle、另一个 forward 或不同类型的资源
    /// - 外部资源或创建请求的类型与 descriptor 不一致
    /// - attachment 引用不存在的 handle、不是图像或者是 forward
    pub(crate) fn new(
        name: String,
        descriptors: Vec<RgResourceDescriptor>,
        subpasses: Vec<RgSubpass>,
        executor: Box<dyn RgPassExecutor + 'a>,
        pool: &mut RgResourcePool,
    ) -> Self {
        let by_handle: HashMap<_, _> = descriptors.iter().map(|d| (d.handle(), d)).collect();
        assert_eq!(by_handle.len(), descriptors.len(), "pass \"{name}\": duplicate resource handle");

        for desc in &descriptors {
            match desc.source() {
                RgResourceSource::Forward(from) => {
                    let target = by_handle
                        .get(from)
                        .unwrap_or_else(|| panic!("pass \"{name}\": {:?} forwards unknown {:?}", desc.handle(), from));
                    assert!(
                        !matches!(target.source(), RgResourceSource::Forward(_)),
                        "pass \"{name}\": {:?} forwards another forward",
                        desc.handle()
                    );
                    assert_eq!(target.kind(), desc.kind(), "pass \"{name}\": forward kind mismatch");
                }
                RgResourceSource::External(resource) => {
                    assert_eq!(resource.kind(), desc.kind(), "pass \"{name}\": external kind mismatch");
                }
                RgResourceSource::Create(info) => {
                    assert_eq!(info.kind(), desc.kind(), "pass \"{name}\": create info kind mismatch");
                }
                RgResourceSource::Input => {}
            }
        }
        for attachment in subpasses.iter().flat_map(|s| s.attachments()) {
            let desc = by_handle
                .get(&attachment.handle)
                .unwrap_or_else(|| panic!("pass \"{name}\": attachment uses unknown {:?}", attachment.handle));
            assert_eq!(desc.kind(), RgResourceKind::Image, "pass \"{name}\": attachment must be an image");
            assert!(
                !matches!(desc.source(), RgResourceSource::Forward(_)),
                "pass \"{name}\": attachment cannot bind forward {:?}, bind the forwarded handle instead",
                attachment.handle
            );
        }

        let created = descriptors
            .iter()
            .filter_map(|desc| match desc.source() {
                RgResourceSource::Create(info) => {
                    let resource = pool.request(format!("{}.{}", name, desc.name()), info.clone());
                    Some((desc.handle(), resource))
                }
                _ => None,
            })
            .collect();

        let inputs = descriptors
            .iter()
            .filter(|d| d.has_input_port())
            .map(|d| RgPort::new(RgPortDirection::Input, d.kind(), d.handle(), d.name()))
            .collect_vec();
        let outputs = descriptors
            .iter()
            .filter(|d| d.has_output_port())
            .map(|d| RgPort::new(RgPortDirection::Output, d.kind(), d.handle(), d.name()))
            .collect_vec();

        let mut node = Self {
            name,
            descriptors,
            inputs,
            outputs,
            subpasses,
            executor,
            created,
            state: RgPassState::Pending,
            resolved: HashMap::new(),
            usages: Vec::new(),
            compiled: None,
            last_barriers: PassBarriers::new(),
        };
        node.refresh_outputs();
        node
    }
}

// getters
impl RgPassNode<'_> {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn descriptors(&self) -> &[RgResourceDescriptor] {
        &self.descriptors
    }

    #[inline]
    pub fn descriptor(&self, handle: RgResourceHandle) -> Option<&RgResourceDescriptor> {
        self.descriptors.iter().find(|d| d.handle() == handle)
    }

    #[inline]
    pub fn inputs(&self) -> &[RgPort] {
        &self.inputs
    }

    #[inline]
    pub fn outputs(&self) -> &[RgPort] {
        &self.outputs
    }

    #[inline]
    pub fn subpasses(&self) -> &[RgSubpass] {
        &self.subpasses
    }

    pub fn port(&self, direction: RgPortDirection, handle: RgResourceHandle) -> Option<&RgPort> {
        let ports = match direction {
            RgPortDirection::Input => &self.inputs,
            RgPortDirection::Output => &self.outputs,
        };
        ports.iter().find(|p| p.handle == handle)
    }

    pub(crate) fn port_mut(&mut self, direction: RgPortDirection, handle: RgResourceHandle) -> Option<&mut RgPort> {
        let ports = match direction {
            RgPortDirection::Input => &mut self.inputs,
            RgPortDirection::Output => &mut self.outputs,
        };
        ports.iter_mut().find(|p| p.handle == handle)
    }

    #[inline]
    pub fn state(&self) -> &RgPassState {
        &self.state
    }

    #[inline]
    pub fn is_skipped(&self) -> bool {
        matches!(self.state, RgPassState::Skipped(_))
    }

    #[inline]
    pub fn usages(&self) -> &[RgPassUsage] {
        &self.usages
    }

    #[inline]
    pub fn compiled(&self) -> Option<&RgCompiledRenderPass> {
        self.compiled.as_ref()
    }

    #[inline]
    pub fn last_barriers(&self) -> &PassBarriers {
        &self.last_barriers
    }
}

// 资源推导
impl RgPassNode<'_> {
    /// handle 当前代表的资源
    pub fn resolve_ref(&self, handle: RgResourceHandle) -> RgResourceRef {
        let Some(desc) = self.descriptor(handle) else {
            panic!("pass \"{}\": unknown resource handle {:?}", self.name, handle);
        };
        match desc.source() {
            RgResourceSource::Input => self
                .port(RgPortDirection::Input, handle)
                .map(|p| p.resource)
                .unwrap_or_else(|| RgResourceRef::empty(desc.kind())),
            RgResourceSource::External(resource) => *resource,
            RgResourceSource::Create(_) => {
                self.created.get(&handle).copied().unwrap_or_else(|| RgResourceRef::empty(desc.kind()))
            }
            RgResourceSource::Forward(from) => self.resolve_ref(*from),
        }
    }

    /// 重新推导所有 output port 的资源，返回发生变化的 handle
    pub(crate) fn refresh_outputs(&mut self) -> Vec<RgResourceHandle> {
        let derived = self.outputs.iter().map(|p| self.resolve_ref(p.handle)).collect_vec();

        let mut changed = Vec::new();
        for (port, resource) in self.outputs.iter_mut().zip(derived) {
            if port.resource != resource {
                port.resource = resource;
                changed.push(port.handle);
            }
        }
        changed
    }
}
