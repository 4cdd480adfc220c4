//! 资源标识与 pass 的资源声明
//!
//! - [`RgResourceHandle`]：pass 内部的小整数编号，只在一个 pass 内唯一
//! - [`RgResourceId`]：graph 资源表中的代际索引
//! - [`RgResourceRef`]：在相连的 port 之间按值传递的资源引用，可以为空
//! - [`RgResourceDescriptor`]：pass 对一个资源的完整声明

use std::fmt;

use ash::vk;
use kestrel_gfx::resources::{buffer::GfxBufferCreateInfo, image::GfxImageCreateInfo};

use crate::resource_state::{RgBufferState, RgImageState};
use crate::subresource::RgSubresourceRange;

slotmap::new_key_type! {
    /// graph 资源表中的资源 id
    pub struct RgResourceId;
}

/// pass 内的资源编号
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RgResourceHandle(pub u32);

impl fmt::Debug for RgResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RgResourceKind {
    Image,
    Buffer,
}

/// 资源引用，不拥有资源
///
/// `id == None` 表示空引用：port 没有连接，或者资源创建失败。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RgResourceRef {
    kind: RgResourceKind,
    id: Option<RgResourceId>,
}

// new & init
impl RgResourceRef {
    #[inline]
    pub fn new(kind: RgResourceKind, id: RgResourceId) -> Self {
        Self { kind, id: Some(id) }
    }

    #[inline]
    pub fn empty(kind: RgResourceKind) -> Self {
        Self { kind, id: None }
    }
}

// getters
impl RgResourceRef {
    #[inline]
    pub fn kind(&self) -> RgResourceKind {
        self.kind
    }

    #[inline]
    pub fn id(&self) -> Option<RgResourceId> {
        self.id
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.id.is_none()
    }
}

/// 需要 graph 创建的资源
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RgResourceCreateInfo {
    Image(GfxImageCreateInfo),
    Buffer(GfxBufferCreateInfo),
}

impl RgResourceCreateInfo {
    #[inline]
    pub fn kind(&self) -> RgResourceKind {
        match self {
            Self::Image(_) => RgResourceKind::Image,
            Self::Buffer(_) => RgResourceKind::Buffer,
        }
    }
}

/// 资源从哪里来
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RgResourceSource {
    /// 由 input port 的连接提供
    Input,
    /// 外部资源（通过 `RenderGraph::import_*` 注册）
    External(RgResourceRef),
    /// 由 graph 创建，生命周期归资源池管理
    Create(RgResourceCreateInfo),
    /// 转发本 pass 另一个 descriptor 的资源，自身不产生 usage
    Forward(RgResourceHandle),
}

/// 一次使用的 stage/access/layout
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RgAccess {
    pub stage: vk::PipelineStageFlags2,
    pub access: vk::AccessFlags2,
    /// 只对 image 有意义，buffer 为 UNDEFINED
    pub layout: vk::ImageLayout,
}

impl From<RgImageState> for RgAccess {
    fn from(state: RgImageState) -> Self {
        Self {
            stage: state.stage,
            access: state.access,
            layout: state.layout,
        }
    }
}

impl From<RgBufferState> for RgAccess {
    fn from(state: RgBufferState) -> Self {
        Self {
            stage: state.stage,
            access: state.access,
            layout: vk::ImageLayout::UNDEFINED,
        }
    }
}

/// pass 对一个资源的声明
///
/// # 使用示例
/// ```ignore
/// RgResourceDescriptor::image(RgResourceHandle(0), "albedo")
///     .create(GfxImageCreateInfo::new_2d(w, h, vk::Format::R8G8B8A8_UNORM, usage));
/// RgResourceDescriptor::image(RgResourceHandle(1), "scene")
///     .state(RgImageState::SHADER_READ_FRAGMENT);
/// ```
#[derive(Clone, Debug)]
pub struct RgResourceDescriptor {
    pub(crate) handle: RgResourceHandle,
    pub(crate) name: String,
    pub(crate) kind: RgResourceKind,
    pub(crate) source: RgResourceSource,
    /// input 资源是否同时通过 output port 导出
    pub(crate) exported: bool,
    /// 为空时 pass 可以在没有该资源的情况下运行
    pub(crate) optional: bool,
    pub(crate) access: Option<RgAccess>,
    /// None 表示整个资源
    pub(crate) range: Option<RgSubresourceRange>,
}

// new & init
impl RgResourceDescriptor {
    pub fn image(handle: RgResourceHandle, name: impl Into<String>) -> Self {
        Self::new(handle, name, RgResourceKind::Image)
    }

    pub fn buffer(handle: RgResourceHandle, name: impl Into<String>) -> Self {
        Self::new(handle, name, RgResourceKind::Buffer)
    }

    fn new(handle: RgResourceHandle, name: impl Into<String>, kind: RgResourceKind) -> Self {
        Self {
            handle,
            name: name.into(),
            kind,
            source: RgResourceSource::Input,
            exported: false,
            optional: false,
            access: None,
            range: None,
        }
    }
}

// builder
impl RgResourceDescriptor {
    /// builder
    #[inline]
    pub fn external(mut self, resource: RgResourceRef) -> Self {
        self.source = RgResourceSource::External(resource);
        self
    }

    /// builder
    #[inline]
    pub fn create_image(mut self, info: GfxImageCreateInfo) -> Self {
        self.source = RgResourceSource::Create(RgResourceCreateInfo::Image(info));
        self
    }

    /// builder
    #[inline]
    pub fn create_buffer(mut self, info: GfxBufferCreateInfo) -> Self {
        self.source = RgResourceSource::Create(RgResourceCreateInfo::Buffer(info));
        self
    }

    /// builder
    #[inline]
    pub fn forward(mut self, from: RgResourceHandle) -> Self {
        self.source = RgResourceSource::Forward(from);
        self
    }

    /// builder
    ///
    /// input 资源同时出现在同 handle 的 output port 上
    #[inline]
    pub fn exported(mut self) -> Self {
        self.exported = true;
        self
    }

    /// builder
    #[inline]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// builder
    #[inline]
    pub fn state(mut self, access: impl Into<RgAccess>) -> Self {
        self.access = Some(access.into());
        self
    }

    /// builder
    #[inline]
    pub fn range(mut self, range: RgSubresourceRange) -> Self {
        self.range = Some(range);
        self
    }
}

// getters
impl RgResourceDescriptor {
    #[inline]
    pub fn handle(&self) -> RgResourceHandle {
        self.handle
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn kind(&self) -> RgResourceKind {
        self.kind
    }

    #[inline]
    pub fn source(&self) -> &RgResourceSource {
        &self.source
    }

    #[inline]
    pub fn access(&self) -> Option<RgAccess> {
        self.access
    }

    /// 是否有 input port
    #[inline]
    pub fn has_input_port(&self) -> bool {
        matches!(self.source, RgResourceSource::Input)
    }

    /// 是否有 output port
    #[inline]
    pub fn has_output_port(&self) -> bool {
        match self.source {
            RgResourceSource::Input => self.exported,
            RgResourceSource::External(_) | RgResourceSource::Create(_) | RgResourceSource::Forward(_) => true,
        }
    }
}
