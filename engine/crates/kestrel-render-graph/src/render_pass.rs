//! 光栅 pass 的 attachment 与 subpass 描述，以及 compile 后的 dynamic rendering 信息

use std::collections::HashMap;

use ash::vk;
use kestrel_gfx::{
    basic::format::GfxFormat,
    commands::rendering_info::{GfxRenderingAttachment, GfxRenderingInfo},
    resources::{allocator::GfxResourceAllocator, image::GfxImage},
};

use crate::{
    error::RgCompileError,
    pass::RgResolvedResource,
    resource::{RgAccess, RgResourceHandle},
    subresource::RgSubresourceRange,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RgAttachmentRole {
    Color,
    DepthStencil,
}

/// 一个 color 或 depth/stencil attachment
#[derive(Clone, Copy)]
pub struct RgAttachment {
    pub handle: RgResourceHandle,
    pub role: RgAttachmentRole,
    pub load_op: vk::AttachmentLoadOp,
    pub store_op: vk::AttachmentStoreOp,
    pub stencil_load_op: vk::AttachmentLoadOp,
    pub stencil_store_op: vk::AttachmentStoreOp,
    pub samples: vk::SampleCountFlags,
    pub clear_value: vk::ClearValue,
    /// 只渲染到 image 的一部分（例如某个 mip 或 layer），会为它单独创建 image view
    pub view_range: Option<RgSubresourceRange>,
}

impl std::fmt::Debug for RgAttachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RgAttachment")
            .field("handle", &self.handle)
            .field("role", &self.role)
            .field("load_op", &self.load_op)
            .field("store_op", &self.store_op)
            .field("stencil_load_op", &self.stencil_load_op)
            .field("stencil_store_op", &self.stencil_store_op)
            .field("samples", &self.samples)
            .field("view_range", &self.view_range)
            .finish()
    }
}

// new & init
impl RgAttachment {
    /// 默认 clear 为黑色并 store
    pub fn color(handle: RgResourceHandle) -> Self {
        Self {
            handle,
            role: RgAttachmentRole::Color,
            load_op: vk::AttachmentLoadOp::CLEAR,
            store_op: vk::AttachmentStoreOp::STORE,
            stencil_load_op: vk::AttachmentLoadOp::DONT_CARE,
            stencil_store_op: vk::AttachmentStoreOp::DONT_CARE,
            samples: vk::SampleCountFlags::TYPE_1,
            clear_value: vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: [0.0, 0.0, 0.0, 1.0],
                },
            },
            view_range: None,
        }
    }

    /// 默认 clear 为 depth 1.0 并 store
    pub fn depth(handle: RgResourceHandle) -> Self {
        Self {
            handle,
            role: RgAttachmentRole::DepthStencil,
            load_op: vk::AttachmentLoadOp::CLEAR,
            store_op: vk::AttachmentStoreOp::STORE,
            stencil_load_op: vk::AttachmentLoadOp::DONT_CARE,
            stencil_store_op: vk::AttachmentStoreOp::DONT_CARE,
            samples: vk::SampleCountFlags::TYPE_1,
            clear_value: vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue { depth: 1.0, stencil: 0 },
            },
            view_range: None,
        }
    }
}

// builder
impl RgAttachment {
    #[inline]
    pub fn load_op(mut self, load_op: vk::AttachmentLoadOp) -> Self {
        self.load_op = load_op;
        self
    }

    #[inline]
    pub fn store_op(mut self, store_op: vk::AttachmentStoreOp) -> Self {
        self.store_op = store_op;
        self
    }

    #[inline]
    pub fn stencil_ops(mut self, load_op: vk::AttachmentLoadOp, store_op: vk::AttachmentStoreOp) -> Self {
        self.stencil_load_op = load_op;
        self.stencil_store_op = store_op;
        self
    }

    #[inline]
    pub fn samples(mut self, samples: vk::SampleCountFlags) -> Self {
        self.samples = samples;
        self
    }

    #[inline]
    pub fn clear_color(mut self, color: [f32; 4]) -> Self {
        self.clear_value = vk::ClearValue {
            color: vk::ClearColorValue { float32: color },
        };
        self
    }

    #[inline]
    pub fn clear_depth(mut self, depth: f32, stencil: u32) -> Self {
        self.clear_value = vk::ClearValue {
            depth_stencil: vk::ClearDepthStencilValue { depth, stencil },
        };
        self
    }

    #[inline]
    pub fn view_range(mut self, range: RgSubresourceRange) -> Self {
        self.view_range = Some(range);
        self
    }
}

// getters
impl RgAttachment {
    #[inline]
    fn loads(&self) -> bool {
        self.load_op == vk::AttachmentLoadOp::LOAD || self.stencil_load_op == vk::AttachmentLoadOp::LOAD
    }

    /// 作为 attachment 使用时隐含的 stage/access/layout
    pub fn access(&self) -> RgAccess {
        match self.role {
            RgAttachmentRole::Color => RgAccess {
                stage: vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT,
                access: if self.loads() {
                    vk::AccessFlags2::COLOR_ATTACHMENT_READ | vk::AccessFlags2::COLOR_ATTACHMENT_WRITE
                } else {
                    vk::AccessFlags2::COLOR_ATTACHMENT_WRITE
                },
                layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            },
            RgAttachmentRole::DepthStencil => RgAccess {
                stage: vk::PipelineStageFlags2::EARLY_FRAGMENT_TESTS | vk::PipelineStageFlags2::LATE_FRAGMENT_TESTS,
                access: if self.loads() {
                    vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_READ | vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_WRITE
                } else {
                    vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_WRITE
                },
                layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
            },
        }
    }
}

/// 一个 subpass：若干 color attachment 和至多一个 depth/stencil attachment
#[derive(Clone, Debug, Default)]
pub struct RgSubpass {
    pub colors: Vec<RgAttachment>,
    pub depth: Option<RgAttachment>,
}

impl RgSubpass {
    pub fn new() -> Self {
        Self::default()
    }

    /// builder
    pub fn color(mut self, attachment: RgAttachment) -> Self {
        self.colors.push(RgAttachment {
            role: RgAttachmentRole::Color,
            ..attachment
        });
        self
    }

    /// builder
    pub fn depth(mut self, attachment: RgAttachment) -> Self {
        self.depth = Some(RgAttachment {
            role: RgAttachmentRole::DepthStencil,
            ..attachment
        });
        self
    }

    pub fn attachments(&self) -> impl Iterator<Item = &RgAttachment> {
        self.colors.iter().chain(self.depth.iter())
    }
}

/// compile 的结果，每个非空 subpass 一份 dynamic rendering 信息
///
/// 只在 process 时构建，之后每帧复用。
#[derive(Debug, Default)]
pub struct RgCompiledRenderPass {
    subpasses: Vec<GfxRenderingInfo>,
    /// 与 `subpasses` 一一对应，记录在 pass 声明中的原始下标
    subpass_indices: Vec<usize>,
    /// 为 `view_range` 额外创建的 view，由 compiled render pass 负责销毁
    custom_views: Vec<vk::ImageView>,
}

// new & init
impl RgCompiledRenderPass {
    /// 没有被解析的 attachment（可选资源为空）会被忽略，所有 attachment 都为空的 subpass 不会录制。
    /// 整个 pass 没有任何 attachment 时返回 [`RgCompileError::NoAttachments`]。
    ///
    /// 失败时已经创建的 view 会被销毁。
    pub(crate) fn compile(
        pass_name: &str,
        subpasses: &[RgSubpass],
        resolved: &HashMap<RgResourceHandle, RgResolvedResource>,
        allocator: &mut dyn GfxResourceAllocator,
    ) -> Result<Self, RgCompileError> {
        let mut compiled = Self::default();
        for (subpass_idx, subpass) in subpasses.iter().enumerate() {
            match compiled.compile_subpass(pass_name, subpass_idx, subpass, resolved, allocator) {
                Ok(Some(info)) => {
                    compiled.subpasses.push(info);
                    compiled.subpass_indices.push(subpass_idx);
                }
                Ok(None) => log::debug!("pass \"{}\": subpass {} has no resolved attachment", pass_name, subpass_idx),
                Err(e) => {
                    compiled.destroy(allocator);
                    return Err(e);
                }
            }
        }
        if compiled.subpasses.is_empty() {
            return Err(RgCompileError::NoAttachments);
        }
        Ok(compiled)
    }

    fn compile_subpass(
        &mut self,
        pass_name: &str,
        subpass_idx: usize,
        subpass: &RgSubpass,
        resolved: &HashMap<RgResourceHandle, RgResolvedResource>,
        allocator: &mut dyn GfxResourceAllocator,
    ) -> Result<Option<GfxRenderingInfo>, RgCompileError> {
        let resolve = |attachment: &RgAttachment| match resolved.get(&attachment.handle) {
            Some(RgResolvedResource::Image { image, .. }) => Some((*attachment, *image)),
            _ => None,
        };
        let colors = subpass.colors.iter().filter_map(resolve).collect::<Vec<_>>();
        let depth = subpass.depth.as_ref().and_then(resolve);

        let Some((first, first_image)) = colors.first().copied().or(depth) else {
            return Ok(None);
        };

        if colors.iter().chain(depth.iter()).any(|(att, image)| att.samples != first.samples || image.samples() != att.samples) {
            return Err(RgCompileError::SampleCountMismatch { subpass: subpass_idx });
        }

        let (base_mip, layer_count) = match first.view_range {
            Some(range) => (range.base_mip, range.layer_count),
            None => (0, first_image.array_layers()),
        };
        let extent = first_image.extent_2d();
        let render_area = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent: vk::Extent2D {
                width: (extent.width >> base_mip).max(1),
                height: (extent.height >> base_mip).max(1),
            },
        };

        let mut info = GfxRenderingInfo::new(render_area, layer_count);
        for (attachment, image) in &colors {
            let view = self.attachment_view(pass_name, attachment, image, allocator)?;
            info.push_color_attachment(GfxRenderingAttachment {
                image_view: view,
                image_layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
                load_op: attachment.load_op,
                store_op: attachment.store_op,
                clear_value: attachment.clear_value,
            });
        }
        if let Some((attachment, image)) = &depth {
            let view = self.attachment_view(pass_name, attachment, image, allocator)?;
            let aspect = GfxFormat::infer_aspect(image.format());
            if aspect.contains(vk::ImageAspectFlags::DEPTH) {
                info.set_depth_attachment(GfxRenderingAttachment {
                    image_view: view,
                    image_layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
                    load_op: attachment.load_op,
                    store_op: attachment.store_op,
                    clear_value: attachment.clear_value,
                });
            }
            if aspect.contains(vk::ImageAspectFlags::STENCIL) {
                info.set_stencil_attachment(GfxRenderingAttachment {
                    image_view: view,
                    image_layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
                    load_op: attachment.stencil_load_op,
                    store_op: attachment.stencil_store_op,
                    clear_value: attachment.clear_value,
                });
            }
        }

        Ok(Some(info))
    }

    fn attachment_view(
        &mut self,
        pass_name: &str,
        attachment: &RgAttachment,
        image: &GfxImage,
        allocator: &mut dyn GfxResourceAllocator,
    ) -> Result<vk::ImageView, RgCompileError> {
        let Some(range) = attachment.view_range else {
            return Ok(image.default_view());
        };
        let view_type = GfxFormat::infer_view_type(vk::ImageType::TYPE_2D, range.layer_count);
        let view = allocator.create_image_view(
            image,
            view_type,
            range.to_vk(),
            &format!("{}-attachment-{:?}", pass_name, attachment.handle),
        )?;
        self.custom_views.push(view);
        Ok(view)
    }
}

// getters
impl RgCompiledRenderPass {
    #[inline]
    pub fn subpasses(&self) -> &[GfxRenderingInfo] {
        &self.subpasses
    }

    /// 需要录制的 subpass 及其原始下标
    pub fn rendered_subpasses(&self) -> impl Iterator<Item = (usize, &GfxRenderingInfo)> {
        self.subpass_indices.iter().copied().zip(self.subpasses.iter())
    }

    #[inline]
    pub fn custom_view_count(&self) -> usize {
        self.custom_views.len()
    }
}

// destroy
impl RgCompiledRenderPass {
    pub fn destroy(&mut self, allocator: &mut dyn GfxResourceAllocator) {
        for view in self.custom_views.drain(..) {
            allocator.destroy_image_view(view);
        }
        self.subpasses.clear();
        self.subpass_indices.clear();
    }
}
