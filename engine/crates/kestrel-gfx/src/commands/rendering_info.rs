use ash::vk;

/// 单个 attachment 在 dynamic rendering 中的描述
#[derive(Clone, Copy)]
pub struct GfxRenderingAttachment {
    pub image_view: vk::ImageView,
    pub image_layout: vk::ImageLayout,
    pub load_op: vk::AttachmentLoadOp,
    pub store_op: vk::AttachmentStoreOp,
    pub clear_value: vk::ClearValue,
}

impl GfxRenderingAttachment {
    #[inline]
    fn to_vk(self) -> vk::RenderingAttachmentInfo<'static> {
        vk::RenderingAttachmentInfo::default()
            .image_view(self.image_view)
            .image_layout(self.image_layout)
            .load_op(self.load_op)
            .store_op(self.store_op)
            .clear_value(self.clear_value)
    }
}

/// dynamic rendering 的完整描述
///
/// 在 render graph compile 阶段构建一次，之后每帧复用。
/// stencil 的 load/store 通过独立的 stencil attachment 表达，image view 和 depth 共用。
#[derive(Clone)]
pub struct GfxRenderingInfo {
    color_attach_info: Vec<vk::RenderingAttachmentInfo<'static>>,
    depth_attach_info: Option<vk::RenderingAttachmentInfo<'static>>,
    stencil_attach_info: Option<vk::RenderingAttachmentInfo<'static>>,
    render_area: vk::Rect2D,
    layer_count: u32,
}

// new & init
impl GfxRenderingInfo {
    pub fn new(render_area: vk::Rect2D, layer_count: u32) -> Self {
        Self {
            color_attach_info: Vec::new(),
            depth_attach_info: None,
            stencil_attach_info: None,
            render_area,
            layer_count,
        }
    }
}

// builder
impl GfxRenderingInfo {
    /// builder
    #[inline]
    pub fn push_color_attachment(&mut self, attachment: GfxRenderingAttachment) -> &mut Self {
        self.color_attach_info.push(attachment.to_vk());
        self
    }

    /// builder
    #[inline]
    pub fn set_depth_attachment(&mut self, attachment: GfxRenderingAttachment) -> &mut Self {
        self.depth_attach_info = Some(attachment.to_vk());
        self
    }

    /// builder
    #[inline]
    pub fn set_stencil_attachment(&mut self, attachment: GfxRenderingAttachment) -> &mut Self {
        self.stencil_attach_info = Some(attachment.to_vk());
        self
    }
}

// getters
impl GfxRenderingInfo {
    pub fn rendering_info(&self) -> vk::RenderingInfo<'_> {
        let mut info = vk::RenderingInfo::default()
            .layer_count(self.layer_count)
            .render_area(self.render_area)
            .color_attachments(&self.color_attach_info);
        if let Some(depth_attach) = &self.depth_attach_info {
            info = info.depth_attachment(depth_attach);
        }
        if let Some(stencil_attach) = &self.stencil_attach_info {
            info = info.stencil_attachment(stencil_attach);
        }
        info
    }

    #[inline]
    pub fn render_area(&self) -> vk::Rect2D {
        self.render_area
    }

    #[inline]
    pub fn layer_count(&self) -> u32 {
        self.layer_count
    }

    #[inline]
    pub fn color_attachments(&self) -> &[vk::RenderingAttachmentInfo<'static>] {
        &self.color_attach_info
    }

    #[inline]
    pub fn depth_attachment(&self) -> Option<&vk::RenderingAttachmentInfo<'static>> {
        self.depth_attach_info.as_ref()
    }

    #[inline]
    pub fn stencil_attachment(&self) -> Option<&vk::RenderingAttachmentInfo<'static>> {
        self.stencil_attach_info.as_ref()
    }

    #[inline]
    pub fn attachment_count(&self) -> usize {
        self.color_attach_info.len() + self.depth_attach_info.iter().count()
    }
}

impl std::fmt::Debug for GfxRenderingInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GfxRenderingInfo")
            .field("render_area", &self.render_area)
            .field("layer_count", &self.layer_count)
            .field("color_attachments", &self.color_attach_info.len())
            .field("depth", &self.depth_attach_info.is_some())
            .field("stencil", &self.stencil_attach_info.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;

    fn attachment(raw: u64, layout: vk::ImageLayout) -> GfxRenderingAttachment {
        GfxRenderingAttachment {
            image_view: vk::ImageView::from_raw(raw),
            image_layout: layout,
            load_op: vk::AttachmentLoadOp::CLEAR,
            store_op: vk::AttachmentStoreOp::STORE,
            clear_value: vk::ClearValue::default(),
        }
    }

    #[test]
    fn test_rendering_info_attachments() {
        let area = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent: vk::Extent2D { width: 64, height: 32 },
        };
        let mut info = GfxRenderingInfo::new(area, 1);
        info.push_color_attachment(attachment(1, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL))
            .push_color_attachment(attachment(2, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL))
            .set_depth_attachment(attachment(3, vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL));

        assert_eq!(info.attachment_count(), 3);
        let vk_info = info.rendering_info();
        assert_eq!(vk_info.color_attachment_count, 2);
        assert!(!vk_info.p_depth_attachment.is_null());
        assert!(vk_info.p_stencil_attachment.is_null());
        assert_eq!(vk_info.render_area.extent.width, 64);
    }
}
