//! 在 HDR 结果上叠加调试信息，保留原有内容

use ash::vk;
use kestrel_render_graph::{
    RgAttachment, RgPass, RgPassBuilder, RgPassContext, RgResourceDescriptor, RgResourceHandle, RgSubpass,
};

pub struct OverlayPass {
    quad_count: u32,
}

impl OverlayPass {
    /// 读入后原样导出给下游
    pub const SCENE: RgResourceHandle = RgResourceHandle(0);

    pub fn new(quad_count: u32) -> Self {
        Self { quad_count }
    }
}

impl RgPass for OverlayPass {
    fn setup(&mut self, builder: &mut RgPassBuilder) {
        builder.descriptor(RgResourceDescriptor::image(Self::SCENE, "scene").exported());
        builder.subpass(RgSubpass::new().color(RgAttachment::color(Self::SCENE).load_op(vk::AttachmentLoadOp::LOAD)));
    }

    fn execute(&mut self, ctx: &mut RgPassContext<'_>) {
        if self.quad_count == 0 {
            return;
        }
        ctx.cmd.draw(6, self.quad_count, 0, 0);
    }
}
