//! HDR -> swapchain

use kestrel_render_graph::{
    RgAttachment, RgImageState, RgPass, RgPassBuilder, RgPassContext, RgResourceDescriptor, RgResourceHandle,
    RgResourceRef, RgSubpass,
};

pub struct TonemapPass {
    swapchain: RgResourceRef,
}

impl TonemapPass {
    pub const HDR: RgResourceHandle = RgResourceHandle(0);
    pub const OUTPUT: RgResourceHandle = RgResourceHandle(1);

    pub fn new(swapchain: RgResourceRef) -> Self {
        Self { swapchain }
    }
}

impl RgPass for TonemapPass {
    fn setup(&mut self, builder: &mut RgPassBuilder) {
        builder.read_image(Self::HDR, "hdr", RgImageState::SHADER_READ_FRAGMENT);
        builder.descriptor(RgResourceDescriptor::image(Self::OUTPUT, "output").external(self.swapchain));
        builder.subpass(RgSubpass::new().color(RgAttachment::color(Self::OUTPUT)));
    }

    fn execute(&mut self, ctx: &mut RgPassContext<'_>) {
        ctx.cmd.draw(3, 1, 0, 0);
    }
}
