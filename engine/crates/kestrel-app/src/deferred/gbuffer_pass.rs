//! 几何 Pass：把场景写入 albedo / normal / depth

use ash::vk;
use kestrel_gfx::resources::image::GfxImageCreateInfo;
use kestrel_render_graph::{
    RgAttachment, RgPass, RgPassBuilder, RgPassContext, RgResourceDescriptor, RgResourceHandle, RgSubpass,
};

use crate::frame_settings::FrameSettings;

pub struct GBufferPass {
    frame_settings: FrameSettings,
    index_count: u32,
}

impl GBufferPass {
    pub const ALBEDO: RgResourceHandle = RgResourceHandle(0);
    pub const NORMAL: RgResourceHandle = RgResourceHandle(1);
    pub const DEPTH: RgResourceHandle = RgResourceHandle(2);

    pub fn new(frame_settings: &FrameSettings, index_count: u32) -> Self {
        Self {
            frame_settings: *frame_settings,
            index_count,
        }
    }

    fn target_info(&self, format: vk::Format, usage: vk::ImageUsageFlags) -> GfxImageCreateInfo {
        let extent = self.frame_settings.frame_extent;
        GfxImageCreateInfo::new_2d(extent.width, extent.height, format, usage | vk::ImageUsageFlags::SAMPLED)
    }
}

impl RgPass for GBufferPass {
    fn setup(&mut self, builder: &mut RgPassBuilder) {
        let color_usage = vk::ImageUsageFlags::COLOR_ATTACHMENT;
        builder.descriptor(
            RgResourceDescriptor::image(Self::ALBEDO, "albedo")
                .create_image(self.target_info(vk::Format::R8G8B8A8_UNORM, color_usage)),
        );
        builder.descriptor(
            RgResourceDescriptor::image(Self::NORMAL, "normal")
                .create_image(self.target_info(vk::Format::R16G16B16A16_SFLOAT, color_usage)),
        );
        builder.descriptor(RgResourceDescriptor::image(Self::DEPTH, "depth").create_image(
            self.target_info(self.frame_settings.depth_format, vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT),
        ));

        builder.subpass(
            RgSubpass::new()
                .color(RgAttachment::color(Self::ALBEDO))
                .color(RgAttachment::color(Self::NORMAL).clear_color([0.0, 0.0, 0.0, 0.0]))
                .depth(RgAttachment::depth(Self::DEPTH)),
        );
    }

    fn execute(&mut self, ctx: &mut RgPassContext<'_>) {
        ctx.cmd.draw_indexed(self.index_count, 1, 0, 0, 0);
    }
}
