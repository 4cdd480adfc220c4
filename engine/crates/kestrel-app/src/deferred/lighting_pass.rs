//! 全屏光照 Pass：采样 gbuffer，输出 HDR 颜色

use ash::vk;
use kestrel_gfx::resources::image::GfxImageCreateInfo;
use kestrel_render_graph::{
    RgAttachment, RgImageState, RgPass, RgPassBuilder, RgPassContext, RgResourceDescriptor, RgResourceHandle,
    RgSubpass,
};

use crate::frame_settings::{DefaultRendererSettings, FrameSettings};

pub struct LightingPass {
    frame_extent: vk::Extent2D,
}

impl LightingPass {
    pub const ALBEDO: RgResourceHandle = RgResourceHandle(0);
    pub const NORMAL: RgResourceHandle = RgResourceHandle(1);
    pub const DEPTH: RgResourceHandle = RgResourceHandle(2);
    pub const HDR: RgResourceHandle = RgResourceHandle(3);

    pub fn new(frame_settings: &FrameSettings) -> Self {
        Self {
            frame_extent: frame_settings.frame_extent,
        }
    }
}

impl RgPass for LightingPass {
    fn setup(&mut self, builder: &mut RgPassBuilder) {
        builder.read_image(Self::ALBEDO, "albedo", RgImageState::SHADER_READ_FRAGMENT);
        builder.read_image(Self::NORMAL, "normal", RgImageState::SHADER_READ_FRAGMENT);
        builder.read_image(Self::DEPTH, "depth", RgImageState::SHADER_READ_FRAGMENT);
        builder.descriptor(RgResourceDescriptor::image(Self::HDR, "hdr").create_image(GfxImageCreateInfo::new_2d(
            self.frame_extent.width,
            self.frame_extent.height,
            DefaultRendererSettings::HDR_FORMAT,
            vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::SAMPLED,
        )));

        builder.subpass(RgSubpass::new().color(RgAttachment::color(Self::HDR)));
    }

    fn execute(&mut self, ctx: &mut RgPassContext<'_>) {
        // 全屏三角形
        ctx.cmd.draw(3, 1, 0, 0);
    }
}
