//! 延迟渲染 graph
//!
//! ```text
//! gbuffer ──albedo/normal/depth──▶ lighting ──hdr──▶ [overlay] ──hdr──▶ tonemap ──swapchain──▶ present
//! ```
//!
//! overlay 关闭时 lighting 直接连到 tonemap。present 只把 swapchain 转换到 `PRESENT_SRC_KHR`。

mod gbuffer_pass;
mod lighting_pass;
mod overlay_pass;
mod tonemap_pass;

pub use gbuffer_pass::GBufferPass;
pub use lighting_pass::LightingPass;
pub use overlay_pass::OverlayPass;
pub use tonemap_pass::TonemapPass;

use kestrel_render_graph::{
    RenderGraph, RgImageState, RgPassContext, RgPassHandle, RgResourceDescriptor, RgResourceHandle, RgResourceRef,
    error::RgConnectError,
};

use crate::{app_config::PassConfig, frame_settings::FrameSettings};

/// present 节点读取的 swapchain
pub const PRESENT_INPUT: RgResourceHandle = RgResourceHandle(0);

/// 构建好的 pass
#[derive(Clone, Copy, Debug)]
pub struct DeferredPasses {
    pub gbuffer: RgPassHandle,
    pub lighting: RgPassHandle,
    pub overlay: Option<RgPassHandle>,
    pub tonemap: RgPassHandle,
    pub present: RgPassHandle,
}

/// 向 graph 中添加延迟渲染的所有 pass 并连接
pub fn build_deferred_graph(
    graph: &mut RenderGraph<'_>,
    frame_settings: &FrameSettings,
    swapchain: RgResourceRef,
    config: &PassConfig,
) -> Result<DeferredPasses, RgConnectError> {
    let gbuffer = graph.add_pass("gbuffer", GBufferPass::new(frame_settings, config.index_count));
    let lighting = graph.add_pass("lighting", LightingPass::new(frame_settings));
    let overlay = config.debug_overlay.then(|| graph.add_pass("overlay", OverlayPass::new(1)));
    let tonemap = graph.add_pass("tonemap", TonemapPass::new(swapchain));
    let present = graph.add_node(
        "present",
        vec![RgResourceDescriptor::image(PRESENT_INPUT, "swapchain").state(RgImageState::PRESENT)],
        vec![],
        |_ctx: &mut RgPassContext<'_>| {},
    );

    graph.connect(gbuffer, GBufferPass::ALBEDO, lighting, LightingPass::ALBEDO)?;
    graph.connect(gbuffer, GBufferPass::NORMAL, lighting, LightingPass::NORMAL)?;
    graph.connect(gbuffer, GBufferPass::DEPTH, lighting, LightingPass::DEPTH)?;
    match overlay {
        Some(overlay) => {
            graph.connect(lighting, LightingPass::HDR, overlay, OverlayPass::SCENE)?;
            graph.connect(overlay, OverlayPass::SCENE, tonemap, TonemapPass::HDR)?;
        }
        None => graph.connect(lighting, LightingPass::HDR, tonemap, TonemapPass::HDR)?,
    }
    graph.connect(tonemap, TonemapPass::OUTPUT, present, PRESENT_INPUT)?;

    Ok(DeferredPasses {
        gbuffer,
        lighting,
        overlay,
        tonemap,
        present,
    })
}
