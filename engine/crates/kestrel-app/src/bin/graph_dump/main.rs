//! 在无 GPU 的环境下构建延迟渲染 graph，录制几帧并打印执行计划
//!
//! 配置：
//! - `config/graph_dump.toml`：分辨率、帧数、是否开启 overlay
//! - `config/render_graph.toml`：RenderGraph 自身的配置

use anyhow::Context;
use ash::vk;
use kestrel_app::{app_config::AppConfig, deferred::build_deferred_graph, frame_settings::FrameSettings};
use kestrel_crate_tools::{init_log::init_log, path::KestrelPath};
use kestrel_gfx::{
    commands::command_list::GfxCommandList,
    frame::{FifSlots, FrameCounter},
    resources::{
        allocator::{GfxHeadlessAllocator, GfxResourceAllocator},
        image::GfxImageCreateInfo,
    },
};
use kestrel_render_graph::{RenderGraph, RgImageState, RgSettings};

fn main() -> anyhow::Result<()> {
    init_log();

    let app_config = AppConfig::load_or_default(KestrelPath::config_path("graph_dump.toml"));
    let rg_settings = RgSettings::load(KestrelPath::config_path("render_graph.toml")).unwrap_or_else(|e| {
        log::warn!("{}, fallback to default render graph settings", e);
        RgSettings::default()
    });
    let frame_settings = FrameSettings::from(&app_config.frame);
    log::info!("graph-dump: {:?}", frame_settings);

    let mut allocator = GfxHeadlessAllocator::new();
    let swapchain_image = allocator
        .create_image(
            &GfxImageCreateInfo::new_2d(
                frame_settings.frame_extent.width,
                frame_settings.frame_extent.height,
                frame_settings.color_format,
                vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST,
            ),
            "swapchain",
        )
        .context("failed to create swapchain image")?;

    let mut graph = RenderGraph::new(rg_settings);
    let swapchain = graph.import_image("swapchain", swapchain_image, RgImageState::UNDEFINED);
    let passes = build_deferred_graph(&mut graph, &frame_settings, swapchain, &app_config.passes)
        .context("failed to connect deferred graph")?;
    if passes.overlay.is_none() {
        log::info!("debug overlay disabled");
    }

    let report = graph.process(&mut allocator);
    for (pass_name, reason) in &report.skipped {
        log::warn!("pass \"{}\" will not run: {}", pass_name, reason);
    }

    let mut frame_counter = FrameCounter::new(0);
    let mut cmds = FifSlots::new(|_| GfxCommandList::new());
    for _ in 0..app_config.frame.frames {
        let frame_label = frame_counter.frame_label();
        let cmd = cmds.get_mut(frame_label);
        cmd.clear();

        let stats = graph.execute(cmd, frame_label);
        log::info!(
            "{}: {} passes ({} skipped), {} image barriers ({} layout transitions), {} buffer barriers, {} commands",
            frame_counter.frame_name(),
            stats.executed_passes,
            stats.skipped_passes,
            stats.image_barriers,
            stats.layout_transitions,
            stats.buffer_barriers,
            cmd.len()
        );
        frame_counter.next_frame();
    }

    graph.print_execution_plan();

    graph.destroy(&mut allocator);
    allocator.destroy_image(&swapchain_image);
    if allocator.live_image_count() != 0 || allocator.live_view_count() != 0 {
        log::error!(
            "leaked {} images, {} views",
            allocator.live_image_count(),
            allocator.live_view_count()
        );
    }
    Ok(())
}
