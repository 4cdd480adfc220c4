use std::cell::{Cell, RefCell};

use ash::vk;
use kestrel_gfx::{
    commands::{
        command_list::{GfxCommand, GfxCommandList},
        recorder::GfxCommandRecorder,
    },
    frame::FrameLabel,
    resources::{
        allocator::{GfxHeadlessAllocator, GfxResourceAllocator},
        buffer::GfxBufferCreateInfo,
        image::GfxImageCreateInfo,
    },
};

use super::*;
use crate::{
    error::{RgCompileError, RgConnectError},
    pass::{RgPassState, RgPassUsage},
    port::{RgPortDirection, RgPortId},
    render_pass::RgAttachment,
    resource::{RgResourceHandle, RgResourceKind},
    resource_pool::RgPhysicalResource,
    subresource::RgSubresourceRange,
};

const COLOR: RgResourceHandle = RgResourceHandle(0);
const SCENE: RgResourceHandle = RgResourceHandle(1);
const FORWARD: RgResourceHandle = RgResourceHandle(2);
const DATA: RgResourceHandle = RgResourceHandle(3);

fn color_info(width: u32, height: u32) -> GfxImageCreateInfo {
    GfxImageCreateInfo::new_2d(
        width,
        height,
        vk::Format::R8G8B8A8_UNORM,
        vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::SAMPLED,
    )
}

fn noop(_ctx: &mut RgPassContext<'_>) {}

/// 创建 64x64 color target 并画一个三角形
fn add_writer(graph: &mut RenderGraph<'_>, name: &str) -> RgPassHandle {
    graph.add_node(
        name,
        vec![RgResourceDescriptor::image(COLOR, "color").create_image(color_info(64, 64))],
        vec![RgSubpass::new().color(RgAttachment::color(COLOR))],
        |ctx: &mut RgPassContext<'_>| ctx.cmd.draw(3, 1, 0, 0),
    )
}

/// 在片段着色器中采样 input
fn add_reader(graph: &mut RenderGraph<'_>, name: &str) -> RgPassHandle {
    graph.add_node(
        name,
        vec![RgResourceDescriptor::image(SCENE, "scene").state(RgImageState::SHADER_READ_FRAGMENT)],
        vec![],
        noop,
    )
}

fn image_of(graph: &RenderGraph<'_>, resource: RgResourceRef) -> vk::Image {
    match graph.resource_pool().physical(resource.id().unwrap()) {
        Some(RgPhysicalResource::Image(image)) => image.handle(),
        other => panic!("expected an image, got {:?}", other),
    }
}

fn port_snapshot(graph: &RenderGraph<'_>) -> Vec<(String, RgPortDirection, RgResourceHandle, RgResourceRef)> {
    graph
        .passes()
        .flat_map(|(_, node)| {
            node.inputs()
                .iter()
                .chain(node.outputs())
                .map(move |p| (node.name().to_string(), p.direction(), p.handle(), p.resource()))
        })
        .collect()
}

// 连接协议

#[test]
fn test_connect_is_symmetric() {
    let mut graph = RenderGraph::default();
    let writer = add_writer(&mut graph, "writer");
    let reader = add_reader(&mut graph, "reader");

    graph.connect(writer, COLOR, reader, SCENE).unwrap();

    let output = RgPortId::output(writer, COLOR);
    let input = RgPortId::input(reader, SCENE);
    assert_eq!(graph.port(output).unwrap().connection(), Some(input));
    assert_eq!(graph.port(input).unwrap().connection(), Some(output));

    let resource = graph.port(output).unwrap().resource();
    assert!(!resource.is_empty());
    assert_eq!(graph.port(input).unwrap().resource(), resource);
}

#[test]
fn test_connect_ports_in_any_order() {
    let mut graph = RenderGraph::default();
    let writer = add_writer(&mut graph, "writer");
    let reader = add_reader(&mut graph, "reader");

    let output = RgPortId::output(writer, COLOR);
    let input = RgPortId::input(reader, SCENE);
    graph.connect_ports(input, output).unwrap();

    assert_eq!(graph.port(output).unwrap().connection(), Some(input));
    assert_eq!(graph.port(input).unwrap().resource(), graph.port(output).unwrap().resource());
}

#[test]
fn test_port_lookup_by_name() {
    let mut graph = RenderGraph::default();
    let writer = add_writer(&mut graph, "writer");
    let reader = add_reader(&mut graph, "reader");

    assert_eq!(graph.output_port_by_name(writer, "color"), Some(RgPortId::output(writer, COLOR)));
    assert_eq!(graph.input_port_by_name(reader, "scene"), Some(RgPortId::input(reader, SCENE)));
    assert_eq!(graph.input_port_by_name(writer, "color"), None);
    assert_eq!(graph.output_port_by_name(reader, "scene"), None);
}

#[test]
fn test_reject_output_to_output() {
    let mut graph = RenderGraph::default();
    let a = add_writer(&mut graph, "a");
    let b = add_writer(&mut graph, "b");
    let before = port_snapshot(&graph);

    let result = graph.connect_ports(RgPortId::output(a, COLOR), RgPortId::output(b, COLOR));

    assert_eq!(result, Err(RgConnectError::SameDirection));
    assert_eq!(graph.port(RgPortId::output(a, COLOR)).unwrap().connection(), None);
    assert_eq!(graph.port(RgPortId::output(b, COLOR)).unwrap().connection(), None);
    assert_eq!(port_snapshot(&graph), before);
}

#[test]
fn test_reject_same_port_and_same_pass() {
    let mut graph = RenderGraph::default();
    let pass = graph.add_node(
        "blit",
        vec![
            RgResourceDescriptor::image(SCENE, "scene").state(RgImageState::TRANSFER_SRC),
            RgResourceDescriptor::image(COLOR, "color").create_image(color_info(16, 16)).state(RgImageState::TRANSFER_DST),
        ],
        vec![],
        noop,
    );

    let output = RgPortId::output(pass, COLOR);
    assert_eq!(graph.connect_ports(output, output), Err(RgConnectError::SamePort));
    assert_eq!(graph.connect(pass, COLOR, pass, SCENE), Err(RgConnectError::SamePass));
}

#[test]
fn test_reject_kind_mismatch() {
    let mut graph = RenderGraph::default();
    let producer = graph.add_node(
        "producer",
        vec![RgResourceDescriptor::buffer(DATA, "data")
            .create_buffer(GfxBufferCreateInfo::new(256, vk::BufferUsageFlags::STORAGE_BUFFER))
            .state(RgBufferState::STORAGE_WRITE_COMPUTE)],
        vec![],
        noop,
    );
    let reader = add_reader(&mut graph, "reader");

    assert_eq!(
        graph.connect(producer, DATA, reader, SCENE),
        Err(RgConnectError::KindMismatch {
            output: RgResourceKind::Buffer,
            input: RgResourceKind::Image,
        })
    );
    assert!(graph.port(RgPortId::input(reader, SCENE)).unwrap().resource().is_empty());
}

#[test]
fn test_reject_second_connection() {
    let mut graph = RenderGraph::default();
    let writer_a = add_writer(&mut graph, "writer_a");
    let writer_b = add_writer(&mut graph, "writer_b");
    let reader = add_reader(&mut graph, "reader");
    let other_reader = add_reader(&mut graph, "other_reader");

    graph.connect(writer_a, COLOR, reader, SCENE).unwrap();

    // input 已经连接
    assert_eq!(
        graph.connect(writer_b, COLOR, reader, SCENE),
        Err(RgConnectError::AlreadyConnected(RgPortId::output(writer_a, COLOR)))
    );
    // output 已经连接
    assert_eq!(
        graph.connect(writer_a, COLOR, other_reader, SCENE),
        Err(RgConnectError::AlreadyConnected(RgPortId::input(reader, SCENE)))
    );
    assert!(graph.port(RgPortId::input(other_reader, SCENE)).unwrap().resource().is_empty());
}

#[test]
fn test_reject_cycle() {
    let mut graph = RenderGraph::default();
    let make = |graph: &mut RenderGraph<'_>, name: &str| {
        graph.add_node(
            name,
            vec![
                RgResourceDescriptor::image(SCENE, "scene").optional().state(RgImageState::SHADER_READ_FRAGMENT),
                RgResourceDescriptor::image(COLOR, "color").create_image(color_info(16, 16)),
            ],
            vec![RgSubpass::new().color(RgAttachment::color(COLOR))],
            noop,
        )
    };
    let a = make(&mut graph, "a");
    let b = make(&mut graph, "b");
    let c = make(&mut graph, "c");

    graph.connect(a, COLOR, b, SCENE).unwrap();
    graph.connect(b, COLOR, c, SCENE).unwrap();
    let before = port_snapshot(&graph);

    assert_eq!(graph.connect(c, COLOR, a, SCENE), Err(RgConnectError::WouldCycle));
    assert_eq!(graph.port(RgPortId::input(a, SCENE)).unwrap().connection(), None);
    assert_eq!(port_snapshot(&graph), before);
}

#[test]
fn test_disconnect() {
    let mut graph = RenderGraph::default();
    let writer = add_writer(&mut graph, "writer");
    let reader = add_reader(&mut graph, "reader");
    graph.connect(writer, COLOR, reader, SCENE).unwrap();

    let input = RgPortId::input(reader, SCENE);
    graph.disconnect(input).unwrap();

    assert_eq!(graph.port(input).unwrap().connection(), None);
    assert_eq!(graph.port(RgPortId::output(writer, COLOR)).unwrap().connection(), None);
    assert!(graph.port(input).unwrap().resource().is_empty());
    assert_eq!(graph.disconnect(input), Err(RgConnectError::NotConnected(input)));
}

#[test]
fn test_propagation_reaches_fixed_point() {
    let mut graph = RenderGraph::default();
    let source = add_writer(&mut graph, "source");
    let relay = graph.add_node(
        "relay",
        vec![
            RgResourceDescriptor::image(SCENE, "scene").state(RgImageState::TRANSFER_SRC).exported(),
            RgResourceDescriptor::image(FORWARD, "forward").forward(SCENE),
        ],
        vec![],
        noop,
    );
    let sink_a = add_reader(&mut graph, "sink_a");
    let sink_b = add_reader(&mut graph, "sink_b");

    // 先连下游，此时 relay 的 output 还是空的
    graph.connect(relay, SCENE, sink_a, SCENE).unwrap();
    graph.connect(relay, FORWARD, sink_b, SCENE).unwrap();
    assert!(graph.port(RgPortId::input(sink_a, SCENE)).unwrap().resource().is_empty());

    graph.connect(source, COLOR, relay, SCENE).unwrap();

    let resource = graph.port(RgPortId::output(source, COLOR)).unwrap().resource();
    assert_eq!(graph.port(RgPortId::input(sink_a, SCENE)).unwrap().resource(), resource);
    assert_eq!(graph.port(RgPortId::input(sink_b, SCENE)).unwrap().resource(), resource);

    let incremental = port_snapshot(&graph);
    graph.refresh_all_ports();
    assert_eq!(port_snapshot(&graph), incremental);

    graph.disconnect(RgPortId::input(relay, SCENE)).unwrap();
    assert!(graph.port(RgPortId::input(sink_a, SCENE)).unwrap().resource().is_empty());
    assert!(graph.port(RgPortId::input(sink_b, SCENE)).unwrap().resource().is_empty());
    assert!(!graph.port(RgPortId::output(source, COLOR)).unwrap().resource().is_empty());
}

#[test]
fn test_connect_invalidates_process() {
    let mut allocator = GfxHeadlessAllocator::new();
    let mut graph = RenderGraph::default();
    let writer = add_writer(&mut graph, "writer");
    let reader = add_reader(&mut graph, "reader");

    graph.process(&mut allocator);
    assert!(graph.is_processed());

    graph.connect(writer, COLOR, reader, SCENE).unwrap();
    assert!(!graph.is_processed());
}

// 执行顺序

#[test]
fn test_execution_order_respects_connections() {
    let mut allocator = GfxHeadlessAllocator::new();
    let mut graph = RenderGraph::default();

    // 故意倒序添加
    let present = add_reader(&mut graph, "present");
    let composite = graph.add_node(
        "composite",
        vec![
            RgResourceDescriptor::image(SCENE, "scene").state(RgImageState::SHADER_READ_FRAGMENT),
            RgResourceDescriptor::image(FORWARD, "overlay").state(RgImageState::SHADER_READ_FRAGMENT),
            RgResourceDescriptor::image(COLOR, "color").create_image(color_info(64, 64)),
        ],
        vec![RgSubpass::new().color(RgAttachment::color(COLOR))],
        noop,
    );
    let overlay = add_writer(&mut graph, "overlay");
    let scene = add_writer(&mut graph, "scene");

    graph.connect(composite, COLOR, present, SCENE).unwrap();
    graph.connect(scene, COLOR, composite, SCENE).unwrap();
    graph.connect(overlay, COLOR, composite, FORWARD).unwrap();

    graph.process(&mut allocator);
    let order = graph.execution_order().to_vec();
    assert_eq!(order.len(), 4);

    let position = |pass: RgPassHandle| order.iter().position(|&p| p == pass).unwrap();
    for (handle, node) in graph.passes() {
        for port in node.inputs() {
            if let Some(upstream) = port.connection() {
                assert!(position(upstream.pass) < position(handle));
            }
        }
    }
    // depth 相同时保持添加顺序
    assert_eq!(order, vec![overlay, scene, composite, present]);
}

// 帧录制

#[test]
fn test_write_then_sample_inserts_one_barrier() {
    let mut allocator = GfxHeadlessAllocator::new();
    let mut graph = RenderGraph::default();
    let writer = add_writer(&mut graph, "writer");
    let reader = add_reader(&mut graph, "reader");
    graph.connect(writer, COLOR, reader, SCENE).unwrap();

    let report = graph.process(&mut allocator);
    assert!(report.is_clean());
    assert_eq!(report.created_resources, 1);

    let mut cmd = GfxCommandList::new();
    let stats = graph.execute(&mut cmd, FrameLabel::A);
    assert_eq!(stats.executed_passes, 2);
    assert_eq!(stats.skipped_passes, 0);
    assert_eq!(stats.image_barriers, 2);
    assert_eq!(stats.layout_transitions, 2);

    // writer 从初始状态转换到 attachment
    let writer_barriers = graph.frame_barriers(writer).unwrap();
    assert_eq!(writer_barriers.image_barrier_count(), 1);
    let first = writer_barriers.image_barriers[0];
    assert_eq!(first.src_pass, None);
    assert_eq!(first.old_layout, vk::ImageLayout::UNDEFINED);
    assert_eq!(first.new_layout, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);

    let reader_barriers = graph.frame_barriers(reader).unwrap();
    assert_eq!(reader_barriers.image_barrier_count(), 1);
    assert_eq!(reader_barriers.buffer_barrier_count(), 0);
    let barrier = reader_barriers.image_barriers[0];
    assert_eq!(barrier.src_pass, Some(0));
    assert_eq!(barrier.src_stage, vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT);
    assert_eq!(barrier.src_access, vk::AccessFlags2::COLOR_ATTACHMENT_WRITE);
    assert_eq!(barrier.dst_stage, vk::PipelineStageFlags2::FRAGMENT_SHADER);
    assert_eq!(barrier.dst_access, vk::AccessFlags2::SHADER_SAMPLED_READ);
    assert_eq!(barrier.old_layout, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
    assert_eq!(barrier.new_layout, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
    assert_eq!(barrier.range, RgSubresourceRange::full(vk::ImageAspectFlags::COLOR, 1, 1));

    assert!(matches!(
        cmd.commands(),
        [
            GfxCommand::PipelineBarrier { .. },
            GfxCommand::BeginLabel { .. },
            GfxCommand::BeginRendering(_),
            GfxCommand::Draw { vertex_count: 3, .. },
            GfxCommand::EndRendering,
            GfxCommand::EndLabel,
            GfxCommand::PipelineBarrier { .. },
            GfxCommand::BeginLabel { .. },
            GfxCommand::EndLabel,
        ]
    ));

    // 录制下来的 vk barrier 指向真实的图像
    let image = image_of(&graph, graph.port(RgPortId::output(writer, COLOR)).unwrap().resource());
    let (image_barriers, buffer_barriers) = cmd.barrier_batches().nth(1).unwrap();
    assert!(buffer_barriers.is_empty());
    let vk_barrier = image_barriers[0].inner();
    assert_eq!(vk_barrier.image, image);
    assert_eq!(vk_barrier.old_layout, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
    assert_eq!(vk_barrier.new_layout, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
    assert_eq!(vk_barrier.src_access_mask, vk::AccessFlags2::COLOR_ATTACHMENT_WRITE);
}

#[test]
fn test_disjoint_mip_writers_then_full_read() {
    let mut allocator = GfxHeadlessAllocator::new();
    let target = allocator
        .create_image(&color_info(64, 64).with_mip_levels(2), "mip-chain")
        .unwrap();

    let mut graph = RenderGraph::default();
    let target_ref = graph.import_image("mip-chain", target, RgImageState::UNDEFINED);

    let mip0 = RgSubresourceRange::mip_level(vk::ImageAspectFlags::COLOR, 0, 1);
    let mip1 = RgSubresourceRange::mip_level(vk::ImageAspectFlags::COLOR, 1, 1);

    let writer0 = graph.add_node(
        "write_mip0",
        vec![RgResourceDescriptor::image(COLOR, "target").external(target_ref)],
        vec![RgSubpass::new().color(RgAttachment::color(COLOR).view_range(mip0))],
        noop,
    );
    let writer1 = graph.add_node(
        "write_mip1",
        vec![RgResourceDescriptor::image(COLOR, "target").exported()],
        vec![RgSubpass::new().color(RgAttachment::color(COLOR).view_range(mip1))],
        noop,
    );
    let reader = graph.add_node(
        "read_all",
        vec![RgResourceDescriptor::image(COLOR, "target").state(RgImageState::SHADER_READ_FRAGMENT)],
        vec![],
        noop,
    );
    graph.connect(writer0, COLOR, writer1, COLOR).unwrap();
    graph.connect(writer1, COLOR, reader, COLOR).unwrap();

    let report = graph.process(&mut allocator);
    assert!(report.is_clean());
    assert_eq!(graph.execution_order(), &[writer0, writer1, reader]);

    let area = graph.pass(writer1).unwrap().compiled().unwrap().subpasses()[0].render_area();
    assert_eq!(area.extent, vk::Extent2D { width: 32, height: 32 });

    let mut cmd = GfxCommandList::new();
    graph.execute(&mut cmd, FrameLabel::A);

    // 两个写者之间范围不相交，只有各自的初始转换
    let writer1_barriers = graph.frame_barriers(writer1).unwrap();
    assert_eq!(writer1_barriers.image_barrier_count(), 1);
    assert_eq!(writer1_barriers.image_barriers[0].src_pass, None);
    assert_eq!(writer1_barriers.image_barriers[0].range, mip1);

    let reader_barriers = graph.frame_barriers(reader).unwrap();
    assert_eq!(reader_barriers.image_barrier_count(), 2);
    let mut sources = reader_barriers
        .iter()
        .map(|b| (b.src_pass, b.range.base_mip, b.old_layout))
        .collect::<Vec<_>>();
    sources.sort();
    assert_eq!(
        sources,
        vec![
            (Some(0), 0, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL),
            (Some(1), 1, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL),
        ]
    );
    for barrier in reader_barriers.iter() {
        assert_eq!(barrier.src_access, vk::AccessFlags2::COLOR_ATTACHMENT_WRITE);
        assert_eq!(barrier.new_layout, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
    }

    graph.destroy(&mut allocator);
    assert_eq!(allocator.live_view_count(), 1);
    assert_eq!(allocator.live_image_count(), 1);
}

#[test]
fn test_sample_one_mip_and_render_another() {
    let mut allocator = GfxHeadlessAllocator::new();
    let chain = allocator
        .create_image(&color_info(64, 64).with_mip_levels(2), "bloom-chain")
        .unwrap();

    let mut graph = RenderGraph::default();
    let chain_ref = graph.import_image("bloom-chain", chain, RgImageState::UNDEFINED);

    let mip0 = RgSubresourceRange::mip_level(vk::ImageAspectFlags::COLOR, 0, 1);
    let mip1 = RgSubresourceRange::mip_level(vk::ImageAspectFlags::COLOR, 1, 1);

    let writer = graph.add_node(
        "bright",
        vec![RgResourceDescriptor::image(COLOR, "chain").external(chain_ref)],
        vec![RgSubpass::new().color(RgAttachment::color(COLOR).view_range(mip0))],
        noop,
    );
    let downsample = graph.add_node(
        "downsample",
        vec![RgResourceDescriptor::image(COLOR, "chain").state(RgImageState::SHADER_READ_FRAGMENT).range(mip0)],
        vec![RgSubpass::new().color(RgAttachment::color(COLOR).view_range(mip1))],
        noop,
    );
    graph.connect(writer, COLOR, downsample, COLOR).unwrap();

    assert!(graph.process(&mut allocator).is_clean());

    // 采样和渲染的范围不同，各自记录一次 usage
    let mut usages = graph
        .pass(downsample)
        .unwrap()
        .usages()
        .iter()
        .map(|u| (u.range.base_mip, u.access.layout))
        .collect::<Vec<_>>();
    usages.sort();
    assert_eq!(
        usages,
        vec![
            (0, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL),
            (1, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL),
        ]
    );

    let mut cmd = GfxCommandList::new();
    graph.execute(&mut cmd, FrameLabel::A);

    let mut barriers = graph
        .frame_barriers(downsample)
        .unwrap()
        .iter()
        .map(|b| (b.range.base_mip, b.src_pass, b.old_layout, b.new_layout))
        .collect::<Vec<_>>();
    barriers.sort();
    assert_eq!(
        barriers,
        vec![
            (
                0,
                Some(0),
                vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
                vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL
            ),
            (1, None, vk::ImageLayout::UNDEFINED, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL),
        ]
    );

    graph.destroy(&mut allocator);
    allocator.destroy_image(&chain);
}

#[test]
#[should_panic(expected = "is out of")]
fn test_declared_range_out_of_image_panics() {
    let mut allocator = GfxHeadlessAllocator::new();
    let mut graph = RenderGraph::default();
    let writer = add_writer(&mut graph, "writer");
    let reader = graph.add_node(
        "reader",
        vec![RgResourceDescriptor::image(SCENE, "scene")
            .state(RgImageState::SHADER_READ_FRAGMENT)
            .range(RgSubresourceRange::mip_level(vk::ImageAspectFlags::COLOR, 5, 1))],
        vec![],
        noop,
    );
    graph.connect(writer, COLOR, reader, SCENE).unwrap();
    graph.process(&mut allocator);
}

#[test]
#[should_panic(expected = "is out of")]
fn test_attachment_view_range_out_of_image_panics() {
    let mut allocator = GfxHeadlessAllocator::new();
    let mut graph = RenderGraph::default();
    graph.add_node(
        "writer",
        vec![RgResourceDescriptor::image(COLOR, "color").create_image(color_info(64, 64))],
        vec![RgSubpass::new().color(
            RgAttachment::color(COLOR).view_range(RgSubresourceRange::mip_level(vk::ImageAspectFlags::COLOR, 3, 1)),
        )],
        noop,
    );
    graph.process(&mut allocator);
}

#[test]
#[should_panic(expected = "attachment cannot bind forward")]
fn test_forward_attachment_panics() {
    let mut graph = RenderGraph::default();
    graph.add_node(
        "broken",
        vec![
            RgResourceDescriptor::image(SCENE, "scene").state(RgImageState::SHADER_READ_FRAGMENT),
            RgResourceDescriptor::image(FORWARD, "forward").forward(SCENE),
        ],
        vec![RgSubpass::new().color(RgAttachment::color(FORWARD))],
        noop,
    );
}

#[test]
fn test_empty_optional_subpass_does_not_skip_pass() {
    let subpasses_seen = RefCell::new(Vec::new());
    let mut allocator = GfxHeadlessAllocator::new();
    let mut graph = RenderGraph::default();
    let pass = graph.add_node(
        "scene",
        vec![
            RgResourceDescriptor::image(COLOR, "color").create_image(color_info(64, 64)),
            RgResourceDescriptor::image(SCENE, "debug").optional(),
        ],
        vec![
            RgSubpass::new().color(RgAttachment::color(COLOR)),
            RgSubpass::new().color(RgAttachment::color(SCENE)),
        ],
        |ctx: &mut RgPassContext<'_>| subpasses_seen.borrow_mut().push(ctx.subpass_index),
    );

    assert!(graph.process(&mut allocator).is_clean());
    assert_eq!(graph.pass(pass).unwrap().state(), &RgPassState::Ready);

    let mut cmd = GfxCommandList::new();
    graph.execute(&mut cmd, FrameLabel::A);
    assert_eq!(cmd.rendering_scope_count(), 1);
    drop(graph);
    assert_eq!(*subpasses_seen.borrow(), vec![Some(0)]);
}

#[test]
fn test_raster_pass_without_attachments_is_skipped() {
    let calls = Cell::new(0);
    let mut allocator = GfxHeadlessAllocator::new();
    let mut graph = RenderGraph::default();

    let overlay = graph.add_node(
        "overlay",
        vec![RgResourceDescriptor::image(SCENE, "target").optional()],
        vec![RgSubpass::new().color(RgAttachment::color(SCENE).load_op(vk::AttachmentLoadOp::LOAD))],
        |_ctx: &mut RgPassContext<'_>| calls.set(calls.get() + 1),
    );

    let report = graph.process(&mut allocator);
    assert_eq!(report.skipped, vec![("overlay".to_string(), RgCompileError::NoAttachments)]);
    assert_eq!(
        graph.pass(overlay).unwrap().state(),
        &RgPassState::Skipped(RgCompileError::NoAttachments)
    );
    assert!(graph.pass(overlay).unwrap().usages().is_empty());

    let mut cmd = GfxCommandList::new();
    let stats = graph.execute(&mut cmd, FrameLabel::A);
    assert_eq!(stats.executed_passes, 0);
    assert_eq!(stats.skipped_passes, 1);
    assert_eq!(cmd.rendering_scope_count(), 0);
    assert!(cmd.is_empty());
    drop(graph);
    assert_eq!(calls.get(), 0);
}

#[test]
fn test_read_after_read_needs_no_barrier() {
    let mut allocator = GfxHeadlessAllocator::new();
    let texture = allocator.create_image(&color_info(32, 32), "texture").unwrap();

    let mut graph = RenderGraph::default();
    let texture_ref = graph.import_image("texture", texture, RgImageState::SHADER_READ_FRAGMENT);
    let sample = |graph: &mut RenderGraph<'_>, name: &str| {
        graph.add_node(
            name,
            vec![RgResourceDescriptor::image(SCENE, "texture")
                .external(texture_ref)
                .state(RgImageState::SHADER_READ_FRAGMENT)],
            vec![],
            noop,
        )
    };
    let first = sample(&mut graph, "first");
    let second = sample(&mut graph, "second");

    graph.process(&mut allocator);
    let mut cmd = GfxCommandList::new();
    let stats = graph.execute(&mut cmd, FrameLabel::A);

    assert_eq!(stats.image_barriers, 0);
    assert!(!graph.frame_barriers(first).unwrap().has_barriers());
    assert!(!graph.frame_barriers(second).unwrap().has_barriers());
    assert_eq!(cmd.barrier_batches().count(), 0);
}

#[test]
fn test_buffer_upload_then_compute_read() {
    let mut allocator = GfxHeadlessAllocator::new();
    let mut graph = RenderGraph::default();

    let upload = graph.add_node(
        "upload",
        vec![RgResourceDescriptor::buffer(DATA, "instances")
            .create_buffer(GfxBufferCreateInfo::new(1024, vk::BufferUsageFlags::STORAGE_BUFFER))
            .state(RgBufferState::TRANSFER_DST)],
        vec![],
        noop,
    );
    let cull = graph.add_node(
        "cull",
        vec![RgResourceDescriptor::buffer(DATA, "instances").state(RgBufferState::STORAGE_READ_COMPUTE)],
        vec![],
        |ctx: &mut RgPassContext<'_>| {
            assert!(ctx.buffer(DATA).is_some());
            assert!(ctx.image(DATA).is_none());
            ctx.cmd.dispatch([4, 1, 1]);
        },
    );
    graph.connect(upload, DATA, cull, DATA).unwrap();

    graph.process(&mut allocator);
    let mut cmd = GfxCommandList::new();
    let stats = graph.execute(&mut cmd, FrameLabel::B);

    assert_eq!(stats.frame_label, FrameLabel::B);
    assert_eq!(stats.buffer_barriers, 1);
    assert_eq!(stats.layout_transitions, 0);
    assert!(!graph.frame_barriers(upload).unwrap().has_barriers());

    let barrier = graph.frame_barriers(cull).unwrap().buffer_barriers[0];
    assert_eq!(barrier.src_pass, Some(0));
    assert_eq!(barrier.src_stage, vk::PipelineStageFlags2::TRANSFER);
    assert_eq!(barrier.src_access, vk::AccessFlags2::TRANSFER_WRITE);
    assert_eq!(barrier.dst_stage, vk::PipelineStageFlags2::COMPUTE_SHADER);
    assert!(cmd.commands().iter().any(|c| matches!(c, GfxCommand::Dispatch([4, 1, 1]))));
}

#[test]
fn test_failed_creation_skips_dependents() {
    let optional_saw = RefCell::new(Vec::new());
    let mut allocator = GfxHeadlessAllocator::new().reject_format(vk::Format::R32G32B32A32_SFLOAT);
    let mut graph = RenderGraph::default();

    let info = GfxImageCreateInfo::new_2d(
        64,
        64,
        vk::Format::R32G32B32A32_SFLOAT,
        vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::SAMPLED,
    );
    let writer = graph.add_node(
        "hdr",
        vec![
            RgResourceDescriptor::image(COLOR, "color").create_image(info),
            RgResourceDescriptor::image(FORWARD, "forward").forward(COLOR),
        ],
        vec![RgSubpass::new().color(RgAttachment::color(COLOR))],
        noop,
    );
    let reader = add_reader(&mut graph, "tonemap");
    let optional_reader = graph.add_node(
        "debug",
        vec![RgResourceDescriptor::image(SCENE, "scene")
            .optional()
            .state(RgImageState::SHADER_READ_FRAGMENT)],
        vec![],
        |ctx: &mut RgPassContext<'_>| optional_saw.borrow_mut().push(ctx.image(SCENE)),
    );
    graph.connect(writer, COLOR, reader, SCENE).unwrap();
    graph.connect(writer, FORWARD, optional_reader, SCENE).unwrap();

    let report = graph.process(&mut allocator);
    assert_eq!(report.failed_resources, 1);
    assert_eq!(report.created_resources, 0);
    assert_eq!(report.skipped.len(), 2);
    assert!(!report.is_clean());

    assert_eq!(
        graph.pass(writer).unwrap().state(),
        &RgPassState::Skipped(RgCompileError::MissingResource {
            handle: COLOR,
            name: "color".to_string(),
        })
    );
    assert!(graph.pass(reader).unwrap().is_skipped());
    assert_eq!(graph.pass(optional_reader).unwrap().state(), &RgPassState::Ready);

    let mut cmd = GfxCommandList::new();
    let stats = graph.execute(&mut cmd, FrameLabel::A);
    assert_eq!(stats.executed_passes, 1);
    assert_eq!(stats.skipped_passes, 2);
    assert_eq!(cmd.rendering_scope_count(), 0);
    assert_eq!(stats.image_barriers, 0);
    drop(graph);
    assert_eq!(*optional_saw.borrow(), vec![None]);
}

#[test]
fn test_state_carries_over_to_next_frame() {
    let mut allocator = GfxHeadlessAllocator::new();
    let mut graph = RenderGraph::default();
    let writer = add_writer(&mut graph, "writer");
    let reader = add_reader(&mut graph, "reader");
    graph.connect(writer, COLOR, reader, SCENE).unwrap();
    graph.process(&mut allocator);

    let mut cmd = GfxCommandList::new();
    graph.execute(&mut cmd, FrameLabel::A);
    cmd.clear();
    graph.execute(&mut cmd, FrameLabel::B);

    // 第二帧 writer 要等上一帧的采样结束
    let barrier = graph.frame_barriers(writer).unwrap().image_barriers[0];
    assert_eq!(barrier.src_pass, None);
    assert_eq!(barrier.src_stage, vk::PipelineStageFlags2::FRAGMENT_SHADER);
    assert_eq!(barrier.old_layout, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
    assert_eq!(barrier.new_layout, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);

    // 重新 process 后从 UNDEFINED 开始
    graph.process(&mut allocator);
    cmd.clear();
    graph.execute(&mut cmd, FrameLabel::C);
    let barrier = graph.frame_barriers(writer).unwrap().image_barriers[0];
    assert_eq!(barrier.old_layout, vk::ImageLayout::UNDEFINED);
}

#[test]
fn test_external_state_resets_every_frame() {
    let mut allocator = GfxHeadlessAllocator::new();
    let swapchain = allocator.create_image(&color_info(64, 64), "swapchain").unwrap();

    let mut graph = RenderGraph::default();
    let swapchain_ref = graph.import_image("swapchain", swapchain, RgImageState::UNDEFINED);
    let present = graph.add_node(
        "present",
        vec![RgResourceDescriptor::image(COLOR, "swapchain").external(swapchain_ref)],
        vec![RgSubpass::new().color(RgAttachment::color(COLOR))],
        noop,
    );
    graph.process(&mut allocator);

    let mut cmd = GfxCommandList::new();
    for label in [FrameLabel::A, FrameLabel::B] {
        graph.execute(&mut cmd, label);
        let barrier = graph.frame_barriers(present).unwrap().image_barriers[0];
        assert_eq!(barrier.old_layout, vk::ImageLayout::UNDEFINED);
    }
}

#[test]
fn test_multiple_subpasses() {
    let subpasses_seen = RefCell::new(Vec::new());
    let mut allocator = GfxHeadlessAllocator::new();
    let mut graph = RenderGraph::default();

    let depth_info = GfxImageCreateInfo::new_2d(
        64,
        64,
        vk::Format::D32_SFLOAT,
        vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
    );
    let pass = graph.add_node(
        "forward",
        vec![
            RgResourceDescriptor::image(COLOR, "color").create_image(color_info(64, 64)),
            RgResourceDescriptor::image(SCENE, "depth").create_image(depth_info),
        ],
        vec![
            RgSubpass::new().depth(RgAttachment::depth(SCENE)),
            RgSubpass::new()
                .color(RgAttachment::color(COLOR))
                .depth(RgAttachment::depth(SCENE).load_op(vk::AttachmentLoadOp::LOAD)),
        ],
        |ctx: &mut RgPassContext<'_>| {
            assert_eq!(ctx.pass_name(), "forward");
            subpasses_seen.borrow_mut().push(ctx.subpass_index);
        },
    );

    let report = graph.process(&mut allocator);
    assert!(report.is_clean());
    let compiled = graph.pass(pass).unwrap().compiled().unwrap();
    assert_eq!(compiled.subpasses().len(), 2);
    assert!(compiled.subpasses()[0].depth_attachment().is_some());
    assert!(compiled.subpasses()[0].stencil_attachment().is_none());
    assert_eq!(compiled.subpasses()[1].color_attachments().len(), 1);

    // 两个 subpass 对 depth 的使用合并为一次
    let depth_usages = graph
        .pass(pass)
        .unwrap()
        .usages()
        .iter()
        .filter(|u| u.handle == SCENE)
        .copied()
        .collect::<Vec<RgPassUsage>>();
    assert_eq!(depth_usages.len(), 1);
    assert!(depth_usages[0].access.access.contains(vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_READ));

    let mut cmd = GfxCommandList::new();
    graph.execute(&mut cmd, FrameLabel::A);
    assert_eq!(cmd.rendering_scope_count(), 2);
    drop(graph);
    assert_eq!(*subpasses_seen.borrow(), vec![Some(0), Some(1)]);
}

struct BlurPass<'c> {
    executed: &'c Cell<u32>,
}

impl RgPass for BlurPass<'_> {
    fn setup(&mut self, builder: &mut RgPassBuilder) {
        builder.read_image(SCENE, "src", RgImageState::SHADER_READ_COMPUTE);
        builder.create_image(COLOR, "dst", color_info(32, 32), RgImageState::STORAGE_WRITE_COMPUTE);
    }

    fn execute(&mut self, ctx: &mut RgPassContext<'_>) {
        assert!(ctx.image_view(SCENE).is_some());
        assert!(ctx.image_view(COLOR).is_some());
        ctx.cmd.dispatch([8, 8, 1]);
        self.executed.set(self.executed.get() + 1);
    }
}

#[test]
fn test_add_pass_with_trait() {
    let executed = Cell::new(0);
    let mut allocator = GfxHeadlessAllocator::new();
    let mut graph = RenderGraph::default();

    let writer = add_writer(&mut graph, "writer");
    let blur = graph.add_pass("blur", BlurPass { executed: &executed });
    assert_eq!(graph.pass(blur).unwrap().inputs().len(), 1);
    assert_eq!(graph.pass(blur).unwrap().outputs().len(), 1);
    graph.connect(writer, COLOR, blur, SCENE).unwrap();

    graph.process(&mut allocator);
    let mut cmd = GfxCommandList::new();
    graph.execute(&mut cmd, FrameLabel::A);

    // 输入从 attachment 转为采样，输出从 UNDEFINED 转为 GENERAL
    let barriers = graph.frame_barriers(blur).unwrap();
    assert_eq!(barriers.image_barrier_count(), 2);
    assert!(barriers.iter().any(|b| b.new_layout == vk::ImageLayout::GENERAL));
    assert!(cmd.commands().iter().any(|c| matches!(c, GfxCommand::Dispatch([8, 8, 1]))));
    drop(graph);
    assert_eq!(executed.get(), 1);
}

#[test]
fn test_labels_can_be_disabled() {
    let mut allocator = GfxHeadlessAllocator::new();
    let mut graph = RenderGraph::new(RgSettings {
        label_passes: false,
        ..Default::default()
    });
    add_writer(&mut graph, "writer");
    graph.process(&mut allocator);

    let mut cmd = GfxCommandList::new();
    graph.execute(&mut cmd, FrameLabel::A);
    assert!(!cmd.commands().iter().any(|c| matches!(c, GfxCommand::BeginLabel { .. } | GfxCommand::EndLabel)));
    assert_eq!(cmd.rendering_scope_count(), 1);
}

// 资源生命周期

#[test]
fn test_reprocess_and_destroy_release_resources() {
    let mut allocator = GfxHeadlessAllocator::new();
    let external = allocator.create_image(&color_info(8, 8), "external").unwrap();

    let mut graph = RenderGraph::default();
    let external_ref = graph.import_image("external", external, RgImageState::UNDEFINED);
    let writer = add_writer(&mut graph, "writer");
    let copy = graph.add_node(
        "copy",
        vec![
            RgResourceDescriptor::image(SCENE, "scene").state(RgImageState::TRANSFER_SRC),
            RgResourceDescriptor::image(COLOR, "dst").external(external_ref).state(RgImageState::TRANSFER_DST),
        ],
        vec![],
        noop,
    );
    graph.connect(writer, COLOR, copy, SCENE).unwrap();

    graph.process(&mut allocator);
    assert_eq!(allocator.live_image_count(), 2);
    graph.process(&mut allocator);
    assert_eq!(allocator.live_image_count(), 2);

    graph.clear(&mut allocator);
    assert_eq!(graph.pass_count(), 0);
    assert!(graph.resource_pool().is_empty());
    assert_eq!(allocator.live_image_count(), 1);

    graph.destroy(&mut allocator);
    allocator.destroy_image(&external);
    assert_eq!(allocator.live_image_count(), 0);
    assert_eq!(allocator.live_view_count(), 0);
}

#[test]
#[should_panic(expected = "before process")]
fn test_execute_requires_process() {
    let mut graph = RenderGraph::default();
    add_writer(&mut graph, "writer");
    let mut cmd = GfxCommandList::new();
    graph.execute(&mut cmd, FrameLabel::A);
}

#[test]
#[should_panic(expected = "duplicate resource handle")]
fn test_duplicate_handle_panics() {
    let mut graph = RenderGraph::default();
    graph.add_node(
        "broken",
        vec![
            RgResourceDescriptor::image(COLOR, "a").create_image(color_info(8, 8)),
            RgResourceDescriptor::image(COLOR, "b").create_image(color_info(8, 8)),
        ],
        vec![],
        noop,
    );
}
