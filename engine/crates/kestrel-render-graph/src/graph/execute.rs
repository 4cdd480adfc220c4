use kestrel_gfx::{
    basic::color::LabelColor,
    commands::{
        barrier::{GfxBufferBarrier, GfxImageBarrier},
        recorder::GfxCommandRecorder,
    },
    frame::FrameLabel,
};
use slotmap::SecondaryMap;

use super::RenderGraph;
use crate::{
    barrier::PassBarriers,
    pass::{RgPassContext, RgPassHandle},
    profile_scope,
    resource::RgResourceId,
    resource_pool::{RgPhysicalResource, RgResourcePool},
    usage_track::{RgResourceUsageTrack, RgUsage},
};

/// 一帧的执行统计
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RgFrameStats {
    pub frame_label: FrameLabel,
    pub executed_passes: usize,
    pub skipped_passes: usize,
    pub image_barriers: usize,
    pub buffer_barriers: usize,
    pub layout_transitions: usize,
}

impl RgFrameStats {
    fn new(frame_label: FrameLabel) -> Self {
        Self {
            frame_label,
            executed_passes: 0,
            skipped_passes: 0,
            image_barriers: 0,
            buffer_barriers: 0,
            layout_transitions: 0,
        }
    }
}

impl RenderGraph<'_> {
    /// 录制一帧
    ///
    /// 按执行顺序依次为每个 pass 插入 barrier，再调用 pass 的回调。
    /// 所有命令录制到同一个 recorder 中，由调用方在帧末一次性提交。
    ///
    /// # Panics
    /// 结构变化后没有重新 process
    pub fn execute(&mut self, cmd: &mut dyn GfxCommandRecorder, frame_label: FrameLabel) -> RgFrameStats {
        profile_scope!("RenderGraph::execute");
        assert!(self.processed, "RenderGraph::execute called before process");

        let mut stats = RgFrameStats::new(frame_label);
        self.tracks.clear();

        for (order, &handle) in self.execution_order.iter().enumerate() {
            let node = &mut self.passes[handle];
            node.last_barriers.clear();

            if node.is_skipped() {
                log::trace!("RenderGraph: pass \"{}\" skipped", node.name);
                stats.skipped_passes += 1;
                continue;
            }

            let mut barriers = PassBarriers::new();
            for usage in &node.usages {
                if !self.tracks.contains_key(usage.resource) {
                    let track = seed_track(&self.pool, &self.carry_over, usage.resource);
                    self.tracks.insert(usage.resource, track);
                }
                let track = &mut self.tracks[usage.resource];
                barriers.extend(track.record(RgUsage::new(usage.access, usage.range, order)));
            }

            if barriers.has_barriers() {
                record_barriers(cmd, &self.pool, &barriers);
                stats.image_barriers += barriers.image_barrier_count();
                stats.buffer_barriers += barriers.buffer_barrier_count();
                stats.layout_transitions += barriers.iter().filter(|b| b.has_layout_transition()).count();
            }
            log::trace!(
                "RenderGraph: pass \"{}\" with {} image / {} buffer barriers",
                node.name,
                barriers.image_barrier_count(),
                barriers.buffer_barrier_count()
            );

            if self.settings.label_passes {
                cmd.begin_label(&node.name, LabelColor::COLOR_PASS);
            }
            match &node.compiled {
                Some(compiled) => {
                    for (subpass_idx, rendering_info) in compiled.rendered_subpasses() {
                        cmd.begin_rendering(rendering_info);
                        let mut ctx = RgPassContext {
                            cmd: &mut *cmd,
                            frame_label,
                            subpass_index: Some(subpass_idx),
                            pass_name: &node.name,
                            resources: &node.resolved,
                        };
                        node.executor.execute(&mut ctx);
                        cmd.end_rendering();
                    }
                }
                None => {
                    let mut ctx = RgPassContext {
                        cmd: &mut *cmd,
                        frame_label,
                        subpass_index: None,
                        pass_name: &node.name,
                        resources: &node.resolved,
                    };
                    node.executor.execute(&mut ctx);
                }
            }
            if self.settings.label_passes {
                cmd.end_label();
            }

            node.last_barriers = barriers;
            stats.executed_passes += 1;
        }

        // 池中资源的状态延续到下一帧，外部资源每帧从声明的初始状态开始
        for (id, track) in self.tracks.iter() {
            let Some(entry) = self.pool.get(id).filter(|e| e.is_pool_owned()) else {
                continue;
            };
            if let Some(physical) = entry.physical() {
                self.carry_over.insert(id, track.final_usages(physical.full_range()));
            }
        }

        stats
    }

    /// pass 在最近一次 execute 中插入的 barrier
    pub fn frame_barriers(&self, pass: RgPassHandle) -> Option<&PassBarriers> {
        self.passes.get(pass).map(|node| node.last_barriers())
    }
}

fn seed_track(
    pool: &RgResourcePool,
    carry_over: &SecondaryMap<RgResourceId, Vec<RgUsage>>,
    resource: RgResourceId,
) -> RgResourceUsageTrack {
    let entry = pool.get(resource).unwrap_or_else(|| panic!("RenderGraph: usage of unknown resource {:?}", resource));
    let kind = entry.kind();

    if let Some(previous) = carry_over.get(resource) {
        return RgResourceUsageTrack::new(resource, kind, previous.iter().copied());
    }

    let full_range = match entry.physical() {
        Some(physical) => physical.full_range(),
        None => panic!("RenderGraph: usage of unrealized resource \"{}\"", entry.name()),
    };
    RgResourceUsageTrack::new(resource, kind, [RgUsage::initial(entry.initial_access, full_range)])
}

fn record_barriers(cmd: &mut dyn GfxCommandRecorder, pool: &RgResourcePool, barriers: &PassBarriers) {
    let image_barriers: Vec<GfxImageBarrier> = barriers
        .image_barriers
        .iter()
        .filter_map(|barrier| match pool.physical(barrier.resource)? {
            RgPhysicalResource::Image(image) => Some(barrier.to_gfx_image_barrier(image.handle())),
            RgPhysicalResource::Buffer(_) => None,
        })
        .collect();
    let buffer_barriers: Vec<GfxBufferBarrier> = barriers
        .buffer_barriers
        .iter()
        .filter_map(|barrier| match pool.physical(barrier.resource)? {
            RgPhysicalResource::Buffer(buffer) => Some(barrier.to_gfx_buffer_barrier(buffer.handle())),
            RgPhysicalResource::Image(_) => None,
        })
        .collect();

    cmd.pipeline_barrier(&image_barriers, &buffer_barriers);
}
