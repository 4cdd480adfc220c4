//! 资源使用历史与 hazard 检测
//!
//! 每个资源维护一条按执行顺序排列的 usage 历史。记录新 usage 时，从最新的历史向前扫描：
//! - 与更早 usage 的重叠部分如果没有 hazard、也没有 layout 变化，就把它的 stage/access 并入 src，
//!   继续用剩余范围向更早的 usage 扫描
//! - 遇到第一个造成 hazard 的 usage 就为这部分范围生成一条 barrier，这部分范围的扫描结束
//! - 与该 usage 不重叠的部分（差集）保持原样，继续向前扫描

use ash::vk;
use itertools::Itertools;

use crate::{
    barrier::RgBarrier,
    resource::{RgAccess, RgResourceId, RgResourceKind},
    resource_state::is_write_access,
    subresource::RgSubresourceRange,
};

/// 一次使用
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RgUsage {
    pub stage: vk::PipelineStageFlags2,
    pub access: vk::AccessFlags2,
    /// 只对 image 有意义
    pub layout: vk::ImageLayout,
    pub range: RgSubresourceRange,
    /// 在执行顺序中的位置，None 表示帧开始时的状态
    pub pass_order: Option<usize>,
    /// 这次使用之前是否做了 layout transition
    ///
    /// layout transition 会写入图像内存，之后的读取需要等待它完成。
    pub transitioned: bool,
}

impl RgUsage {
    pub fn new(access: RgAccess, range: RgSubresourceRange, pass_order: usize) -> Self {
        Self {
            stage: access.stage,
            access: access.access,
            layout: access.layout,
            range,
            pass_order: Some(pass_order),
            transitioned: false,
        }
    }

    /// 帧开始时资源所处的状态
    pub fn initial(access: RgAccess, range: RgSubresourceRange) -> Self {
        Self {
            stage: access.stage,
            access: access.access,
            layout: access.layout,
            range,
            pass_order: None,
            transitioned: false,
        }
    }

    #[inline]
    pub fn is_write(&self) -> bool {
        is_write_access(self.access)
    }

    /// 对之后的使用来说，这次使用是否相当于写
    #[inline]
    fn writes_memory(&self) -> bool {
        self.is_write() || self.transitioned
    }

    /// 是否真正访问过内存
    #[inline]
    fn touches_memory(&self) -> bool {
        self.access != vk::AccessFlags2::NONE || self.transitioned
    }

    /// `later` 的执行和内存依赖是否已经被这次使用之前的 barrier 覆盖
    ///
    /// 只有带 layout transition 的使用才有对应的 barrier。
    #[inline]
    fn covers(&self, later: &RgUsage) -> bool {
        self.transitioned
            && !later.is_write()
            && self.layout == later.layout
            && self.stage.contains(later.stage)
            && self.access.contains(later.access)
    }
}

/// 向前扫描时尚未找到 hazard 的一块范围
#[derive(Clone, Copy, Debug)]
struct PendingRange {
    range: RgSubresourceRange,
    src_stage: vk::PipelineStageFlags2,
    src_access: vk::AccessFlags2,
    /// 离新 usage 最近的那次使用的 layout，也就是 barrier 的 old layout
    nearest_layout: Option<vk::ImageLayout>,
}

/// 单个资源在一帧内的使用历史
#[derive(Debug)]
pub struct RgResourceUsageTrack {
    resource: RgResourceId,
    kind: RgResourceKind,
    history: Vec<RgUsage>,
}

// new & init
impl RgResourceUsageTrack {
    /// 用帧开始时的状态初始化，`seed` 需要覆盖整个资源
    pub fn new(resource: RgResourceId, kind: RgResourceKind, seed: impl IntoIterator<Item = RgUsage>) -> Self {
        let history = seed
            .into_iter()
            .map(|usage| RgUsage {
                pass_order: None,
                ..usage
            })
            .collect_vec();
        Self {
            resource,
            kind,
            history,
        }
    }
}

// getters
impl RgResourceUsageTrack {
    #[inline]
    pub fn resource(&self) -> RgResourceId {
        self.resource
    }

    #[inline]
    pub fn kind(&self) -> RgResourceKind {
        self.kind
    }

    #[inline]
    pub fn history(&self) -> &[RgUsage] {
        &self.history
    }
}

// 记录与 barrier 生成
impl RgResourceUsageTrack {
    /// 追加一次使用，返回它之前需要插入的 barrier
    ///
    /// # Panics
    /// usage 的 pass_order 必须不小于历史中最后一次使用
    pub fn record(&mut self, usage: RgUsage) -> Vec<RgBarrier> {
        assert!(usage.pass_order.is_some(), "recorded usage must belong to a pass");
        if let Some(last) = self.history.last() {
            assert!(
                last.pass_order <= usage.pass_order,
                "usage recorded out of execution order: {:?} after {:?}",
                usage.pass_order,
                last.pass_order
            );
        }

        let usage = match self.kind {
            RgResourceKind::Image => usage,
            RgResourceKind::Buffer => RgUsage {
                range: RgSubresourceRange::WHOLE_BUFFER,
                layout: vk::ImageLayout::UNDEFINED,
                ..usage
            },
        };

        let barriers = self.scan(&usage);

        // 做了 layout transition 的部分单独记录，之后的读取会把它当作写
        let transitioned_ranges = barriers.iter().filter(|b| b.has_layout_transition()).map(|b| b.range).collect_vec();
        let mut plain_ranges = vec![usage.range];
        for transitioned in &transitioned_ranges {
            plain_ranges = plain_ranges.iter().flat_map(|r| r.subtract(transitioned)).collect();
        }

        self.history.extend(transitioned_ranges.into_iter().map(|range| RgUsage {
            range,
            transitioned: true,
            ..usage
        }));
        self.history.extend(plain_ranges.into_iter().map(|range| RgUsage { range, ..usage }));

        barriers
    }

    fn scan(&self, usage: &RgUsage) -> Vec<RgBarrier> {
        let mut barriers = Vec::new();
        let mut pending = vec![PendingRange {
            range: usage.range,
            src_stage: vk::PipelineStageFlags2::NONE,
            src_access: vk::AccessFlags2::NONE,
            nearest_layout: None,
        }];

        for earlier in self.history.iter().rev() {
            if pending.is_empty() {
                break;
            }
            // 同一个 pass 内的多次使用之间无法插入 barrier
            if earlier.pass_order == usage.pass_order {
                continue;
            }

            let mut remaining = Vec::with_capacity(pending.len());
            for part in pending {
                let Some(overlap) = part.range.intersect(&earlier.range) else {
                    remaining.push(part);
                    continue;
                };
                remaining.extend(part.range.subtract(&earlier.range).into_iter().map(|range| PendingRange { range, ..part }));

                // 更早的 transition barrier 已经同步过这部分范围
                if earlier.covers(usage) {
                    continue;
                }
                let nearest_layout = part.nearest_layout.unwrap_or(earlier.layout);

                let src_stage = part.src_stage | earlier.stage;
                let src_access = part.src_access | earlier.access;

                let hazard = if usage.is_write() { earlier.touches_memory() } else { earlier.writes_memory() };
                let layout_change = self.kind == RgResourceKind::Image && nearest_layout != usage.layout;

                if hazard || layout_change {
                    barriers.push(RgBarrier {
                        resource: self.resource,
                        kind: self.kind,
                        range: overlap,
                        src_stage,
                        src_access,
                        dst_stage: usage.stage,
                        dst_access: usage.access,
                        old_layout: nearest_layout,
                        new_layout: usage.layout,
                        src_pass: earlier.pass_order,
                    });
                } else {
                    remaining.push(PendingRange {
                        range: overlap,
                        src_stage,
                        src_access,
                        nearest_layout: Some(nearest_layout),
                    });
                }
            }
            pending = remaining;
        }

        barriers
    }

    /// 帧结束时每块范围最后一次使用的状态，作为下一帧的初始状态
    pub fn final_usages(&self, full_range: RgSubresourceRange) -> Vec<RgUsage> {
        let mut result = Vec::new();
        let mut pending = vec![full_range];

        for usage in self.history.iter().rev() {
            if pending.is_empty() {
                break;
            }
            let mut remaining = Vec::with_capacity(pending.len());
            for range in pending {
                match range.intersect(&usage.range) {
                    Some(overlap) => {
                        result.push(RgUsage {
                            range: overlap,
                            pass_order: None,
                            ..*usage
                        });
                        remaining.extend(range.subtract(&usage.range));
                    }
                    None => remaining.push(range),
                }
            }
            pending = remaining;
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource_state::{RgBufferState, RgImageState};
    use slotmap::KeyData;

    const COLOR: vk::ImageAspectFlags = vk::ImageAspectFlags::COLOR;

    fn image_track(mips: u32, initial: RgImageState) -> RgResourceUsageTrack {
        let full = RgSubresourceRange::full(COLOR, mips, 1);
        RgResourceUsageTrack::new(
            RgResourceId::from(KeyData::from_ffi(7)),
            RgResourceKind::Image,
            [RgUsage::initial(initial.into(), full)],
        )
    }

    fn mip(level: u32) -> RgSubresourceRange {
        RgSubresourceRange::mip_level(COLOR, level, 1)
    }

    #[test]
    fn test_write_then_sample() {
        let full = RgSubresourceRange::full(COLOR, 1, 1);
        let mut track = image_track(1, RgImageState::UNDEFINED);

        let first = track.record(RgUsage::new(RgImageState::COLOR_ATTACHMENT_WRITE.into(), full, 0));
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].old_layout, vk::ImageLayout::UNDEFINED);
        assert_eq!(first[0].src_pass, None);

        let second = track.record(RgUsage::new(RgImageState::SHADER_READ_FRAGMENT.into(), full, 1));
        assert_eq!(second.len(), 1);
        let barrier = second[0];
        assert_eq!(barrier.src_stage, vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT);
        assert_eq!(barrier.src_access, vk::AccessFlags2::COLOR_ATTACHMENT_WRITE);
        assert_eq!(barrier.dst_stage, vk::PipelineStageFlags2::FRAGMENT_SHADER);
        assert_eq!(barrier.dst_access, vk::AccessFlags2::SHADER_SAMPLED_READ);
        assert_eq!(barrier.old_layout, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
        assert_eq!(barrier.new_layout, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
        assert_eq!(barrier.src_pass, Some(0));
    }

    #[test]
    fn test_disjoint_mips_then_full_read() {
        let mut track = image_track(2, RgImageState::UNDEFINED);

        let w0 = track.record(RgUsage::new(RgImageState::COLOR_ATTACHMENT_WRITE.into(), mip(0), 0));
        let w1 = track.record(RgUsage::new(RgImageState::COLOR_ATTACHMENT_WRITE.into(), mip(1), 1));
        // 两个 writer 之间没有依赖，只有各自从初始状态的 transition
        assert!(w0.iter().chain(w1.iter()).all(|b| b.src_pass.is_none()));
        assert_eq!(w1.len(), 1);
        assert_eq!(w1[0].range, mip(1));

        let reads = track.record(RgUsage::new(
            RgImageState::SHADER_READ_FRAGMENT.into(),
            RgSubresourceRange::full(COLOR, 2, 1),
            2,
        ));
        assert_eq!(reads.len(), 2);
        let mut sources = reads.iter().map(|b| (b.src_pass, b.range.base_mip)).collect_vec();
        sources.sort();
        assert_eq!(sources, vec![(Some(0), 0), (Some(1), 1)]);
    }

    #[test]
    fn test_read_after_read_without_transition() {
        let full = RgSubresourceRange::full(COLOR, 1, 1);
        let mut track = image_track(1, RgImageState::SHADER_READ_FRAGMENT);

        assert!(track.record(RgUsage::new(RgImageState::SHADER_READ_FRAGMENT.into(), full, 0)).is_empty());
        assert!(track.record(RgUsage::new(RgImageState::SHADER_READ_FRAGMENT.into(), full, 1)).is_empty());
    }

    #[test]
    fn test_read_covered_by_previous_transition() {
        let full = RgSubresourceRange::full(COLOR, 1, 1);
        let mut track = image_track(1, RgImageState::UNDEFINED);

        track.record(RgUsage::new(RgImageState::STORAGE_WRITE_COMPUTE.into(), full, 0));
        assert_eq!(track.record(RgUsage::new(RgImageState::SHADER_READ_FRAGMENT.into(), full, 1)).len(), 1);
        // 与上一个读取同 stage 同 layout，已经被上一个 barrier 覆盖
        assert!(track.record(RgUsage::new(RgImageState::SHADER_READ_FRAGMENT.into(), full, 2)).is_empty());
        // compute 阶段不在上一个 barrier 的 dst 范围内，需要等 transition 完成
        let compute = track.record(RgUsage::new(RgImageState::SHADER_READ_COMPUTE.into(), full, 3));
        assert_eq!(compute.len(), 1);
        assert_eq!(compute[0].old_layout, compute[0].new_layout);
    }

    #[test]
    fn test_write_after_read_accumulates_src() {
        let mut track = RgResourceUsageTrack::new(
            RgResourceId::from(KeyData::from_ffi(3)),
            RgResourceKind::Buffer,
            [RgUsage::initial(RgBufferState::UNDEFINED.into(), RgSubresourceRange::WHOLE_BUFFER)],
        );
        let whole = RgSubresourceRange::WHOLE_BUFFER;

        assert!(track.record(RgUsage::new(RgBufferState::TRANSFER_DST.into(), whole, 0)).is_empty());
        let read = track.record(RgUsage::new(RgBufferState::STORAGE_READ_COMPUTE.into(), whole, 1));
        assert_eq!(read.len(), 1);
        assert_eq!(read[0].src_access, vk::AccessFlags2::TRANSFER_WRITE);

        let write = track.record(RgUsage::new(RgBufferState::TRANSFER_DST.into(), whole, 2));
        assert_eq!(write.len(), 1);
        assert_eq!(write[0].src_pass, Some(1));
        assert_eq!(write[0].src_stage, vk::PipelineStageFlags2::COMPUTE_SHADER);
    }

    #[test]
    fn test_same_pass_usages_do_not_conflict() {
        let mut track = image_track(2, RgImageState::UNDEFINED);
        track.record(RgUsage::new(RgImageState::COLOR_ATTACHMENT_WRITE.into(), mip(0), 0));

        // 下采样：同一个 pass 读 mip 0，写 mip 1
        let read = track.record(RgUsage::new(RgImageState::SHADER_READ_FRAGMENT.into(), mip(0), 1));
        let write = track.record(RgUsage::new(RgImageState::COLOR_ATTACHMENT_WRITE.into(), mip(1), 1));
        assert_eq!(read.len(), 1);
        assert_eq!(read[0].src_pass, Some(0));
        assert_eq!(write.len(), 1);
        assert_eq!(write[0].src_pass, None);
    }

    #[test]
    fn test_final_usages_cover_full_range() {
        let mut track = image_track(3, RgImageState::UNDEFINED);
        track.record(RgUsage::new(RgImageState::COLOR_ATTACHMENT_WRITE.into(), mip(1), 0));

        let full = RgSubresourceRange::full(COLOR, 3, 1);
        let finals = track.final_usages(full);
        assert_eq!(finals.iter().map(|u| u.range.volume()).sum::<u64>(), full.volume());
        assert!(finals.iter().all(|u| u.pass_order.is_none()));

        let mip1 = finals.iter().find(|u| u.range == mip(1)).unwrap();
        assert_eq!(mip1.layout, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
        assert!(mip1.transitioned);
    }

    #[test]
    #[should_panic]
    fn test_out_of_order_usage_panics() {
        let full = RgSubresourceRange::full(COLOR, 1, 1);
        let mut track = image_track(1, RgImageState::UNDEFINED);
        track.record(RgUsage::new(RgImageState::COLOR_ATTACHMENT_WRITE.into(), full, 2));
        track.record(RgUsage::new(RgImageState::SHADER_READ_FRAGMENT.into(), full, 1));
    }
}
