//! Process：资源创建、排序、Preprocess（usage 收集）和 Compile（render pass 组装）

use std::collections::HashMap;

use ash::vk;
use itertools::Itertools;
use kestrel_gfx::resources::allocator::GfxResourceAllocator;

use super::RenderGraph;
use crate::{
    error::RgCompileError,
    pass::{RgPassHandle, RgPassNode, RgPassState, RgPassUsage, RgResolvedResource},
    profile_scope,
    render_pass::RgCompiledRenderPass,
    resource::{RgAccess, RgResourceSource},
    resource_pool::{RgPhysicalResource, RgResourcePool},
    subresource::RgSubresourceRange,
};

/// [`RenderGraph::process`] 的结果
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RgProcessReport {
    pub pass_count: usize,
    pub created_resources: usize,
    pub failed_resources: usize,
    /// 被跳过的 pass 及原因
    pub skipped: Vec<(String, RgCompileError)>,
}

impl RgProcessReport {
    #[inline]
    pub fn is_clean(&self) -> bool {
        self.failed_resources == 0 && self.skipped.is_empty()
    }
}

impl RenderGraph<'_> {
    /// 编译整个 graph
    ///
    /// 创建 graph 持有的资源，计算执行顺序，收集每个 pass 的 usage 并组装 render pass。
    /// 创建失败或缺少 attachment 的 pass 会被标记为跳过，不会中断其它 pass。
    /// 再次调用时会先释放上一次创建的资源。
    pub fn process(&mut self, allocator: &mut dyn GfxResourceAllocator) -> RgProcessReport {
        profile_scope!("RenderGraph::process");

        self.release_compiled(allocator);
        self.pool.release(allocator);
        let realize = self.pool.realize(allocator);

        self.refresh_all_ports();
        self.execution_order = self.compute_execution_order();
        self.tracks.clear();
        self.carry_over.clear();

        let mut report = RgProcessReport {
            pass_count: self.passes.len(),
            created_resources: realize.created,
            failed_resources: realize.failed.len(),
            skipped: Vec::new(),
        };

        for &handle in &self.execution_order {
            let node = &mut self.passes[handle];
            let result = node.preprocess(&self.pool).and_then(|()| node.compile(allocator));
            match result {
                Ok(()) => node.state = RgPassState::Ready,
                Err(e) => {
                    if self.settings.warn_on_skipped_pass {
                        log::warn!("RenderGraph: skip pass \"{}\": {}", node.name, e);
                    } else {
                        log::debug!("RenderGraph: skip pass \"{}\": {}", node.name, e);
                    }
                    node.resolved.clear();
                    node.usages.clear();
                    report.skipped.push((node.name.clone(), e.clone()));
                    node.state = RgPassState::Skipped(e);
                }
            }
        }

        self.processed = true;
        log::info!(
            "RenderGraph processed: {} passes ({} skipped), {} resources created, {} failed",
            report.pass_count,
            report.skipped.len(),
            report.created_resources,
            report.failed_resources
        );
        if self.settings.print_plan_on_process {
            self.print_execution_plan();
        }

        report
    }

    /// 按依赖深度排序
    ///
    /// `depth(pass) = 1 + max(depth(upstream))`，depth 相同时保持添加顺序。
    pub(crate) fn compute_execution_order(&self) -> Vec<RgPassHandle> {
        let mut depths = HashMap::with_capacity(self.passes.len());
        for &pass in &self.insertion_order {
            self.depth(pass, &mut depths);
        }

        self.insertion_order
            .iter()
            .copied()
            .enumerate()
            .sorted_by_key(|&(insert_idx, pass)| (depths[&pass], insert_idx))
            .map(|(_, pass)| pass)
            .collect()
    }

    fn depth(&self, pass: RgPassHandle, memo: &mut HashMap<RgPassHandle, usize>) -> usize {
        if let Some(&depth) = memo.get(&pass) {
            return depth;
        }
        let depth = 1 + self.passes[pass]
            .inputs()
            .iter()
            .filter_map(|p| p.connection())
            .map(|upstream| self.depth(upstream.pass, memo))
            .max()
            .unwrap_or(0);
        memo.insert(pass, depth);
        depth
    }
}

impl RgPassNode<'_> {
    /// 解析 descriptor 对应的物理资源并收集 usage
    ///
    /// attachment 隐含的使用会记录为 usage。descriptor 自己声明的使用与 attachment 范围相同且 layout 兼容时
    /// 并入 attachment 的 usage，否则单独记录（例如采样 mip 0 同时渲染到 mip 1）。
    ///
    /// # Panics
    /// descriptor 的 range 或 attachment 的 view_range 超出资源的范围
    pub(crate) fn preprocess(&mut self, pool: &RgResourcePool) -> Result<(), RgCompileError> {
        self.resolved.clear();
        self.usages.clear();

        let mut declared = HashMap::new();

        for desc in &self.descriptors {
            let resource = self.resolve_ref(desc.handle);
            let physical = resource
                .id()
                .filter(|&id| !pool.is_failed(id))
                .and_then(|id| pool.physical(id).map(|physical| (id, physical)));

            let Some((id, physical)) = physical else {
                if desc.optional {
                    log::debug!("pass \"{}\": optional resource \"{}\" is empty", self.name, desc.name);
                    continue;
                }
                return Err(RgCompileError::MissingResource {
                    handle: desc.handle,
                    name: desc.name.clone(),
                });
            };

            let resolved = match physical {
                RgPhysicalResource::Image(image) => RgResolvedResource::Image {
                    image,
                    view: image.default_view(),
                },
                RgPhysicalResource::Buffer(buffer) => RgResolvedResource::Buffer(buffer),
            };
            self.resolved.insert(desc.handle, resolved);

            if matches!(desc.source, RgResourceSource::Forward(_)) {
                continue;
            }
            let full_range = physical.full_range();
            let range = desc.range.unwrap_or(full_range);
            assert!(
                full_range.contains(&range),
                "pass \"{}\": range {:?} of \"{}\" is out of {:?}",
                self.name,
                range,
                desc.name,
                full_range
            );
            declared.insert(desc.handle, (id, range, full_range));

            let Some(access) = desc.access else {
                continue;
            };
            let folded = self
                .subpasses
                .iter()
                .flat_map(|s| s.attachments())
                .any(|a| a.handle == desc.handle && folds_into(access, range, a.access(), a.view_range.unwrap_or(range)));
            if folded {
                continue;
            }
            merge_usage(
                &mut self.usages,
                RgPassUsage {
                    handle: desc.handle,
                    resource: id,
                    access,
                    range,
                },
            );
        }

        for attachment in self.subpasses.iter().flat_map(|s| s.attachments()) {
            // 可选资源为空时 attachment 被忽略
            let Some(&(id, declared_range, full_range)) = declared.get(&attachment.handle) else {
                continue;
            };
            let range = attachment.view_range.unwrap_or(declared_range);
            assert!(
                full_range.contains(&range),
                "pass \"{}\": attachment view range {:?} of {:?} is out of {:?}",
                self.name,
                range,
                attachment.handle,
                full_range
            );

            let mut access = attachment.access();
            let desc_access = self.descriptors.iter().find(|d| d.handle == attachment.handle).and_then(|d| d.access);
            match desc_access {
                Some(desc_access) if folds_into(desc_access, declared_range, access, range) => {
                    access.stage |= desc_access.stage;
                    access.access |= desc_access.access;
                }
                Some(desc_access) if declared_range.overlaps(&range) => {
                    log::warn!(
                        "pass \"{}\": {:?} is used as {:?} and bound as attachment with {:?} on overlapping ranges",
                        self.name,
                        attachment.handle,
                        desc_access.layout,
                        access.layout
                    );
                }
                _ => {}
            }
            merge_usage(
                &mut self.usages,
                RgPassUsage {
                    handle: attachment.handle,
                    resource: id,
                    access,
                    range,
                },
            );
        }

        Ok(())
    }

    /// 光栅 pass 组装 dynamic rendering 信息，非光栅 pass 什么也不做
    pub(crate) fn compile(&mut self, allocator: &mut dyn GfxResourceAllocator) -> Result<(), RgCompileError> {
        if self.subpasses.is_empty() {
            return Ok(());
        }
        let compiled = RgCompiledRenderPass::compile(&self.name, &self.subpasses, &self.resolved, allocator)?;
        self.compiled = Some(compiled);
        Ok(())
    }
}

/// descriptor 声明的使用能否并入 attachment 的 usage：范围相同，且没有声明 layout 或 layout 一致
fn folds_into(
    declared: RgAccess,
    declared_range: RgSubresourceRange,
    attachment: RgAccess,
    range: RgSubresourceRange,
) -> bool {
    declared_range == range
        && (declared.layout == attachment.layout || declared.layout == vk::ImageLayout::UNDEFINED)
}

/// 同一个 pass 对同一块范围的多次使用合并为一次
///
/// stage/access 取并集，layout 冲突时以后出现的为准。
fn merge_usage(usages: &mut Vec<RgPassUsage>, usage: RgPassUsage) {
    let Some(existing) = usages.iter_mut().find(|u| u.resource == usage.resource && u.range == usage.range) else {
        usages.push(usage);
        return;
    };
    if existing.access.layout != usage.access.layout {
        log::warn!(
            "conflicting layouts for one resource in a pass: {:?} and {:?}",
            existing.access.layout,
            usage.access.layout
        );
    }
    existing.access = RgAccess {
        stage: existing.access.stage | usage.access.stage,
        access: existing.access.access | usage.access.access,
        layout: usage.access.layout,
    };
}
