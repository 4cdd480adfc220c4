//! 执行计划的调试输出

use ash::vk;
use itertools::Itertools;

use crate::{
    barrier::RgBarrier, graph::RenderGraph, pass::RgPassState, resource::RgResourceKind, resource_state::is_write_access,
};

// 调试方法
impl RenderGraph<'_> {
    /// 打印执行计划（用于调试）
    ///
    /// 输出每个 Pass 的执行顺序、port 连接、资源使用，以及最近一次 execute 插入的 barrier。
    pub fn print_execution_plan(&self) {
        let order = self.execution_order();
        log::info!("╔══════════════════════════════════════════════════════════════════╗");
        log::info!("║              RenderGraph Execution Plan                          ║");
        log::info!("╠══════════════════════════════════════════════════════════════════╣");
        log::info!(
            "║ Total Passes: {}  |  Execution Order: [{}]",
            self.pass_count(),
            order.iter().filter_map(|&h| self.pass(h)).map(|p| p.name()).join(" → ")
        );
        log::info!("╚══════════════════════════════════════════════════════════════════╝");

        for (idx, &handle) in order.iter().enumerate() {
            let Some(pass) = self.pass(handle) else {
                continue;
            };

            log::info!("");
            log::info!("┌─────────────────────────────────────────────────────────────────┐");
            log::info!("│ [{}/{}] Pass: \"{}\"", idx + 1, order.len(), pass.name());
            log::info!("├─────────────────────────────────────────────────────────────────┤");

            if let RgPassState::Skipped(reason) = pass.state() {
                log::info!("│ ⏭️  Skipped: {}", reason);
                log::info!("└─────────────────────────────────────────────────────────────────┘");
                continue;
            }

            for port in pass.inputs() {
                let upstream = port
                    .connection()
                    .and_then(|c| self.pass(c.pass).map(|p| format!("\"{}\".{:?}", p.name(), c.handle)))
                    .unwrap_or_else(|| "<unconnected>".to_string());
                log::info!("│ ⬅️  in  {:?} \"{}\" <- {}", port.handle(), port.name(), upstream);
            }
            for port in pass.outputs() {
                log::info!("│ ➡️  out {:?} \"{}\"", port.handle(), port.name());
            }

            for usage in pass.usages() {
                let name = self.resource_pool().name(usage.resource);
                let icon = if is_write_access(usage.access.access) { "✏️ " } else { "📖" };
                log::info!(
                    "│   {} \"{}\" @ {:?} (stage: {}, access: {}, range: mip {}+{} layer {}+{})",
                    icon,
                    name,
                    usage.access.layout,
                    format_pipeline_stage(usage.access.stage),
                    format_access_flags(usage.access.access),
                    usage.range.base_mip,
                    usage.range.mip_count,
                    usage.range.base_layer,
                    usage.range.layer_count
                );
            }

            let barriers = pass.last_barriers();
            if barriers.has_barriers() {
                log::info!("├─────────────────────────────────────────────────────────────────┤");
                log::info!(
                    "│ Barriers: {} image, {} buffer",
                    barriers.image_barrier_count(),
                    barriers.buffer_barrier_count()
                );
                for barrier in barriers.iter() {
                    self.print_barrier(barrier);
                }
            } else {
                log::info!("│ No barriers recorded");
            }

            log::info!("└─────────────────────────────────────────────────────────────────┘");
        }

        log::info!("");
        log::info!("═══════════════════════ End of Execution Plan ═══════════════════════");
    }

    fn print_barrier(&self, barrier: &RgBarrier) {
        let name = self.resource_pool().name(barrier.resource);
        let source = match barrier.src_pass.and_then(|order| self.execution_order().get(order)) {
            Some(&h) => self.pass(h).map(|p| p.name()).unwrap_or("<unknown>"),
            None => "<frame start>",
        };

        match barrier.kind {
            RgResourceKind::Image => {
                let layout_change = if barrier.has_layout_transition() {
                    format!("{:?} → {:?}", barrier.old_layout, barrier.new_layout)
                } else {
                    format!("{:?} (no layout change)", barrier.old_layout)
                };
                log::info!("│   🔒 Image \"{}\" (after \"{}\"):", name, source);
                log::info!("│       Layout: {}", layout_change);
                log::info!(
                    "│       Range:  {:?} mip {}+{} layer {}+{}",
                    barrier.range.aspect,
                    barrier.range.base_mip,
                    barrier.range.mip_count,
                    barrier.range.base_layer,
                    barrier.range.layer_count
                );
            }
            RgResourceKind::Buffer => {
                log::info!("│   🔒 Buffer \"{}\" (after \"{}\"):", name, source);
            }
        }
        log::info!(
            "│       Stage:  {} → {}",
            format_pipeline_stage(barrier.src_stage),
            format_pipeline_stage(barrier.dst_stage)
        );
        log::info!(
            "│       Access: {} → {}",
            format_access_flags(barrier.src_access),
            format_access_flags(barrier.dst_access)
        );
    }
}

/// 格式化 PipelineStageFlags2 为可读字符串
pub fn format_pipeline_stage(stage: vk::PipelineStageFlags2) -> String {
    const NAMES: &[(vk::PipelineStageFlags2, &str)] = &[
        (vk::PipelineStageFlags2::TOP_OF_PIPE, "TOP_OF_PIPE"),
        (vk::PipelineStageFlags2::BOTTOM_OF_PIPE, "BOTTOM_OF_PIPE"),
        (vk::PipelineStageFlags2::DRAW_INDIRECT, "DRAW_INDIRECT"),
        (vk::PipelineStageFlags2::VERTEX_INPUT, "VERTEX_INPUT"),
        (vk::PipelineStageFlags2::INDEX_INPUT, "INDEX_INPUT"),
        (vk::PipelineStageFlags2::VERTEX_SHADER, "VERTEX_SHADER"),
        (vk::PipelineStageFlags2::FRAGMENT_SHADER, "FRAGMENT_SHADER"),
        (vk::PipelineStageFlags2::EARLY_FRAGMENT_TESTS, "EARLY_FRAGMENT_TESTS"),
        (vk::PipelineStageFlags2::LATE_FRAGMENT_TESTS, "LATE_FRAGMENT_TESTS"),
        (vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT, "COLOR_ATTACHMENT_OUTPUT"),
        (vk::PipelineStageFlags2::COMPUTE_SHADER, "COMPUTE_SHADER"),
        (vk::PipelineStageFlags2::TRANSFER, "TRANSFER"),
        (vk::PipelineStageFlags2::HOST, "HOST"),
        (vk::PipelineStageFlags2::ALL_GRAPHICS, "ALL_GRAPHICS"),
        (vk::PipelineStageFlags2::ALL_COMMANDS, "ALL_COMMANDS"),
    ];

    if stage == vk::PipelineStageFlags2::NONE {
        return "NONE".to_string();
    }
    let stages = NAMES.iter().filter(|(flag, _)| stage.contains(*flag)).map(|(_, name)| *name).collect_vec();
    if stages.is_empty() { format!("{:?}", stage) } else { stages.join(" | ") }
}

/// 格式化 AccessFlags2 为可读字符串
pub fn format_access_flags(access: vk::AccessFlags2) -> String {
    const NAMES: &[(vk::AccessFlags2, &str)] = &[
        (vk::AccessFlags2::INDIRECT_COMMAND_READ, "INDIRECT_CMD_READ"),
        (vk::AccessFlags2::INDEX_READ, "INDEX_READ"),
        (vk::AccessFlags2::VERTEX_ATTRIBUTE_READ, "VERTEX_ATTR_READ"),
        (vk::AccessFlags2::UNIFORM_READ, "UNIFORM_READ"),
        (vk::AccessFlags2::SHADER_SAMPLED_READ, "SHADER_SAMPLED_READ"),
        (vk::AccessFlags2::SHADER_STORAGE_READ, "STORAGE_READ"),
        (vk::AccessFlags2::SHADER_STORAGE_WRITE, "STORAGE_WRITE"),
        (vk::AccessFlags2::COLOR_ATTACHMENT_READ, "COLOR_ATTACH_READ"),
        (vk::AccessFlags2::COLOR_ATTACHMENT_WRITE, "COLOR_ATTACH_WRITE"),
        (vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_READ, "DEPTH_ATTACH_READ"),
        (vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_WRITE, "DEPTH_ATTACH_WRITE"),
        (vk::AccessFlags2::TRANSFER_READ, "TRANSFER_READ"),
        (vk::AccessFlags2::TRANSFER_WRITE, "TRANSFER_WRITE"),
        (vk::AccessFlags2::HOST_READ, "HOST_READ"),
        (vk::AccessFlags2::MEMORY_READ, "MEMORY_READ"),
        (vk::AccessFlags2::MEMORY_WRITE, "MEMORY_WRITE"),
    ];

    if access == vk::AccessFlags2::NONE {
        return "NONE".to_string();
    }
    let flags = NAMES.iter().filter(|(flag, _)| access.contains(*flag)).map(|(_, name)| *name).collect_vec();
    if flags.is_empty() { format!("{:?}", access) } else { flags.join(" | ") }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_flags() {
        assert_eq!(format_pipeline_stage(vk::PipelineStageFlags2::NONE), "NONE");
        assert_eq!(
            format_pipeline_stage(vk::PipelineStageFlags2::EARLY_FRAGMENT_TESTS | vk::PipelineStageFlags2::LATE_FRAGMENT_TESTS),
            "EARLY_FRAGMENT_TESTS | LATE_FRAGMENT_TESTS"
        );
        assert_eq!(
            format_access_flags(vk::AccessFlags2::COLOR_ATTACHMENT_WRITE),
            "COLOR_ATTACH_WRITE"
        );
    }
}
