use ash::vk;

use crate::commands::{
    barrier::{GfxBufferBarrier, GfxImageBarrier},
    recorder::GfxCommandRecorder,
    rendering_info::GfxRenderingInfo,
};

/// 录制下来的单条命令
///
/// 每个 variant 都内联保存参数，之后可以回放到任意 [`GfxCommandRecorder`]。
#[derive(Clone, Debug)]
pub enum GfxCommand {
    BeginRendering(GfxRenderingInfo),
    EndRendering,
    BindPipeline {
        bind_point: vk::PipelineBindPoint,
        pipeline: vk::Pipeline,
    },
    BindDescriptorSets {
        bind_point: vk::PipelineBindPoint,
        pipeline_layout: vk::PipelineLayout,
        first_set: u32,
        descriptor_sets: Vec<vk::DescriptorSet>,
    },
    BindVertexBuffers {
        first_binding: u32,
        buffers: Vec<vk::Buffer>,
        offsets: Vec<vk::DeviceSize>,
    },
    BindIndexBuffer {
        buffer: vk::Buffer,
        offset: vk::DeviceSize,
        index_type: vk::IndexType,
    },
    Draw {
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    },
    DrawIndexed {
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    },
    Dispatch([u32; 3]),
    CopyBuffer {
        src: vk::Buffer,
        dst: vk::Buffer,
        regions: Vec<vk::BufferCopy>,
    },
    CopyImageToBuffer {
        src: vk::Image,
        src_layout: vk::ImageLayout,
        dst: vk::Buffer,
        regions: Vec<vk::BufferImageCopy>,
    },
    BlitImage {
        src: vk::Image,
        src_layout: vk::ImageLayout,
        dst: vk::Image,
        dst_layout: vk::ImageLayout,
        regions: Vec<vk::ImageBlit>,
        filter: vk::Filter,
    },
    PipelineBarrier {
        image_barriers: Vec<GfxImageBarrier>,
        buffer_barriers: Vec<GfxBufferBarrier>,
    },
    BeginLabel {
        label_name: String,
        label_color: glam::Vec4,
    },
    EndLabel,
}

/// 可回放的命令列表
///
/// 不依赖 GPU，常用于 dry run 和测试；也可以先在这里录制，再回放到真正的 command buffer 上。
#[derive(Clone, Debug, Default)]
pub struct GfxCommandList {
    commands: Vec<GfxCommand>,
}

// new & init
impl GfxCommandList {
    pub fn new() -> Self {
        Self::default()
    }
}

// getters
impl GfxCommandList {
    #[inline]
    pub fn commands(&self) -> &[GfxCommand] {
        &self.commands
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// 所有 barrier 命令（按录制顺序）
    pub fn barrier_batches(&self) -> impl Iterator<Item = (&[GfxImageBarrier], &[GfxBufferBarrier])> {
        self.commands.iter().filter_map(|cmd| match cmd {
            GfxCommand::PipelineBarrier {
                image_barriers,
                buffer_barriers,
            } => Some((image_barriers.as_slice(), buffer_barriers.as_slice())),
            _ => None,
        })
    }

    /// `BeginRendering` 的次数
    pub fn rendering_scope_count(&self) -> usize {
        self.commands.iter().filter(|cmd| matches!(cmd, GfxCommand::BeginRendering(_))).count()
    }
}

// tools
impl GfxCommandList {
    #[inline]
    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// 按录制顺序回放到另一个 recorder 上
    pub fn replay(&self, recorder: &mut dyn GfxCommandRecorder) {
        for cmd in &self.commands {
            match cmd {
                GfxCommand::BeginRendering(info) => recorder.begin_rendering(info),
                GfxCommand::EndRendering => recorder.end_rendering(),
                GfxCommand::BindPipeline { bind_point, pipeline } => recorder.bind_pipeline(*bind_point, *pipeline),
                GfxCommand::BindDescriptorSets {
                    bind_point,
                    pipeline_layout,
                    first_set,
                    descriptor_sets,
                } => recorder.bind_descriptor_sets(*bind_point, *pipeline_layout, *first_set, descriptor_sets),
                GfxCommand::BindVertexBuffers {
                    first_binding,
                    buffers,
                    offsets,
                } => recorder.bind_vertex_buffers(*first_binding, buffers, offsets),
                GfxCommand::BindIndexBuffer {
                    buffer,
                    offset,
                    index_type,
                } => recorder.bind_index_buffer(*buffer, *offset, *index_type),
                GfxCommand::Draw {
                    vertex_count,
                    instance_count,
                    first_vertex,
                    first_instance,
                } => recorder.draw(*vertex_count, *instance_count, *first_vertex, *first_instance),
                GfxCommand::DrawIndexed {
                    index_count,
                    instance_count,
                    first_index,
                    vertex_offset,
                    first_instance,
                } => recorder.draw_indexed(*index_count, *instance_count, *first_index, *vertex_offset, *first_instance),
                GfxCommand::Dispatch(group_count) => recorder.dispatch(*group_count),
                GfxCommand::CopyBuffer { src, dst, regions } => recorder.copy_buffer(*src, *dst, regions),
                GfxCommand::CopyImageToBuffer {
                    src,
                    src_layout,
                    dst,
                    regions,
                } => recorder.copy_image_to_buffer(*src, *src_layout, *dst, regions),
                GfxCommand::BlitImage {
                    src,
                    src_layout,
                    dst,
                    dst_layout,
                    regions,
                    filter,
                } => recorder.blit_image(*src, *src_layout, *dst, *dst_layout, regions, *filter),
                GfxCommand::PipelineBarrier {
                    image_barriers,
                    buffer_barriers,
                } => recorder.pipeline_barrier(image_barriers, buffer_barriers),
                GfxCommand::BeginLabel {
                    label_name,
                    label_color,
                } => recorder.begin_label(label_name, *label_color),
                GfxCommand::EndLabel => recorder.end_label(),
            }
        }
    }
}

impl GfxCommandRecorder for GfxCommandList {
    fn begin_rendering(&mut self, rendering_info: &GfxRenderingInfo) {
        self.commands.push(GfxCommand::BeginRendering(rendering_info.clone()));
    }

    fn end_rendering(&mut self) {
        self.commands.push(GfxCommand::EndRendering);
    }

    fn bind_pipeline(&mut self, bind_point: vk::PipelineBindPoint, pipeline: vk::Pipeline) {
        self.commands.push(GfxCommand::BindPipeline { bind_point, pipeline });
    }

    fn bind_descriptor_sets(
        &mut self,
        bind_point: vk::PipelineBindPoint,
        pipeline_layout: vk::PipelineLayout,
        first_set: u32,
        descriptor_sets: &[vk::DescriptorSet],
    ) {
        self.commands.push(GfxCommand::BindDescriptorSets {
            bind_point,
            pipeline_layout,
            first_set,
            descriptor_sets: descriptor_sets.to_vec(),
        });
    }

    fn bind_vertex_buffers(&mut self, first_binding: u32, buffers: &[vk::Buffer], offsets: &[vk::DeviceSize]) {
        self.commands.push(GfxCommand::BindVertexBuffers {
            first_binding,
            buffers: buffers.to_vec(),
            offsets: offsets.to_vec(),
        });
    }

    fn bind_index_buffer(&mut self, buffer: vk::Buffer, offset: vk::DeviceSize, index_type: vk::IndexType) {
        self.commands.push(GfxCommand::BindIndexBuffer {
            buffer,
            offset,
            index_type,
        });
    }

    fn draw(&mut self, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32) {
        self.commands.push(GfxCommand::Draw {
            vertex_count,
            instance_count,
            first_vertex,
            first_instance,
        });
    }

    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) {
        self.commands.push(GfxCommand::DrawIndexed {
            index_count,
            instance_count,
            first_index,
            vertex_offset,
            first_instance,
        });
    }

    fn dispatch(&mut self, group_count: [u32; 3]) {
        self.commands.push(GfxCommand::Dispatch(group_count));
    }

    fn copy_buffer(&mut self, src: vk::Buffer, dst: vk::Buffer, regions: &[vk::BufferCopy]) {
        self.commands.push(GfxCommand::CopyBuffer {
            src,
            dst,
            regions: regions.to_vec(),
        });
    }

    fn copy_image_to_buffer(
        &mut self,
        src: vk::Image,
        src_layout: vk::ImageLayout,
        dst: vk::Buffer,
        regions: &[vk::BufferImageCopy],
    ) {
        self.commands.push(GfxCommand::CopyImageToBuffer {
            src,
            src_layout,
            dst,
            regions: regions.to_vec(),
        });
    }

    fn blit_image(
        &mut self,
        src: vk::Image,
        src_layout: vk::ImageLayout,
        dst: vk::Image,
        dst_layout: vk::ImageLayout,
        regions: &[vk::ImageBlit],
        filter: vk::Filter,
    ) {
        self.commands.push(GfxCommand::BlitImage {
            src,
            src_layout,
            dst,
            dst_layout,
            regions: regions.to_vec(),
            filter,
        });
    }

    fn pipeline_barrier(&mut self, image_barriers: &[GfxImageBarrier], buffer_barriers: &[GfxBufferBarrier]) {
        self.commands.push(GfxCommand::PipelineBarrier {
            image_barriers: image_barriers.to_vec(),
            buffer_barriers: buffer_barriers.to_vec(),
        });
    }

    fn begin_label(&mut self, label_name: &str, label_color: glam::Vec4) {
        self.commands.push(GfxCommand::BeginLabel {
            label_name: label_name.to_string(),
            label_color,
        });
    }

    fn end_label(&mut self) {
        self.commands.push(GfxCommand::EndLabel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic::color::LabelColor;

    #[test]
    fn test_record_and_replay_keeps_order() {
        let mut list = GfxCommandList::new();
        list.begin_label("pass", LabelColor::COLOR_PASS);
        list.pipeline_barrier(&[GfxImageBarrier::new(vk::Image::null(), vk::ImageSubresourceRange::default())], &[]);
        list.draw(3, 1, 0, 0);
        list.end_label();

        let mut replayed = GfxCommandList::new();
        list.replay(&mut replayed);

        assert_eq!(replayed.len(), 4);
        assert!(matches!(replayed.commands()[0], GfxCommand::BeginLabel { .. }));
        assert!(matches!(replayed.commands()[1], GfxCommand::PipelineBarrier { .. }));
        assert!(matches!(replayed.commands()[2], GfxCommand::Draw { vertex_count: 3, .. }));
        assert!(matches!(replayed.commands()[3], GfxCommand::EndLabel));
        assert_eq!(replayed.barrier_batches().count(), 1);
        assert_eq!(replayed.rendering_scope_count(), 0);
    }
}
