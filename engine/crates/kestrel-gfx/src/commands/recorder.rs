use ash::vk;

use crate::commands::{
    barrier::{GfxBufferBarrier, GfxImageBarrier},
    rendering_info::GfxRenderingInfo,
};

/// 命令录制接口
///
/// render graph 只通过这个 trait 录制命令，不关心命令最终写入 `vk::CommandBuffer`
/// 还是 [`GfxCommandList`](crate::commands::command_list::GfxCommandList)。
///
/// 所有方法都要求调用顺序即为 GPU 看到的程序顺序。
pub trait GfxCommandRecorder {
    fn begin_rendering(&mut self, rendering_info: &GfxRenderingInfo);

    fn end_rendering(&mut self);

    fn bind_pipeline(&mut self, bind_point: vk::PipelineBindPoint, pipeline: vk::Pipeline);

    fn bind_descriptor_sets(
        &mut self,
        bind_point: vk::PipelineBindPoint,
        pipeline_layout: vk::PipelineLayout,
        first_set: u32,
        descriptor_sets: &[vk::DescriptorSet],
    );

    /// buffers 每个 vertex buffer 以及 offset
    fn bind_vertex_buffers(&mut self, first_binding: u32, buffers: &[vk::Buffer], offsets: &[vk::DeviceSize]);

    fn bind_index_buffer(&mut self, buffer: vk::Buffer, offset: vk::DeviceSize, index_type: vk::IndexType);

    fn draw(&mut self, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32);

    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    );

    fn dispatch(&mut self, group_count: [u32; 3]);

    fn copy_buffer(&mut self, src: vk::Buffer, dst: vk::Buffer, regions: &[vk::BufferCopy]);

    fn copy_image_to_buffer(
        &mut self,
        src: vk::Image,
        src_layout: vk::ImageLayout,
        dst: vk::Buffer,
        regions: &[vk::BufferImageCopy],
    );

    fn blit_image(
        &mut self,
        src: vk::Image,
        src_layout: vk::ImageLayout,
        dst: vk::Image,
        dst_layout: vk::ImageLayout,
        regions: &[vk::ImageBlit],
        filter: vk::Filter,
    );

    /// 插入一组 barrier，对应一次 `vkCmdPipelineBarrier2`
    fn pipeline_barrier(&mut self, image_barriers: &[GfxImageBarrier], buffer_barriers: &[GfxBufferBarrier]);

    fn begin_label(&mut self, _label_name: &str, _label_color: glam::Vec4) {}

    fn end_label(&mut self) {}
}
