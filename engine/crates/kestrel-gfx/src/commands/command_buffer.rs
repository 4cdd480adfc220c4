use ash::vk;
use itertools::Itertools;

use crate::{
    basic::color::LabelColor,
    commands::{
        barrier::{GfxBufferBarrier, GfxImageBarrier},
        recorder::GfxCommandRecorder,
        rendering_info::GfxRenderingInfo,
    },
    error::GfxError,
};

/// 命令缓冲封装
///
/// 封装 Vulkan CommandBuffer，实现 [`GfxCommandRecorder`]。
/// 自己持有 `ash::Device`，不依赖任何全局状态。
///
/// # 使用示例
/// ```ignore
/// let mut cmd = GfxCommandBuffer::new(device.clone(), debug_utils, command_pool, "frame-A")?;
/// cmd.begin(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT, "render-graph")?;
/// render_graph.execute(&mut cmd, frame_label);
/// cmd.end()?;
/// ```
pub struct GfxCommandBuffer {
    vk_handle: vk::CommandBuffer,
    device: ash::Device,
    debug_utils: Option<ash::ext::debug_utils::Device>,

    #[cfg(debug_assertions)]
    name: String,
}
// new & init
impl GfxCommandBuffer {
    pub fn new(
        device: ash::Device,
        debug_utils: Option<ash::ext::debug_utils::Device>,
        command_pool: vk::CommandPool,
        debug_name: &str,
    ) -> Result<Self, GfxError> {
        let info = vk::CommandBufferAllocateInfo::default()
            .command_pool(command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);

        let command_buffers = unsafe { device.allocate_command_buffers(&info)? };
        let vk_handle = command_buffers.first().copied().ok_or(GfxError::Vk(vk::Result::ERROR_UNKNOWN))?;

        log::debug!("allocate command buffer: {}", debug_name);
        Ok(Self {
            vk_handle,
            device,
            debug_utils,

            #[cfg(debug_assertions)]
            name: debug_name.to_string(),
        })
    }
}
// Basic 命令
impl GfxCommandBuffer {
    /// 开始录制 command
    ///
    /// 自动设置 debug label
    pub fn begin(&mut self, usage_flag: vk::CommandBufferUsageFlags, debug_label_name: &str) -> Result<(), GfxError> {
        unsafe {
            self.device
                .begin_command_buffer(self.vk_handle, &vk::CommandBufferBeginInfo::default().flags(usage_flag))?;
        }
        self.begin_label(debug_label_name, LabelColor::COLOR_CMD);
        Ok(())
    }

    /// 结束录制 command
    ///
    /// 结束 debug label
    pub fn end(&mut self) -> Result<(), GfxError> {
        self.end_label();
        unsafe { self.device.end_command_buffer(self.vk_handle)? };
        Ok(())
    }
}
// getters
impl GfxCommandBuffer {
    #[inline]
    pub fn vk_handle(&self) -> vk::CommandBuffer {
        self.vk_handle
    }

    #[cfg(debug_assertions)]
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl GfxCommandRecorder for GfxCommandBuffer {
    /// - command type: action, state
    /// - supported queue types: graphics
    fn begin_rendering(&mut self, rendering_info: &GfxRenderingInfo) {
        let info = rendering_info.rendering_info();
        unsafe { self.device.cmd_begin_rendering(self.vk_handle, &info) }
    }

    /// - command type: action, state
    /// - supported queue types: graphics
    fn end_rendering(&mut self) {
        unsafe { self.device.cmd_end_rendering(self.vk_handle) }
    }

    /// - command type: state
    /// - supported queue types: graphics, compute
    fn bind_pipeline(&mut self, bind_point: vk::PipelineBindPoint, pipeline: vk::Pipeline) {
        unsafe { self.device.cmd_bind_pipeline(self.vk_handle, bind_point, pipeline) }
    }

    /// - command type: state
    /// - supported queue types: graphics, compute
    fn bind_descriptor_sets(
        &mut self,
        bind_point: vk::PipelineBindPoint,
        pipeline_layout: vk::PipelineLayout,
        first_set: u32,
        descriptor_sets: &[vk::DescriptorSet],
    ) {
        unsafe {
            self.device.cmd_bind_descriptor_sets(
                self.vk_handle,
                bind_point,
                pipeline_layout,
                first_set,
                descriptor_sets,
                &[],
            )
        }
    }

    /// - command type: state
    /// - supported queue types: graphics
    fn bind_vertex_buffers(&mut self, first_binding: u32, buffers: &[vk::Buffer], offsets: &[vk::DeviceSize]) {
        unsafe { self.device.cmd_bind_vertex_buffers(self.vk_handle, first_binding, buffers, offsets) }
    }

    /// - command type: state
    /// - supported queue types: graphics
    fn bind_index_buffer(&mut self, buffer: vk::Buffer, offset: vk::DeviceSize, index_type: vk::IndexType) {
        unsafe { self.device.cmd_bind_index_buffer(self.vk_handle, buffer, offset, index_type) }
    }

    /// - command type: action
    /// - supported queue types: graphics
    fn draw(&mut self, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32) {
        unsafe { self.device.cmd_draw(self.vk_handle, vertex_count, instance_count, first_vertex, first_instance) }
    }

    /// - command type: action
    /// - supported queue types: graphics
    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) {
        unsafe {
            self.device.cmd_draw_indexed(
                self.vk_handle,
                index_count,
                instance_count,
                first_index,
                vertex_offset,
                first_instance,
            )
        }
    }

    /// - command type: action
    /// - supported queue types: compute
    fn dispatch(&mut self, group_count: [u32; 3]) {
        unsafe { self.device.cmd_dispatch(self.vk_handle, group_count[0], group_count[1], group_count[2]) }
    }

    /// - command type: action
    /// - 支持的 queue：transfer，graphics，compute
    fn copy_buffer(&mut self, src: vk::Buffer, dst: vk::Buffer, regions: &[vk::BufferCopy]) {
        unsafe { self.device.cmd_copy_buffer(self.vk_handle, src, dst, regions) }
    }

    /// - command type: action
    /// - 支持的 queue：transfer，graphics，compute
    fn copy_image_to_buffer(
        &mut self,
        src: vk::Image,
        src_layout: vk::ImageLayout,
        dst: vk::Buffer,
        regions: &[vk::BufferImageCopy],
    ) {
        unsafe { self.device.cmd_copy_image_to_buffer(self.vk_handle, src, src_layout, dst, regions) }
    }

    /// - command type: action
    /// - supported queue types: graphics
    fn blit_image(
        &mut self,
        src: vk::Image,
        src_layout: vk::ImageLayout,
        dst: vk::Image,
        dst_layout: vk::ImageLayout,
        regions: &[vk::ImageBlit],
        filter: vk::Filter,
    ) {
        unsafe { self.device.cmd_blit_image(self.vk_handle, src, src_layout, dst, dst_layout, regions, filter) }
    }

    /// - command type: synchronize
    /// - supported queue types: graphics, compute, transfer
    fn pipeline_barrier(&mut self, image_barriers: &[GfxImageBarrier], buffer_barriers: &[GfxBufferBarrier]) {
        let image_barriers = image_barriers.iter().map(|b| *b.inner()).collect_vec();
        let buffer_barriers = buffer_barriers.iter().map(|b| *b.inner()).collect_vec();
        let dependency_info = vk::DependencyInfo::default()
            .image_memory_barriers(&image_barriers)
            .buffer_memory_barriers(&buffer_barriers);
        unsafe { self.device.cmd_pipeline_barrier2(self.vk_handle, &dependency_info) }
    }

    /// - command type: state, action
    /// - supported queue type: graphics, compute
    fn begin_label(&mut self, label_name: &str, label_color: glam::Vec4) {
        let Some(debug_utils) = &self.debug_utils else {
            return;
        };
        let name = std::ffi::CString::new(label_name).unwrap_or_default();
        unsafe {
            debug_utils.cmd_begin_debug_utils_label(
                self.vk_handle,
                &vk::DebugUtilsLabelEXT::default().label_name(name.as_c_str()).color(label_color.into()),
            );
        }
    }

    /// - command type: state, action
    /// - supported queue type: graphics, compute
    fn end_label(&mut self) {
        if let Some(debug_utils) = &self.debug_utils {
            unsafe { debug_utils.cmd_end_debug_utils_label(self.vk_handle) }
        }
    }
}
