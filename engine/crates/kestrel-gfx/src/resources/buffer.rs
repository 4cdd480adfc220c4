use ash::vk;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GfxBufferCreateInfo {
    pub size: vk::DeviceSize,
    pub usage: vk::BufferUsageFlags,
    /// 是否需要 CPU 可见（staging / readback）
    pub host_visible: bool,
}

impl GfxBufferCreateInfo {
    #[inline]
    pub fn new(size: vk::DeviceSize, usage: vk::BufferUsageFlags) -> Self {
        Self {
            size,
            usage,
            host_visible: false,
        }
    }

    /// builder
    #[inline]
    pub fn host_visible(mut self) -> Self {
        self.host_visible = true;
        self
    }

    pub fn to_vk(&self) -> vk::BufferCreateInfo<'static> {
        vk::BufferCreateInfo::default().size(self.size).usage(self.usage).sharing_mode(vk::SharingMode::EXCLUSIVE)
    }
}

/// 一个已经存在的 buffer，只是句柄，不拥有资源
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GfxBuffer {
    handle: vk::Buffer,
    size: vk::DeviceSize,
}

impl GfxBuffer {
    #[inline]
    pub fn new(handle: vk::Buffer, size: vk::DeviceSize) -> Self {
        Self { handle, size }
    }

    #[inline]
    pub fn handle(&self) -> vk::Buffer {
        self.handle
    }

    #[inline]
    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }
}
