//! Vulkan GFX 抽象层
//!
//! 只提供 render graph 需要的能力：
//! - 命令录制：[`commands::recorder::GfxCommandRecorder`]，以及基于 ash 的实现和可回放的命令列表
//! - 资源分配：[`resources::allocator::GfxResourceAllocator`]，以及基于 vk-mem 的实现和无 GPU 的实现
//! - 多帧并行：[`frame::FrameCounter`] 和 [`frame::FifSlots`]
//!
//! 不存在全局单例，device 和 allocator 都通过参数显式传递。

pub mod basic;
pub mod commands;
pub mod error;
pub mod frame;
pub mod resources;
