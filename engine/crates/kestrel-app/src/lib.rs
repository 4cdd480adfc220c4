//! Kestrel app
//!
//! 不依赖窗口和 GPU：用 headless 分配器和可回放的命令列表构建一个延迟渲染 graph，
//! 用于检查 pass 顺序和自动插入的 barrier。

pub mod app_config;
pub mod deferred;
pub mod frame_settings;
