pub mod barrier;
pub mod command_buffer;
pub mod command_list;
pub mod recorder;
pub mod rendering_info;
