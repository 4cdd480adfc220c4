//! 基于 port 连接的 RenderGraph
//!
//! pass 通过 [`resource::RgResourceDescriptor`] 独立声明自己读写的资源，通过 port 连接传递资源的身份。
//! graph 负责：
//! - 按依赖深度排序 pass
//! - 创建和销毁 graph 持有的资源
//! - 跟踪每个资源的使用历史，为每个 pass 生成最少且足够的 barrier
//! - 把光栅 pass 的 attachment 组装成 dynamic rendering 信息
//!
//! # 示例
//!
//! ```ignore
//! let mut graph = RenderGraph::new(RgSettings::default());
//! let swapchain = graph.import_image("swapchain", image, RgImageState::UNDEFINED);
//!
//! let gbuffer = graph.add_node(
//!     "gbuffer",
//!     vec![RgResourceDescriptor::image(ALBEDO, "albedo").create_image(albedo_info)],
//!     vec![RgSubpass::new().color(RgAttachment::color(ALBEDO))],
//!     |ctx| ctx.cmd.draw(3, 1, 0, 0),
//! );
//! let lighting = graph.add_node(
//!     "lighting",
//!     vec![
//!         RgResourceDescriptor::image(ALBEDO, "albedo").state(RgImageState::SHADER_READ_FRAGMENT),
//!         RgResourceDescriptor::image(OUTPUT, "output").external(swapchain),
//!     ],
//!     vec![RgSubpass::new().color(RgAttachment::color(OUTPUT))],
//!     |ctx| ctx.cmd.draw(3, 1, 0, 0),
//! );
//! graph.connect(gbuffer, ALBEDO, lighting, ALBEDO)?;
//!
//! graph.process(&mut allocator);
//! graph.execute(&mut cmd, frame_label);
//! ```

pub mod barrier;
pub mod error;
pub mod graph;
pub mod pass;
pub mod plan;
pub mod port;
pub mod profiling;
pub mod render_pass;
pub mod resource;
pub mod resource_pool;
pub mod resource_state;
pub mod settings;
pub mod subresource;
pub mod usage_track;

pub use graph::{RenderGraph, RgFrameStats, RgProcessReport};
pub use pass::{RgPass, RgPassBuilder, RgPassContext, RgPassHandle};
pub use port::{RgPortDirection, RgPortId};
pub use render_pass::{RgAttachment, RgSubpass};
pub use resource::{RgResourceDescriptor, RgResourceHandle, RgResourceKind, RgResourceRef};
pub use resource_state::{RgBufferState, RgImageState};
pub use settings::RgSettings;
pub use subresource::RgSubresourceRange;
