use kestrel_gfx::error::GfxError;

use crate::{
    port::RgPortId,
    resource::{RgResourceHandle, RgResourceKind},
};

/// 连接被拒绝的原因
///
/// 被拒绝的连接不会修改 graph。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RgConnectError {
    #[error("cannot connect a port to itself")]
    SamePort,

    #[error("both ports belong to the same pass")]
    SamePass,

    #[error("both ports have the same direction")]
    SameDirection,

    #[error("resource kind mismatch: output is {output:?}, input is {input:?}")]
    KindMismatch {
        output: RgResourceKind,
        input: RgResourceKind,
    },

    #[error("port is already connected to {0:?}")]
    AlreadyConnected(RgPortId),

    #[error("connection would create a cycle")]
    WouldCycle,

    #[error("port {0:?} is not connected")]
    NotConnected(RgPortId),
}

/// pass 在 compile 阶段被跳过的原因
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RgCompileError {
    #[error("required resource {handle:?} \"{name}\" resolved to nothing")]
    MissingResource { handle: RgResourceHandle, name: String },

    #[error("no subpass has a resolved attachment")]
    NoAttachments,

    #[error("attachments of subpass {subpass} disagree on sample count")]
    SampleCountMismatch { subpass: usize },

    #[error("failed to create attachment view: {0}")]
    ViewCreation(#[from] GfxError),
}

/// 加载配置失败
#[derive(Debug, thiserror::Error)]
pub enum RgSettingsError {
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),
}
