//! pass 上的 port
//!
//! 每个 port 最多连接一个方向相反、属于另一个 pass 的 port，连接是对称的。
//! input port 的资源来自连接的 output port；output port 的资源由所属 pass 的 descriptor 推导。

use crate::{
    pass::RgPassHandle,
    resource::{RgResourceHandle, RgResourceKind, RgResourceRef},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RgPortDirection {
    Input,
    Output,
}

impl RgPortDirection {
    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            Self::Input => Self::Output,
            Self::Output => Self::Input,
        }
    }
}

/// port 的全局标识：(pass, 方向, pass 内的 handle)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RgPortId {
    pub pass: RgPassHandle,
    pub direction: RgPortDirection,
    pub handle: RgResourceHandle,
}

impl RgPortId {
    #[inline]
    pub fn input(pass: RgPassHandle, handle: RgResourceHandle) -> Self {
        Self {
            pass,
            direction: RgPortDirection::Input,
            handle,
        }
    }

    #[inline]
    pub fn output(pass: RgPassHandle, handle: RgResourceHandle) -> Self {
        Self {
            pass,
            direction: RgPortDirection::Output,
            handle,
        }
    }
}

#[derive(Clone, Debug)]
pub struct RgPort {
    pub(crate) direction: RgPortDirection,
    pub(crate) kind: RgResourceKind,
    pub(crate) handle: RgResourceHandle,
    pub(crate) name: String,
    pub(crate) connection: Option<RgPortId>,
    pub(crate) resource: RgResourceRef,
}

// new & init
impl RgPort {
    pub(crate) fn new(direction: RgPortDirection, kind: RgResourceKind, handle: RgResourceHandle, name: &str) -> Self {
        Self {
            direction,
            kind,
            handle,
            name: name.to_string(),
            connection: None,
            resource: RgResourceRef::empty(kind),
        }
    }
}

// getters
impl RgPort {
    #[inline]
    pub fn direction(&self) -> RgPortDirection {
        self.direction
    }

    #[inline]
    pub fn kind(&self) -> RgResourceKind {
        self.kind
    }

    #[inline]
    pub fn handle(&self) -> RgResourceHandle {
        self.handle
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn connection(&self) -> Option<RgPortId> {
        self.connection
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// 当前代表的资源
    #[inline]
    pub fn resource(&self) -> RgResourceRef {
        self.resource
    }
}
