//! 可选的 tracy 性能分析
//!
//! 开启 `profiling` feature 后 [`profile_scope!`](crate::profile_scope) 会创建 tracy span，
//! 否则展开为空。

#[cfg(feature = "profiling")]
pub use tracy_client::span;

/// 为当前作用域创建 span
#[macro_export]
#[cfg(feature = "profiling")]
macro_rules! profile_scope {
    ($name:expr) => {
        let _profile_span = $crate::profiling::span!($name);
    };
}

/// 未开启 profiling 时为空
#[macro_export]
#[cfg(not(feature = "profiling"))]
macro_rules! profile_scope {
    ($name:expr) => {};
}
