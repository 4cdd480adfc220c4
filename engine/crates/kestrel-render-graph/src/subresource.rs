//! 子资源范围的集合运算
//!
//! 一个范围是 aspect × mip × layer 的长方体。hazard 扫描需要求交集和差集，
//! 差集的结果是若干互不相交的长方体。

use ash::vk;

/// 图像的子资源范围 (aspect, mip 区间, layer 区间)
///
/// buffer 统一使用 [`Self::WHOLE_BUFFER`]，即总是整体重叠。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RgSubresourceRange {
    pub aspect: vk::ImageAspectFlags,
    pub base_mip: u32,
    pub mip_count: u32,
    pub base_layer: u32,
    pub layer_count: u32,
}

// new & init
impl RgSubresourceRange {
    /// buffer 的隐式范围
    pub const WHOLE_BUFFER: Self = Self {
        aspect: vk::ImageAspectFlags::COLOR,
        base_mip: 0,
        mip_count: 1,
        base_layer: 0,
        layer_count: 1,
    };

    /// # Panics
    /// aspect 为空、count 为 0，或者区间末尾溢出 u32
    pub fn new(aspect: vk::ImageAspectFlags, base_mip: u32, mip_count: u32, base_layer: u32, layer_count: u32) -> Self {
        assert!(!aspect.is_empty(), "subresource range with empty aspect");
        assert!(mip_count > 0 && layer_count > 0, "subresource range with zero mip or layer count");
        assert!(
            base_mip.checked_add(mip_count).is_some() && base_layer.checked_add(layer_count).is_some(),
            "subresource range overflow: mips {base_mip}+{mip_count}, layers {base_layer}+{layer_count}"
        );
        Self {
            aspect,
            base_mip,
            mip_count,
            base_layer,
            layer_count,
        }
    }

    /// 全部 mip 和 layer
    #[inline]
    pub fn full(aspect: vk::ImageAspectFlags, mip_count: u32, layer_count: u32) -> Self {
        Self::new(aspect, 0, mip_count, 0, layer_count)
    }

    /// 单个 mip level 的全部 layer
    #[inline]
    pub fn mip_level(aspect: vk::ImageAspectFlags, mip: u32, layer_count: u32) -> Self {
        Self::new(aspect, mip, 1, 0, layer_count)
    }
}

// getters
impl RgSubresourceRange {
    #[inline]
    pub fn mip_end(&self) -> u32 {
        self.base_mip + self.mip_count
    }

    #[inline]
    pub fn layer_end(&self) -> u32 {
        self.base_layer + self.layer_count
    }

    /// 范围内 (aspect bit, mip, layer) 三元组的数量
    #[inline]
    pub fn volume(&self) -> u64 {
        self.aspect.as_raw().count_ones() as u64 * self.mip_count as u64 * self.layer_count as u64
    }

    #[inline]
    pub fn to_vk(&self) -> vk::ImageSubresourceRange {
        vk::ImageSubresourceRange {
            aspect_mask: self.aspect,
            base_mip_level: self.base_mip,
            level_count: self.mip_count,
            base_array_layer: self.base_layer,
            layer_count: self.layer_count,
        }
    }
}

// 集合运算
impl RgSubresourceRange {
    /// 交集，没有重叠时返回 None
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        let aspect = self.aspect & other.aspect;
        let base_mip = self.base_mip.max(other.base_mip);
        let mip_end = self.mip_end().min(other.mip_end());
        let base_layer = self.base_layer.max(other.base_layer);
        let layer_end = self.layer_end().min(other.layer_end());

        if aspect.is_empty() || base_mip >= mip_end || base_layer >= layer_end {
            return None;
        }
        Some(Self {
            aspect,
            base_mip,
            mip_count: mip_end - base_mip,
            base_layer,
            layer_count: layer_end - base_layer,
        })
    }

    #[inline]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.intersect(other).is_some()
    }

    /// `other` 是否完全落在 `self` 之内
    #[inline]
    pub fn contains(&self, other: &Self) -> bool {
        self.intersect(other).as_ref() == Some(other)
    }

    /// 差集 `self - other`，结果是互不相交的若干范围
    ///
    /// 切分顺序：先切掉 aspect 的差，再在交集 aspect 内切掉交集 mip 区间之外的部分，
    /// 最后在交集 mip 区间内切掉交集 layer 区间之外的部分。
    pub fn subtract(&self, other: &Self) -> Vec<Self> {
        let Some(inter) = self.intersect(other) else {
            return vec![*self];
        };

        let mut pieces = Vec::with_capacity(5);

        let rest_aspect = self.aspect & !inter.aspect;
        if !rest_aspect.is_empty() {
            pieces.push(Self { aspect: rest_aspect, ..*self });
        }

        if self.base_mip < inter.base_mip {
            pieces.push(Self {
                aspect: inter.aspect,
                mip_count: inter.base_mip - self.base_mip,
                ..*self
            });
        }
        if inter.mip_end() < self.mip_end() {
            pieces.push(Self {
                aspect: inter.aspect,
                base_mip: inter.mip_end(),
                mip_count: self.mip_end() - inter.mip_end(),
                ..*self
            });
        }

        if self.base_layer < inter.base_layer {
            pieces.push(Self {
                layer_count: inter.base_layer - self.base_layer,
                ..inter
            });
        }
        if inter.layer_end() < self.layer_end() {
            pieces.push(Self {
                base_layer: inter.layer_end(),
                layer_count: self.layer_end() - inter.layer_end(),
                ..inter
            });
        }

        pieces
    }
}
