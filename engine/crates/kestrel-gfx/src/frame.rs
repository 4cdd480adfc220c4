//! 多帧并行（frames in flight）相关的基础设施
//!
//! CPU 录制第 N+1 帧时 GPU 可能还在执行第 N 帧，每个 in-flight slot 需要独立的临时资源。
//! slot 的回收（等待 fence）由上层负责，render graph 本身从不等待 GPU。

use std::fmt::Display;
use std::ops::Deref;

/// in-flight slot 的标签
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FrameLabel {
    A,
    B,
    C,
}
impl Deref for FrameLabel {
    type Target = usize;
    #[inline]
    fn deref(&self) -> &Self::Target {
        match self {
            Self::A => &Self::INDEX[0],
            Self::B => &Self::INDEX[1],
            Self::C => &Self::INDEX[2],
        }
    }
}
impl Display for FrameLabel {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::A => write!(f, "A"),
            Self::B => write!(f, "B"),
            Self::C => write!(f, "C"),
        }
    }
}
impl FrameLabel {
    const INDEX: [usize; 3] = [0, 1, 2];

    #[inline]
    pub fn from_usize(idx: usize) -> Self {
        match idx {
            0 => Self::A,
            1 => Self::B,
            2 => Self::C,
            _ => panic!("Invalid frame index: {idx}"),
        }
    }
}

pub struct FrameCounter {
    /// 当前的帧序号，一直累加
    frame_id: u64,
}
// new & init
impl FrameCounter {
    pub fn new(init_frame_id: u64) -> Self {
        Self { frame_id: init_frame_id }
    }
}
// update
impl FrameCounter {
    #[inline]
    pub fn next_frame(&mut self) {
        self.frame_id = self.frame_id.wrapping_add(1);
    }
}
// getters
impl FrameCounter {
    const FIF_COUNT: usize = 3;
    #[inline]
    pub fn frame_id(&self) -> u64 {
        self.frame_id
    }
    #[inline]
    pub const fn fif_count() -> usize {
        Self::FIF_COUNT
    }
    #[inline]
    pub const fn frame_labels() -> [FrameLabel; Self::FIF_COUNT] {
        [FrameLabel::A, FrameLabel::B, FrameLabel::C]
    }
    #[inline]
    pub fn frame_label(&self) -> FrameLabel {
        FrameLabel::from_usize(self.frame_id as usize % Self::fif_count())
    }
    #[inline]
    pub fn frame_name(&self) -> String {
        format!("[F{}{}]", self.frame_id, self.frame_label())
    }
}

/// 每个 in-flight slot 一份的数据
pub struct FifSlots<T> {
    slots: [T; FrameCounter::FIF_COUNT],
}
// new & init
impl<T> FifSlots<T> {
    pub fn new(mut init: impl FnMut(FrameLabel) -> T) -> Self {
        Self {
            slots: FrameCounter::frame_labels().map(&mut init),
        }
    }
}
// getters
impl<T> FifSlots<T> {
    #[inline]
    pub fn get(&self, label: FrameLabel) -> &T {
        &self.slots[*label]
    }
    #[inline]
    pub fn get_mut(&mut self, label: FrameLabel) -> &mut T {
        &mut self.slots[*label]
    }
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (FrameLabel, &T)> {
        FrameCounter::frame_labels().into_iter().zip(self.slots.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_label_cycles() {
        let mut counter = FrameCounter::new(0);
        let mut labels = Vec::new();
        for _ in 0..4 {
            labels.push(counter.frame_label());
            counter.next_frame();
        }
        assert_eq!(labels, vec![FrameLabel::A, FrameLabel::B, FrameLabel::C, FrameLabel::A]);
        assert_eq!(counter.frame_name(), "[F4B]");
    }

    #[test]
    fn test_fif_slots_are_independent() {
        let mut slots = FifSlots::new(|label| *label * 10);
        *slots.get_mut(FrameLabel::B) += 1;
        assert_eq!(*slots.get(FrameLabel::A), 0);
        assert_eq!(*slots.get(FrameLabel::B), 11);
        assert_eq!(*slots.get(FrameLabel::C), 20);
        assert_eq!(slots.iter().count(), 3);
    }
}
