pub mod allocator;
pub mod buffer;
pub mod image;
pub mod vma_allocator;
