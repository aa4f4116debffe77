// 適配器層：領域介面的具體實作

pub mod allocator;
pub mod clock;

pub use allocator::SequentialAllocator;
pub use clock::{FixedClock, SystemClock};
