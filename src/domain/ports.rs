use crate::utils::error::Result;
use chrono::NaiveDate;

/// Source of fresh ticket numbers. Numbers are global across all clients.
pub trait NumberAllocator: Send + Sync {
    fn next_number(&mut self) -> Result<u32>;
}

/// 提供 `assigned_at` 使用的日期
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}
