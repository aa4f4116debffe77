use crate::domain::ports::NumberAllocator;
use crate::utils::error::{Result, SorteoError};

/// Hands out consecutive numbers starting at `next`.
#[derive(Debug, Clone)]
pub struct SequentialAllocator {
    next: u32,
}

impl SequentialAllocator {
    pub fn new(first: u32) -> Self {
        Self { next: first }
    }

    /// Starts right after the highest number already issued, or at `first` for an empty ledger.
    pub fn after(highest_issued: Option<u32>, first: u32) -> Self {
        match highest_issued {
            Some(highest) => Self::new(highest.saturating_add(1).max(first)),
            None => Self::new(first),
        }
    }
}

impl NumberAllocator for SequentialAllocator {
    fn next_number(&mut self) -> Result<u32> {
        let number = self.next;
        self.next = number.checked_add(1).ok_or_else(|| SorteoError::ConfigError {
            message: "ticket number space exhausted".to_string(),
        })?;
        Ok(number)
    }
}
