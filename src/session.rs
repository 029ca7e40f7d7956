use crate::error::{FocusError, Result};

pub const DEFAULT_GRID_SIZE: usize = 3;
pub const DEFAULT_TOTAL_ROUNDS: u32 = 15;
pub const DEFAULT_TIMEOUT_MS: u64 = 1500;
/// Largest grid edge that still fits a terminal
pub const MAX_GRID_SIZE: usize = 9;

/// Grid edge must be in `1..=MAX_GRID_SIZE`
pub fn check_grid_size(grid_size: usize) -> Result<()> {
    if !(1..=MAX_GRID_SIZE).contains(&grid_size) {
        return Err(FocusError::InvalidGridSize(grid_size));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub grid_size: usize,
    pub total_rounds: u32,
    pub timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            grid_size: DEFAULT_GRID_SIZE,
            total_rounds: DEFAULT_TOTAL_ROUNDS,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<()> {
        check_grid_size(self.grid_size)?;
        if self.total_rounds == 0 {
            return Err(FocusError::InvalidRounds);
        }
        if self.timeout_ms == 0 {
            return Err(FocusError::InvalidTimeout);
        }
        Ok(())
    }

    pub fn cell_count(&self) -> usize {
        self.grid_size * self.grid_size
    }
}
