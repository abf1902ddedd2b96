use serde::{Deserialize, Serialize};

use crate::building::GridError;

/// Building grid configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridConfig {
    /// World-space edge length of one cell.
    pub grid_unit: i32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self { grid_unit: 4 }
    }
}

impl GridConfig {
    pub fn validate(&self) -> Result<(), GridError> {
        if self.grid_unit <= 0 {
            return Err(GridError::InvalidGridUnit(self.grid_unit));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_config_defaults() {
        let config = GridConfig::default();
        assert_eq!(config.grid_unit, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn non_positive_unit_is_rejected() {
        assert!(GridConfig { grid_unit: 0 }.validate().is_err());
        assert!(GridConfig { grid_unit: -4 }.validate().is_err());
    }
}
