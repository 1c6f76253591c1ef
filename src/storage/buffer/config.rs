use crate::storage::buffer::error::BufferPoolError;

/// Buffer pool configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferPoolConfig {
    /// Number of frames; fixed for the lifetime of the pool
    pub pool_size: usize,
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self { pool_size: 1000 }
    }
}

impl BufferPoolConfig {
    pub fn new(pool_size: usize) -> Self {
        Self { pool_size }
    }

    pub fn validate(&self) -> Result<(), BufferPoolError> {
        if self.pool_size == 0 {
            return Err(BufferPoolError::InvalidConfig(
                "pool_size must be at least 1".to_string(),
            ));
        }
        if u32::try_from(self.pool_size).is_err() {
            return Err(BufferPoolError::InvalidConfig(format!(
                "pool_size {} exceeds the frame id range",
                self.pool_size
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(BufferPoolConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_frames_rejected() {
        assert!(matches!(
            BufferPoolConfig::new(0).validate(),
            Err(BufferPoolError::InvalidConfig(_))
        ));
    }
}
