use crate::utils::error::BoxError;

pub const DEFAULT_ALIGNMENT: usize = 64;

/// Settings for the host allocator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AllocatorConfig {
    /// Byte alignment of every data buffer. Must be a power of two at least
    /// as large as the widest element (8 bytes).
    pub alignment: usize,
}

impl AllocatorConfig {
    pub fn build(self) -> Result<Self, BoxError> {
        if !self.alignment.is_power_of_two() {
            return Err(BoxError::IllegalArgs(format!(
                "Alignment must be a power of two, got {}",
                self.alignment
            )));
        }

        if self.alignment < std::mem::align_of::<u64>() {
            return Err(BoxError::IllegalArgs(format!(
                "Alignment must be at least {}, got {}",
                std::mem::align_of::<u64>(),
                self.alignment
            )));
        }

        Ok(self)
    }
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            alignment: DEFAULT_ALIGNMENT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert_eq!(AllocatorConfig::default().build().unwrap().alignment, 64);
    }

    #[test]
    fn rejects_bad_alignment() {
        assert!(AllocatorConfig { alignment: 48 }.build().is_err());
        assert!(AllocatorConfig { alignment: 2 }.build().is_err());
        assert!(AllocatorConfig { alignment: 4096 }.build().is_ok());
    }
}
