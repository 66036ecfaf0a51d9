//! 缓存配置

use crate::consts::{DEFAULT_NR_BUFFERS, NR_HASH};
use crate::error::{Error, ErrorKind, Result};

/// I/O 完成方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IoMode {
    /// 在提交者上下文中同步完成
    #[default]
    Sync,
    /// 由后台工作线程完成
    Worker,
}

/// 缓冲区缓存配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// 缓冲块数量（缓冲池大小，初始化后不变）
    pub nr_buffers: usize,
    /// 哈希桶数量，取素数分布更均匀
    pub nr_hash: usize,
    /// I/O 完成方式
    pub io_mode: IoMode,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            nr_buffers: DEFAULT_NR_BUFFERS,
            nr_hash: NR_HASH,
            io_mode: IoMode::Sync,
        }
    }
}

impl CacheConfig {
    /// 设置缓冲块数量
    pub fn with_buffers(mut self, nr_buffers: usize) -> Self {
        self.nr_buffers = nr_buffers;
        self
    }

    /// 设置哈希桶数量
    pub fn with_hash_size(mut self, nr_hash: usize) -> Self {
        self.nr_hash = nr_hash;
        self
    }

    /// 设置 I/O 完成方式
    pub fn with_io_mode(mut self, io_mode: IoMode) -> Self {
        self.io_mode = io_mode;
        self
    }

    /// 检查配置
    pub fn validate(&self) -> Result<()> {
        if self.nr_buffers == 0 {
            return Err(Error::new(ErrorKind::InvalidInput, "buffer pool must not be empty"));
        }
        if self.nr_hash == 0 {
            return Err(Error::new(ErrorKind::InvalidInput, "hash table must have buckets"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.nr_buffers, DEFAULT_NR_BUFFERS);
        assert_eq!(config.nr_hash, 307);
        assert_eq!(config.io_mode, IoMode::Sync);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_config() {
        let config = CacheConfig::default().with_buffers(0);
        assert_eq!(config.validate().unwrap_err().kind(), ErrorKind::InvalidInput);

        let config = CacheConfig::default().with_hash_size(0);
        assert!(config.validate().is_err());
    }
}
