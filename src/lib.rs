//! bcache_core: 块设备缓冲区缓存
//!
//! 固定大小的缓冲池，位于块设备和文件系统之间：
//! - **唯一性**：任一 (设备, 块号) 在内存中至多一份拷贝
//! - **引用计数**：被引用的缓冲块永远不会被挪作他用
//! - **延迟写回**：脏块在驱逐前或 `sync` 时写回
//! - **阻塞语义**：缓冲池耗尽或缓冲块上锁时睡眠等待，而不是返回错误
//!
//! # 示例
//!
//! ```rust,ignore
//! use bcache_core::{BufferCache, CacheConfig, DevId, DeviceTable, MemDevice, Result};
//! use std::sync::Arc;
//!
//! fn main() -> Result<()> {
//!     let dev = DevId::new(3, 1);
//!     let devices = Arc::new(DeviceTable::new());
//!     devices.register(dev, Box::new(MemDevice::new(1440)))?;
//!
//!     let cache = BufferCache::new(CacheConfig::default(), devices)?;
//!
//!     // 读取块
//!     let id = cache.bread(dev, 1)?;
//!     cache.with_data(id, |data| println!("{:02x}", data[0]));
//!     cache.brelse(id);
//!
//!     cache.sync_device(dev);
//!     Ok(())
//! }
//! ```
//!
//! # 模块结构
//!
//! - [`error`] - 错误类型定义
//! - [`block`] - 块设备、I/O 请求队列和字节粒度读写
//! - [`cache`] - 缓冲区缓存
//! - [`superblock`] - 挂载表和常驻位图
//! - [`bitmap`] - 逻辑块和 inode 分配

#![deny(unsafe_code)]
#![warn(missing_docs)]

// ===== 核心模块 =====

/// 错误处理
pub mod error;

/// 常量定义
pub mod consts;

/// 基础类型
pub mod types;

/// 缓存配置
pub mod config;

/// 等待队列
pub mod wait;

/// 块设备抽象
pub mod block;

/// 缓冲区缓存
pub mod cache;

/// Superblock 与挂载表
pub mod superblock;

/// 位图操作
pub mod bitmap;

#[cfg(test)]
pub(crate) mod testing;

// ===== 公共导出 =====

// 错误处理
pub use error::{Error, ErrorKind, Result};

// 基础类型
pub use types::{BlockNo, BufferId, DevId};

// 配置
pub use config::{CacheConfig, IoMode};

// 块设备
pub use block::{Block, BlockDevice, DeviceTable, Direction, MemDevice};

// Cache
pub use cache::{BufferCache, BufferFlags, CacheStats, MetadataSync};

// Superblock
pub use superblock::{DiskSuperblock, SuperTable, Superblock};
