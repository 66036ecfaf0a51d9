//! 缓冲区缓存模块
//!
//! 固定数量的缓冲块，在块设备和上层之间缓存磁盘块。
//!
//! # 主要组件
//!
//! - [`BufferCache`] - 缓存管理器，提供 `getblk` / `bread` / `brelse` 等接口
//! - [`BufferFlags`] - 缓冲块状态标志
//! - [`RefCount`] - 带重复释放检查的引用计数
//! - [`CacheStats`] - 缓存统计信息
//! - [`MetadataSync`] - 写回前刷新上层元数据的钩子
//!
//! # 数据结构
//!
//! 每个缓冲块同时挂在两条链上：
//!
//! 1. **哈希链**：按 (设备, 块号) 查找，保证同一个块至多缓存一份
//! 2. **环形空闲链表**：所有缓冲块都在上面，驱逐时从表头扫描，
//!    新认领的缓冲块移到表尾
//!
//! 驱逐时在未被引用的缓冲块中选评分最低的（脏计 2 分，锁定计 1 分），
//! 脏块必须先写回才能改键。
//!
//! # 与 `buffer.c` 的对应关系
//!
//! | buffer.c                    | bcache_core                          |
//! |-----------------------------|--------------------------------------|
//! | `struct buffer_head`        | `BufferHead` + 每槽位数据锁           |
//! | `hash_table[NR_HASH]`       | `HashIndex`                          |
//! | `free_list`                 | `FreeList`                           |
//! | `getblk()`                  | [`BufferCache::getblk()`]            |
//! | `get_hash_table()`          | [`BufferCache::get_hash_table()`]    |
//! | `bread()` / `breada()`      | [`BufferCache::bread()`] / [`BufferCache::breada()`] |
//! | `bread_page()`              | [`BufferCache::bread_page()`]        |
//! | `brelse()`                  | [`BufferCache::brelse()`]            |
//! | `sys_sync()` / `sync_dev()` | [`BufferCache::sync_all()`] / [`BufferCache::sync_device()`] |
//! | `invalidate_buffers()`      | [`BufferCache::invalidate_device()`] |
//!
//! # 使用示例
//!
//! ```rust,ignore
//! use bcache_core::cache::BufferCache;
//!
//! let cache = BufferCache::new(CacheConfig::default(), devices)?;
//!
//! let id = cache.bread(dev, 100)?;
//! cache.with_data_mut(id, |data| data[0] = 42);
//! cache.mark_dirty(id);
//! cache.brelse(id);
//!
//! cache.sync_device(dev);
//! let stats = cache.stats();
//! println!("hit rate {:.2}", stats.hit_rate());
//! ```

mod buffer;
mod free_list;
mod hash;
mod manager;
mod sync;

pub use buffer::{BufferFlags, RefCount};
pub use manager::{BufferCache, CacheStats};
pub use sync::MetadataSync;

pub(crate) use manager::Shared;
