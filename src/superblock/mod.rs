//! Superblock 模块
//!
//! 磁盘上的 superblock 解析、挂载时常驻内存的位图缓冲块，以及设备到
//! superblock 的挂载表。
//!
//! 挂载一个设备时读入块 1 的 superblock，再把 inode 位图和逻辑块位图
//! 全部 `bread` 进缓存并一直持有引用，直到卸载或检测到换盘。

mod read;
mod table;
mod write;

pub use read::*;
pub use table::SuperTable;
