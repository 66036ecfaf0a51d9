//! 位图模块
//!
//! - bitmap/ops.rs 提供针对一块位图数据的位操作
//! - bitmap/alloc.rs 在挂载设备的位图上分配和释放逻辑块与 inode

mod alloc;
pub mod ops;

pub use self::alloc::{
    count_free_blocks, count_free_inodes, free_block, free_inode, new_block, new_inode,
};
