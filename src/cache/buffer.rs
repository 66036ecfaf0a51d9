//! 缓冲块描述符
//!
//! 对应 `struct buffer_head` 的元数据部分。数据区单独存放在
//! [`Shared`](super::Shared) 的每槽位锁里，这里只保留状态和两组链接：
//!
//! - `hash`：所在哈希链中的前驱/后继
//! - `free`：环形空闲链表中的前驱/后继
//!
//! C 实现用嵌入式指针串起这两条链。这里用 [`BufferId`] 下标代替指针，
//! 链接全部指向同一个描述符数组，不存在别名和生命周期问题。

use crate::types::{BlockNo, BufferId, DevId};
use bitflags::bitflags;

bitflags! {
    /// 缓冲块状态标志
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BufferFlags: u8 {
        /// 数据与磁盘一致（有效）
        const UPTODATE = 0x01;
        /// 数据已修改，重用前必须写回
        const DIRTY    = 0x02;
        /// I/O 进行中
        const LOCKED   = 0x04;
    }
}

/// 带检查的引用计数
///
/// 递减到零以下说明发生了重复释放，直接 panic。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefCount(u32);

impl RefCount {
    /// 增加引用
    pub fn get(&mut self) {
        self.0 = self
            .0
            .checked_add(1)
            .unwrap_or_else(|| panic!("buffer reference count overflow"));
    }

    /// 释放引用
    ///
    /// # Panics
    ///
    /// 计数已经为零时 panic（重复释放）。
    pub fn put(&mut self) {
        match self.0.checked_sub(1) {
            Some(count) => self.0 = count,
            None => panic!("trying to free free buffer"),
        }
    }

    /// 当前计数
    pub fn value(self) -> u32 {
        self.0
    }

    /// 是否有持有者
    pub fn is_held(self) -> bool {
        self.0 > 0
    }
}

/// 双向链接（下标形式）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Link {
    pub prev: Option<BufferId>,
    pub next: Option<BufferId>,
}

/// 缓冲块描述符
#[derive(Debug, Clone)]
pub(crate) struct BufferHead {
    /// 所属设备，None 表示尚未分配
    pub dev: Option<DevId>,
    /// 设备上的块号，仅在 `dev` 有值时有意义
    pub block: BlockNo,
    pub flags: BufferFlags,
    pub count: RefCount,
    /// 是否挂在哈希链上
    pub hashed: bool,
    pub hash: Link,
    pub free: Link,
}

impl BufferHead {
    pub fn new() -> Self {
        Self {
            dev: None,
            block: 0,
            flags: BufferFlags::empty(),
            count: RefCount::default(),
            hashed: false,
            hash: Link::default(),
            free: Link::default(),
        }
    }

    pub fn is_uptodate(&self) -> bool {
        self.flags.contains(BufferFlags::UPTODATE)
    }

    pub fn is_dirty(&self) -> bool {
        self.flags.contains(BufferFlags::DIRTY)
    }

    pub fn is_locked(&self) -> bool {
        self.flags.contains(BufferFlags::LOCKED)
    }

    pub fn matches(&self, dev: DevId, block: BlockNo) -> bool {
        self.dev == Some(dev) && self.block == block
    }

    /// 驱逐评分：脏的权重高于锁定
    pub fn badness(&self) -> u8 {
        ((self.is_dirty() as u8) << 1) + self.is_locked() as u8
    }
}
