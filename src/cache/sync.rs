//! 写回与失效
//!
//! 对应 `sys_sync` / `sync_dev` / `invalidate_buffers`。

use crate::block::Direction;
use crate::consts::BLOCK_SIZE;
use crate::types::{BufferId, DevId};
use std::sync::Arc;

use super::buffer::BufferFlags;
use super::manager::BufferCache;

/// 元数据同步钩子
///
/// 写回脏缓冲块之前调用，让上层（如 inode 表）先把内存中的元数据刷进缓冲块。
/// 钩子在不持有缓存内部锁的情况下被调用，可以自由使用缓存接口。
pub trait MetadataSync: Send + Sync {
    /// 把脏的元数据写入缓冲块
    fn sync_inodes(&self, cache: &BufferCache);
}

impl BufferCache {
    /// 安装元数据同步钩子，返回之前的钩子
    pub fn set_metadata_sync(
        &self,
        hook: Option<Arc<dyn MetadataSync>>,
    ) -> Option<Arc<dyn MetadataSync>> {
        core::mem::replace(&mut *self.metadata.write(), hook)
    }

    fn run_metadata_sync(&self) {
        let hook = self.metadata.read().clone();
        if let Some(hook) = hook {
            hook.sync_inodes(self);
        }
    }

    /// 对缓冲池做一遍写回，`dev` 为 None 时覆盖全部设备
    ///
    /// 返回提交的写请求数。
    fn sync_pass(&self, dev: Option<DevId>) -> usize {
        let mut st = self.lock_state();
        let mut issued = 0;

        for i in 0..st.heads.len() {
            let id = BufferId(i);
            if dev.is_some() && st.heads[i].dev != dev {
                continue;
            }
            self.shared().wait_on_buffer(&mut st, id);

            // 等待期间缓冲块可能已被挪给别的设备
            let head = &st.heads[i];
            if head.dev.is_none() || (dev.is_some() && head.dev != dev) {
                continue;
            }
            if head.is_dirty() && self.ll_rw_block_locked(&mut st, Direction::Write, id) {
                issued += 1;
            }
        }
        issued
    }

    /// 写回所有设备的脏缓冲块
    ///
    /// 只提交请求，不等待完成。返回提交的写请求数。
    pub fn sync_all(&self) -> usize {
        self.run_metadata_sync();
        let issued = self.sync_pass(None);
        log::debug!("[BCACHE] sync: {} writes issued", issued);
        issued
    }

    /// 写回单个设备的脏缓冲块
    ///
    /// 分两遍：第一遍写出已有的脏数据，然后调用元数据钩子，
    /// 第二遍写出钩子新产生的脏数据。再次调用时没有新的写。
    pub fn sync_device(&self, dev: DevId) -> usize {
        let first = self.sync_pass(Some(dev));
        self.run_metadata_sync();
        let second = self.sync_pass(Some(dev));
        log::debug!(
            "[BCACHE] sync_dev {}: {} + {} writes issued",
            dev,
            first,
            second
        );
        first + second
    }

    /// 使设备的全部缓冲块失效
    ///
    /// 清除有效位和脏位，未写回的修改会丢失。缓冲块仍留在哈希表中，
    /// 下次读取时重新发起 I/O。返回失效的缓冲块数量。
    pub fn invalidate_device(&self, dev: DevId) -> usize {
        let mut st = self.lock_state();
        let mut count = 0;

        for i in 0..st.heads.len() {
            if st.heads[i].dev != Some(dev) {
                continue;
            }
            self.shared().wait_on_buffer(&mut st, BufferId(i));
            let head = &mut st.heads[i];
            if head.dev == Some(dev) {
                head.flags.remove(BufferFlags::UPTODATE | BufferFlags::DIRTY);
                count += 1;
            }
        }
        log::debug!("[BCACHE] invalidate {}: {} buffers", dev, count);
        count
    }

    /// 缓存中属于某设备的脏数据总字节数
    pub fn dirty_bytes(&self, dev: DevId) -> usize {
        let st = self.lock_state();
        st.heads
            .iter()
            .filter(|head| head.dev == Some(dev) && head.is_dirty())
            .count()
            * BLOCK_SIZE
    }
}
