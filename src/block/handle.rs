//! 块句柄 - RAII 风格的缓冲块访问
//!
//! 对应 `bread()` + `brelse()` 的配对使用。

use crate::cache::BufferCache;
use crate::error::Result;
use crate::types::{BlockNo, BufferId, DevId};

/// 块句柄
///
/// 持有缓冲块的一个引用，丢弃时自动 `brelse`。
///
/// - 多个句柄可以同时引用同一个块，它们看到的是同一份数据
/// - `with_data_mut` 修改后自动置脏，脏块由 `sync` 或驱逐时写回
///
/// # 示例
///
/// ```rust,ignore
/// // 读取块
/// let block = Block::get(&cache, dev, 1)?;
/// block.with_data(|data| {
///     println!("First byte: {:02x}", data[0]);
/// });
///
/// // 新块（不从磁盘读取）
/// let block = Block::get_noread(&cache, dev, 10);
/// block.zero();
/// block.with_data_mut(|data| data[0] = 0xFF);
/// ```
pub struct Block<'a> {
    cache: &'a BufferCache,
    id: BufferId,
}

impl<'a> Block<'a> {
    /// 获取块（读取数据）
    ///
    /// # 参数
    ///
    /// * `cache` - 缓冲区缓存
    /// * `dev` - 设备号
    /// * `block` - 块号
    pub fn get(cache: &'a BufferCache, dev: DevId, block: BlockNo) -> Result<Self> {
        let id = cache.bread(dev, block)?;
        Ok(Self { cache, id })
    }

    /// 获取块（不读取数据）
    ///
    /// 用于马上要整块覆盖的场景。数据是否有效看 [`is_uptodate`](Self::is_uptodate)。
    pub fn get_noread(cache: &'a BufferCache, dev: DevId, block: BlockNo) -> Self {
        let id = cache.getblk(dev, block);
        Self { cache, id }
    }

    /// 接管一个已经持有的引用
    pub fn from_raw(cache: &'a BufferCache, id: BufferId) -> Self {
        Self { cache, id }
    }

    /// 缓冲块句柄
    pub fn id(&self) -> BufferId {
        self.id
    }

    /// 块号
    pub fn block_no(&self) -> BlockNo {
        self.cache.key(self.id).map_or(0, |(_, block)| block)
    }

    /// 数据是否有效
    pub fn is_uptodate(&self) -> bool {
        self.cache.is_uptodate(self.id)
    }

    /// 访问块数据（只读）
    pub fn with_data<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&[u8]) -> R,
    {
        self.cache.with_data(self.id, f)
    }

    /// 访问块数据（可写），自动标记为脏
    pub fn with_data_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut [u8]) -> R,
    {
        let result = self.cache.with_data_mut(self.id, f);
        self.cache.mark_dirty(self.id);
        result
    }

    /// 清零整块，标记为有效且脏
    pub fn zero(&self) {
        self.cache.zero_fill(self.id);
    }

    /// 立即写回并等待完成
    pub fn write_now(&self) -> Result<()> {
        self.cache.write_block(self.id)
    }

    /// 放弃 RAII 管理，返回裸句柄，调用者负责 `brelse`
    pub fn into_raw(self) -> BufferId {
        let id = self.id;
        core::mem::forget(self);
        id
    }
}

impl Drop for Block<'_> {
    fn drop(&mut self) {
        self.cache.brelse(self.id);
    }
}

impl core::fmt::Debug for Block<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Block")
            .field("id", &self.id)
            .field("key", &self.cache.key(self.id))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{DeviceTable, MemDevice};
    use crate::config::CacheConfig;
    use crate::testing::{fill_pattern, DEV};
    use std::sync::Arc;

    fn setup() -> (BufferCache, MemDevice) {
        let mem = MemDevice::new(32);
        fill_pattern(&mem, 32);
        let devices = Arc::new(DeviceTable::new());
        devices.register(DEV, Box::new(mem.clone())).unwrap();
        let cache = BufferCache::new(CacheConfig::default().with_buffers(4), devices).unwrap();
        (cache, mem)
    }

    #[test]
    fn test_block_get_and_release() {
        let (cache, _mem) = setup();
        {
            let block = Block::get(&cache, DEV, 3).unwrap();
            assert_eq!(block.block_no(), 3);
            assert!(block.is_uptodate());
            assert_eq!(block.with_data(|data| data[0]), 3);
            assert_eq!(cache.ref_count(block.id()), 1);
        }
        assert_eq!(cache.free_count(), 4);
    }

    #[test]
    fn test_block_modify_marks_dirty() {
        let (cache, mem) = setup();
        {
            let block = Block::get(&cache, DEV, 0).unwrap();
            block.with_data_mut(|data| {
                data[0] = 0x42;
                data[1] = 0x43;
            });
            assert!(cache.is_dirty(block.id()));
        }

        // 仍在缓存中，不重新读
        let block = Block::get(&cache, DEV, 0).unwrap();
        block.with_data(|data| {
            assert_eq!(data[0], 0x42);
            assert_eq!(data[1], 0x43);
        });
        assert_eq!(mem.reads(), 1);

        block.write_now().unwrap();
        assert_eq!(mem.peek(0)[..2], [0x42, 0x43]);
    }

    #[test]
    fn test_block_get_noread() {
        let (cache, mem) = setup();
        let block = Block::get_noread(&cache, DEV, 10);
        assert!(!block.is_uptodate());
        block.zero();
        block.with_data_mut(|data| data.fill(0xFF));
        drop(block);
        assert_eq!(mem.reads(), 0);

        let block = Block::get(&cache, DEV, 10).unwrap();
        block.with_data(|data| {
            assert_eq!(data[0], 0xFF);
            assert_eq!(data[1023], 0xFF);
        });
        assert_eq!(mem.reads(), 0);
    }

    #[test]
    fn test_shared_handles() {
        let (cache, _mem) = setup();
        let a = Block::get(&cache, DEV, 5).unwrap();
        let b = Block::get(&cache, DEV, 5).unwrap();
        assert_eq!(a.id(), b.id());
        assert_eq!(cache.ref_count(a.id()), 2);

        a.with_data_mut(|data| data[7] = 0x11);
        assert_eq!(b.with_data(|data| data[7]), 0x11);
    }

    #[test]
    fn test_into_raw_keeps_reference() {
        let (cache, _mem) = setup();
        let id = Block::get(&cache, DEV, 2).unwrap().into_raw();
        assert_eq!(cache.ref_count(id), 1);

        drop(Block::from_raw(&cache, id));
        assert_eq!(cache.ref_count(id), 0);
    }
}
