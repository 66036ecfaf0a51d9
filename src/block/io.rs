//! 字节粒度的块设备读写
//!
//! 对应 `block_dev.c`：读写都经过缓冲区缓存，按块拆分。
//! 不足一块的部分先读入整块（同时预读后两块），再拷贝或修改其中的字节；
//! 整块写入直接 `getblk` 覆盖，不读磁盘。

use crate::cache::BufferCache;
use crate::consts::{BLOCK_SIZE, BLOCK_SIZE_BITS, READ_AHEAD_WINDOW};
use crate::error::{Error, ErrorKind, Result};
use crate::types::{BlockNo, DevId};

impl BufferCache {
    fn device_blocks(&self, dev: DevId) -> Result<u64> {
        self.devices()
            .capacity(dev)
            .ok_or(Error::new(ErrorKind::NotFound, "no such device"))
    }

    /// 字节偏移换算出的块号超出 [`BlockNo`] 范围时返回 `InvalidInput`
    fn block_no(block: u64) -> Result<BlockNo> {
        BlockNo::try_from(block)
            .map_err(|_| Error::new(ErrorKind::InvalidInput, "block number out of range"))
    }

    /// 预读窗口：`block` 之后的若干块，不超过设备末尾
    fn read_ahead_window(block: u64, size: u64) -> Vec<BlockNo> {
        (1..=READ_AHEAD_WINDOW as u64)
            .map(|i| block + i)
            .filter(|&b| b < size)
            .filter_map(|b| BlockNo::try_from(b).ok())
            .collect()
    }

    /// 从设备的字节偏移 `pos` 处读取
    ///
    /// # 参数
    ///
    /// * `dev` - 设备号
    /// * `pos` - 字节偏移
    /// * `buf` - 目标缓冲区
    ///
    /// # 返回
    ///
    /// 实际读取的字节数。到达设备末尾时提前结束；一个字节都没读到时返回错误。
    pub fn block_read(&self, dev: DevId, pos: u64, buf: &mut [u8]) -> Result<usize> {
        let size = self.device_blocks(dev)?;
        let mut block = pos >> BLOCK_SIZE_BITS;
        let mut offset = (pos & (BLOCK_SIZE as u64 - 1)) as usize;
        let mut done = 0;

        while done < buf.len() {
            if block >= size {
                break;
            }
            let chars = (BLOCK_SIZE - offset).min(buf.len() - done);
            let ahead = Self::read_ahead_window(block, size);
            let id = match Self::block_no(block).and_then(|nr| self.breada(dev, nr, &ahead)) {
                Ok(id) => id,
                Err(err) if done == 0 => return Err(err),
                Err(_) => break,
            };

            self.with_data(id, |data| {
                buf[done..done + chars].copy_from_slice(&data[offset..offset + chars]);
            });
            self.brelse(id);

            done += chars;
            offset = 0;
            block += 1;
        }

        if done == 0 && !buf.is_empty() {
            return Err(Error::new(ErrorKind::Io, "read past end of device"));
        }
        Ok(done)
    }

    /// 向设备的字节偏移 `pos` 处写入
    ///
    /// 数据只写进缓存并置脏，什么时候落盘由 `sync` 或驱逐决定。
    ///
    /// # 返回
    ///
    /// 实际写入的字节数。到达设备末尾时提前结束；一个字节都没写时返回错误。
    pub fn block_write(&self, dev: DevId, pos: u64, buf: &[u8]) -> Result<usize> {
        let size = self.device_blocks(dev)?;
        let mut block = pos >> BLOCK_SIZE_BITS;
        let mut offset = (pos & (BLOCK_SIZE as u64 - 1)) as usize;
        let mut done = 0;

        while done < buf.len() {
            if block >= size {
                break;
            }
            let chars = (BLOCK_SIZE - offset).min(buf.len() - done);
            let fetched = Self::block_no(block).and_then(|nr| {
                if chars == BLOCK_SIZE {
                    Ok(self.getblk(dev, nr))
                } else {
                    self.breada(dev, nr, &Self::read_ahead_window(block, size))
                }
            });
            let id = match fetched {
                Ok(id) => id,
                Err(err) if done == 0 => return Err(err),
                Err(_) => break,
            };

            self.with_data_mut(id, |data| {
                data[offset..offset + chars].copy_from_slice(&buf[done..done + chars]);
            });
            if chars == BLOCK_SIZE {
                self.mark_uptodate(id);
            }
            self.mark_dirty(id);
            self.brelse(id);

            done += chars;
            offset = 0;
            block += 1;
        }

        if done == 0 && !buf.is_empty() {
            return Err(Error::new(ErrorKind::Io, "write past end of device"));
        }
        Ok(done)
    }
}

#[cfg(test)]
mod tests {
    use crate::block::{BlockDevice, DeviceTable, MemDevice};
    use crate::cache::BufferCache;
    use crate::config::CacheConfig;
    use crate::consts::BLOCK_SIZE;
    use crate::error::{ErrorKind, Result};
    use crate::testing::{fill_pattern, DEV};
    use crate::types::{BlockNo, DevId};
    use std::sync::Arc;

    fn setup(total_blocks: u64) -> (BufferCache, MemDevice) {
        setup_buffers(total_blocks, 8)
    }

    fn setup_buffers(total_blocks: u64, nr_buffers: usize) -> (BufferCache, MemDevice) {
        let mem = MemDevice::new(total_blocks);
        fill_pattern(&mem, total_blocks);
        let devices = Arc::new(DeviceTable::new());
        devices.register(DEV, Box::new(mem.clone())).unwrap();
        let cache =
            BufferCache::new(CacheConfig::default().with_buffers(nr_buffers), devices).unwrap();
        (cache, mem)
    }

    /// 声称有 2^33 个块的设备，读出的块内容是块号的低 8 位
    struct HugeDevice;

    impl BlockDevice for HugeDevice {
        fn total_blocks(&self) -> u64 {
            1 << 33
        }

        fn read_block(&mut self, block: BlockNo, buf: &mut [u8]) -> Result<()> {
            buf.fill(block as u8);
            Ok(())
        }

        fn write_block(&mut self, _block: BlockNo, _buf: &[u8]) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_read_across_blocks() {
        let (cache, mem) = setup(16);
        let mut buf = vec![0u8; 100];

        let n = cache.block_read(DEV, 3 * BLOCK_SIZE as u64 - 50, &mut buf).unwrap();
        assert_eq!(n, 100);
        assert!(buf[..50].iter().all(|&b| b == 2));
        assert!(buf[50..].iter().all(|&b| b == 3));
        // 块 2 的预读带进了 3 和 4，读块 3 时只需再预读 5
        assert_eq!(mem.reads(), 4);
    }

    #[test]
    fn test_read_stops_at_device_end() {
        let (cache, _mem) = setup(4);
        let mut buf = vec![0u8; 2 * BLOCK_SIZE];

        let n = cache.block_read(DEV, 3 * BLOCK_SIZE as u64, &mut buf).unwrap();
        assert_eq!(n, BLOCK_SIZE);

        let err = cache.block_read(DEV, 4 * BLOCK_SIZE as u64, &mut buf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_unknown_device() {
        let (cache, _mem) = setup(4);
        let mut buf = [0u8; 8];
        let err = cache.block_read(DevId::new(7, 0), 0, &mut buf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_partial_write_preserves_rest() {
        let (cache, mem) = setup(16);
        let n = cache.block_write(DEV, 5 * BLOCK_SIZE as u64 + 10, &[0xee; 4]).unwrap();
        assert_eq!(n, 4);
        assert_eq!(mem.writes(), 0);

        cache.sync_device(DEV);
        let data = mem.peek(5);
        assert_eq!(data[9], 5);
        assert_eq!(data[10..14], [0xee; 4]);
        assert_eq!(data[14], 5);
    }

    #[test]
    fn test_whole_block_write_skips_read() {
        let (cache, mem) = setup(16);
        let buf = vec![0x3cu8; 2 * BLOCK_SIZE];

        let n = cache.block_write(DEV, 6 * BLOCK_SIZE as u64, &buf).unwrap();
        assert_eq!(n, 2 * BLOCK_SIZE);
        assert_eq!(mem.reads(), 0);

        let mut back = vec![0u8; 2 * BLOCK_SIZE];
        cache.block_read(DEV, 6 * BLOCK_SIZE as u64, &mut back).unwrap();
        assert_eq!(back, buf);

        cache.sync_all();
        assert!(mem.peek(7).iter().all(|&b| b == 0x3c));
    }

    #[test]
    fn test_write_truncated_at_device_end() {
        let (cache, _mem) = setup(4);
        let buf = vec![1u8; 3 * BLOCK_SIZE];
        let n = cache.block_write(DEV, 2 * BLOCK_SIZE as u64, &buf).unwrap();
        assert_eq!(n, 2 * BLOCK_SIZE);
    }

    #[test]
    fn test_single_buffer_pool_skips_read_ahead() {
        let (cache, mem) = setup_buffers(16, 1);

        let mut buf = [0u8; 10];
        assert_eq!(cache.block_read(DEV, 0, &mut buf).unwrap(), 10);
        assert_eq!(buf, [0u8; 10]);
        assert_eq!(mem.reads(), 1);

        assert_eq!(cache.block_write(DEV, BLOCK_SIZE as u64 + 1, &[0x5a; 4]).unwrap(), 4);
        cache.sync_device(DEV);
        assert_eq!(mem.peek(1)[1..5], [0x5a; 4]);
        assert_eq!(cache.free_count(), 1);
    }

    #[test]
    fn test_offset_beyond_block_number_range() {
        let devices = Arc::new(DeviceTable::new());
        devices.register(DEV, Box::new(HugeDevice)).unwrap();
        let cache = BufferCache::new(CacheConfig::default().with_buffers(4), devices).unwrap();
        let last = u32::MAX as u64 * BLOCK_SIZE as u64;

        let mut buf = vec![0u8; BLOCK_SIZE + 10];
        let err = cache.block_read(DEV, last + BLOCK_SIZE as u64, &mut buf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        let err = cache.block_write(DEV, last + BLOCK_SIZE as u64, &buf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        // 最后一个可寻址块能读，跨过去的部分被截断
        let n = cache.block_read(DEV, last, &mut buf).unwrap();
        assert_eq!(n, BLOCK_SIZE);
        assert!(buf[..BLOCK_SIZE].iter().all(|&b| b == 0xff));
        cache.check_invariants();
    }
}
