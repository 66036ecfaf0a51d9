//! 内存块设备
//!
//! 用内存模拟的块设备（RAM disk）。可以克隆：所有克隆共享同一份存储，
//! 一份注册进 [`DeviceTable`](super::DeviceTable)，另一份留在手里观察
//! 读写次数、注入 I/O 错误或模拟换盘。

use crate::consts::BLOCK_SIZE;
use crate::error::{Error, ErrorKind, Result};
use crate::types::BlockNo;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;

use super::device::BlockDevice;

struct MemInner {
    storage: Vec<u8>,
    total_blocks: u64,
    read_only: bool,
    media_changed: bool,
    bad_blocks: BTreeSet<BlockNo>,
    reads: u64,
    writes: u64,
    write_log: Vec<BlockNo>,
}

/// 内存块设备
#[derive(Clone)]
pub struct MemDevice {
    inner: Arc<Mutex<MemInner>>,
}

impl MemDevice {
    /// 创建 `total_blocks` 个块、内容全零的设备
    pub fn new(total_blocks: u64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemInner {
                storage: vec![0u8; total_blocks as usize * BLOCK_SIZE],
                total_blocks,
                read_only: false,
                media_changed: false,
                bad_blocks: BTreeSet::new(),
                reads: 0,
                writes: 0,
                write_log: Vec::new(),
            })),
        }
    }

    /// 物理读次数
    pub fn reads(&self) -> u64 {
        self.inner.lock().reads
    }

    /// 物理写次数
    pub fn writes(&self) -> u64 {
        self.inner.lock().writes
    }

    /// 按顺序记录的已写块号
    pub fn write_log(&self) -> Vec<BlockNo> {
        self.inner.lock().write_log.clone()
    }

    /// 清零读写计数和写日志
    pub fn reset_counters(&self) {
        let mut inner = self.inner.lock();
        inner.reads = 0;
        inner.writes = 0;
        inner.write_log.clear();
    }

    /// 直接读取设备上的块内容（不计数）
    pub fn peek(&self, block: BlockNo) -> Vec<u8> {
        let inner = self.inner.lock();
        let start = block as usize * BLOCK_SIZE;
        inner.storage[start..start + BLOCK_SIZE].to_vec()
    }

    /// 直接改写设备上的块内容（不计数）
    ///
    /// `data` 不足一块时只覆盖前面的字节。
    pub fn poke(&self, block: BlockNo, data: &[u8]) {
        let mut inner = self.inner.lock();
        let start = block as usize * BLOCK_SIZE;
        let len = data.len().min(BLOCK_SIZE);
        inner.storage[start..start + len].copy_from_slice(&data[..len]);
    }

    /// 让某个块的读写失败
    pub fn fail_block(&self, block: BlockNo) {
        self.inner.lock().bad_blocks.insert(block);
    }

    /// 恢复某个块
    pub fn heal_block(&self, block: BlockNo) {
        self.inner.lock().bad_blocks.remove(&block);
    }

    /// 设置只读
    pub fn set_read_only(&self, read_only: bool) {
        self.inner.lock().read_only = read_only;
    }

    /// 模拟换盘：换上 `content` 作为新介质的内容，并置位更换标记
    pub fn change_media(&self, content: &[u8]) {
        let mut inner = self.inner.lock();
        let len = content.len().min(inner.storage.len());
        inner.storage.fill(0);
        inner.storage[..len].copy_from_slice(&content[..len]);
        inner.media_changed = true;
    }
}

impl BlockDevice for MemDevice {
    fn total_blocks(&self) -> u64 {
        self.inner.lock().total_blocks
    }

    fn read_block(&mut self, block: BlockNo, buf: &mut [u8]) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.reads += 1;
        if inner.bad_blocks.contains(&block) {
            return Err(Error::new(ErrorKind::Io, "media read error"));
        }
        let start = block as usize * BLOCK_SIZE;
        buf[..BLOCK_SIZE].copy_from_slice(&inner.storage[start..start + BLOCK_SIZE]);
        Ok(())
    }

    fn write_block(&mut self, block: BlockNo, buf: &[u8]) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.writes += 1;
        inner.write_log.push(block);
        if inner.bad_blocks.contains(&block) {
            return Err(Error::new(ErrorKind::Io, "media write error"));
        }
        let start = block as usize * BLOCK_SIZE;
        inner.storage[start..start + BLOCK_SIZE].copy_from_slice(&buf[..BLOCK_SIZE]);
        Ok(())
    }

    fn is_read_only(&self) -> bool {
        self.inner.lock().read_only
    }

    fn media_changed(&mut self) -> bool {
        let mut inner = self.inner.lock();
        core::mem::replace(&mut inner.media_changed, false)
    }
}
