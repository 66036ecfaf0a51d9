//! 测试辅助：内存设备、文件系统镜像和手动完成的请求队列

use crate::block::{DeviceTable, IoRequest, MemDevice, RequestQueue};
use crate::cache::BufferCache;
use crate::config::CacheConfig;
use crate::consts::{BLOCK_SIZE, SUPER_MAGIC};
use crate::superblock::DiskSuperblock;
use crate::types::{BlockNo, BufferId, DevId};
use parking_lot::Mutex;
use std::sync::Arc;

pub const DEV: DevId = DevId::new(3, 1);

/// 每个块填满自己块号的低 8 位
pub fn fill_pattern(mem: &MemDevice, blocks: u64) {
    for block in 0..blocks {
        mem.poke(block as BlockNo, &[block as u8; BLOCK_SIZE]);
    }
}

/// 一个 inode 位图块、一个逻辑块位图块的 superblock
pub fn sample_superblock(ninodes: u16, nzones: u16) -> DiskSuperblock {
    let inode_blocks = (ninodes as usize * 32).div_ceil(BLOCK_SIZE) as u16;
    DiskSuperblock {
        ninodes,
        nzones,
        imap_blocks: 1,
        zmap_blocks: 1,
        firstdatazone: 4 + inode_blocks,
        log_zone_size: 0,
        max_size: 268_966_912,
        magic: SUPER_MAGIC,
    }
}

/// 换上一张刚格式化的盘
pub fn install_image(mem: &MemDevice, ninodes: u16, nzones: u16) {
    let mut image = vec![0u8; 2 * BLOCK_SIZE];
    sample_superblock(ninodes, nzones)
        .encode(&mut image[BLOCK_SIZE..])
        .unwrap();
    mem.change_media(&image);
}

/// 格式化过的设备和挂在上面的缓存
pub fn formatted(ninodes: u16, nzones: u16) -> (BufferCache, MemDevice) {
    let mem = MemDevice::new(nzones as u64);
    install_image(&mem, ninodes, nzones);
    let devices = Arc::new(DeviceTable::new());
    devices.register(DEV, Box::new(mem.clone())).unwrap();
    let cache = BufferCache::new(CacheConfig::default().with_buffers(32), devices).unwrap();
    (cache, mem)
}

/// 请求只入队，由测试决定什么时候完成
#[derive(Clone, Default)]
pub struct ManualQueue {
    pending: Arc<Mutex<Vec<IoRequest>>>,
}

impl ManualQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn peek_buffer(&self, index: usize) -> BufferId {
        self.pending.lock()[index].buffer()
    }

    /// 取出全部未完成的请求，由调用者自己传输和完成
    pub fn take_all(&self) -> Vec<IoRequest> {
        self.pending.lock().drain(..).collect()
    }

    pub fn complete_all(&self, devices: &DeviceTable) {
        for req in self.take_all() {
            let result = req.transfer(devices);
            req.complete(result);
        }
    }
}

impl RequestQueue for ManualQueue {
    fn submit(&self, req: IoRequest) {
        self.pending.lock().push(req);
    }
}
