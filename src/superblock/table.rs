//! 挂载表
//!
//! 对应 `super.c` 的 `super_block[NR_SUPER]`。

use crate::cache::BufferCache;
use crate::consts::NR_SUPER;
use crate::error::{Error, ErrorKind, Result};
use crate::types::DevId;
use parking_lot::Mutex;
use std::sync::Arc;

use super::Superblock;

/// 已挂载 superblock 的表
///
/// 挂载过程持有表锁，同一时刻只有一个挂载在进行，
/// 同一设备不会被读入两次。
#[derive(Debug, Default)]
pub struct SuperTable {
    mounts: Mutex<Vec<Arc<Superblock>>>,
    root: Mutex<Option<DevId>>,
}

impl SuperTable {
    /// 创建空表
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置根设备，根设备不会被 `put_super` 卸下
    pub fn set_root_dev(&self, dev: DevId) {
        *self.root.lock() = Some(dev);
    }

    /// 查找设备的 superblock
    pub fn get_super(&self, dev: DevId) -> Option<Arc<Superblock>> {
        self.mounts.lock().iter().find(|sb| sb.dev() == dev).cloned()
    }

    /// 已挂载设备数
    pub fn len(&self) -> usize {
        self.mounts.lock().len()
    }

    /// 表是否为空
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 读入设备的 superblock
    ///
    /// 先检查换盘；设备已挂载时直接返回现有的 superblock。
    ///
    /// # 返回
    ///
    /// - 魔数或布局错误返回 `Corrupted`
    /// - 表满返回 `NoSpace`
    /// - 读块失败返回 `Io`
    pub fn read_super(&self, cache: &BufferCache, dev: DevId) -> Result<Arc<Superblock>> {
        self.check_disk_change(cache, dev);

        let mut mounts = self.mounts.lock();
        if let Some(sb) = mounts.iter().find(|sb| sb.dev() == dev) {
            return Ok(sb.clone());
        }
        if mounts.len() >= NR_SUPER {
            log::warn!("[SUPER] super block table full, cannot mount {}", dev);
            return Err(Error::new(ErrorKind::NoSpace, "super block table full"));
        }

        let sb = Arc::new(Superblock::load(cache, dev)?);
        mounts.push(sb.clone());
        Ok(sb)
    }

    /// 卸下设备的 superblock，释放其位图缓冲块
    ///
    /// 返回是否真的卸下。根设备和未挂载的设备返回 false。
    pub fn put_super(&self, cache: &BufferCache, dev: DevId) -> bool {
        if *self.root.lock() == Some(dev) {
            log::error!("[SUPER] root device {} changed: prepare for armageddon", dev);
            return false;
        }

        let mut mounts = self.mounts.lock();
        let Some(pos) = mounts.iter().position(|sb| sb.dev() == dev) else {
            return false;
        };
        let sb = mounts.swap_remove(pos);
        drop(mounts);

        sb.release(cache);
        log::info!("[SUPER] {} released", dev);
        true
    }

    /// 检查设备是否换过盘
    ///
    /// 换过盘时卸下 superblock 并使该设备的全部缓冲块失效。
    pub fn check_disk_change(&self, cache: &BufferCache, dev: DevId) -> bool {
        if !cache.devices().media_changed(dev) {
            return false;
        }

        log::warn!("[SUPER] disk change detected on {}", dev);
        self.put_super(cache, dev);
        cache.invalidate_device(dev);
        true
    }
}
