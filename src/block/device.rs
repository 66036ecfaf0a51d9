//! 块设备接口和设备表

use crate::consts::BLOCK_SIZE;
use crate::error::{Error, ErrorKind, Result};
use crate::types::{BlockNo, DevId};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;

use super::request::Direction;

/// 块设备接口
///
/// 实现此 trait 以提供底层块设备访问。所有传输都以 [`BLOCK_SIZE`] 为单位。
///
/// # 示例
///
/// ```rust,ignore
/// use bcache_core::{BlockDevice, Result};
///
/// struct MyDevice {
///     // ...
/// }
///
/// impl BlockDevice for MyDevice {
///     fn total_blocks(&self) -> u64 {
///         1440
///     }
///
///     fn read_block(&mut self, block: u32, buf: &mut [u8]) -> Result<()> {
///         // 实现块读取
///         Ok(())
///     }
///
///     fn write_block(&mut self, block: u32, buf: &[u8]) -> Result<()> {
///         // 实现块写入
///         Ok(())
///     }
/// }
/// ```
pub trait BlockDevice: Send {
    /// 总块数
    fn total_blocks(&self) -> u64;

    /// 读取一个块到 `buf`（长度为 `BLOCK_SIZE`）
    fn read_block(&mut self, block: BlockNo, buf: &mut [u8]) -> Result<()>;

    /// 把 `buf`（长度为 `BLOCK_SIZE`）写入一个块
    fn write_block(&mut self, block: BlockNo, buf: &[u8]) -> Result<()>;

    /// 刷新设备自身的缓存
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    /// 是否只读
    fn is_read_only(&self) -> bool {
        false
    }

    /// 可移动介质是否被更换过
    ///
    /// 返回后清除更换标记。不可移动的设备使用默认实现，永远返回 false。
    fn media_changed(&mut self) -> bool {
        false
    }
}

type DeviceMap = BTreeMap<DevId, Mutex<Box<dyn BlockDevice>>>;

/// 设备表
///
/// 设备号到块设备的映射，同时充当“设备容量表”：调用者通过
/// [`capacity`](Self::capacity) 在请求到达缓存之前检查块号是否越界。
///
/// 每个设备单独加锁，不同设备上的传输可以并行进行。
#[derive(Default)]
pub struct DeviceTable {
    devices: RwLock<DeviceMap>,
}

impl DeviceTable {
    /// 创建空设备表
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册设备
    ///
    /// 设备号已被占用时返回 `Busy`。
    pub fn register(&self, dev: DevId, device: Box<dyn BlockDevice>) -> Result<()> {
        let mut devices = self.devices.write();
        if devices.contains_key(&dev) {
            return Err(Error::new(ErrorKind::Busy, "device number already registered"));
        }
        log::debug!(
            "[BLKDEV] register {} ({} blocks)",
            dev,
            device.total_blocks()
        );
        devices.insert(dev, Mutex::new(device));
        Ok(())
    }

    /// 注销设备，返回设备对象
    pub fn unregister(&self, dev: DevId) -> Option<Box<dyn BlockDevice>> {
        self.devices
            .write()
            .remove(&dev)
            .map(|device| device.into_inner())
    }

    /// 设备是否已注册
    pub fn contains(&self, dev: DevId) -> bool {
        self.devices.read().contains_key(&dev)
    }

    /// 设备容量（块数），未注册时返回 None
    pub fn capacity(&self, dev: DevId) -> Option<u64> {
        self.devices
            .read()
            .get(&dev)
            .map(|device| device.lock().total_blocks())
    }

    /// 查询并清除设备的介质更换标记
    pub fn media_changed(&self, dev: DevId) -> bool {
        self.devices
            .read()
            .get(&dev)
            .map(|device| device.lock().media_changed())
            .unwrap_or(false)
    }

    /// 刷新设备自身的缓存
    pub fn flush(&self, dev: DevId) -> Result<()> {
        match self.devices.read().get(&dev) {
            Some(device) => device.lock().flush(),
            None => Err(Error::new(ErrorKind::NotFound, "no such block device")),
        }
    }

    /// 在设备和缓冲区之间传输一个块
    ///
    /// 对应 `ll_rw_block` 之下驱动层完成的实际传输。
    pub fn transfer(&self, dir: Direction, dev: DevId, block: BlockNo, buf: &mut [u8]) -> Result<()> {
        if buf.len() < BLOCK_SIZE {
            return Err(Error::new(ErrorKind::InvalidInput, "buffer too small for block"));
        }

        let devices = self.devices.read();
        let device = devices
            .get(&dev)
            .ok_or(Error::new(ErrorKind::NotFound, "no such block device"))?;
        let mut device = device.lock();

        if block as u64 >= device.total_blocks() {
            return Err(Error::new(ErrorKind::InvalidInput, "block beyond end of device"));
        }

        if dir.is_write() {
            if device.is_read_only() {
                return Err(Error::new(ErrorKind::Unsupported, "write to read-only device"));
            }
            device.write_block(block, &buf[..BLOCK_SIZE])
        } else {
            device.read_block(block, &mut buf[..BLOCK_SIZE])
        }
    }
}

impl core::fmt::Debug for DeviceTable {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list()
            .entries(self.devices.read().keys())
            .finish()
    }
}
