//! I/O 请求与请求队列
//!
//! 缓冲区缓存通过 [`RequestQueue`] 把读写请求交给驱动层。请求提交时缓冲块
//! 已经上锁；驱动完成传输后调用 [`IoRequest::complete`]，由它清除锁定位、
//! 更新有效位/脏位并唤醒在该缓冲块上等待的上下文。
//!
//! - [`SyncQueue`]：在提交者的上下文中直接完成传输
//! - [`WorkerQueue`]：交给后台线程完成，完成通知真正异步到达

use crate::cache::Shared;
use crate::error::{Error, ErrorKind, Result};
use crate::types::{BlockNo, BufferId, DevId};
use parking_lot::Mutex;
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use super::device::DeviceTable;

/// 传输方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// 读
    Read,
    /// 写
    Write,
    /// 预读：缓冲块已上锁时直接放弃
    ReadAhead,
    /// 预写：缓冲块已上锁时直接放弃
    WriteAhead,
}

impl Direction {
    /// 是否为写方向
    pub fn is_write(self) -> bool {
        matches!(self, Direction::Write | Direction::WriteAhead)
    }

    /// 是否为预读/预写
    pub fn is_ahead(self) -> bool {
        matches!(self, Direction::ReadAhead | Direction::WriteAhead)
    }
}

/// 一次块传输请求
///
/// 请求必须被完成恰好一次。如果请求在完成之前被丢弃，会按失败处理，
/// 否则缓冲块会一直处于锁定状态。
pub struct IoRequest {
    dir: Direction,
    dev: DevId,
    block: BlockNo,
    buffer: BufferId,
    cache: Option<Arc<Shared>>,
}

impl IoRequest {
    pub(crate) fn new(
        dir: Direction,
        dev: DevId,
        block: BlockNo,
        buffer: BufferId,
        cache: Arc<Shared>,
    ) -> Self {
        Self {
            dir,
            dev,
            block,
            buffer,
            cache: Some(cache),
        }
    }

    /// 传输方向
    pub fn dir(&self) -> Direction {
        self.dir
    }

    /// 目标设备
    pub fn dev(&self) -> DevId {
        self.dev
    }

    /// 目标块号
    pub fn block(&self) -> BlockNo {
        self.block
    }

    /// 缓冲块句柄
    pub fn buffer(&self) -> BufferId {
        self.buffer
    }

    /// 在设备和缓冲块数据之间执行实际传输
    pub fn transfer(&self, devices: &DeviceTable) -> Result<()> {
        let cache = self
            .cache
            .as_ref()
            .ok_or(Error::new(ErrorKind::Busy, "request already completed"))?;
        let mut data = cache.payload(self.buffer).lock();
        devices.transfer(self.dir, self.dev, self.block, &mut data)
    }

    /// 完成请求
    ///
    /// 读成功置有效位；写清除脏位；无论成败都清除锁定位并唤醒等待者。
    pub fn complete(mut self, result: Result<()>) {
        if let Some(cache) = self.cache.take() {
            cache.end_request(self.buffer, self.dir, result);
        }
    }
}

impl Drop for IoRequest {
    fn drop(&mut self) {
        if let Some(cache) = self.cache.take() {
            log::warn!(
                "[BLKDEV] request for {} block {} dropped before completion",
                self.dev,
                self.block
            );
            cache.end_request(
                self.buffer,
                self.dir,
                Err(Error::new(ErrorKind::Io, "request dropped")),
            );
        }
    }
}

impl core::fmt::Debug for IoRequest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IoRequest")
            .field("dir", &self.dir)
            .field("dev", &self.dev)
            .field("block", &self.block)
            .field("buffer", &self.buffer)
            .field("completed", &self.cache.is_none())
            .finish()
    }
}

/// 请求队列
///
/// 对应 `ll_rw_block` 背后的驱动层。`submit` 可以立即完成请求，
/// 也可以稍后在别的线程中完成。
pub trait RequestQueue: Send + Sync {
    /// 提交请求
    fn submit(&self, req: IoRequest);
}

/// 同步请求队列
///
/// 在提交者的上下文中完成传输。
pub struct SyncQueue {
    devices: Arc<DeviceTable>,
}

impl SyncQueue {
    /// 创建同步队列
    pub fn new(devices: Arc<DeviceTable>) -> Self {
        Self { devices }
    }
}

impl RequestQueue for SyncQueue {
    fn submit(&self, req: IoRequest) {
        let result = req.transfer(&self.devices);
        req.complete(result);
    }
}

/// 后台线程请求队列
///
/// 请求按提交顺序由一个工作线程依次完成。队列被丢弃时关闭通道并等待
/// 工作线程处理完剩余请求后退出。
pub struct WorkerQueue {
    tx: Mutex<Option<Sender<IoRequest>>>,
    worker: Option<JoinHandle<()>>,
}

impl WorkerQueue {
    /// 创建队列并启动工作线程
    pub fn new(devices: Arc<DeviceTable>) -> Result<Self> {
        let (tx, rx) = mpsc::channel::<IoRequest>();
        let worker = thread::Builder::new()
            .name("bcache-io".into())
            .spawn(move || {
                for req in rx {
                    let result = req.transfer(&devices);
                    req.complete(result);
                }
                log::debug!("[BLKDEV] io worker exiting");
            })
            .map_err(|_| Error::new(ErrorKind::Io, "failed to spawn io worker"))?;

        Ok(Self {
            tx: Mutex::new(Some(tx)),
            worker: Some(worker),
        })
    }
}

impl RequestQueue for WorkerQueue {
    fn submit(&self, req: IoRequest) {
        let tx = self.tx.lock();
        match tx.as_ref() {
            Some(tx) => {
                if let Err(mpsc::SendError(req)) = tx.send(req) {
                    req.complete(Err(Error::new(ErrorKind::Io, "io worker gone")));
                }
            }
            None => req.complete(Err(Error::new(ErrorKind::Io, "request queue closed"))),
        }
    }
}

impl Drop for WorkerQueue {
    fn drop(&mut self) {
        self.tx.lock().take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
