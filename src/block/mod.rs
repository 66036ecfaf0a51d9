//! 块设备层
//!
//! - block/device.rs 定义块设备接口和设备表，设备表按设备号分发传输请求
//! - block/request.rs 定义 I/O 请求和请求队列，请求完成时回写缓冲块状态
//! - block/io.rs 提供字节粒度的读写，全部经过缓冲区缓存
//! - block/handle.rs 提供对某个缓冲块的 RAII 引用
//! - block/mem.rs 是内存模拟设备，测试和工具都用它

mod device;
mod handle;
mod io;
mod mem;
mod request;

pub use device::{BlockDevice, DeviceTable};
pub use handle::Block;
pub use mem::MemDevice;
pub use request::{Direction, IoRequest, RequestQueue, SyncQueue, WorkerQueue};
