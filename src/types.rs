//! 基础类型定义
//!
//! 设备号、块号和缓冲块句柄。

use core::fmt;

/// 逻辑块号
pub type BlockNo = u32;

/// 块设备号
///
/// 高 8 位为主设备号，低 8 位为次设备号。
/// 缓冲块的“未分配”状态用 `Option<DevId>::None` 表示，而不是设备号 0。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DevId(pub u16);

impl DevId {
    /// 由主、次设备号构造
    pub const fn new(major: u8, minor: u8) -> Self {
        Self(((major as u16) << 8) | minor as u16)
    }

    /// 主设备号
    pub const fn major(self) -> u8 {
        (self.0 >> 8) as u8
    }

    /// 次设备号
    pub const fn minor(self) -> u8 {
        (self.0 & 0xff) as u8
    }

    /// 原始设备号
    pub const fn raw(self) -> u16 {
        self.0
    }
}

impl fmt::Display for DevId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x}:{:02x}", self.major(), self.minor())
    }
}

/// 缓冲块句柄
///
/// 缓冲池中槽位的稳定下标。槽位在缓存初始化时一次性创建，之后只会被
/// 重新绑定到别的 (设备, 块号)，不会销毁，因此句柄在缓存生命周期内一直有效。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BufferId(pub(crate) usize);

impl BufferId {
    /// 槽位下标
    pub const fn index(self) -> usize {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dev_id_parts() {
        let dev = DevId::new(3, 1);
        assert_eq!(dev.raw(), 0x0301);
        assert_eq!(dev.major(), 3);
        assert_eq!(dev.minor(), 1);
        assert_eq!(format!("{}", dev), "03:01");
    }
}
