//! 错误类型定义
//!
//! 缓冲区缓存中只有“可恢复”的失败才会以 [`Error`] 返回：设备 I/O 失败、
//! 超级块损坏、位图耗尽、未注册的设备等。
//!
//! 不变量被破坏（重复释放、驱逐被引用的缓冲块、哈希链重复插入、空闲链表损坏）
//! 属于编程错误，直接 `panic!`，不做任何恢复。

use core::fmt;

/// 缓冲区缓存操作错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    kind: ErrorKind,
    message: &'static str,
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// I/O 错误
    Io,
    /// 无效参数
    InvalidInput,
    /// 文件系统损坏
    Corrupted,
    /// 设备或对象不存在
    NotFound,
    /// 空间不足
    NoSpace,
    /// 不支持的操作
    Unsupported,
    /// 设备忙
    Busy,
}

impl Error {
    /// 创建新错误
    pub const fn new(kind: ErrorKind, message: &'static str) -> Self {
        Self { kind, message }
    }

    /// 获取错误类型
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// 获取错误消息
    pub const fn message(&self) -> &'static str {
        self.message
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for Error {}

/// Result 类型别名
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_accessors() {
        let err = Error::new(ErrorKind::Io, "block read failed");
        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(err.message(), "block read failed");
    }

    #[test]
    fn test_error_display() {
        let err = Error::new(ErrorKind::NotFound, "no such device");
        assert_eq!(format!("{}", err), "NotFound: no such device");
    }
}
