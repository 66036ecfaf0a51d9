//! 缓冲区缓存常量定义
//!
//! 这个模块包含了缓冲区缓存和 MINIX 文件系统布局用到的常量：
//! - 块大小
//! - 缓冲池与哈希表规模
//! - 超级块与位图布局

//=============================================================================
// 基础常量
//=============================================================================

/// 块大小（1024 字节，固定不变）
pub const BLOCK_SIZE: usize = 1024;

/// 块大小对应的位移（`pos >> BLOCK_SIZE_BITS` 得到块号）
pub const BLOCK_SIZE_BITS: u32 = 10;

//=============================================================================
// 缓冲池
//=============================================================================

/// 哈希表桶数（素数）
pub const NR_HASH: usize = 307;

/// 默认缓冲块数量
pub const DEFAULT_NR_BUFFERS: usize = 256;

/// 一页包含的块数（`bread_page` 一次读取的块数）
pub const PAGE_BLOCKS: usize = 4;

/// 字节级读写时，在当前块之后预读的块数
pub const READ_AHEAD_WINDOW: u32 = 2;

//=============================================================================
// Superblock / 位图
//=============================================================================

/// MINIX v1 文件系统魔数
pub const SUPER_MAGIC: u16 = 0x137F;

/// 超级块所在块号（块 0 为引导块）
pub const SUPER_BLOCK_NR: u32 = 1;

/// 第一个位图块的块号
pub const FIRST_MAP_BLOCK: u32 = 2;

/// 最多同时挂载的文件系统数
pub const NR_SUPER: usize = 8;

/// inode 位图最多占用的块数
pub const I_MAP_SLOTS: usize = 8;

/// 逻辑块（zone）位图最多占用的块数
pub const Z_MAP_SLOTS: usize = 8;

/// 每个位图块包含的位数
pub const BITS_PER_BLOCK: u32 = (BLOCK_SIZE * 8) as u32;
