//! 逻辑块和 inode 的分配与释放
//!
//! 对应 `bitmap.c`。位图缓冲块在挂载期间常驻缓存，分配只改缓存中的位图
//! 并置脏，由 `sync` 写回。
//!
//! 逻辑块位图的第 0 位保留，第 `n` 位对应块 `firstdatazone + n - 1`。
//! inode 位图的第 `n` 位直接对应 inode `n`。

use super::ops::{clear_bit, count_zeros, find_first_zero, set_bit};
use crate::cache::BufferCache;
use crate::consts::BITS_PER_BLOCK;
use crate::error::{Error, ErrorKind, Result};
use crate::superblock::Superblock;
use crate::types::{BlockNo, BufferId};

/// 在一组位图块中找到并置位第一个空闲位
///
/// `total` 是有效位数，之后的位不参与分配。返回全局位号。
fn claim_first_zero(cache: &BufferCache, maps: &[BufferId], total: u32) -> Option<u32> {
    for (i, &map) in maps.iter().enumerate() {
        let base = i as u32 * BITS_PER_BLOCK;
        if base >= total {
            break;
        }
        let limit = (total - base).min(BITS_PER_BLOCK);

        // 查找和置位在同一次数据锁内完成
        let found = cache.with_data_mut(map, |data| {
            let bit = find_first_zero(data, limit)?;
            if set_bit(data, bit).unwrap_or(true) {
                panic!("bitmap bit {} already set", base + bit);
            }
            Some(bit)
        });
        if let Some(bit) = found {
            cache.mark_dirty(map);
            return Some(base + bit);
        }
    }
    None
}

/// 清除全局位号 `bit`，返回清除前的值
fn release_bit(cache: &BufferCache, maps: &[BufferId], bit: u32) -> bool {
    let map = maps[(bit / BITS_PER_BLOCK) as usize];
    let was_set = cache.with_data_mut(map, |data| {
        clear_bit(data, bit % BITS_PER_BLOCK).unwrap_or(false)
    });
    cache.mark_dirty(map);
    was_set
}

fn count_free(cache: &BufferCache, maps: &[BufferId], total: u32) -> u32 {
    maps.iter()
        .enumerate()
        .map(|(i, &map)| {
            let base = i as u32 * BITS_PER_BLOCK;
            let limit = total.saturating_sub(base).min(BITS_PER_BLOCK);
            cache.with_data(map, |data| count_zeros(data, limit))
        })
        .sum()
}

/// 逻辑块位图中有效的位数（含保留的第 0 位）
fn zone_bits(sb: &Superblock) -> u32 {
    sb.nzones() - sb.firstdatazone() + 1
}

/// 分配一个数据块
///
/// 块内容清零，标记为有效且脏。
///
/// # 返回
///
/// 新块的块号；没有空闲块时返回 `NoSpace`
pub fn new_block(cache: &BufferCache, sb: &Superblock) -> Result<BlockNo> {
    let Some(bit) = claim_first_zero(cache, sb.zmap(), zone_bits(sb)) else {
        return Err(Error::new(ErrorKind::NoSpace, "no free data zone"));
    };
    let block = bit + sb.firstdatazone() - 1;

    let id = cache.getblk(sb.dev(), block);
    if cache.ref_count(id) != 1 {
        panic!("new_block: count is != 1");
    }
    cache.zero_fill(id);
    cache.brelse(id);

    log::trace!("[BITMAP] {}: new block {}", sb.dev(), block);
    Ok(block)
}

/// 释放一个数据块
///
/// 块还被别人引用时不释放，返回 `Ok(false)`。缓存中的拷贝被丢弃，不会写回。
///
/// # Panics
///
/// 块号不在数据区时 panic。
pub fn free_block(cache: &BufferCache, sb: &Superblock, block: BlockNo) -> Result<bool> {
    if block < sb.firstdatazone() || block >= sb.nzones() {
        panic!("trying to free block not in datazone");
    }

    if let Some(id) = cache.get_hash_table(sb.dev(), block) {
        let discarded = cache.discard(id);
        cache.brelse(id);
        if !discarded {
            log::debug!("[BITMAP] {}: block {} still in use", sb.dev(), block);
            return Ok(false);
        }
    }

    let bit = block - (sb.firstdatazone() - 1);
    if !release_bit(cache, sb.zmap(), bit) {
        log::warn!(
            "[BITMAP] block ({}:{}) free_block: bit already cleared",
            sb.dev(),
            block
        );
    }
    Ok(true)
}

/// 分配一个 inode 号
///
/// # 返回
///
/// 新的 inode 号（从 1 开始）；没有空闲 inode 时返回 `NoSpace`
pub fn new_inode(cache: &BufferCache, sb: &Superblock) -> Result<u32> {
    claim_first_zero(cache, sb.imap(), sb.ninodes() + 1)
        .ok_or(Error::new(ErrorKind::NoSpace, "no free inode"))
}

/// 释放一个 inode 号
///
/// # Panics
///
/// inode 0 或超出范围的 inode 号 panic。
pub fn free_inode(cache: &BufferCache, sb: &Superblock, ino: u32) {
    if ino < 1 || ino > sb.ninodes() {
        panic!("trying to free inode 0 or nonexistant inode");
    }
    if !release_bit(cache, sb.imap(), ino) {
        log::warn!("[BITMAP] {}: free_inode: bit {} already cleared", sb.dev(), ino);
    }
}

/// 空闲数据块数
pub fn count_free_blocks(cache: &BufferCache, sb: &Superblock) -> u32 {
    count_free(cache, sb.zmap(), zone_bits(sb))
}

/// 空闲 inode 数
pub fn count_free_inodes(cache: &BufferCache, sb: &Superblock) -> u32 {
    count_free(cache, sb.imap(), sb.ninodes() + 1)
}
