//! Superblock 读取和验证

use crate::{
    cache::BufferCache,
    consts::*,
    error::{Error, ErrorKind, Result},
    types::{BlockNo, BufferId, DevId},
};
use byteorder::{ByteOrder, LittleEndian};

/// 磁盘上的 superblock
///
/// 位于块 1 开头，全部字段小端存放。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskSuperblock {
    /// inode 总数
    pub ninodes: u16,
    /// 逻辑块总数（含引导块、superblock、位图和 inode 表）
    pub nzones: u16,
    /// inode 位图占用的块数
    pub imap_blocks: u16,
    /// 逻辑块位图占用的块数
    pub zmap_blocks: u16,
    /// 第一个数据块的块号
    pub firstdatazone: u16,
    /// log2(逻辑块大小 / 块大小)
    pub log_zone_size: u16,
    /// 文件最大长度
    pub max_size: u32,
    /// 魔数
    pub magic: u16,
}

impl DiskSuperblock {
    /// 磁盘上的字节数
    pub const SIZE: usize = 18;

    /// 从块数据解析
    ///
    /// # 参数
    ///
    /// * `buf` - 块 1 的数据，长度至少为 [`SIZE`](Self::SIZE)
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() < Self::SIZE {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "buffer too small for superblock",
            ));
        }

        Ok(Self {
            ninodes: LittleEndian::read_u16(&buf[0..2]),
            nzones: LittleEndian::read_u16(&buf[2..4]),
            imap_blocks: LittleEndian::read_u16(&buf[4..6]),
            zmap_blocks: LittleEndian::read_u16(&buf[6..8]),
            firstdatazone: LittleEndian::read_u16(&buf[8..10]),
            log_zone_size: LittleEndian::read_u16(&buf[10..12]),
            max_size: LittleEndian::read_u32(&buf[12..16]),
            magic: LittleEndian::read_u16(&buf[16..18]),
        })
    }

    /// 魔数是否正确
    pub fn is_valid(&self) -> bool {
        self.magic == SUPER_MAGIC
    }

    /// 检查魔数和布局
    pub fn validate(&self) -> Result<()> {
        if !self.is_valid() {
            return Err(Error::new(ErrorKind::Corrupted, "bad superblock magic"));
        }
        if self.imap_blocks == 0 || self.imap_blocks as usize > I_MAP_SLOTS {
            return Err(Error::new(ErrorKind::Corrupted, "bad inode map size"));
        }
        if self.zmap_blocks == 0 || self.zmap_blocks as usize > Z_MAP_SLOTS {
            return Err(Error::new(ErrorKind::Corrupted, "bad zone map size"));
        }
        if (self.firstdatazone as u32) < self.first_inode_table_block() {
            return Err(Error::new(ErrorKind::Corrupted, "data zone overlaps bitmaps"));
        }
        if self.nzones <= self.firstdatazone {
            return Err(Error::new(ErrorKind::Corrupted, "no data zone"));
        }
        // 位图要能容纳全部可分配的位，外加保留的第 0 位
        let zone_bits = (self.nzones - self.firstdatazone) as u32 + 1;
        if zone_bits > self.zmap_blocks as u32 * BITS_PER_BLOCK {
            return Err(Error::new(ErrorKind::Corrupted, "zone map too small"));
        }
        if self.ninodes as u32 + 1 > self.imap_blocks as u32 * BITS_PER_BLOCK {
            return Err(Error::new(ErrorKind::Corrupted, "inode map too small"));
        }
        Ok(())
    }

    /// inode 表的起始块号（紧跟在两组位图之后）
    pub fn first_inode_table_block(&self) -> BlockNo {
        FIRST_MAP_BLOCK + self.imap_blocks as u32 + self.zmap_blocks as u32
    }
}

/// 已挂载设备的 superblock
///
/// 持有全部位图缓冲块的引用。位图数据只能通过缓存访问。
#[derive(Debug)]
pub struct Superblock {
    dev: DevId,
    disk: DiskSuperblock,
    imap: Vec<BufferId>,
    zmap: Vec<BufferId>,
}

impl Superblock {
    /// 读取并验证 superblock，读入全部位图
    ///
    /// 任何一步失败都会释放已经读入的位图，不留下引用。
    pub fn load(cache: &BufferCache, dev: DevId) -> Result<Self> {
        let id = cache.bread(dev, SUPER_BLOCK_NR)?;
        let parsed = cache.with_data(id, DiskSuperblock::parse);
        cache.brelse(id);

        let disk = parsed?;
        disk.validate()?;

        let nr_maps = (disk.imap_blocks + disk.zmap_blocks) as usize;
        let mut maps = Vec::with_capacity(nr_maps);
        for block in FIRST_MAP_BLOCK..FIRST_MAP_BLOCK + nr_maps as u32 {
            match cache.bread(dev, block) {
                Ok(id) => maps.push(id),
                Err(err) => {
                    log::error!("[SUPER] {}: cannot read bitmap block {}", dev, block);
                    for id in maps {
                        cache.brelse(id);
                    }
                    return Err(err);
                }
            }
        }
        let zmap = maps.split_off(disk.imap_blocks as usize);
        let imap = maps;

        // inode 0 和逻辑块 0 都不可分配
        cache.with_data_mut(imap[0], |data| data[0] |= 1);
        cache.with_data_mut(zmap[0], |data| data[0] |= 1);

        log::info!(
            "[SUPER] {}: {} inodes, {} zones, first data zone {}",
            dev,
            disk.ninodes,
            disk.nzones,
            disk.firstdatazone
        );
        Ok(Self {
            dev,
            disk,
            imap,
            zmap,
        })
    }

    /// 释放全部位图缓冲块
    pub(crate) fn release(&self, cache: &BufferCache) {
        for &id in self.imap.iter().chain(self.zmap.iter()) {
            cache.brelse(id);
        }
    }

    /// 设备号
    pub fn dev(&self) -> DevId {
        self.dev
    }

    /// 磁盘上的字段
    pub fn disk(&self) -> &DiskSuperblock {
        &self.disk
    }

    /// inode 总数
    pub fn ninodes(&self) -> u32 {
        self.disk.ninodes as u32
    }

    /// 逻辑块总数
    pub fn nzones(&self) -> u32 {
        self.disk.nzones as u32
    }

    /// 第一个数据块
    pub fn firstdatazone(&self) -> BlockNo {
        self.disk.firstdatazone as BlockNo
    }

    /// inode 位图缓冲块
    pub fn imap(&self) -> &[BufferId] {
        &self.imap
    }

    /// 逻辑块位图缓冲块
    pub fn zmap(&self) -> &[BufferId] {
        &self.zmap
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{formatted, sample_superblock, DEV};

    #[test]
    fn test_parse_fields() {
        let disk = sample_superblock(64, 200);
        let mut buf = [0u8; BLOCK_SIZE];
        disk.encode(&mut buf).unwrap();

        let parsed = DiskSuperblock::parse(&buf).unwrap();
        assert_eq!(parsed, disk);
        assert!(parsed.is_valid());
        assert_eq!(LittleEndian::read_u16(&buf[16..18]), SUPER_MAGIC);
        assert_eq!(parsed.first_inode_table_block(), 4);
    }

    #[test]
    fn test_parse_short_buffer() {
        let err = DiskSuperblock::parse(&[0u8; 10]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_validate_rejects_bad_layout() {
        let mut disk = sample_superblock(64, 200);
        disk.magic = 0xEF53;
        assert_eq!(disk.validate().unwrap_err().kind(), ErrorKind::Corrupted);

        let mut disk = sample_superblock(64, 200);
        disk.zmap_blocks = (Z_MAP_SLOTS + 1) as u16;
        assert!(disk.validate().is_err());

        let mut disk = sample_superblock(64, 200);
        disk.firstdatazone = 3;
        assert!(disk.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_undersized_bitmaps() {
        // 一个逻辑块位图块只能覆盖 8191 个数据块
        let disk = sample_superblock(64, 30000);
        assert_eq!(disk.validate().unwrap_err().kind(), ErrorKind::Corrupted);

        let mut disk = sample_superblock(64, 30000);
        disk.zmap_blocks = 4;
        disk.firstdatazone += 3;
        assert!(disk.validate().is_ok());

        let mut disk = sample_superblock(9000, 1000);
        assert_eq!(disk.validate().unwrap_err().kind(), ErrorKind::Corrupted);
        disk.imap_blocks = 2;
        disk.firstdatazone += 1;
        assert!(disk.validate().is_ok());

        // 恰好填满一个位图块
        let disk = sample_superblock(8191, 2000);
        assert!(disk.validate().is_ok());
    }

    #[test]
    fn test_load_rejects_undersized_zone_map() {
        let (cache, mem) = formatted(64, 200);
        let mut block = [0u8; BLOCK_SIZE];
        let mut disk = sample_superblock(64, 200);
        disk.nzones = 30000;
        disk.encode(&mut block).unwrap();
        mem.poke(SUPER_BLOCK_NR, &block);

        let err = Superblock::load(&cache, DEV).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Corrupted);
        assert_eq!(cache.free_count(), cache.nr_buffers());
    }

    #[test]
    fn test_load_pins_bitmaps() {
        let (cache, _mem) = formatted(64, 200);
        let sb = Superblock::load(&cache, DEV).unwrap();

        assert_eq!(sb.imap().len(), 1);
        assert_eq!(sb.zmap().len(), 1);
        assert_eq!(cache.ref_count(sb.imap()[0]), 1);
        assert_eq!(cache.key(sb.zmap()[0]), Some((DEV, 3)));
        assert_eq!(cache.free_count(), cache.nr_buffers() - 2);
        cache.with_data(sb.zmap()[0], |data| assert_eq!(data[0] & 1, 1));

        sb.release(&cache);
        assert_eq!(cache.free_count(), cache.nr_buffers());
    }
}
