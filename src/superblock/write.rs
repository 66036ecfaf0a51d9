//! Superblock 写入

use super::DiskSuperblock;
use crate::error::{Error, ErrorKind, Result};
use byteorder::{ByteOrder, LittleEndian};

impl DiskSuperblock {
    /// 按磁盘格式写入 `buf` 开头
    ///
    /// `buf` 中 [`SIZE`](Self::SIZE) 之后的字节保持不变。
    pub fn encode(&self, buf: &mut [u8]) -> Result<()> {
        if buf.len() < Self::SIZE {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "buffer too small for superblock",
            ));
        }

        LittleEndian::write_u16(&mut buf[0..2], self.ninodes);
        LittleEndian::write_u16(&mut buf[2..4], self.nzones);
        LittleEndian::write_u16(&mut buf[4..6], self.imap_blocks);
        LittleEndian::write_u16(&mut buf[6..8], self.zmap_blocks);
        LittleEndian::write_u16(&mut buf[8..10], self.firstdatazone);
        LittleEndian::write_u16(&mut buf[10..12], self.log_zone_size);
        LittleEndian::write_u32(&mut buf[12..16], self.max_size);
        LittleEndian::write_u16(&mut buf[16..18], self.magic);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_superblock;

    #[test]
    fn test_encode_keeps_tail() {
        let mut buf = [0xAAu8; 32];
        sample_superblock(32, 100).encode(&mut buf).unwrap();
        assert_eq!(LittleEndian::read_u16(&buf[0..2]), 32);
        assert_eq!(LittleEndian::read_u16(&buf[2..4]), 100);
        assert!(buf[DiskSuperblock::SIZE..].iter().all(|&b| b == 0xAA));
    }

    #[test]
    fn test_encode_short_buffer() {
        let mut buf = [0u8; 4];
        assert!(sample_superblock(32, 100).encode(&mut buf).is_err());
    }
}
