//! 位图操作
//!
//! 位 `i` 存放在第 `i / 8` 字节的第 `i % 8` 位（小端位序），与磁盘上
//! inode 位图、逻辑块位图的格式一致。

use crate::error::{Error, ErrorKind, Result};

fn locate(bitmap: &[u8], index: u32) -> Result<(usize, u8)> {
    let byte_index = (index / 8) as usize;
    if byte_index >= bitmap.len() {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            "Bitmap index out of range",
        ));
    }
    Ok((byte_index, 1 << (index % 8)))
}

/// 测试位图中某一位是否被设置
///
/// 超出位图范围的位视为未设置。
pub fn test_bit(bitmap: &[u8], index: u32) -> bool {
    match locate(bitmap, index) {
        Ok((byte, mask)) => bitmap[byte] & mask != 0,
        Err(_) => false,
    }
}

/// 设置位图中的某一位
///
/// # 返回
///
/// 设置前该位的值；索引超出范围返回错误
pub fn set_bit(bitmap: &mut [u8], index: u32) -> Result<bool> {
    let (byte, mask) = locate(bitmap, index)?;
    let old = bitmap[byte] & mask != 0;
    bitmap[byte] |= mask;
    Ok(old)
}

/// 清除位图中的某一位
///
/// # 返回
///
/// 清除前该位的值；索引超出范围返回错误
pub fn clear_bit(bitmap: &mut [u8], index: u32) -> Result<bool> {
    let (byte, mask) = locate(bitmap, index)?;
    let old = bitmap[byte] & mask != 0;
    bitmap[byte] &= !mask;
    Ok(old)
}

/// 在 `[0, limit)` 中查找第一个为 0 的位
///
/// 整字节全为 1 时跳过该字节。
///
/// # 参数
///
/// * `bitmap` - 位图数据
/// * `limit` - 搜索上限（不包含），超过位图长度时按位图长度截断
pub fn find_first_zero(bitmap: &[u8], limit: u32) -> Option<u32> {
    let limit = limit.min((bitmap.len() * 8) as u32);
    let mut index = 0;

    while index < limit {
        let byte = bitmap[(index / 8) as usize];
        if index % 8 == 0 && byte == 0xFF {
            index += 8;
            continue;
        }
        if byte & (1 << (index % 8)) == 0 {
            return Some(index);
        }
        index += 1;
    }
    None
}

/// 统计 `[0, limit)` 中被设置的位数
pub fn count_ones(bitmap: &[u8], limit: u32) -> u32 {
    let limit = limit.min((bitmap.len() * 8) as u32);
    let full = (limit / 8) as usize;
    let whole: u32 = bitmap[..full].iter().map(|b| b.count_ones()).sum();
    let tail = (full as u32 * 8..limit).filter(|&i| test_bit(bitmap, i)).count() as u32;
    whole + tail
}

/// 统计 `[0, limit)` 中为 0 的位数
pub fn count_zeros(bitmap: &[u8], limit: u32) -> u32 {
    let limit = limit.min((bitmap.len() * 8) as u32);
    limit - count_ones(bitmap, limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_operations() {
        let mut bitmap = [0u8; 4];

        assert!(!test_bit(&bitmap, 0));
        assert!(!set_bit(&mut bitmap, 0).unwrap());
        assert!(test_bit(&bitmap, 0));
        assert!(set_bit(&mut bitmap, 0).unwrap());

        set_bit(&mut bitmap, 15).unwrap();
        assert_eq!(bitmap[1], 0x80);

        assert!(clear_bit(&mut bitmap, 0).unwrap());
        assert!(!clear_bit(&mut bitmap, 0).unwrap());
        assert!(test_bit(&bitmap, 15));
    }

    #[test]
    fn test_find_first_zero() {
        let mut bitmap = [0xFFu8; 4];
        assert_eq!(find_first_zero(&bitmap, 32), None);

        clear_bit(&mut bitmap, 21).unwrap();
        assert_eq!(find_first_zero(&bitmap, 32), Some(21));
        // 上限之外的空闲位不算
        assert_eq!(find_first_zero(&bitmap, 21), None);

        clear_bit(&mut bitmap, 5).unwrap();
        assert_eq!(find_first_zero(&bitmap, 32), Some(5));
    }

    #[test]
    fn test_count_ones_zeros() {
        let mut bitmap = [0u8; 4];
        assert_eq!(count_zeros(&bitmap, 32), 32);

        set_bit(&mut bitmap, 0).unwrap();
        set_bit(&mut bitmap, 5).unwrap();
        set_bit(&mut bitmap, 10).unwrap();
        set_bit(&mut bitmap, 20).unwrap();

        assert_eq!(count_ones(&bitmap, 32), 4);
        assert_eq!(count_ones(&bitmap, 11), 3);
        assert_eq!(count_zeros(&bitmap, 11), 8);
    }

    #[test]
    fn test_out_of_range() {
        let mut bitmap = [0u8; 4];

        assert!(set_bit(&mut bitmap, 32).is_err());
        assert!(clear_bit(&mut bitmap, 32).is_err());
        assert!(!test_bit(&bitmap, 32));
        assert_eq!(find_first_zero(&bitmap, 100), Some(0));
        assert_eq!(count_zeros(&bitmap, 100), 32);
    }
}
