//! 哈希索引
//!
//! (设备, 块号) → 缓冲块，冲突时链式挂接。链接保存在描述符自身的
//! `hash` 字段中，桶里只存链头。

use crate::types::{BlockNo, BufferId, DevId};

use super::buffer::{BufferHead, Link};

pub(crate) struct HashIndex {
    buckets: Vec<Option<BufferId>>,
}

impl HashIndex {
    /// 创建 `nr_hash` 个桶的哈希表
    pub fn new(nr_hash: usize) -> Self {
        Self {
            buckets: vec![None; nr_hash],
        }
    }

    /// 桶下标：设备号与块号异或后对桶数取模
    pub fn bucket(&self, dev: DevId, block: BlockNo) -> usize {
        ((dev.raw() as u32) ^ block) as usize % self.buckets.len()
    }

    /// 插入到所属桶的链头
    ///
    /// 未分配设备的缓冲块不入链。
    ///
    /// # Panics
    ///
    /// 缓冲块已经在链上时 panic。
    pub fn insert(&mut self, heads: &mut [BufferHead], id: BufferId) {
        let head = &heads[id.0];
        if head.hashed {
            panic!("buffer {} already in hash queue", id.0);
        }
        let Some(dev) = head.dev else {
            heads[id.0].hash = Link::default();
            return;
        };

        let bucket = self.bucket(dev, head.block);
        let next = self.buckets[bucket];
        heads[id.0].hash = Link { prev: None, next };
        heads[id.0].hashed = true;
        // 空桶时链头为 None，不能回写前驱
        if let Some(next) = next {
            heads[next.0].hash.prev = Some(id);
        }
        self.buckets[bucket] = Some(id);
    }

    /// 从哈希链上摘除
    ///
    /// 必须在修改缓冲块的 (设备, 块号) 之前调用，桶下标按旧键计算。
    pub fn remove(&mut self, heads: &mut [BufferHead], id: BufferId) {
        if !heads[id.0].hashed {
            return;
        }
        let Link { prev, next } = heads[id.0].hash;

        if let Some(next) = next {
            heads[next.0].hash.prev = prev;
        }
        match prev {
            Some(prev) => heads[prev.0].hash.next = next,
            None => {
                let head = &heads[id.0];
                let dev = head
                    .dev
                    .unwrap_or_else(|| panic!("hashed buffer {} has no device", id.0));
                let bucket = self.bucket(dev, head.block);
                if self.buckets[bucket] != Some(id) {
                    panic!("hash chain corrupted at bucket {}", bucket);
                }
                self.buckets[bucket] = next;
            }
        }

        heads[id.0].hash = Link::default();
        heads[id.0].hashed = false;
    }

    /// 查找 (设备, 块号) 对应的缓冲块
    pub fn find(&self, heads: &[BufferHead], dev: DevId, block: BlockNo) -> Option<BufferId> {
        let mut cursor = self.buckets[self.bucket(dev, block)];
        while let Some(id) = cursor {
            let head = &heads[id.0];
            if head.matches(dev, block) {
                return Some(id);
            }
            cursor = head.hash.next;
        }
        None
    }

    /// 某个桶的链长
    pub fn chain_len(&self, heads: &[BufferHead], bucket: usize) -> usize {
        let mut len = 0;
        let mut cursor = self.buckets[bucket];
        while let Some(id) = cursor {
            len += 1;
            cursor = heads[id.0].hash.next;
        }
        len
    }

    /// 桶数
    pub fn len(&self) -> usize {
        self.buckets.len()
    }
}
