//! 环形空闲链表
//!
//! 所有缓冲块无论是否被引用，都恰好在这条环形双向链表上占一个位置。
//! `head` 是扫描起点，`head` 的前驱是表尾；新认领的缓冲块被移到表尾，
//! 所以从表头开始扫描时最先遇到的是最久没有被认领过的缓冲块。

use crate::types::BufferId;

use super::buffer::{BufferHead, Link};

pub(crate) struct FreeList {
    head: Option<BufferId>,
    len: usize,
}

impl FreeList {
    /// 把全部描述符按下标顺序串成环
    pub fn init(heads: &mut [BufferHead]) -> Self {
        let n = heads.len();
        for (i, head) in heads.iter_mut().enumerate() {
            head.free = Link {
                prev: Some(BufferId((i + n - 1) % n)),
                next: Some(BufferId((i + 1) % n)),
            };
        }
        Self {
            head: if n == 0 { None } else { Some(BufferId(0)) },
            len: n,
        }
    }

    pub fn head(&self) -> Option<BufferId> {
        self.head
    }

    pub fn len(&self) -> usize {
        self.len
    }

    /// 从环上摘除
    ///
    /// # Panics
    ///
    /// 前驱或后继缺失时说明链表已损坏。
    pub fn remove(&mut self, heads: &mut [BufferHead], id: BufferId) {
        let Link { prev, next } = heads[id.0].free;
        let (Some(prev), Some(next)) = (prev, next) else {
            panic!("Free block list corrupted");
        };

        if next == id {
            // 环上只剩它自己
            self.head = None;
        } else {
            heads[prev.0].free.next = Some(next);
            heads[next.0].free.prev = Some(prev);
            if self.head == Some(id) {
                self.head = Some(next);
            }
        }
        heads[id.0].free = Link::default();
        self.len -= 1;
    }

    /// 插入到表尾（表头之前）
    pub fn push_back(&mut self, heads: &mut [BufferHead], id: BufferId) {
        match self.head {
            None => {
                heads[id.0].free = Link {
                    prev: Some(id),
                    next: Some(id),
                };
                self.head = Some(id);
            }
            Some(head) => {
                let tail = heads[head.0]
                    .free
                    .prev
                    .unwrap_or_else(|| panic!("Free block list corrupted"));
                heads[id.0].free = Link {
                    prev: Some(tail),
                    next: Some(head),
                };
                heads[tail.0].free.next = Some(id);
                heads[head.0].free.prev = Some(id);
            }
        }
        self.len += 1;
    }

    /// 从表头开始绕环一圈
    pub fn iter<'a>(&self, heads: &'a [BufferHead]) -> FreeIter<'a> {
        FreeIter {
            heads,
            cursor: self.head,
            remaining: self.len,
        }
    }
}

pub(crate) struct FreeIter<'a> {
    heads: &'a [BufferHead],
    cursor: Option<BufferId>,
    remaining: usize,
}

impl Iterator for FreeIter<'_> {
    type Item = BufferId;

    fn next(&mut self) -> Option<BufferId> {
        if self.remaining == 0 {
            return None;
        }
        let id = self.cursor?;
        self.remaining -= 1;
        self.cursor = self.heads[id.0].free.next;
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(n: usize) -> (Vec<BufferHead>, FreeList) {
        let mut heads: Vec<BufferHead> = (0..n).map(|_| BufferHead::new()).collect();
        let list = FreeList::init(&mut heads);
        (heads, list)
    }

    fn order(list: &FreeList, heads: &[BufferHead]) -> Vec<usize> {
        list.iter(heads).map(|id| id.0).collect()
    }

    #[test]
    fn test_init_ring() {
        let (heads, list) = ring(4);
        assert_eq!(list.len(), 4);
        assert_eq!(order(&list, &heads), vec![0, 1, 2, 3]);
        assert_eq!(heads[0].free.prev, Some(BufferId(3)));
        assert_eq!(heads[3].free.next, Some(BufferId(0)));
    }

    #[test]
    fn test_move_to_tail() {
        let (mut heads, mut list) = ring(4);

        list.remove(&mut heads, BufferId(0));
        assert_eq!(list.head(), Some(BufferId(1)));
        list.push_back(&mut heads, BufferId(0));
        assert_eq!(order(&list, &heads), vec![1, 2, 3, 0]);

        list.remove(&mut heads, BufferId(2));
        list.push_back(&mut heads, BufferId(2));
        assert_eq!(order(&list, &heads), vec![1, 3, 0, 2]);
        assert_eq!(list.len(), 4);
    }

    #[test]
    fn test_single_element() {
        let (mut heads, mut list) = ring(1);
        assert_eq!(heads[0].free.next, Some(BufferId(0)));

        list.remove(&mut heads, BufferId(0));
        assert_eq!(list.head(), None);
        assert_eq!(list.iter(&heads).count(), 0);

        list.push_back(&mut heads, BufferId(0));
        assert_eq!(order(&list, &heads), vec![0]);
    }

    #[test]
    #[should_panic(expected = "Free block list corrupted")]
    fn test_remove_unlinked_panics() {
        let (mut heads, mut list) = ring(2);
        list.remove(&mut heads, BufferId(1));
        list.remove(&mut heads, BufferId(1));
    }
}
