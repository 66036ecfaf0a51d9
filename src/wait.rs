//! 等待队列
//!
//! 对应调度器的 `sleep_on` / `wake_up` 原语。
//!
//! 整个缓冲区缓存只有一把状态锁，持有它就相当于“正在运行”。
//! 睡眠时通过 [`Condvar`] 原子地放开状态锁并挂起，被唤醒后重新拿到锁，
//! 所以任何一次睡眠之后，调用者都必须重新检查自己等待的条件：
//!
//! ```rust,ignore
//! while state.heads[id].is_locked() {
//!     queue.sleep_on(&mut state);
//! }
//! ```
//!
//! 这里只提供不可中断的睡眠，缓冲块上的 I/O 一旦开始就不能放弃。

use core::sync::atomic::{AtomicUsize, Ordering};
use parking_lot::{Condvar, MutexGuard};

/// 等待队列
pub struct WaitQueue {
    name: &'static str,
    cond: Condvar,
    sleepers: AtomicUsize,
}

impl WaitQueue {
    /// 创建新的等待队列
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            cond: Condvar::new(),
            sleepers: AtomicUsize::new(0),
        }
    }

    /// 在队列上睡眠，直到被 [`wake_up`](Self::wake_up) 唤醒
    ///
    /// 睡眠期间 `guard` 对应的锁被放开，返回时已重新持有。
    /// 可能出现虚假唤醒，调用者必须在循环中重新检查条件。
    pub fn sleep_on<T>(&self, guard: &mut MutexGuard<'_, T>) {
        self.sleepers.fetch_add(1, Ordering::SeqCst);
        log::trace!("[WAIT] sleep on {}", self.name);
        self.cond.wait(guard);
        self.sleepers.fetch_sub(1, Ordering::SeqCst);
    }

    /// 唤醒队列上的所有睡眠者
    pub fn wake_up(&self) {
        if self.sleepers.load(Ordering::SeqCst) > 0 {
            log::trace!("[WAIT] wake up {}", self.name);
        }
        self.cond.notify_all();
    }

    /// 当前在队列上睡眠的上下文数量
    pub fn sleepers(&self) -> usize {
        self.sleepers.load(Ordering::SeqCst)
    }

    /// 队列名称
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl core::fmt::Debug for WaitQueue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WaitQueue")
            .field("name", &self.name)
            .field("sleepers", &self.sleepers())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_sleep_until_condition() {
        let shared = Arc::new((Mutex::new(false), WaitQueue::new("flag")));

        let waiter = {
            let shared = shared.clone();
            thread::spawn(move || {
                let (lock, queue) = &*shared;
                let mut ready = lock.lock();
                while !*ready {
                    queue.sleep_on(&mut ready);
                }
            })
        };

        // 等到对方真正睡下再改条件
        while shared.1.sleepers() == 0 {
            thread::yield_now();
        }
        *shared.0.lock() = true;
        shared.1.wake_up();

        waiter.join().unwrap();
        assert_eq!(shared.1.sleepers(), 0);
    }

    #[test]
    fn test_wake_up_without_sleepers() {
        let queue = WaitQueue::new("empty");
        queue.wake_up();
        assert_eq!(queue.sleepers(), 0);
        assert_eq!(queue.name(), "empty");
    }
}
