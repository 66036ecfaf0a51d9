//! 缓冲区缓存管理器
//!
//! 对应 `buffer.c` 的 `getblk` / `bread` / `breada` / `bread_page` / `brelse`。
//!
//! # 并发模型
//!
//! 哈希表、空闲链表和全部描述符由一把状态锁保护。持有状态锁就是“正在运行”，
//! 放开状态锁的地方只有下面几个挂起点：
//!
//! - 等待某个缓冲块解锁（`wait_on_buffer`）
//! - 等待任意缓冲块空闲（`buffer_wait`）
//! - 提交 I/O 请求（提交期间放开状态锁，同步队列会在提交中直接完成请求）
//!
//! 每个挂起点醒来之后，之前观察到的全局状态都可能已经失效，必须重新检查。
//! `getblk` 中反复出现的“重新检查引用计数 / 重新查找哈希表”就是这个原因。

use crate::block::{DeviceTable, Direction, IoRequest, RequestQueue, SyncQueue, WorkerQueue};
use crate::config::{CacheConfig, IoMode};
use crate::consts::{BLOCK_SIZE, PAGE_BLOCKS};
use crate::error::{Error, ErrorKind, Result};
use crate::types::{BlockNo, BufferId, DevId};
use crate::wait::WaitQueue;
use parking_lot::{Mutex, MutexGuard, RwLock};
use std::sync::Arc;

use super::buffer::{BufferFlags, BufferHead};
use super::free_list::FreeList;
use super::hash::HashIndex;
use super::sync::MetadataSync;

/// 缓存统计信息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// `getblk` 在哈希表中命中的次数
    pub hits: u64,
    /// `getblk` 认领新缓冲块的次数
    pub misses: u64,
    /// 认领时挪用了原本属于别的块的缓冲块的次数
    pub reclaims: u64,
    /// 驱逐前同步写回脏块的次数
    pub writebacks: u64,
    /// 提交的读请求数（含预读）
    pub reads_issued: u64,
    /// 提交的写请求数
    pub writes_issued: u64,
    /// 完成时报告失败的请求数
    pub io_errors: u64,
    /// 因没有空闲缓冲块而睡眠的次数
    pub buffer_waits: u64,
    /// 因缓冲块上锁而睡眠的次数
    pub lock_waits: u64,
}

impl CacheStats {
    /// 计算命中率
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

pub(crate) struct CacheState {
    pub heads: Vec<BufferHead>,
    pub hash: HashIndex,
    pub free: FreeList,
    pub stats: CacheStats,
}

pub(crate) type StateGuard<'a> = MutexGuard<'a, CacheState>;

/// 缓存与 I/O 完成路径共享的部分
pub(crate) struct Shared {
    pub(crate) state: Mutex<CacheState>,
    payloads: Box<[Mutex<Box<[u8]>>]>,
    pub(crate) buffer_wait: WaitQueue,
    lock_waits: Box<[WaitQueue]>,
}

impl Shared {
    fn new(config: &CacheConfig) -> Self {
        let n = config.nr_buffers;
        let mut heads: Vec<BufferHead> = (0..n).map(|_| BufferHead::new()).collect();
        let free = FreeList::init(&mut heads);

        Self {
            state: Mutex::new(CacheState {
                heads,
                hash: HashIndex::new(config.nr_hash),
                free,
                stats: CacheStats::default(),
            }),
            payloads: (0..n)
                .map(|_| Mutex::new(vec![0u8; BLOCK_SIZE].into_boxed_slice()))
                .collect(),
            buffer_wait: WaitQueue::new("buffer_wait"),
            lock_waits: (0..n).map(|_| WaitQueue::new("b_wait")).collect(),
        }
    }

    pub(crate) fn payload(&self, id: BufferId) -> &Mutex<Box<[u8]>> {
        &self.payloads[id.0]
    }

    /// 等待缓冲块解锁
    pub(crate) fn wait_on_buffer(&self, st: &mut StateGuard<'_>, id: BufferId) {
        while st.heads[id.0].is_locked() {
            st.stats.lock_waits += 1;
            self.lock_waits[id.0].sleep_on(st);
        }
    }

    /// I/O 完成
    ///
    /// 完成路径只改动锁定位、有效位和脏位，然后唤醒该缓冲块的等待队列。
    /// 写请求上锁期间没有人能修改数据，清除脏位不会丢掉修改。
    pub(crate) fn end_request(&self, id: BufferId, dir: Direction, result: Result<()>) {
        let mut st = self.state.lock();
        let CacheState { heads, stats, .. } = &mut *st;
        let head = &mut heads[id.0];

        if dir.is_write() {
            head.flags.remove(BufferFlags::DIRTY);
        }
        match result {
            Ok(()) => head.flags.insert(BufferFlags::UPTODATE),
            Err(err) => {
                stats.io_errors += 1;
                head.flags.remove(BufferFlags::UPTODATE);
                log::error!(
                    "[BCACHE] I/O error, dev {:?} block {} ({:?}): {}",
                    head.dev,
                    head.block,
                    dir,
                    err
                );
            }
        }
        head.flags.remove(BufferFlags::LOCKED);
        drop(st);

        self.lock_waits[id.0].wake_up();
    }
}

/// 缓冲区缓存
///
/// 固定大小的缓冲池，保证任一 (设备, 块号) 在内存中至多只有一份拷贝。
/// 多个线程可以通过 `Arc<BufferCache>` 共享同一个缓存。
///
/// # 示例
///
/// ```rust,ignore
/// let devices = Arc::new(DeviceTable::new());
/// devices.register(DevId::new(3, 1), Box::new(MemDevice::new(1440)))?;
/// let cache = BufferCache::new(CacheConfig::default(), devices)?;
///
/// let id = cache.bread(DevId::new(3, 1), 1)?;
/// cache.with_data(id, |data| println!("{:02x}", data[0]));
/// cache.brelse(id);
/// ```
pub struct BufferCache {
    shared: Arc<Shared>,
    devices: Arc<DeviceTable>,
    queue: Box<dyn RequestQueue>,
    pub(super) metadata: RwLock<Option<Arc<dyn MetadataSync>>>,
    config: CacheConfig,
}

impl BufferCache {
    /// 创建缓存，按 `config.io_mode` 选择请求队列
    pub fn new(config: CacheConfig, devices: Arc<DeviceTable>) -> Result<Self> {
        let queue: Box<dyn RequestQueue> = match config.io_mode {
            IoMode::Sync => Box::new(SyncQueue::new(devices.clone())),
            IoMode::Worker => Box::new(WorkerQueue::new(devices.clone())?),
        };
        Self::with_queue(config, devices, queue)
    }

    /// 使用自定义请求队列创建缓存
    pub fn with_queue(
        config: CacheConfig,
        devices: Arc<DeviceTable>,
        queue: Box<dyn RequestQueue>,
    ) -> Result<Self> {
        config.validate()?;
        log::info!(
            "[BCACHE] {} buffers = {} bytes, {} hash buckets",
            config.nr_buffers,
            config.nr_buffers * BLOCK_SIZE,
            config.nr_hash
        );
        Ok(Self {
            shared: Arc::new(Shared::new(&config)),
            devices,
            queue,
            metadata: RwLock::new(None),
            config,
        })
    }

    /// 设备表
    pub fn devices(&self) -> &Arc<DeviceTable> {
        &self.devices
    }

    /// 缓存配置
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub(super) fn lock_state(&self) -> StateGuard<'_> {
        self.shared.state.lock()
    }

    pub(super) fn shared(&self) -> &Shared {
        &self.shared
    }

    fn assert_held(st: &CacheState, id: BufferId) {
        if !st.heads[id.0].count.is_held() {
            panic!("access to unreferenced buffer {}", id.0);
        }
    }

    // ===== 查找与分配 =====

    /// 在哈希表中查找缓冲块，找到则增加引用并等待其解锁
    ///
    /// 引用计数在等待之前增加，睡眠期间缓冲块不会被挪作他用。
    pub fn get_hash_table(&self, dev: DevId, block: BlockNo) -> Option<BufferId> {
        let mut st = self.lock_state();
        self.get_hash_table_locked(&mut st, dev, block)
    }

    fn get_hash_table_locked(
        &self,
        st: &mut StateGuard<'_>,
        dev: DevId,
        block: BlockNo,
    ) -> Option<BufferId> {
        loop {
            let id = st.hash.find(&st.heads, dev, block)?;
            st.heads[id.0].count.get();
            self.shared.wait_on_buffer(st, id);
            if st.heads[id.0].matches(dev, block) {
                return Some(id);
            }
            st.heads[id.0].count.put();
        }
    }

    /// 取得 (设备, 块号) 对应的缓冲块
    ///
    /// 返回的缓冲块引用计数已加一、未上锁。数据是否有效由有效位决定，
    /// 无效时由调用者读入或整块覆盖。
    ///
    /// 没有空闲缓冲块时一直睡眠到有人释放，不会返回错误。
    pub fn getblk(&self, dev: DevId, block: BlockNo) -> BufferId {
        let mut st = self.lock_state();
        self.getblk_locked(&mut st, dev, block)
    }

    pub(super) fn getblk_locked(
        &self,
        st: &mut StateGuard<'_>,
        dev: DevId,
        block: BlockNo,
    ) -> BufferId {
        'repeat: loop {
            if let Some(id) = self.get_hash_table_locked(st, dev, block) {
                st.stats.hits += 1;
                log::trace!("[BCACHE] getblk {} block {} HIT buffer {}", dev, block, id.0);
                return id;
            }

            let Some(id) = Self::pick_candidate(st) else {
                st.stats.buffer_waits += 1;
                log::debug!("[BCACHE] getblk {} block {}: all buffers in use, sleeping", dev, block);
                self.shared.buffer_wait.sleep_on(st);
                continue;
            };

            self.shared.wait_on_buffer(st, id);
            if st.heads[id.0].count.is_held() {
                continue;
            }

            while st.heads[id.0].is_dirty() {
                st.stats.writebacks += 1;
                self.ll_rw_block_locked(st, Direction::Write, id);
                self.shared.wait_on_buffer(st, id);
                if st.heads[id.0].count.is_held() {
                    continue 'repeat;
                }
            }

            // 睡眠期间可能有别人已经把这个块放进了缓存
            if st.hash.find(&st.heads, dev, block).is_some() {
                continue;
            }

            Self::claim(st, id, dev, block);
            log::debug!("[BCACHE] getblk {} block {} MISS, claimed buffer {}", dev, block, id.0);
            return id;
        }
    }

    /// 预读用的认领，从不睡眠
    ///
    /// 块已经有效或正在传输时放弃；不在缓存中时只接受干净、未上锁的候选，
    /// 没有这样的候选也放弃。返回的缓冲块引用计数已加一。
    fn try_getblk_locked(st: &mut CacheState, dev: DevId, block: BlockNo) -> Option<BufferId> {
        if let Some(id) = st.hash.find(&st.heads, dev, block) {
            let head = &mut st.heads[id.0];
            if head.is_locked() || head.is_uptodate() {
                return None;
            }
            head.count.get();
            return Some(id);
        }

        let id = Self::pick_candidate(st)?;
        if st.heads[id.0].badness() != 0 {
            return None;
        }
        Self::claim(st, id, dev, block);
        Some(id)
    }

    /// 扫描整个空闲链表，挑出评分最低的未引用缓冲块
    fn pick_candidate(st: &CacheState) -> Option<BufferId> {
        let mut best: Option<(BufferId, u8)> = None;
        for id in st.free.iter(&st.heads) {
            let head = &st.heads[id.0];
            if head.count.is_held() {
                continue;
            }
            let badness = head.badness();
            if best.map_or(true, |(_, lowest)| badness < lowest) {
                best = Some((id, badness));
                if badness == 0 {
                    break;
                }
            }
        }
        best.map(|(id, _)| id)
    }

    /// 认领缓冲块：按旧键摘链、改键、按新键入链，并移到空闲链表尾
    fn claim(st: &mut CacheState, id: BufferId, dev: DevId, block: BlockNo) {
        let CacheState {
            heads,
            hash,
            free,
            stats,
        } = st;

        {
            let head = &mut heads[id.0];
            if head.count.is_held() {
                panic!("trying to evict referenced buffer {}", id.0);
            }
            if head.is_locked() {
                panic!("trying to evict locked buffer {}", id.0);
            }
            if head.dev.is_some() {
                stats.reclaims += 1;
            }
            stats.misses += 1;
            head.count.get();
            head.flags.remove(BufferFlags::DIRTY | BufferFlags::UPTODATE);
        }

        hash.remove(heads, id);
        free.remove(heads, id);
        heads[id.0].dev = Some(dev);
        heads[id.0].block = block;
        free.push_back(heads, id);
        hash.insert(heads, id);
    }

    // ===== 读 =====

    /// 读块
    ///
    /// 缓存命中且有效时不产生 I/O。读失败时释放缓冲块并返回 `ErrorKind::Io`。
    pub fn bread(&self, dev: DevId, block: BlockNo) -> Result<BufferId> {
        let mut st = self.lock_state();
        let id = self.getblk_locked(&mut st, dev, block);
        if st.heads[id.0].is_uptodate() {
            return Ok(id);
        }

        self.ll_rw_block_locked(&mut st, Direction::Read, id);
        self.shared.wait_on_buffer(&mut st, id);
        if st.heads[id.0].is_uptodate() {
            return Ok(id);
        }

        self.brelse_locked(&mut st, id);
        Err(Error::new(ErrorKind::Io, "block read failed"))
    }

    /// 读块并预读后续块
    ///
    /// 只等待 `first`；`rest` 中的块提交预读后立即放开引用，不等待完成。
    /// 预读从不睡眠：找不到干净的空闲缓冲块时直接跳过该块。
    pub fn breada(&self, dev: DevId, first: BlockNo, rest: &[BlockNo]) -> Result<BufferId> {
        let mut st = self.lock_state();
        let id = self.getblk_locked(&mut st, dev, first);
        if !st.heads[id.0].is_uptodate() {
            self.ll_rw_block_locked(&mut st, Direction::Read, id);
        }

        for &block in rest {
            let Some(ahead) = Self::try_getblk_locked(&mut st, dev, block) else {
                log::trace!("[BCACHE] read-ahead {} block {} skipped", dev, block);
                continue;
            };
            self.ll_rw_block_locked(&mut st, Direction::ReadAhead, ahead);
            st.heads[ahead.0].count.put();
            self.shared.buffer_wait.wake_up();
        }

        self.shared.wait_on_buffer(&mut st, id);
        if st.heads[id.0].is_uptodate() {
            return Ok(id);
        }

        self.brelse_locked(&mut st, id);
        Err(Error::new(ErrorKind::Io, "block read failed"))
    }

    /// 一次读取一页（四个块）到 `dest`
    ///
    /// 块号为 0 表示该位置没有块。先为所有块提交读请求，再逐个等待，
    /// 让几个块的 I/O 相互重叠。返回值标出哪些位置拷入了有效数据；
    /// 所有缓冲块在返回前都已释放。
    pub fn bread_page(
        &self,
        dev: DevId,
        blocks: [BlockNo; PAGE_BLOCKS],
        dest: &mut [u8],
    ) -> Result<[bool; PAGE_BLOCKS]> {
        if dest.len() < PAGE_BLOCKS * BLOCK_SIZE {
            return Err(Error::new(ErrorKind::InvalidInput, "destination smaller than a page"));
        }

        let mut st = self.lock_state();
        let mut ids = [None; PAGE_BLOCKS];
        for (slot, &block) in ids.iter_mut().zip(blocks.iter()) {
            if block == 0 {
                continue;
            }
            let id = self.getblk_locked(&mut st, dev, block);
            if !st.heads[id.0].is_uptodate() {
                self.ll_rw_block_locked(&mut st, Direction::Read, id);
            }
            *slot = Some(id);
        }

        let mut filled = [false; PAGE_BLOCKS];
        for (i, slot) in ids.iter().enumerate() {
            let Some(id) = *slot else {
                continue;
            };
            self.shared.wait_on_buffer(&mut st, id);
            if st.heads[id.0].is_uptodate() {
                let data = self.shared.payload(id).lock();
                dest[i * BLOCK_SIZE..(i + 1) * BLOCK_SIZE].copy_from_slice(&data[..BLOCK_SIZE]);
                filled[i] = true;
            }
            self.brelse_locked(&mut st, id);
        }
        Ok(filled)
    }

    // ===== 释放 =====

    /// 释放缓冲块
    ///
    /// # Panics
    ///
    /// 引用计数已经为零时 panic（重复释放）。
    pub fn brelse(&self, id: BufferId) {
        let mut st = self.lock_state();
        self.brelse_locked(&mut st, id);
    }

    fn brelse_locked(&self, st: &mut StateGuard<'_>, id: BufferId) {
        self.shared.wait_on_buffer(st, id);
        st.heads[id.0].count.put();
        self.shared.buffer_wait.wake_up();
    }

    // ===== 底层 I/O =====

    /// 提交读写请求
    ///
    /// 先等缓冲块解锁再上锁提交。写一个干净的块、读一个有效的块都直接返回；
    /// 预读/预写遇到已上锁的块直接放弃。不等待请求完成。
    pub fn ll_rw_block(&self, dir: Direction, id: BufferId) {
        let mut st = self.lock_state();
        self.ll_rw_block_locked(&mut st, dir, id);
    }

    /// 返回是否真正提交了请求
    pub(super) fn ll_rw_block_locked(
        &self,
        st: &mut StateGuard<'_>,
        dir: Direction,
        id: BufferId,
    ) -> bool {
        if dir.is_ahead() && st.heads[id.0].is_locked() {
            return false;
        }
        self.shared.wait_on_buffer(st, id);

        let CacheState { heads, stats, .. } = &mut **st;
        let head = &mut heads[id.0];
        let Some(dev) = head.dev else {
            panic!("I/O on unassigned buffer {}", id.0);
        };
        if dir.is_write() {
            if !head.is_dirty() {
                return false;
            }
            stats.writes_issued += 1;
        } else {
            if head.is_uptodate() {
                return false;
            }
            stats.reads_issued += 1;
        }
        head.flags.insert(BufferFlags::LOCKED);
        log::trace!("[BCACHE] submit {:?} {} block {}", dir, dev, head.block);

        let req = IoRequest::new(dir, dev, head.block, id, self.shared.clone());
        MutexGuard::unlocked(st, || self.queue.submit(req));
        true
    }

    /// 同步写回一个缓冲块
    ///
    /// 缓冲块不脏时什么也不做。
    pub fn write_block(&self, id: BufferId) -> Result<()> {
        let mut st = self.lock_state();
        Self::assert_held(&st, id);
        if !self.ll_rw_block_locked(&mut st, Direction::Write, id) {
            return Ok(());
        }
        self.shared.wait_on_buffer(&mut st, id);
        if st.heads[id.0].is_uptodate() {
            Ok(())
        } else {
            Err(Error::new(ErrorKind::Io, "block write failed"))
        }
    }

    /// 等待缓冲块上的 I/O 完成
    pub fn wait_on_buffer(&self, id: BufferId) {
        let mut st = self.lock_state();
        self.shared.wait_on_buffer(&mut st, id);
    }

    // ===== 数据与状态 =====

    /// 等缓冲块解锁后取得数据锁
    ///
    /// 数据锁在放开状态锁之前拿到。之后提交的写请求要等数据锁释放才开始
    /// 传输，传输的一定是修改后的数据。
    fn lock_payload(&self, id: BufferId) -> MutexGuard<'_, Box<[u8]>> {
        let mut st = self.lock_state();
        Self::assert_held(&st, id);
        self.shared.wait_on_buffer(&mut st, id);
        self.shared.payload(id).lock()
    }

    /// 只读访问缓冲块数据
    ///
    /// 调用者必须持有引用。闭包执行期间不得回调缓存。
    pub fn with_data<R>(&self, id: BufferId, f: impl FnOnce(&[u8]) -> R) -> R {
        let data = self.lock_payload(id);
        f(&data[..])
    }

    /// 可写访问缓冲块数据
    ///
    /// 不会自动置脏，修改后需调用 [`mark_dirty`](Self::mark_dirty)。
    pub fn with_data_mut<R>(&self, id: BufferId, f: impl FnOnce(&mut [u8]) -> R) -> R {
        let mut data = self.lock_payload(id);
        f(&mut data[..])
    }

    /// 标记为脏
    pub fn mark_dirty(&self, id: BufferId) {
        let mut st = self.lock_state();
        Self::assert_held(&st, id);
        st.heads[id.0].flags.insert(BufferFlags::DIRTY);
    }

    /// 标记为有效
    pub fn mark_uptodate(&self, id: BufferId) {
        let mut st = self.lock_state();
        Self::assert_held(&st, id);
        st.heads[id.0].flags.insert(BufferFlags::UPTODATE);
    }

    /// 清零数据并标记为有效且脏
    pub fn zero_fill(&self, id: BufferId) {
        let mut st = self.lock_state();
        Self::assert_held(&st, id);
        self.shared.wait_on_buffer(&mut st, id);
        self.shared.payload(id).lock().fill(0);
        st.heads[id.0].flags.insert(BufferFlags::UPTODATE | BufferFlags::DIRTY);
    }

    /// 调用者是唯一持有者时，丢弃缓冲块内容（清除有效位和脏位）
    ///
    /// 返回是否丢弃。还有别的持有者时什么也不做。
    pub fn discard(&self, id: BufferId) -> bool {
        let mut st = self.lock_state();
        Self::assert_held(&st, id);
        let head = &mut st.heads[id.0];
        if head.count.value() > 1 {
            return false;
        }
        head.flags.remove(BufferFlags::DIRTY | BufferFlags::UPTODATE);
        true
    }

    /// 缓冲块当前绑定的 (设备, 块号)
    pub fn key(&self, id: BufferId) -> Option<(DevId, BlockNo)> {
        let st = self.lock_state();
        let head = &st.heads[id.0];
        head.dev.map(|dev| (dev, head.block))
    }

    /// 引用计数
    pub fn ref_count(&self, id: BufferId) -> u32 {
        self.lock_state().heads[id.0].count.value()
    }

    /// 状态标志
    pub fn flags(&self, id: BufferId) -> BufferFlags {
        self.lock_state().heads[id.0].flags
    }

    /// 数据是否有效
    pub fn is_uptodate(&self, id: BufferId) -> bool {
        self.lock_state().heads[id.0].is_uptodate()
    }

    /// 是否脏
    pub fn is_dirty(&self, id: BufferId) -> bool {
        self.lock_state().heads[id.0].is_dirty()
    }

    /// 是否正在进行 I/O
    pub fn is_locked(&self, id: BufferId) -> bool {
        self.lock_state().heads[id.0].is_locked()
    }

    // ===== 诊断 =====

    /// 统计信息
    pub fn stats(&self) -> CacheStats {
        self.lock_state().stats.clone()
    }

    /// 缓冲池大小
    pub fn nr_buffers(&self) -> usize {
        self.config.nr_buffers
    }

    /// 未被引用的缓冲块数量
    pub fn free_count(&self) -> usize {
        let st = self.lock_state();
        st.heads.iter().filter(|head| !head.count.is_held()).count()
    }

    /// 脏缓冲块数量
    pub fn dirty_count(&self) -> usize {
        let st = self.lock_state();
        st.heads.iter().filter(|head| head.is_dirty()).count()
    }

    /// 正在等待空闲缓冲块的上下文数量
    pub fn buffer_waiters(&self) -> usize {
        self.shared.buffer_wait.sleepers()
    }

    /// 正在等待某个缓冲块解锁的上下文数量
    pub fn lock_waiters(&self, id: BufferId) -> usize {
        self.shared.lock_waits[id.0].sleepers()
    }

    /// 检查哈希表和空闲链表的一致性
    ///
    /// # Panics
    ///
    /// 任何一项检查失败都会 panic。
    pub fn check_invariants(&self) {
        let st = self.lock_state();
        let n = st.heads.len();

        if st.free.len() != n {
            panic!("free list holds {} buffers, pool has {}", st.free.len(), n);
        }
        let mut seen = vec![false; n];
        for id in st.free.iter(&st.heads) {
            if seen[id.0] {
                panic!("buffer {} appears twice in free list", id.0);
            }
            seen[id.0] = true;
            let next = st.heads[id.0].free.next.unwrap_or_else(|| panic!("Free block list corrupted"));
            if st.heads[next.0].free.prev != Some(id) {
                panic!("Free block list corrupted");
            }
        }
        if seen.iter().any(|&s| !s) {
            panic!("free list does not reach every buffer");
        }

        for (i, head) in st.heads.iter().enumerate() {
            match head.dev {
                Some(dev) => {
                    if !head.hashed {
                        panic!("assigned buffer {} missing from hash queue", i);
                    }
                    if st.hash.find(&st.heads, dev, head.block) != Some(BufferId(i)) {
                        panic!("{} block {} cached more than once", dev, head.block);
                    }
                }
                None => {
                    if head.hashed {
                        panic!("unassigned buffer {} in hash queue", i);
                    }
                }
            }
        }
    }
}

impl core::fmt::Debug for BufferCache {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BufferCache")
            .field("config", &self.config)
            .field("devices", &self.devices)
            .field("stats", &self.stats())
            .finish()
    }
}
