use std::num::NonZeroUsize;
use std::ops::Range;

/// One shard of a parallel work domain: this kernel invocation is shard
/// `idx` out of `max` total shards.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct WorkDivision {
    pub idx: u32,
    pub max: u32,
}

impl WorkDivision {
    /// The contiguous sub-range of `[0, len)` owned by this shard. The shards
    /// of all `max` divisions partition the range exactly.
    pub fn shard(&self, len: usize) -> Range<usize> {
        let idx = self.idx as usize;
        let max = self.max as usize;
        (len * idx / max)..(len * (idx + 1) / max)
    }
}

/// Executes a kernel over every shard of a work domain.
///
/// Implementations must invoke the kernel exactly once for every shard index
/// in `[0, shards)` and return only after every invocation has completed.
pub trait Scheduler {
    /// Number of shards `run` will dispatch.
    fn shards(&self) -> u32;

    fn run<K: Fn(WorkDivision) + Sync>(&self, kernel: K);
}

#[derive(Copy, Clone, Debug)]
pub enum WorkerCount {
    Auto,
    Manual(NonZeroUsize),
}

impl WorkerCount {
    fn get(&self) -> usize {
        match self {
            WorkerCount::Auto => num_cpus::get().max(1),
            WorkerCount::Manual(count) => count.get(),
        }
    }
}

impl Default for WorkerCount {
    fn default() -> Self {
        WorkerCount::Auto
    }
}

/// Dispatches one shard per worker thread; the pool exists for the duration
/// of a single `run` call, so consecutive build phases are separated by a
/// full join.
#[derive(Copy, Clone, Debug, Default)]
pub struct DefaultScheduler {
    pub workers: WorkerCount,
}

impl DefaultScheduler {
    pub fn new(workers: WorkerCount) -> DefaultScheduler {
        DefaultScheduler { workers }
    }
}

impl Scheduler for DefaultScheduler {
    fn shards(&self) -> u32 {
        self.workers.get() as u32
    }

    fn run<K: Fn(WorkDivision) + Sync>(&self, kernel: K) {
        let max = self.shards();
        if max == 1 {
            kernel(WorkDivision { idx: 0, max: 1 });
            return;
        }

        let kernel = &kernel;
        crossbeam_utils::thread::scope(|scope| {
            for idx in 0..max {
                scope.spawn(move |_| kernel(WorkDivision { idx, max }));
            }
        })
        .unwrap(); // The scope error is a worker panic, which we propagate
    }
}

/// Runs the whole domain as a single shard on the calling thread. Useful for
/// tests and for callers that manage their own threading.
#[derive(Copy, Clone, Debug, Default)]
pub struct SerialScheduler;

impl Scheduler for SerialScheduler {
    fn shards(&self) -> u32 {
        1
    }

    fn run<K: Fn(WorkDivision) + Sync>(&self, kernel: K) {
        kernel(WorkDivision { idx: 0, max: 1 });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

    use assert2::assert;
    use proptest::prelude::*;

    use super::*;

    fn worker_count_strategy() -> impl Strategy<Value = WorkerCount> {
        prop_oneof![
            Just(WorkerCount::Auto),
            (1..32usize).prop_map(|n| WorkerCount::Manual(NonZeroUsize::new(n).unwrap())),
        ]
    }

    proptest! {
        /// The shards of all divisions partition [0, len) without gaps or overlaps.
        #[test]
        fn shards_partition_the_range(max in 1..64u32, len in 0..10_000usize) {
            let mut next = 0;
            for idx in 0..max {
                let shard = WorkDivision { idx, max }.shard(len);
                prop_assert_eq!(shard.start, next);
                next = shard.end;
            }
            prop_assert_eq!(next, len);
        }

        /// Every shard index is dispatched exactly once.
        #[test]
        fn every_shard_runs_once(worker_count in worker_count_strategy()) {
            let scheduler = DefaultScheduler::new(worker_count);
            let invocations: Vec<AtomicU32> =
                (0..scheduler.shards()).map(|_| AtomicU32::new(0)).collect();

            scheduler.run(|div| {
                assert!(div.max == scheduler.shards());
                invocations[div.idx as usize].fetch_add(1, Ordering::Relaxed);
            });

            for count in &invocations {
                prop_assert_eq!(count.load(Ordering::Relaxed), 1);
            }
        }

        /// Sums a range sharded over the workers, checks that sum is as expected.
        #[test]
        fn sum(worker_count in worker_count_strategy(), n in 0..10_000usize) {
            let scheduler = DefaultScheduler::new(worker_count);
            let sum = AtomicUsize::new(0);

            scheduler.run(|div| {
                let partial: usize = div.shard(n).sum();
                sum.fetch_add(partial, Ordering::Relaxed);
            });

            prop_assert_eq!(sum.load(Ordering::Relaxed), n * n.saturating_sub(1) / 2);
        }
    }

    #[test]
    fn serial_scheduler_runs_inline() {
        let thread_id = std::thread::current().id();
        let invocations = AtomicU32::new(0);

        SerialScheduler.run(|div| {
            assert!(div == WorkDivision { idx: 0, max: 1 });
            assert!(std::thread::current().id() == thread_id);
            invocations.fetch_add(1, Ordering::Relaxed);
        });

        assert!(invocations.load(Ordering::Relaxed) == 1);
    }
}
