use crate::morton::MortonCode;
use crate::scheduler::Scheduler;
use crate::util::SliceWriter;

/// Below this many primitives the std stable sort wins over the parallel
/// radix passes.
const RADIX_MIN_LEN: usize = 1 << 13;

const RADIX_BITS: u32 = 10;
const RADIX_BUCKETS: usize = 1 << RADIX_BITS;
/// Three 10-bit passes cover the 30 used bits of a Morton code.
const RADIX_PASSES: u32 = 3;

/// Stable sort of the primitive permutation keyed by Morton code. Equal
/// codes keep their input order, which keeps the downstream prefix
/// tie-breaks deterministic.
pub(super) fn sort_by_code<Sch: Scheduler>(scheduler: &Sch, codes: &[MortonCode]) -> Vec<u32> {
    let mut perm: Vec<u32> = (0..codes.len() as u32).collect();

    if codes.len() < RADIX_MIN_LEN || scheduler.shards() == 1 {
        perm.sort_by_key(|&prim| codes[prim as usize]);
        return perm;
    }

    radix_sort(scheduler, codes, perm)
}

/// Least-significant-digit radix sort. Each pass builds per-shard histograms,
/// scans them bucket-major (so equal digits keep shard order, which keeps
/// the pass stable), then scatters.
fn radix_sort<Sch: Scheduler>(
    scheduler: &Sch,
    codes: &[MortonCode],
    mut perm: Vec<u32>,
) -> Vec<u32> {
    let shards = scheduler.shards() as usize;
    let len = perm.len();
    let mut scratch = vec![0u32; len];
    let mut histogram = vec![0usize; RADIX_BUCKETS * shards];

    for pass in 0..RADIX_PASSES {
        let shift = pass * RADIX_BITS;

        {
            let histogram_writer = SliceWriter::new(&mut histogram);
            let perm = &perm;
            scheduler.run(|div| {
                let mut local = vec![0usize; RADIX_BUCKETS];
                for &prim in &perm[div.shard(len)] {
                    local[bucket(codes[prim as usize], shift)] += 1;
                }
                for (b, count) in local.into_iter().enumerate() {
                    // Bucket-major layout; each shard owns its own column.
                    unsafe { histogram_writer.set(b * shards + div.idx as usize, count) };
                }
            });
        }

        // Exclusive prefix sum over (bucket, shard) yields every shard's
        // first output slot per bucket.
        let mut running = 0;
        for slot in histogram.iter_mut() {
            let count = *slot;
            *slot = running;
            running += count;
        }

        {
            let scratch_writer = SliceWriter::new(&mut scratch);
            let perm = &perm;
            let histogram = &histogram;
            scheduler.run(|div| {
                let mut offsets = vec![0usize; RADIX_BUCKETS];
                for (b, offset) in offsets.iter_mut().enumerate() {
                    *offset = histogram[b * shards + div.idx as usize];
                }
                for &prim in &perm[div.shard(len)] {
                    let b = bucket(codes[prim as usize], shift);
                    // Offset ranges of different shards are disjoint.
                    unsafe { scratch_writer.set(offsets[b], prim) };
                    offsets[b] += 1;
                }
            });
        }

        std::mem::swap(&mut perm, &mut scratch);
    }

    perm
}

#[inline]
fn bucket(code: MortonCode, shift: u32) -> usize {
    ((code >> shift) as usize) & (RADIX_BUCKETS - 1)
}
