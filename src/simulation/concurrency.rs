//! Loops over particle slots, either serial or split into blocks that rayon processes in parallel.
//!
//! The closure receives the global index of each element, so results never depend on the block size
//! or on the number of worker threads.

use crate::simulation_parameters::ExecutionPolicy;

pub use internal::*;

#[cfg(target_arch = "wasm32")]
mod internal {

    pub fn par_iter_mut2_blocked<T1: Send + Sync, T2: Send + Sync, F: Fn(usize, &mut T1, &mut T2) + Send + Sync>(
        _block_size: usize,
        arr1: &mut [T1],
        arr2: &mut [T2],
        f: F,
    ) {
        super::iter_mut2_serial(arr1, arr2, f)
    }

    pub fn par_iter_mut4_blocked<
        T1: Send + Sync,
        T2: Send + Sync,
        T3: Send + Sync,
        T4: Send + Sync,
        F: Fn(usize, &mut T1, &mut T2, &mut T3, &mut T4) + Send + Sync,
    >(
        _block_size: usize,
        arr1: &mut [T1],
        arr2: &mut [T2],
        arr3: &mut [T3],
        arr4: &mut [T4],
        f: F,
    ) {
        super::iter_mut4_serial(arr1, arr2, arr3, arr4, f)
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod internal {
    use rayon::prelude::*;

    pub fn par_iter_mut2_blocked<T1: Send + Sync, T2: Send + Sync, F: Fn(usize, &mut T1, &mut T2) + Send + Sync>(
        block_size: usize,
        arr1: &mut [T1],
        arr2: &mut [T2],
        f: F,
    ) {
        let block_size = block_size.max(1);
        arr1.par_chunks_mut(block_size)
            .zip(arr2.par_chunks_mut(block_size))
            .enumerate()
            .for_each(|(block, (b1, b2))| {
                let offset = block * block_size;
                for (j, (v1, v2)) in b1.iter_mut().zip(b2.iter_mut()).enumerate() {
                    f(offset + j, v1, v2);
                }
            });
    }

    pub fn par_iter_mut4_blocked<
        T1: Send + Sync,
        T2: Send + Sync,
        T3: Send + Sync,
        T4: Send + Sync,
        F: Fn(usize, &mut T1, &mut T2, &mut T3, &mut T4) + Send + Sync,
    >(
        block_size: usize,
        arr1: &mut [T1],
        arr2: &mut [T2],
        arr3: &mut [T3],
        arr4: &mut [T4],
        f: F,
    ) {
        let block_size = block_size.max(1);
        arr1.par_chunks_mut(block_size)
            .zip(arr2.par_chunks_mut(block_size))
            .zip(arr3.par_chunks_mut(block_size))
            .zip(arr4.par_chunks_mut(block_size))
            .enumerate()
            .for_each(|(block, (((b1, b2), b3), b4))| {
                let offset = block * block_size;
                for (j, (((v1, v2), v3), v4)) in b1
                    .iter_mut()
                    .zip(b2.iter_mut())
                    .zip(b3.iter_mut())
                    .zip(b4.iter_mut())
                    .enumerate()
                {
                    f(offset + j, v1, v2, v3, v4);
                }
            });
    }
}

fn iter_mut2_serial<T1, T2, F: Fn(usize, &mut T1, &mut T2)>(arr1: &mut [T1], arr2: &mut [T2], f: F) {
    arr1.iter_mut()
        .zip(arr2.iter_mut())
        .enumerate()
        .for_each(|(idx, (v1, v2))| {
            f(idx, v1, v2);
        });
}

fn iter_mut4_serial<T1, T2, T3, T4, F: Fn(usize, &mut T1, &mut T2, &mut T3, &mut T4)>(
    arr1: &mut [T1],
    arr2: &mut [T2],
    arr3: &mut [T3],
    arr4: &mut [T4],
    f: F,
) {
    arr1.iter_mut()
        .zip(arr2.iter_mut())
        .zip(arr3.iter_mut())
        .zip(arr4.iter_mut())
        .enumerate()
        .for_each(|(idx, (((v1, v2), v3), v4))| {
            f(idx, v1, v2, v3, v4);
        });
}

pub fn iter_mut2<T1: Send + Sync, T2: Send + Sync, F: Fn(usize, &mut T1, &mut T2) + Send + Sync>(
    policy: ExecutionPolicy,
    block_size: usize,
    arr1: &mut [T1],
    arr2: &mut [T2],
    f: F,
) {
    debug_assert_eq!(arr1.len(), arr2.len());
    match policy {
        ExecutionPolicy::Serial => iter_mut2_serial(arr1, arr2, f),
        ExecutionPolicy::Parallel => par_iter_mut2_blocked(block_size, arr1, arr2, f),
    }
}

pub fn iter_mut4<
    T1: Send + Sync,
    T2: Send + Sync,
    T3: Send + Sync,
    T4: Send + Sync,
    F: Fn(usize, &mut T1, &mut T2, &mut T3, &mut T4) + Send + Sync,
>(
    policy: ExecutionPolicy,
    block_size: usize,
    arr1: &mut [T1],
    arr2: &mut [T2],
    arr3: &mut [T3],
    arr4: &mut [T4],
    f: F,
) {
    debug_assert!(arr1.len() == arr2.len() && arr2.len() == arr3.len() && arr3.len() == arr4.len());
    match policy {
        ExecutionPolicy::Serial => iter_mut4_serial(arr1, arr2, arr3, arr4, f),
        ExecutionPolicy::Parallel => par_iter_mut4_blocked(block_size, arr1, arr2, arr3, arr4, f),
    }
}
