use std::collections::HashSet;

use half::{bf16, f16};
use nexar_compress::{
    Compressor, DataType, Element, IndexWidth, RandomKCompressor, Tensor, TensorMut,
};

use super::helpers::{ramp, seeded};

/// Compress then decompress `input`; returns the output and the selected indices.
fn roundtrip<T: Element>(input: &[T], k: usize, seed: u64) -> (Vec<T>, Vec<usize>) {
    let n = input.len();
    let mut c = seeded(n, T::DTYPE, k, seed);
    let packed = c.compress(Tensor::from_slice(input)).unwrap().to_buf();
    let indices = packed.view().indices(n).unwrap();

    let mut out = vec![T::zero(); n];
    c.decompress(packed.view(), TensorMut::from_slice_mut(&mut out))
        .unwrap();
    (out, indices)
}

fn check_roundtrip<T: Element>(input: &[T], k: usize) {
    let (out, indices) = roundtrip(input, k, 99);
    assert_eq!(indices.len(), k);
    let selected: HashSet<usize> = indices.iter().copied().collect();
    for (i, (o, v)) in out.iter().zip(input).enumerate() {
        if selected.contains(&i) {
            assert_eq!(o, v, "kept value at {i} changed");
        } else {
            assert_eq!(*o, T::zero(), "unselected position {i} not zero");
        }
    }
    let nonzero = out.iter().filter(|&&v| v != T::zero()).count();
    assert_eq!(nonzero, k);
}

#[test]
fn test_roundtrip_keeps_exactly_k_f32() {
    for k in [1, 5, 17, 32] {
        check_roundtrip(&ramp(32), k);
    }
}

#[test]
fn test_roundtrip_every_dtype() {
    let n = 40;
    check_roundtrip(&(1..=n).map(|v| v as f64 * 0.1).collect::<Vec<_>>(), 7);
    check_roundtrip(&(1..=n).map(|v| f16::from_f32(v as f32 * 0.5)).collect::<Vec<_>>(), 7);
    check_roundtrip(&(1..=n).map(|v| bf16::from_f32(-(v as f32))).collect::<Vec<_>>(), 7);
    check_roundtrip(&(1..=n).map(|v| v as i8 - 50).collect::<Vec<_>>(), 7);
    check_roundtrip(&(1..=n).map(|v| v as i32 * -1000).collect::<Vec<_>>(), 7);
    check_roundtrip(&(1..=n).map(|v| v as i64 * (1 << 40)).collect::<Vec<_>>(), 7);
    check_roundtrip(&(1..=n).map(|v| v as u8).collect::<Vec<_>>(), 7);
    check_roundtrip(&(1..=n).map(|v| v as u32 * 7).collect::<Vec<_>>(), 7);
    check_roundtrip(&(1..=n).map(|v| u64::MAX - v as u64).collect::<Vec<_>>(), 7);
}

#[test]
fn test_k_equals_count_is_lossless() {
    let input = ramp(16);
    let (out, indices) = roundtrip(&input, 16, 3);
    assert_eq!(out, input);
    let mut sorted = indices;
    sorted.sort_unstable();
    assert_eq!(sorted, (0..16).collect::<Vec<_>>());
}

#[test]
fn test_single_element_tensor() {
    let (out, indices) = roundtrip(&[4.5f32], 1, 0);
    assert_eq!(out, vec![4.5]);
    assert_eq!(indices, vec![0]);
}

#[test]
fn test_same_seed_same_stream() {
    let mut a = seeded(64, DataType::F32, 8, 2024);
    let mut b = seeded(64, DataType::F32, 8, 2024);
    for round in 0..10 {
        let grad: Vec<f32> = (0..64).map(|i| (i * (round + 1)) as f32).collect();
        let pa = a.compress(Tensor::from_slice(&grad)).unwrap().to_buf();
        let pb = b.compress(Tensor::from_slice(&grad)).unwrap().to_buf();
        assert_eq!(pa, pb, "round {round} diverged");
        assert_eq!(
            pa.view().indices(64).unwrap(),
            pb.view().indices(64).unwrap()
        );
    }
}

#[test]
fn test_stream_advances_between_calls() {
    let mut c = seeded(1000, DataType::F32, 10, 7);
    let grad = vec![1f32; 1000];
    let first = c.compress(Tensor::from_slice(&grad)).unwrap().to_buf();
    let second = c.compress(Tensor::from_slice(&grad)).unwrap().to_buf();
    assert_ne!(first, second);

    // Rebuilding restarts the stream.
    let mut fresh = seeded(1000, DataType::F32, 10, 7);
    let again = fresh.compress(Tensor::from_slice(&grad)).unwrap().to_buf();
    assert_eq!(first, again);
}

#[test]
fn test_different_seeds_differ() {
    let grad = vec![1f32; 1000];
    let mut a = seeded(1000, DataType::F32, 10, 1);
    let mut b = seeded(1000, DataType::F32, 10, 2);
    let pa = a.compress(Tensor::from_slice(&grad)).unwrap().to_buf();
    let pb = b.compress(Tensor::from_slice(&grad)).unwrap().to_buf();
    assert_ne!(pa, pb);
}

#[test]
fn test_byte_size_is_k_times_stride() {
    let dtypes = [
        DataType::F32,
        DataType::F64,
        DataType::F16,
        DataType::BF16,
        DataType::I8,
        DataType::I32,
        DataType::I64,
        DataType::U8,
        DataType::U32,
        DataType::U64,
    ];
    for (count, width) in [(200, 1), (300, 2), (70_000, 4)] {
        assert_eq!(IndexWidth::for_len(count).size_in_bytes(), width);
        for dtype in dtypes {
            let k = 13;
            let mut c = seeded(count, dtype, k, 5);
            let grad = vec![0u8; count * dtype.size_in_bytes()];
            let packed = c
                .compress(Tensor::new(&grad, count, dtype).unwrap())
                .unwrap();
            assert_eq!(packed.byte_size(), k * (width + dtype.size_in_bytes()));
            assert_eq!(packed.pairs(), k);
            assert_eq!(packed.dtype(), dtype);
        }
    }
}

#[test]
fn test_indices_distinct_and_in_range() {
    let count = 500;
    let k = 120;
    let mut c = seeded(count, DataType::F32, k, 77);
    let grad = ramp(count);
    for _ in 0..50 {
        let indices = c
            .compress(Tensor::from_slice(&grad))
            .unwrap()
            .indices(count)
            .unwrap();
        let unique: HashSet<usize> = indices.iter().copied().collect();
        assert_eq!(unique.len(), k);
        assert!(indices.iter().all(|&i| i < count));
    }
}

#[test]
fn test_selection_covers_all_positions() {
    // Uniform sampling should touch every slot of a small tensor quickly.
    let mut c = seeded(20, DataType::F32, 3, 8);
    let grad = ramp(20);
    let mut seen = HashSet::new();
    for _ in 0..200 {
        let indices = c
            .compress(Tensor::from_slice(&grad))
            .unwrap()
            .indices(20)
            .unwrap();
        seen.extend(indices);
    }
    assert_eq!(seen.len(), 20);
}

#[test]
fn test_compress_does_not_touch_input() {
    let grad = ramp(32);
    let snapshot = grad.clone();
    let mut c = seeded(32, DataType::F32, 4, 1);
    c.compress(Tensor::from_slice(&grad)).unwrap();
    assert_eq!(grad, snapshot);
}

#[test]
fn test_end_to_end_eight_elements() {
    let grad = ramp(8);
    let mut c = seeded(8, DataType::F32, 3, 42);
    let packed = c.compress(Tensor::from_slice(&grad)).unwrap().to_buf();

    // Pairs are (index, grad[index]) = (index, index + 1) in selection order.
    let bytes = packed.view().as_bytes().to_vec();
    assert_eq!(bytes.len(), 3 * 5);
    let mut expected = vec![0f32; 8];
    for pair in bytes.chunks_exact(5) {
        let index = pair[0] as usize;
        let value = f32::from_le_bytes(pair[1..].try_into().unwrap());
        assert_eq!(value, (index + 1) as f32);
        expected[index] = value;
    }

    let mut out = vec![0f32; 8];
    c.decompress(packed.view(), TensorMut::from_slice_mut(&mut out))
        .unwrap();
    assert_eq!(out, expected);
    assert_eq!(out.iter().filter(|&&v| v != 0.0).count(), 3);
}

#[test]
fn test_decompress_overwrites_stale_output() {
    let grad = ramp(10);
    let mut c = seeded(10, DataType::F32, 2, 4);
    let packed = c.compress(Tensor::from_slice(&grad)).unwrap().to_buf();
    let mut out = vec![-1f32; 10];
    c.decompress(packed.view(), TensorMut::from_slice_mut(&mut out))
        .unwrap();
    assert_eq!(out.iter().filter(|&&v| v == -1.0).count(), 0);
    assert_eq!(out.iter().filter(|&&v| v == 0.0).count(), 8);
}

#[test]
fn test_decompress_rejects_wrong_destination() {
    let grad = ramp(10);
    let mut c = seeded(10, DataType::F32, 2, 4);
    let packed = c.compress(Tensor::from_slice(&grad)).unwrap().to_buf();

    let mut short = vec![0f32; 9];
    assert!(
        c.decompress(packed.view(), TensorMut::from_slice_mut(&mut short))
            .is_err()
    );
    let mut wide = vec![0f64; 10];
    assert!(
        c.decompress(packed.view(), TensorMut::from_slice_mut(&mut wide))
            .is_err()
    );
}

#[test]
fn test_nondeterministic_instances_are_usable() {
    let mut c = RandomKCompressor::new(64, DataType::F32, 4, 0, false).unwrap();
    let grad = ramp(64);
    let packed = c.compress(Tensor::from_slice(&grad)).unwrap();
    assert_eq!(packed.pairs(), 4);
}
