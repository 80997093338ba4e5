use half::bf16;
use nexar_compress::{
    CompressError, Compressor, CompressorConfig, DataType, KSelect, Momentum, MomentumKind,
    MomentumRule, Tensor, TensorMut, VanillaMomentumCompressor,
};

use super::helpers::{boxed, random_grad, seeded};

#[test]
fn test_momentum_buffer_follows_vanilla_rule() {
    let n = 32;
    let mu = 0.5f32;
    let mut m = VanillaMomentumCompressor::vanilla(boxed(n, DataType::F64, 4, 1), mu).unwrap();

    let mut expected = vec![0f64; n];
    for round in 0..5 {
        let grad = random_grad(n, round);
        let prev = m.momentum().to_vec::<f64>().unwrap();
        assert_eq!(prev, expected);

        m.compress(Tensor::from_slice(&grad)).unwrap();
        for (e, g) in expected.iter_mut().zip(&grad) {
            *e = f64::from(mu) * *e + g;
        }
        assert_eq!(m.momentum().to_vec::<f64>().unwrap(), expected);
    }
}

#[test]
fn test_inner_compressor_sees_momentum_not_gradient() {
    let n = 48;
    let k = 6;
    let mut m = VanillaMomentumCompressor::vanilla(boxed(n, DataType::F64, k, 9), 0.9).unwrap();
    // A standalone compressor on the same seed draws the same indices.
    let mut reference = seeded(n, DataType::F64, k, 9);

    for round in 0..4 {
        let grad = random_grad(n, 100 + round);
        let wrapped = m.compress(Tensor::from_slice(&grad)).unwrap().to_buf();
        let mom = m.momentum().to_vec::<f64>().unwrap();
        let direct = reference
            .compress(Tensor::from_slice(&mom))
            .unwrap()
            .to_buf();
        assert_eq!(wrapped, direct, "round {round}");
    }
}

#[test]
fn test_lossless_inner_returns_momentum() {
    let n = 10;
    let mut m = VanillaMomentumCompressor::vanilla(boxed(n, DataType::F32, n, 0), 0.5).unwrap();
    let g1: Vec<f32> = (1..=10).map(|v| v as f32).collect();
    let g2 = vec![1f32; n];

    m.compress(Tensor::from_slice(&g1)).unwrap();
    let packed = m.compress(Tensor::from_slice(&g2)).unwrap().to_buf();
    let mut out = vec![0f32; n];
    m.decompress(packed.view(), TensorMut::from_slice_mut(&mut out))
        .unwrap();

    let expected: Vec<f32> = g1.iter().map(|v| 0.5 * v + 1.0).collect();
    assert_eq!(out, expected);
}

#[test]
fn test_gradient_left_untouched() {
    let grad = random_grad(16, 4);
    let snapshot = grad.clone();
    let mut m = VanillaMomentumCompressor::vanilla(boxed(16, DataType::F64, 2, 0), 0.9).unwrap();
    m.compress(Tensor::from_slice(&grad)).unwrap();
    m.feedback(Tensor::from_slice(&grad)).unwrap();
    assert_eq!(grad, snapshot);
}

#[test]
fn test_feedback_uses_momentum_buffer() {
    let n = 12;
    let mut m = VanillaMomentumCompressor::vanilla(boxed(n, DataType::F64, 3, 2), 0.5).unwrap();
    let grad = random_grad(n, 8);
    let selected = m
        .compress(Tensor::from_slice(&grad))
        .unwrap()
        .indices(n)
        .unwrap();
    m.feedback(Tensor::from_slice(&grad)).unwrap();

    let mom = m.momentum().to_vec::<f64>().unwrap();
    let error = m.error().to_vec::<f64>().unwrap();
    for i in 0..n {
        let want = if selected.contains(&i) { 0.0 } else { mom[i] };
        assert_eq!(error[i], want, "position {i}");
    }
}

#[test]
fn test_error_updates_delegate_to_inner() {
    let n = 20;
    let mut m = VanillaMomentumCompressor::vanilla(boxed(n, DataType::F64, 5, 6), 0.9).unwrap();
    let grad = random_grad(n, 1);
    let packed = m.compress(Tensor::from_slice(&grad)).unwrap().to_buf();
    let mom = m.momentum().to_vec::<f64>().unwrap();

    let mut fast = vec![0f64; n];
    let mut generic = vec![0f64; n];
    m.fast_update_error(
        TensorMut::from_slice_mut(&mut fast),
        Tensor::from_slice(&mom),
        packed.view(),
    )
    .unwrap();
    m.update_error(
        TensorMut::from_slice_mut(&mut generic),
        Tensor::from_slice(&mom),
        packed.view(),
    )
    .unwrap();
    assert_eq!(fast, generic);
}

#[test]
fn test_bf16_momentum() {
    let n = 4;
    let mut m = VanillaMomentumCompressor::vanilla(boxed(n, DataType::BF16, n, 0), 0.5).unwrap();
    let grad: Vec<bf16> = [2.0, -4.0, 8.0, 0.5].map(bf16::from_f32).to_vec();
    m.compress(Tensor::from_slice(&grad)).unwrap();
    m.compress(Tensor::from_slice(&grad)).unwrap();
    let mom = m.momentum().to_vec::<bf16>().unwrap();
    let expected: Vec<bf16> = [3.0, -6.0, 12.0, 0.75].map(bf16::from_f32).to_vec();
    assert_eq!(mom, expected);
}

#[test]
fn test_integer_inner_rejected() {
    let err = VanillaMomentumCompressor::vanilla(boxed(8, DataType::U32, 2, 0), 0.5)
        .err()
        .unwrap();
    assert!(matches!(err, CompressError::UnsupportedDType { .. }));
}

/// Rule that only counts calls, to check the wrapper's plumbing.
struct Counting(std::sync::atomic::AtomicUsize);

impl MomentumRule for Counting {
    fn name(&self) -> &'static str {
        "counting"
    }

    fn update_mom(&self, grad: Tensor<'_>, mut mom: TensorMut<'_>) -> nexar_compress::Result<()> {
        self.0.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        mom.copy_from(grad)
    }
}

#[test]
fn test_custom_rule_plugs_in() {
    let rule = Counting(Default::default());
    let mut m = Momentum::new(boxed(8, DataType::F32, 8, 0), rule).unwrap();
    let grad = vec![3f32; 8];
    for _ in 0..3 {
        m.compress(Tensor::from_slice(&grad)).unwrap();
    }
    assert_eq!(m.rule().0.load(std::sync::atomic::Ordering::Relaxed), 3);
    assert_eq!(m.momentum().to_vec::<f32>().unwrap(), grad);
}

#[test]
fn test_config_builds_wrapped_compressor() {
    let cfg = CompressorConfig {
        k: KSelect::Count(4),
        seed: 9,
        deterministic: true,
        momentum: Some(MomentumKind::Vanilla { mu: 0.9 }),
        ..Default::default()
    };
    let mut from_config = cfg.build(48, DataType::F64).unwrap();
    let mut by_hand =
        VanillaMomentumCompressor::vanilla(boxed(48, DataType::F64, 4, 9), 0.9).unwrap();

    let grad = random_grad(48, 0);
    let a = from_config.compress(Tensor::from_slice(&grad)).unwrap().to_buf();
    let b = by_hand.compress(Tensor::from_slice(&grad)).unwrap().to_buf();
    assert_eq!(a, b);
}
