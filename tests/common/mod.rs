//! Common test utilities
#![allow(dead_code)]

use convnd::dtype::DType;
use convnd::graph::{Attributes, Node};
use convnd::tensor::Tensor;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Assert two f64 slices are close within tolerance
///
/// Uses the formula: |a - b| <= atol + rtol * |b|
pub fn assert_allclose_f64(a: &[f64], b: &[f64], rtol: f64, atol: f64, msg: &str) {
    assert_eq!(a.len(), b.len(), "{}: length mismatch", msg);
    for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        let diff = (x - y).abs();
        let tol = atol + rtol * y.abs();
        assert!(
            diff <= tol,
            "{}: element {} differs: {} vs {} (diff={}, tol={})",
            msg,
            i,
            x,
            y,
            diff,
            tol
        );
    }
}

/// Assert two f32 slices are close within tolerance
pub fn assert_allclose_f32(a: &[f32], b: &[f32], rtol: f32, atol: f32, msg: &str) {
    assert_eq!(a.len(), b.len(), "{}: length mismatch", msg);
    for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        let diff = (x - y).abs();
        let tol = atol + rtol * y.abs();
        assert!(
            diff <= tol,
            "{}: element {} differs: {} vs {} (diff={}, tol={})",
            msg,
            i,
            x,
            y,
            diff,
            tol
        );
    }
}

/// Returns (rtol, atol) tolerance pair for a given dtype
pub fn tolerance_for_dtype(dtype: DType) -> (f64, f64) {
    match dtype {
        DType::F32 => (1e-5, 1e-5),
        DType::F64 => (1e-12, 1e-12),
        DType::F16 => (1e-2, 5e-2), // 1% relative tolerance for half-precision
        _ => (1e-5, 1e-6),
    }
}

/// Deterministic values in [-1, 1), rounded to multiples of 1/16 so every
/// value is exact in f16
pub fn random_values(seed: u64, len: usize) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len)
        .map(|_| f64::from(rng.gen_range(-16i32..16)) / 16.0)
        .collect()
}

/// Build a tensor of `dtype` from f64 values
pub fn tensor_from_f64(values: &[f64], shape: &[usize], dtype: DType) -> Tensor {
    match dtype {
        DType::F64 => Tensor::from_slice(values, shape).unwrap(),
        DType::F32 => {
            let data: Vec<f32> = values.iter().map(|&v| v as f32).collect();
            Tensor::from_slice(&data, shape).unwrap()
        }
        DType::F16 => {
            let data: Vec<half::f16> = values.iter().map(|&v| half::f16::from_f64(v)).collect();
            Tensor::from_slice(&data, shape).unwrap()
        }
        other => panic!("no test tensors for {}", other),
    }
}

/// Build an unbound Conv node over X, W and an optional B
pub fn conv_node(x: Tensor, w: Tensor, bias: Option<Tensor>, attrs: Attributes) -> Node {
    let dtype = x.dtype();
    let mut node = Node::new("conv", "Conv", 11).with_input(x).with_input(w);
    if let Some(b) = bias {
        node = node.with_input(b);
    }
    node.with_output(Tensor::placeholder(dtype))
        .with_attributes(attrs)
}

/// Bind, reshape and compute a Conv node, returning Y as f64
pub fn run_conv(node: &mut Node) -> Vec<f64> {
    node.bind().unwrap();
    node.run().unwrap();
    node.outputs[0].to_f64_vec().unwrap()
}

/// Configuration of a reference convolution
pub struct RefConv<'a> {
    pub x_shape: &'a [usize],
    pub w_shape: &'a [usize],
    pub y_shape: &'a [usize],
    pub pads: &'a [i64],
    pub strides: &'a [usize],
    pub dilations: &'a [usize],
    pub group: usize,
}

fn row_major(index: &[usize], dims: &[usize]) -> usize {
    index.iter().zip(dims).fold(0, |acc, (&i, &d)| acc * d + i)
}

fn unravel(mut flat: usize, dims: &[usize]) -> Vec<usize> {
    let mut index = vec![0; dims.len()];
    for axis in (0..dims.len()).rev() {
        index[axis] = flat % dims[axis];
        flat /= dims[axis];
    }
    index
}

/// Direct definition of grouped N-d convolution, accumulated in f64
pub fn reference_conv(cfg: &RefConv<'_>, x: &[f64], w: &[f64], bias: Option<&[f64]>) -> Vec<f64> {
    let k = cfg.x_shape.len() - 2;
    let (n_batch, c_in) = (cfg.x_shape[0], cfg.x_shape[1]);
    let (c_out, c_per_group) = (cfg.w_shape[0], cfg.w_shape[1]);
    let x_spatial = &cfg.x_shape[2..];
    let w_spatial = &cfg.w_shape[2..];
    let y_spatial = &cfg.y_shape[2..];
    let out_per_group = c_out / cfg.group;
    assert_eq!(c_in, c_per_group * cfg.group);

    let out_positions: usize = y_spatial.iter().product();
    let taps: usize = w_spatial.iter().product();
    let mut y = Vec::with_capacity(n_batch * c_out * out_positions);

    for n in 0..n_batch {
        for m in 0..c_out {
            let g = m / out_per_group;
            for flat_out in 0..out_positions {
                let o = unravel(flat_out, y_spatial);
                let mut acc = bias.map_or(0.0, |b| b[m]);
                for c in 0..c_per_group {
                    for flat_tap in 0..taps {
                        let t = unravel(flat_tap, w_spatial);
                        let mut pos = Vec::with_capacity(k);
                        for i in 0..k {
                            let p = (o[i] * cfg.strides[i] + t[i] * cfg.dilations[i]) as i64
                                - cfg.pads[i];
                            pos.push(p);
                        }
                        if pos
                            .iter()
                            .zip(x_spatial)
                            .any(|(&p, &dim)| p < 0 || p >= dim as i64)
                        {
                            continue;
                        }
                        let pos: Vec<usize> = pos.iter().map(|&p| p as usize).collect();

                        let mut x_index = vec![n, g * c_per_group + c];
                        x_index.extend_from_slice(&pos);
                        let mut w_index = vec![m, c];
                        w_index.extend_from_slice(&t);
                        acc += x[row_major(&x_index, cfg.x_shape)]
                            * w[row_major(&w_index, cfg.w_shape)];
                    }
                }
                y.push(acc);
            }
        }
    }
    y
}
