//! Direct N-dimensional convolution kernel.
//!
//! Grouped, strided, dilated cross-correlation over any number of spatial axes,
//! without an im2col transformation. Positions that fall outside the input read
//! as zero, which is how padding is realized.

use super::params::ConvParams;
use super::shape::to_i64;
use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::tensor::index::{advance, flatten};
use crate::tensor::Tensor;
use num_traits::Zero;
#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Geometry shared by every output plane of one compute call.
struct ConvGeometry<'a> {
    /// Input channels (all groups)
    c_in: usize,
    /// Output channels `M`
    c_out: usize,
    /// Input channels seen by each output channel, `W.shape[1]`
    c_per_group: usize,
    group: usize,
    x_spatial: &'a [usize],
    kernel: &'a [usize],
    y_spatial: &'a [usize],
    strides: &'a [usize],
    dilations: &'a [usize],
    /// Begin pad per spatial axis
    pads: &'a [i64],
}

/// Compute `Y = conv(X, W) + B` for one element type.
///
/// `pads` are the effective pads of the last shape-inference pass (begins
/// first), and `y` must already have the inferred shape. Accumulation happens
/// in `T::Accum` and is narrowed once per output element.
///
/// Shapes are checked up front; a mismatch is reported rather than read out
/// of bounds.
pub fn conv_nd<T: Element>(
    params: &ConvParams,
    pads: &[i64],
    x: &Tensor,
    w: &Tensor,
    bias: Option<&Tensor>,
    y: &mut Tensor,
) -> Result<()> {
    const OP: &str = "Conv";

    let x_shape = x.shape();
    let w_shape = w.shape();
    let ndim = x_shape.len();
    let nspatial = params.spatial_rank();

    if ndim < 2 || ndim != nspatial + 2 {
        return Err(Error::invalid_argument(
            "X",
            format!("{} configured for {} spatial axes, got rank {} input", OP, nspatial, ndim),
        ));
    }
    if w_shape.len() != ndim {
        return Err(Error::invalid_argument(
            "W",
            format!("{} weight rank {} differs from input rank {}", OP, w_shape.len(), ndim),
        ));
    }
    if pads.len() < nspatial {
        return Err(Error::invalid_argument(
            "pads",
            format!("{} needs {} begin pads, have {}", OP, nspatial, pads.len()),
        ));
    }

    let c_in = x_shape[1];
    let c_out = w_shape[0];
    let c_per_group = w_shape[1];
    let group = params.group;
    if c_per_group * group != c_in {
        return Err(Error::invalid_argument(
            "group",
            format!(
                "{} input has {} channels but weight expects {} x {} groups",
                OP, c_in, c_per_group, group
            ),
        ));
    }
    if c_out % group != 0 {
        return Err(Error::invalid_argument(
            "group",
            format!("{} requires M ({}) to be divisible by group ({})", OP, c_out, group),
        ));
    }

    let y_shape = y.shape().to_vec();
    if y_shape.len() != ndim || y_shape[0] != x_shape[0] || y_shape[1] != c_out {
        let mut expected = y_shape.clone();
        expected.resize(ndim, 0);
        expected[0] = x_shape[0];
        expected[1] = c_out;
        return Err(Error::shape_mismatch(&expected, &y_shape));
    }

    let bias = match bias {
        Some(b) => {
            if b.shape() != [c_out] {
                return Err(Error::shape_mismatch(&[c_out], b.shape()));
            }
            Some(b.as_slice::<T>()?)
        }
        None => None,
    };

    let geometry = ConvGeometry {
        c_in,
        c_out,
        c_per_group,
        group,
        x_spatial: &x_shape[2..],
        kernel: &w_shape[2..],
        y_spatial: &y_shape[2..],
        strides: &params.strides,
        dilations: &params.dilations,
        pads: &pads[..nspatial],
    };

    let x_data = x.as_slice::<T>()?;
    let w_data = w.as_slice::<T>()?;
    let y_data = y.as_mut_slice::<T>()?;

    let plane: usize = geometry.y_spatial.iter().product();
    if y_data.is_empty() || plane == 0 {
        return Ok(());
    }

    // Planes are independent; each (batch, output channel) pair writes its own chunk.
    #[cfg(feature = "rayon")]
    y_data
        .par_chunks_mut(plane)
        .enumerate()
        .for_each(|(idx, out)| {
            conv_plane(&geometry, x_data, w_data, bias, idx / c_out, idx % c_out, out)
        });

    #[cfg(not(feature = "rayon"))]
    y_data
        .chunks_mut(plane)
        .enumerate()
        .for_each(|(idx, out)| {
            conv_plane(&geometry, x_data, w_data, bias, idx / c_out, idx % c_out, out)
        });

    Ok(())
}

/// Fill the output plane of batch `n`, output channel `m`.
fn conv_plane<T: Element>(
    geo: &ConvGeometry<'_>,
    x: &[T],
    w: &[T],
    bias: Option<&[T]>,
    n: usize,
    m: usize,
    out: &mut [T],
) {
    let nspatial = geo.y_spatial.len();
    let group_index = m * geo.group / geo.c_out;
    let x_plane: usize = geo.x_spatial.iter().product();
    let kernel_numel: usize = geo.kernel.iter().product();
    let x_batch = n * geo.c_in * x_plane;
    let x_group = x_batch + group_index * geo.c_per_group * x_plane;
    let w_filter = m * geo.c_per_group * kernel_numel;

    let mut o = vec![0usize; nspatial];
    let mut base = vec![0i64; nspatial];
    let mut tap = vec![0usize; nspatial];
    let mut pos = vec![0usize; nspatial];

    for slot in out.iter_mut() {
        for i in 0..nspatial {
            base[i] = to_i64(o[i])
                .saturating_mul(to_i64(geo.strides[i]))
                .saturating_sub(geo.pads[i]);
        }

        let mut sum = T::Accum::zero();
        if kernel_numel > 0 {
            tap.fill(0);
            loop {
                let inside = (0..nspatial).all(|i| {
                    // saturated positions land past the input and are skipped
                    let p = base[i].saturating_add(
                        to_i64(tap[i]).saturating_mul(to_i64(geo.dilations[i])),
                    );
                    if p >= 0 && (p as usize) < geo.x_spatial[i] {
                        pos[i] = p as usize;
                        true
                    } else {
                        false
                    }
                });

                // Outside the input is implicit zero padding: contributes nothing.
                if inside {
                    let x_off = x_group + flatten(&pos, geo.x_spatial);
                    let w_off = w_filter + flatten(&tap, geo.kernel);
                    for ch in 0..geo.c_per_group {
                        let v = x[x_off + ch * x_plane].widen();
                        let k = w[w_off + ch * kernel_numel].widen();
                        sum = sum + v * k;
                    }
                }

                if !advance(&mut tap, geo.kernel) {
                    break;
                }
            }
        }

        if let Some(b) = bias {
            sum = sum + b[m].widen();
        }
        *slot = T::narrow(sum);

        advance(&mut o, geo.y_spatial);
    }
}
