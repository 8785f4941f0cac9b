//! Output shape and effective padding for a Conv node.

use super::params::{AutoPad, ConvParams};
use crate::error::{Error, Result};

/// Result of one shape-inference pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvShape {
    /// `[N, M, spatial_out...]`
    pub output: Vec<usize>,
    /// Begin pads for every spatial axis followed by end pads, as applied to
    /// the current input.
    pub pads: Vec<i64>,
}

/// Extent covered by a kernel of `kernel` taps spaced `dilation` apart.
///
/// Fails when the extent does not fit in an `i64`.
#[inline]
pub fn effective_kernel(kernel: i64, dilation: i64) -> Result<i64> {
    (kernel - 1)
        .checked_mul(dilation)
        .and_then(|span| span.checked_add(1))
        .ok_or_else(|| {
            Error::invalid_argument(
                "dilations",
                format!("kernel of {} taps dilated by {} overflows", kernel, dilation),
            )
        })
}

/// Saturating `usize -> i64` for extents and steps.
#[inline]
pub(crate) fn to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// `ceil(n / d)` for `d > 0`, exact for negative `n`.
#[inline]
pub fn ceil_div(n: i64, d: i64) -> i64 {
    let q = n.div_euclid(d);
    if n.rem_euclid(d) != 0 {
        q + 1
    } else {
        q
    }
}

/// Begin/end padding that makes the output extent `ceil(input / stride)`.
///
/// The odd pixel of an uneven split goes to the end for `SAME_UPPER` and to
/// the beginning for `SAME_LOWER`.
pub fn same_padding(input: i64, kernel: i64, stride: i64, lower: bool) -> Result<(i64, i64)> {
    let output = ceil_div(input, stride);
    let needed = if output > 0 {
        // (output - 1) * stride < input, so only the kernel term can overflow
        ((output - 1) * stride)
            .checked_add(kernel)
            .map(|span| (span - input).max(0))
            .ok_or_else(|| {
                Error::invalid_argument(
                    "kernel_shape",
                    format!("SAME padding for a kernel spanning {} overflows", kernel),
                )
            })?
    } else {
        0
    };
    let begin = if lower { needed - needed / 2 } else { needed / 2 };
    Ok((begin, needed - begin))
}

/// Infer the output shape of a Conv node for the given input and weight shapes.
///
/// Batch is copied from `X`; the channel axis is `M = W.shape[0]`. Each spatial
/// extent follows the node's `auto_pad` policy, using the dilated kernel
/// extent `(k - 1) * d + 1`:
///
/// | mode | pads | output |
/// |---|---|---|
/// | `VALID` | 0, 0 | `ceil((x - k + 1) / s)` |
/// | `NOTSET` | configured | `floor((x + pb + pe - k) / s) + 1` |
/// | `SAME_*` | derived | `ceil(x / s)` |
///
/// Pads are recomputed from the configuration on every call. Under `VALID`
/// and `NOTSET` a kernel that does not fit inside the (padded) input is
/// rejected, as is any configuration whose arithmetic overflows `i64`.
pub fn infer_conv_shape(
    params: &ConvParams,
    x_shape: &[usize],
    w_shape: &[usize],
) -> Result<ConvShape> {
    let ndim = x_shape.len();
    if ndim < 2 {
        return Err(Error::invalid_argument(
            "X",
            format!("Conv expects rank >= 2 input, got rank {}", ndim),
        ));
    }
    let nspatial = params.spatial_rank();
    if nspatial != ndim - 2 {
        return Err(Error::invalid_argument(
            "kernel_shape",
            format!(
                "{} spatial axes configured for rank {} input ({} expected)",
                nspatial,
                ndim,
                ndim - 2
            ),
        ));
    }
    if w_shape.len() != ndim {
        return Err(Error::invalid_argument(
            "W",
            format!("Conv weight rank {} differs from input rank {}", w_shape.len(), ndim),
        ));
    }

    let mut pads = params.pads.clone();
    let mut output = Vec::with_capacity(ndim);
    output.push(x_shape[0]);
    output.push(w_shape[0]);

    for axis in 0..nspatial {
        let kernel = params.kernel_shape[axis];
        if kernel < 1 {
            return Err(Error::invalid_argument(
                "kernel_shape",
                format!("kernel extent {} on spatial axis {} must be positive", kernel, axis),
            ));
        }
        if to_i64(w_shape[axis + 2]) != kernel {
            let configured: Vec<usize> =
                params.kernel_shape.iter().map(|&k| k.max(0) as usize).collect();
            return Err(Error::shape_mismatch(&configured, &w_shape[2..]));
        }

        let input = to_i64(x_shape[axis + 2]);
        let stride = to_i64(params.strides[axis]);
        let kernel = effective_kernel(kernel, to_i64(params.dilations[axis]))?;
        let (begin, end) = (axis, axis + nspatial);
        let too_small = |span: i64| {
            Error::invalid_argument(
                "X",
                format!(
                    "spatial axis {} spans {} (padded), too small for a kernel spanning {}",
                    axis, span, kernel
                ),
            )
        };

        let extent = match params.auto_pad {
            AutoPad::Valid => {
                pads[begin] = 0;
                pads[end] = 0;
                if input < kernel {
                    return Err(too_small(input));
                }
                ceil_div(input - kernel + 1, stride)
            }
            AutoPad::NotSet => {
                let span = input
                    .checked_add(pads[begin])
                    .and_then(|v| v.checked_add(pads[end]))
                    .ok_or_else(|| {
                        Error::invalid_argument(
                            "pads",
                            format!(
                                "padding {} + {} on spatial axis {} overflows",
                                pads[begin], pads[end], axis
                            ),
                        )
                    })?;
                if span < kernel {
                    return Err(too_small(span));
                }
                // span - kernel >= 0 and stride >= 1, so the quotient is below i64::MAX
                (span - kernel) / stride + 1
            }
            AutoPad::SameUpper | AutoPad::SameLower => {
                let lower = params.auto_pad == AutoPad::SameLower;
                (pads[begin], pads[end]) = same_padding(input, kernel, stride, lower)?;
                ceil_div(input, stride)
            }
        };

        output.push(extent as usize);
    }

    Ok(ConvShape { output, pads })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Attributes;

    fn params_1d(auto_pad: &str, kernel: i64, stride: i64) -> ConvParams {
        let attrs = Attributes::new()
            .with_string("auto_pad", auto_pad)
            .with_ints("kernel_shape", &[kernel])
            .with_ints("strides", &[stride]);
        ConvParams::from_attributes(&attrs).unwrap()
    }

    #[test]
    fn test_ceil_div() {
        assert_eq!(ceil_div(7, 2), 4);
        assert_eq!(ceil_div(8, 2), 4);
        assert_eq!(ceil_div(0, 3), 0);
        assert_eq!(ceil_div(-3, 2), -1);
        assert_eq!(ceil_div(-4, 2), -2);
    }

    #[test]
    fn test_valid() {
        let shape = infer_conv_shape(&params_1d("VALID", 3, 1), &[1, 1, 7], &[1, 1, 3]).unwrap();
        assert_eq!(shape.output, vec![1, 1, 5]);
        assert_eq!(shape.pads, vec![0, 0]);

        let shape = infer_conv_shape(&params_1d("VALID", 3, 2), &[1, 1, 8], &[1, 1, 3]).unwrap();
        assert_eq!(shape.output, vec![1, 1, 3]);
    }

    #[test]
    fn test_same_upper_even_split() {
        let shape =
            infer_conv_shape(&params_1d("SAME_UPPER", 3, 2), &[1, 1, 7], &[1, 1, 3]).unwrap();
        assert_eq!(shape.output, vec![1, 1, 4]);
        assert_eq!(shape.pads, vec![1, 1]);

        let shape =
            infer_conv_shape(&params_1d("SAME_LOWER", 3, 2), &[1, 1, 7], &[1, 1, 3]).unwrap();
        assert_eq!(shape.pads, vec![1, 1]);
    }

    #[test]
    fn test_same_odd_split() {
        let upper =
            infer_conv_shape(&params_1d("SAME_UPPER", 3, 2), &[1, 1, 8], &[1, 1, 3]).unwrap();
        assert_eq!(upper.output, vec![1, 1, 4]);
        assert_eq!(upper.pads, vec![0, 1]);

        let lower =
            infer_conv_shape(&params_1d("SAME_LOWER", 3, 2), &[1, 1, 8], &[1, 1, 3]).unwrap();
        assert_eq!(lower.output, vec![1, 1, 4]);
        assert_eq!(lower.pads, vec![1, 0]);
    }

    #[test]
    fn test_same_never_pads_negative() {
        // stride larger than the kernel: no padding is needed
        assert_eq!(same_padding(8, 1, 4, false).unwrap(), (0, 0));
        assert_eq!(same_padding(0, 3, 1, true).unwrap(), (0, 0));
    }

    #[test]
    fn test_notset_uses_configured_pads() {
        let attrs = Attributes::new()
            .with_ints("kernel_shape", &[3, 3])
            .with_ints("pads", &[1, 0, 1, 2]);
        let params = ConvParams::from_attributes(&attrs).unwrap();
        let shape = infer_conv_shape(&params, &[2, 3, 5, 5], &[4, 3, 3, 3]).unwrap();
        // h: 5 + 1 + 1 - 3 + 1 = 5, w: 5 + 0 + 2 - 3 + 1 = 5
        assert_eq!(shape.output, vec![2, 4, 5, 5]);
        assert_eq!(shape.pads, vec![1, 0, 1, 2]);
    }

    #[test]
    fn test_output_channels_come_from_weight() {
        let params = params_1d("VALID", 1, 1);
        let shape = infer_conv_shape(&params, &[3, 2, 4], &[5, 2, 1]).unwrap();
        assert_eq!(shape.output, vec![3, 5, 4]);
    }

    #[test]
    fn test_dilation_widens_kernel() {
        let attrs = Attributes::new()
            .with_string("auto_pad", "VALID")
            .with_ints("kernel_shape", &[3])
            .with_ints("dilations", &[2]);
        let params = ConvParams::from_attributes(&attrs).unwrap();
        let shape = infer_conv_shape(&params, &[1, 1, 7], &[1, 1, 3]).unwrap();
        assert_eq!(shape.output, vec![1, 1, 3]);
    }

    #[test]
    fn test_kernel_larger_than_input_rejected_under_valid() {
        let params = params_1d("VALID", 5, 1);
        let err = infer_conv_shape(&params, &[1, 1, 2], &[1, 1, 5]);
        assert!(matches!(err, Err(Error::InvalidArgument { arg: "X", .. })));
    }

    #[test]
    fn test_valid_rejects_kernel_that_does_not_fit() {
        // x - k + 1 == 0
        let err = infer_conv_shape(&params_1d("VALID", 3, 1), &[1, 1, 2], &[1, 1, 3]);
        assert!(matches!(err, Err(Error::InvalidArgument { arg: "X", .. })));
        // ceil(-1 / 2) == 0
        let err = infer_conv_shape(&params_1d("VALID", 3, 2), &[1, 1, 1], &[1, 1, 3]);
        assert!(matches!(err, Err(Error::InvalidArgument { arg: "X", .. })));
        // exact fit is one window
        let shape = infer_conv_shape(&params_1d("VALID", 3, 2), &[1, 1, 3], &[1, 1, 3]).unwrap();
        assert_eq!(shape.output, vec![1, 1, 1]);
    }

    #[test]
    fn test_notset_rejects_kernel_that_does_not_fit() {
        let err = infer_conv_shape(&params_1d("NOTSET", 3, 2), &[1, 1, 1], &[1, 1, 3]);
        assert!(matches!(err, Err(Error::InvalidArgument { arg: "X", .. })));

        // padding can make it fit
        let attrs = Attributes::new()
            .with_ints("kernel_shape", &[3])
            .with_ints("strides", &[2])
            .with_ints("pads", &[1, 1]);
        let params = ConvParams::from_attributes(&attrs).unwrap();
        let shape = infer_conv_shape(&params, &[1, 1, 1], &[1, 1, 3]).unwrap();
        assert_eq!(shape.output, vec![1, 1, 1]);
    }

    #[test]
    fn test_huge_dilation_is_an_error() {
        let attrs = Attributes::new()
            .with_ints("kernel_shape", &[3])
            .with_ints("dilations", &[i64::MAX / 2 + 1]);
        let params = ConvParams::from_attributes(&attrs).unwrap();
        let err = infer_conv_shape(&params, &[1, 1, 4], &[1, 1, 3]);
        assert!(matches!(
            err,
            Err(Error::InvalidArgument {
                arg: "dilations",
                ..
            })
        ));
    }

    #[test]
    fn test_huge_pads_are_an_error() {
        let attrs = Attributes::new()
            .with_ints("kernel_shape", &[1])
            .with_ints("pads", &[i64::MAX, 1]);
        let params = ConvParams::from_attributes(&attrs).unwrap();
        let err = infer_conv_shape(&params, &[1, 1, 4], &[1, 1, 1]);
        assert!(matches!(err, Err(Error::InvalidArgument { arg: "pads", .. })));
    }

    #[test]
    fn test_same_padding_overflow_is_an_error() {
        assert!(same_padding(4, i64::MAX, 1, false).is_err());
        // odd `needed` near the limit still splits without overflow
        let (begin, end) = same_padding(1, i64::MAX - 1, 1, true).unwrap();
        assert_eq!(begin + end, i64::MAX - 2);
        assert_eq!(begin - end, 1);
    }

    #[test]
    fn test_rank_checks() {
        let params = params_1d("VALID", 3, 1);
        assert!(infer_conv_shape(&params, &[4], &[1, 1, 3]).is_err());
        assert!(infer_conv_shape(&params, &[1, 1, 5, 5], &[1, 1, 3, 3]).is_err());
        assert!(infer_conv_shape(&params, &[1, 1, 5], &[1, 3]).is_err());
    }

    #[test]
    fn test_weight_must_match_kernel_shape() {
        let params = params_1d("VALID", 3, 1);
        assert!(matches!(
            infer_conv_shape(&params, &[1, 1, 5], &[1, 1, 2]),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_degenerate_rank_two() {
        let params = ConvParams::from_attributes(&Attributes::new()).unwrap();
        let shape = infer_conv_shape(&params, &[2, 4], &[3, 4]).unwrap();
        assert_eq!(shape.output, vec![2, 3]);
        assert!(shape.pads.is_empty());
    }

    #[test]
    fn test_pads_recomputed_each_call() {
        let params = params_1d("SAME_UPPER", 3, 2);
        let a = infer_conv_shape(&params, &[1, 1, 8], &[1, 1, 3]).unwrap();
        let b = infer_conv_shape(&params, &[1, 1, 7], &[1, 1, 3]).unwrap();
        let c = infer_conv_shape(&params, &[1, 1, 8], &[1, 1, 3]).unwrap();
        assert_eq!(a.pads, vec![0, 1]);
        assert_eq!(b.pads, vec![1, 1]);
        assert_eq!(a, c);
    }
}
