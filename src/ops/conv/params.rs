//! Convolution configuration read from node attributes.

use crate::error::{Error, Result};
use crate::graph::Attributes;
use tracing::debug;

/// Largest number of begin/end pad slots a configuration may hold.
///
/// Two slots per spatial axis, so at most 16 spatial axes are supported.
pub const MAX_PAD_SLOTS: usize = 32;

/// How spatial padding is derived for each shape-inference pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AutoPad {
    /// No padding; windows never leave the input.
    Valid,
    /// Explicit `pads` attribute.
    #[default]
    NotSet,
    /// Pad so that `out = ceil(in / stride)`, extra pixel at the end.
    SameUpper,
    /// Pad so that `out = ceil(in / stride)`, extra pixel at the beginning.
    SameLower,
}

impl AutoPad {
    /// Exact, case-sensitive match of the attribute spelling.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "VALID" => Some(Self::Valid),
            "NOTSET" => Some(Self::NotSet),
            "SAME_UPPER" => Some(Self::SameUpper),
            "SAME_LOWER" => Some(Self::SameLower),
            _ => None,
        }
    }

    /// Attribute spelling of this mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Valid => "VALID",
            Self::NotSet => "NOTSET",
            Self::SameUpper => "SAME_UPPER",
            Self::SameLower => "SAME_LOWER",
        }
    }
}

/// Normalized Conv configuration
///
/// Built once when a node is bound and immutable afterwards. With `K` spatial
/// axes (`K = kernel_shape.len()`), `dilations` and `strides` hold `K` entries
/// and `pads` holds `2K` (all begins, then all ends).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvParams {
    /// Padding policy
    pub auto_pad: AutoPad,
    /// Number of channel groups (>= 1)
    pub group: usize,
    /// Kernel extent per spatial axis, as configured
    pub kernel_shape: Vec<i64>,
    /// Tap spacing per spatial axis (>= 1)
    pub dilations: Vec<usize>,
    /// Begin pads for every axis followed by end pads for every axis
    pub pads: Vec<i64>,
    /// Step per spatial axis (>= 1)
    pub strides: Vec<usize>,
}

impl ConvParams {
    /// Read and normalize the Conv attributes.
    ///
    /// Missing or malformed values fall back to their defaults (`NOTSET`,
    /// `group = 1`, dilation 1, pad 0, stride 1). Trailing entries are filled
    /// with the default when a list is short; entries past the expected length
    /// are ignored.
    ///
    /// Fails only when the kernel has more spatial axes than [`MAX_PAD_SLOTS`]
    /// allows.
    pub fn from_attributes(attrs: &Attributes) -> Result<Self> {
        let auto_pad_value = attrs.read_string("auto_pad", "NOTSET");
        let auto_pad = AutoPad::parse(auto_pad_value).unwrap_or_else(|| {
            debug!(value = auto_pad_value, "unrecognized auto_pad, using NOTSET");
            AutoPad::NotSet
        });

        let group = positive_or_default("group", attrs.read_int("group", 1));

        let kernel_shape = attrs.read_ints("kernel_shape").to_vec();
        let nspatial = kernel_shape.len();
        if nspatial * 2 > MAX_PAD_SLOTS {
            return Err(Error::UnsupportedRank {
                op: "Conv",
                max: MAX_PAD_SLOTS / 2,
                got: nspatial,
            });
        }

        let dilations = fill_list(attrs.read_ints("dilations"), nspatial, 1)
            .into_iter()
            .map(|d| positive_or_default("dilations", d))
            .collect();
        let pads = fill_list(attrs.read_ints("pads"), nspatial * 2, 0);
        let strides = fill_list(attrs.read_ints("strides"), nspatial, 1)
            .into_iter()
            .map(|s| positive_or_default("strides", s))
            .collect();

        Ok(Self {
            auto_pad,
            group,
            kernel_shape,
            dilations,
            pads,
            strides,
        })
    }

    /// Number of spatial axes `K`.
    #[inline]
    pub fn spatial_rank(&self) -> usize {
        self.kernel_shape.len()
    }
}

/// Copy up to `len` entries of `values`, padding the tail with `default`.
fn fill_list(values: &[i64], len: usize, default: i64) -> Vec<i64> {
    let mut out = Vec::with_capacity(len);
    out.extend(values.iter().take(len).copied());
    out.resize(len, default);
    out
}

fn positive_or_default(name: &'static str, value: i64) -> usize {
    if value >= 1 {
        value as usize
    } else {
        debug!(attribute = name, value, "non-positive value, using 1");
        1
    }
}
