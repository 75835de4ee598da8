//! Capability flags and the historical variant presets.
//!
//! The engine family grew in four steps. Rather than four engines, the model
//! is one engine parameterised by a [`Capabilities`] set; the presets below
//! reproduce each step.
//!
//! | Variant | transform | divide | prog. rd burst | prog. wr burst | single-outstanding rd |
//! |---------|-----------|--------|----------------|----------------|-----------------------|
//! | `basic` | –         | –      | –              | –              | yes                   |
//! | `pipelined` | –     | –      | –              | –              | –                     |
//! | `multiply` | yes    | –      | –              | –              | –                     |
//! | `multiply-divide` | yes | yes | yes           | yes            | –                     |

use std::fmt;
use std::str::FromStr;

/// Feature set of one engine instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Capabilities {
    /// Stage 1 (multiply by coefficient) is present.
    pub has_transform_pipeline: bool,
    /// Stage 2 (`* 5243 >> 21`, ≈ ÷400) follows stage 1.
    pub has_divide_stage: bool,
    /// Read burst size is a CSR instead of a constant.
    pub programmable_read_burst: bool,
    /// Write burst size is a CSR instead of a constant.
    pub programmable_write_burst: bool,
    /// Read master waits for each burst's data phase before the next command.
    pub single_outstanding_read: bool,
}

impl Capabilities {
    /// Transform pipeline depth in stages (0, 1 or 2).
    pub const fn transform_stages(&self) -> u32 {
        match (self.has_transform_pipeline, self.has_divide_stage) {
            (false, _) => 0,
            (true, false) => 1,
            (true, true) => 2,
        }
    }
}

/// Preset capability sets of the engine family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    /// Fixed bursts, plain copy, one read burst in flight.
    Basic,
    /// Fixed bursts, plain copy, pipelined read commands.
    Pipelined,
    /// Fixed bursts, single-stage multiply, coefficient at index 5.
    Multiply,
    /// Programmable bursts, multiply + divide, coefficient at index 7.
    MultiplyDivide,
}

impl Variant {
    /// Every preset, oldest first.
    pub const ALL: [Self; 4] = [
        Self::Basic,
        Self::Pipelined,
        Self::Multiply,
        Self::MultiplyDivide,
    ];

    /// Capability set of this preset.
    pub const fn capabilities(self) -> Capabilities {
        match self {
            Self::Basic => Capabilities {
                has_transform_pipeline: false,
                has_divide_stage: false,
                programmable_read_burst: false,
                programmable_write_burst: false,
                single_outstanding_read: true,
            },
            Self::Pipelined => Capabilities {
                has_transform_pipeline: false,
                has_divide_stage: false,
                programmable_read_burst: false,
                programmable_write_burst: false,
                single_outstanding_read: false,
            },
            Self::Multiply => Capabilities {
                has_transform_pipeline: true,
                has_divide_stage: false,
                programmable_read_burst: false,
                programmable_write_burst: false,
                single_outstanding_read: false,
            },
            Self::MultiplyDivide => Capabilities {
                has_transform_pipeline: true,
                has_divide_stage: true,
                programmable_read_burst: true,
                programmable_write_burst: true,
                single_outstanding_read: false,
            },
        }
    }

    /// Command-line name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Pipelined => "pipelined",
            Self::Multiply => "multiply",
            Self::MultiplyDivide => "multiply-divide",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unknown variant name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown variant '{}' (expected basic, pipelined, multiply or multiply-divide)",
            self.0
        )
    }
}

impl std::error::Error for UnknownVariant {}

impl FromStr for Variant {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "basic" | "v1" => Ok(Self::Basic),
            "pipelined" | "v2" => Ok(Self::Pipelined),
            "multiply" | "mul" | "v3" => Ok(Self::Multiply),
            "multiply-divide" | "muldiv" | "v4" => Ok(Self::MultiplyDivide),
            _ => Err(UnknownVariant(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_stage_count() {
        assert_eq!(Variant::Basic.capabilities().transform_stages(), 0);
        assert_eq!(Variant::Multiply.capabilities().transform_stages(), 1);
        assert_eq!(Variant::MultiplyDivide.capabilities().transform_stages(), 2);
    }

    #[test]
    fn only_basic_is_single_outstanding() {
        let single: Vec<_> = Variant::ALL
            .into_iter()
            .filter(|v| v.capabilities().single_outstanding_read)
            .collect();
        assert_eq!(single, vec![Variant::Basic]);
    }

    #[test]
    fn parse_names() {
        for v in Variant::ALL {
            assert_eq!(v.name().parse::<Variant>(), Ok(v));
        }
        assert_eq!(" MulDiv ".parse::<Variant>(), Ok(Variant::MultiplyDivide));
        assert!("dma9000".parse::<Variant>().is_err());
    }
}
