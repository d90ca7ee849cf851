//! Pointwise activation functions and their derivatives.

use std::fmt;
use std::str::FromStr;

/// Nonlinearity applied to a layer's pre-activation values.
///
/// The numeric codes (`0`, `1`, `2`) are the ones used by fixed-point
/// hosts to describe a network shape.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Activation {
    /// `f(p) = p`.
    #[default]
    Identity,
    /// `f(p) = tanh(p)`.
    Tanh,
    /// Logistic sigmoid, evaluated as `(1 + tanh(p/2)) / 2`.
    Sigmoid,
}

impl Activation {
    /// Decode a host activation code. Unknown codes decode to
    /// [`Activation::Identity`], matching the host bridge.
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => Self::Tanh,
            2 => Self::Sigmoid,
            _ => Self::Identity,
        }
    }

    /// The host activation code for this variant.
    pub fn code(self) -> i32 {
        match self {
            Self::Identity => 0,
            Self::Tanh => 1,
            Self::Sigmoid => 2,
        }
    }

    /// Apply the activation to a pre-activation value.
    #[inline]
    pub fn apply(self, p: f32) -> f32 {
        match self {
            Self::Identity => p,
            Self::Tanh => p.tanh(),
            // Half-angle form keeps the curve symmetric around p = 0.
            Self::Sigmoid => (1.0 + (p / 2.0).tanh()) / 2.0,
        }
    }

    /// Derivative of the activation, evaluated at the pre-activation `p`.
    #[inline]
    pub fn derivative(self, p: f32) -> f32 {
        match self {
            Self::Identity => 1.0,
            Self::Tanh => {
                let t = p.tanh();
                1.0 - t * t
            }
            Self::Sigmoid => {
                let s = (1.0 + (p / 2.0).tanh()) / 2.0;
                s * (1.0 - s)
            }
        }
    }

    /// Lower-case name, as accepted by [`FromStr`].
    pub fn name(self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Tanh => "tanh",
            Self::Sigmoid => "sigmoid",
        }
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown activation name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownActivation(pub String);

impl fmt::Display for UnknownActivation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown activation function '{}'", self.0)
    }
}

impl std::error::Error for UnknownActivation {}

impl FromStr for Activation {
    type Err = UnknownActivation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "identity" | "none" => Ok(Self::Identity),
            "tanh" => Ok(Self::Tanh),
            "sigmoid" => Ok(Self::Sigmoid),
            other => Err(UnknownActivation(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn codes_round_trip() {
        for act in [Activation::Identity, Activation::Tanh, Activation::Sigmoid] {
            assert_eq!(Activation::from_code(act.code()), act);
        }
    }

    #[test]
    fn unknown_code_is_identity() {
        assert_eq!(Activation::from_code(7), Activation::Identity);
        assert_eq!(Activation::from_code(-1), Activation::Identity);
    }

    #[test]
    fn sigmoid_matches_logistic() {
        for &p in &[-4.0f32, -1.0, 0.0, 0.5, 3.0] {
            let logistic = 1.0 / (1.0 + (-p).exp());
            assert!((Activation::Sigmoid.apply(p) - logistic).abs() < 1e-6);
        }
        assert_eq!(Activation::Sigmoid.apply(0.0), 0.5);
    }

    #[test]
    fn derivatives_at_origin() {
        assert_eq!(Activation::Identity.derivative(0.0), 1.0);
        assert_eq!(Activation::Tanh.derivative(0.0), 1.0);
        assert_eq!(Activation::Sigmoid.derivative(0.0), 0.25);
    }

    #[test]
    fn parse_accepts_none_alias() {
        assert_eq!("none".parse::<Activation>().unwrap(), Activation::Identity);
        assert_eq!("tanh".parse::<Activation>().unwrap(), Activation::Tanh);
        assert!("relu".parse::<Activation>().is_err());
    }

    proptest! {
        #[test]
        fn derivative_matches_finite_difference(p in -3.0f32..3.0) {
            let h = 1e-2f32;
            for act in [Activation::Identity, Activation::Tanh, Activation::Sigmoid] {
                let numeric = (act.apply(p + h) - act.apply(p - h)) / (2.0 * h);
                prop_assert!((numeric - act.derivative(p)).abs() < 1e-3);
            }
        }
    }
}
