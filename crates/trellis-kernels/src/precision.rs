//! Mixed-precision arithmetic policy.
//!
//! A kernel invocation mixes up to three value types: the matrix type, the
//! input (right-hand side) type, and the output type. All loads are widened
//! into a single working precision — the widest of the three under the
//! ordering f32 < f64 and real < complex of the same width — and every
//! store back narrows with the target's round-to-nearest.
//!
//! [`Promote`] is the type-level max of two scalar types; [`Widest`] folds it
//! over a (matrix, input, output) tuple. [`Arithmetic`] bundles the
//! conversions a kernel needs so that inner loops carry a single bound.

use num_complex::{Complex32, Complex64};
use num_traits::NumAssign;
use std::fmt::Debug;

/// Value type storable in the containers.
pub trait Scalar: Copy + Send + Sync + PartialEq + Debug + 'static {}

impl Scalar for f32 {}
impl Scalar for f64 {}
impl Scalar for Complex32 {}
impl Scalar for Complex64 {}

/// Scalar usable as a working precision: closed under +, *, and zero.
pub trait ArithScalar: Scalar + NumAssign {}

impl ArithScalar for f32 {}
impl ArithScalar for f64 {}
impl ArithScalar for Complex32 {}
impl ArithScalar for Complex64 {}

/// Lossless widening of a storage scalar into a working-precision scalar.
pub trait PromoteFrom<T>: Sized {
    fn promote(value: T) -> Self;
}

/// Narrowing of a working-precision scalar back into a storage scalar,
/// rounding to nearest even where precision is lost.
pub trait DemoteInto<T>: Sized {
    fn demote(self) -> T;
}

impl PromoteFrom<f32> for f32 {
    #[inline]
    fn promote(value: f32) -> Self {
        value
    }
}

impl PromoteFrom<f32> for f64 {
    #[inline]
    fn promote(value: f32) -> Self {
        Self::from(value)
    }
}

impl PromoteFrom<f64> for f64 {
    #[inline]
    fn promote(value: f64) -> Self {
        value
    }
}

impl PromoteFrom<f32> for Complex32 {
    #[inline]
    fn promote(value: f32) -> Self {
        Self::new(value, 0.0)
    }
}

impl PromoteFrom<Complex32> for Complex32 {
    #[inline]
    fn promote(value: Complex32) -> Self {
        value
    }
}

impl PromoteFrom<f32> for Complex64 {
    #[inline]
    fn promote(value: f32) -> Self {
        Self::new(value.into(), 0.0)
    }
}

impl PromoteFrom<f64> for Complex64 {
    #[inline]
    fn promote(value: f64) -> Self {
        Self::new(value, 0.0)
    }
}

impl PromoteFrom<Complex32> for Complex64 {
    #[inline]
    fn promote(value: Complex32) -> Self {
        Self::new(value.re.into(), value.im.into())
    }
}

impl PromoteFrom<Complex64> for Complex64 {
    #[inline]
    fn promote(value: Complex64) -> Self {
        value
    }
}

impl DemoteInto<f32> for f32 {
    #[inline]
    fn demote(self) -> f32 {
        self
    }
}

impl DemoteInto<f32> for f64 {
    #[inline]
    fn demote(self) -> f32 {
        #[allow(clippy::cast_possible_truncation)]
        {
            self as f32
        }
    }
}

impl DemoteInto<f64> for f64 {
    #[inline]
    fn demote(self) -> f64 {
        self
    }
}

impl DemoteInto<Complex32> for Complex32 {
    #[inline]
    fn demote(self) -> Complex32 {
        self
    }
}

impl DemoteInto<Complex32> for Complex64 {
    #[inline]
    fn demote(self) -> Complex32 {
        #[allow(clippy::cast_possible_truncation)]
        {
            Complex32::new(self.re as f32, self.im as f32)
        }
    }
}

impl DemoteInto<Complex64> for Complex64 {
    #[inline]
    fn demote(self) -> Complex64 {
        self
    }
}

/// Type-level max of two scalar types.
///
/// Width and domain combine independently: pairing a real with a complex
/// type yields the complex type of the wider component width.
pub trait Promote<Rhs: Scalar>: Scalar {
    type Widest: Scalar;
}

macro_rules! promote_impl {
    ($($lhs:ty, $rhs:ty => $widest:ty;)*) => {
        $(
            impl Promote<$rhs> for $lhs {
                type Widest = $widest;
            }
        )*
    };
}

promote_impl! {
    f32, f32 => f32;
    f32, f64 => f64;
    f32, Complex32 => Complex32;
    f32, Complex64 => Complex64;
    f64, f32 => f64;
    f64, f64 => f64;
    f64, Complex32 => Complex64;
    f64, Complex64 => Complex64;
    Complex32, f32 => Complex32;
    Complex32, f64 => Complex64;
    Complex32, Complex32 => Complex32;
    Complex32, Complex64 => Complex64;
    Complex64, f32 => Complex64;
    Complex64, f64 => Complex64;
    Complex64, Complex32 => Complex64;
    Complex64, Complex64 => Complex64;
}

/// The working precision of a (matrix, input, output) value-type tuple.
pub type Widest<MV, IV, OV> = <<MV as Promote<IV>>::Widest as Promote<OV>>::Widest;

/// Working-precision hub for a (matrix, input, output) value-type tuple:
/// promotes from each operand type and demotes into the output type.
pub trait Arithmetic<MV, IV, OV>:
    ArithScalar + PromoteFrom<MV> + PromoteFrom<IV> + PromoteFrom<OV> + DemoteInto<OV>
{
}

impl<A, MV, IV, OV> Arithmetic<MV, IV, OV> for A where
    A: ArithScalar + PromoteFrom<MV> + PromoteFrom<IV> + PromoteFrom<OV> + DemoteInto<OV>
{
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_widest<MV, IV, OV, Expected>()
    where
        MV: Scalar + Promote<IV>,
        IV: Scalar,
        OV: Scalar,
        <MV as Promote<IV>>::Widest: Promote<OV>,
        Widest<MV, IV, OV>: Same<Expected>,
    {
    }

    trait Same<T> {}
    impl<T> Same<T> for T {}

    #[test]
    fn widest_of_uniform_tuples() {
        assert_widest::<f32, f32, f32, f32>();
        assert_widest::<f64, f64, f64, f64>();
        assert_widest::<Complex32, Complex32, Complex32, Complex32>();
    }

    #[test]
    fn widest_mixes_width_and_domain() {
        assert_widest::<f32, f64, f32, f64>();
        assert_widest::<f64, f32, f32, f64>();
        assert_widest::<Complex32, f64, Complex32, Complex64>();
        assert_widest::<f32, Complex32, f32, Complex32>();
    }

    #[test]
    fn demotion_rounds_to_nearest() {
        // 1 + 2^-25 is exactly representable in f64 and rounds down in f32.
        let x = 1.0f64 + 2.0f64.powi(-25);
        let y: f32 = x.demote();
        assert_eq!(y, 1.0f32);
    }

    #[test]
    fn promotion_is_exact() {
        let x = 0.1f32;
        let y: f64 = f64::promote(x);
        assert_eq!(x, y.demote());
    }
}
