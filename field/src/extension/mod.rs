use std::ops::{Add, AddAssign, Mul, MulAssign, Sub, SubAssign};

use crate::types::Field;

pub mod complex;
pub mod quartic;

/// A field with an explicit basis over one of its subfields.
pub trait FieldExtension<const D: usize>: Field {
    type BaseField: Field;

    fn to_basefield_array(&self) -> [Self::BaseField; D];

    fn from_basefield_array(arr: [Self::BaseField; D]) -> Self;

    fn from_basefield(x: Self::BaseField) -> Self;

    /// Multiplication by a subfield element, component-wise on the basis.
    fn scalar_mul(&self, scalar: Self::BaseField) -> Self;
}

/// A field `E` that contains `F`, with mixed-operand arithmetic in both
/// operand orders so extension and base elements compose freely.
pub trait ExtensionOf<F: Field>:
    Field
    + From<F>
    + Add<F, Output = Self>
    + AddAssign<F>
    + Sub<F, Output = Self>
    + SubAssign<F>
    + Mul<F, Output = Self>
    + MulAssign<F>
{
    const DEGREE: usize;
}

/// Every field is the trivial extension of itself.
impl<F: Field> ExtensionOf<F> for F {
    const DEGREE: usize = 1;
}
