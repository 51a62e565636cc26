mod tint;

pub use tint::tint;

use num_traits::{Bounded, ToPrimitive};
use std::any::TypeId;

/// Upper bound of a mask subpixel type, used as the blend weight
/// denominator. Float masks are already normalized to `[0, 1]`; integer
/// masks span their full range.
pub(crate) fn normalized_max<T: Bounded + ToPrimitive + 'static>() -> f32 {
    if TypeId::of::<T>() == TypeId::of::<f32>() {
        1.0
    } else {
        T::max_value().to_f32().unwrap_or(1.0)
    }
}
