pub use enclose::*;

/// Builds a [`Formula`](crate::Formula), cloning the listed handles into the
/// computation.
///
/// ```
/// use timeline::{formula, Cell, Timeline};
///
/// let timeline = Timeline::new();
/// let a = Cell::new(&timeline, 2);
/// let b = Cell::new(&timeline, 3);
/// let sum = formula!(&timeline, (a, b) => a.read() + b.read());
/// assert_eq!(sum.read(), 5);
/// ```
#[macro_export]
macro_rules! formula {
    ($timeline:expr, ( $($d_tt:tt)* ) => $($b:tt)*) => {
        $crate::Formula::new($timeline, $crate::macros::enclose!(($( $d_tt )*) move || { $($b)* }))
    };
    ($timeline:expr, => $($b:tt)*) => {
        $crate::Formula::new($timeline, move || { $($b)* })
    };
}
