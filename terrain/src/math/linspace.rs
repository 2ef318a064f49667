use num_traits::{Float, FromPrimitive};

/// Yields `steps + 1` evenly spaced values from `start` to `end`,
/// endpoints included. `steps == 0` yields `start` alone.
pub(crate) fn linspace<T>(start: T, end: T, steps: usize) -> impl Iterator<Item = T>
where
    T: Float + FromPrimitive,
{
    let dy = if steps == 0 {
        T::zero()
    } else {
        (end - start) / T::from_usize(steps).unwrap()
    };
    (0..=steps).map(move |i| start + T::from_usize(i).unwrap() * dy)
}
