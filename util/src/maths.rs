//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Map a value from one range into another.
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where
    T: Float
{
    target_range.0
        + ((value - source_range.0)
        * (target_range.1 - target_range.0)
        / (source_range.1 - source_range.0))
}

/// Return `num` evenly spaced values over the closed interval `[start, stop]`.
///
/// A single value yields `[start]`, zero values yields an empty vector. The
/// last value is exactly `stop` rather than the accumulated step.
pub fn linspace<T>(start: T, stop: T, num: usize) -> Vec<T>
where
    T: Float
{
    match num {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let last = num - 1;
            (0..num)
                .map(|i| {
                    if i == last {
                        stop
                    }
                    else {
                        let i_t = T::from(i).unwrap_or_else(T::zero);
                        let last_t = T::from(last).unwrap_or_else(T::one);
                        lin_map((T::zero(), last_t), (start, stop), i_t)
                    }
                })
                .collect()
        }
    }
}

/// Clamp a value into the range `[min, max]`.
pub fn clamp<T>(value: T, min: T, max: T) -> T
where
    T: Float
{
    value.max(min).min(max)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_linspace() {
        assert_eq!(linspace(75.0, 75.0, 1), vec![75.0]);
        assert_eq!(linspace(10.0, 20.0, 0), Vec::<f64>::new());
        assert_eq!(linspace(0.0, 100.0, 5), vec![0.0, 25.0, 50.0, 75.0, 100.0]);

        let v = linspace(17.3, 311.9, 7);
        assert_eq!(v.len(), 7);
        assert_eq!(v[0], 17.3);
        assert_eq!(v[6], 311.9);
        assert!(v.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(5.0, 0.0, 1.0), 1.0);
        assert_eq!(clamp(-5.0, 0.0, 1.0), 0.0);
        assert_eq!(clamp(0.5, 0.0, 1.0), 0.5);
    }
}
