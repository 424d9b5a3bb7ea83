/// Piecewise (polylinear) continuous scale with an optional power transform.
///
/// The domain is expected in ascending order. Degenerate inputs never produce
/// NaN: a collapsed domain maps to the middle of the range, a zero-width
/// segment maps to its upper range value.
#[derive(Clone, Debug)]
pub struct Scale {
    domain: Vec<f64>,
    range: Vec<f64>,
    exponent: f64,
    clamp: bool,
}

impl Scale {
    pub fn linear(domain: &[f64], range: &[f64]) -> Self {
        Self::pow(1.0, domain, range)
    }

    pub fn sqrt(domain: &[f64], range: &[f64]) -> Self {
        Self::pow(0.5, domain, range)
    }

    pub fn pow(exponent: f64, domain: &[f64], range: &[f64]) -> Self {
        let domain = if domain.is_empty() || domain.iter().any(|value| !value.is_finite()) {
            vec![0.0, 1.0]
        } else {
            domain.to_vec()
        };

        Self {
            domain,
            range: range.to_vec(),
            exponent,
            clamp: false,
        }
    }

    /// Builds a two-point scale over the extent of `values`, falling back to
    /// `[0, 1]` when there are none.
    pub fn over_extent(exponent: f64, values: impl IntoIterator<Item = f64>, range: &[f64]) -> Self {
        let domain = extent(values).map_or([0.0, 1.0], |(min, max)| [min, max]);
        Self::pow(exponent, &domain, range)
    }

    pub fn clamped(mut self) -> Self {
        self.clamp = true;
        self
    }

    pub fn domain(&self) -> &[f64] {
        &self.domain
    }

    fn transform(&self, value: f64) -> f64 {
        if self.exponent == 1.0 {
            value
        } else {
            value.signum() * value.abs().powf(self.exponent)
        }
    }

    pub fn map(&self, value: f64) -> f32 {
        let count = self.domain.len().min(self.range.len());
        match count {
            0 => return 0.0,
            1 => return self.range[0] as f32,
            _ => {}
        }

        let transformed = self
            .domain
            .iter()
            .take(count)
            .map(|value| self.transform(*value))
            .collect::<Vec<_>>();
        let first = transformed[0];
        let last = transformed[count - 1];

        if (last - first).abs() <= f64::EPSILON {
            return ((self.range[0] + self.range[count - 1]) * 0.5) as f32;
        }

        let mut x = self.transform(if value.is_finite() { value } else { 0.0 });
        if self.clamp {
            x = x.clamp(first.min(last), first.max(last));
        }

        let segment = transformed[1..count - 1]
            .iter()
            .take_while(|breakpoint| **breakpoint <= x)
            .count();
        let (d0, d1) = (transformed[segment], transformed[segment + 1]);
        let (r0, r1) = (self.range[segment], self.range[segment + 1]);

        if (d1 - d0).abs() <= f64::EPSILON {
            return r1 as f32;
        }

        let mut t = (x - d0) / (d1 - d0);
        if self.clamp {
            t = t.clamp(0.0, 1.0);
        }
        (r0 + (r1 - r0) * t) as f32
    }
}

pub fn extent(values: impl IntoIterator<Item = f64>) -> Option<(f64, f64)> {
    values
        .into_iter()
        .filter(|value| value.is_finite())
        .fold(None, |acc, value| match acc {
            None => Some((value, value)),
            Some((min, max)) => Some((min.min(value), max.max(value))),
        })
}

/// R-7 quantile (linear interpolation between closest ranks) of unsorted data.
pub fn quantile(values: &[f64], probability: f64) -> Option<f64> {
    let mut sorted = values
        .iter()
        .copied()
        .filter(|value| value.is_finite())
        .collect::<Vec<_>>();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);

    let position = (sorted.len() - 1) as f64 * probability.clamp(0.0, 1.0);
    let lower = position.floor() as usize;
    let upper = (lower + 1).min(sorted.len() - 1);
    let fraction = position - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn sqrt_scale_interpolates_in_sqrt_space() {
        let scale = Scale::sqrt(&[0.0, 100.0], &[4.0, 20.0]);
        assert!(close(scale.map(0.0), 4.0));
        assert!(close(scale.map(25.0), 12.0));
        assert!(close(scale.map(100.0), 20.0));
    }

    #[test]
    fn polylinear_scale_picks_segment() {
        let scale = Scale::linear(&[1.0, 10.0, 200.0], &[1.0, 2.0, 5.0]);
        assert!(close(scale.map(1.0), 1.0));
        assert!(close(scale.map(10.0), 2.0));
        assert!(close(scale.map(105.0), 3.5));
        // unclamped extrapolates past the last breakpoint
        assert!(scale.map(400.0) > 5.0);
    }

    #[test]
    fn clamped_scale_stays_in_range() {
        let scale = Scale::linear(&[0.0, 400.0], &[0.06, 0.01]).clamped();
        assert!(close(scale.map(-20.0), 0.06));
        assert!(close(scale.map(200.0), 0.035));
        assert!(close(scale.map(10_000.0), 0.01));
    }

    #[test]
    fn degenerate_domains_stay_finite() {
        let collapsed = Scale::sqrt(&[42.0, 42.0], &[8.0, 30.0]);
        assert!(close(collapsed.map(42.0), 19.0));
        assert!(collapsed.map(1000.0).is_finite());

        let empty = Scale::over_extent(0.5, std::iter::empty(), &[4.0, 20.0]);
        assert_eq!(empty.domain(), &[0.0, 1.0]);
        assert!(close(empty.map(1.0), 20.0));

        let zero_width_tail = Scale::pow(0.5, &[0.0, 9.0, 9.0], &[2.5, 12.0, 16.0]).clamped();
        assert!(close(zero_width_tail.map(50.0), 16.0));
        assert!(close(zero_width_tail.map(0.0), 2.5));
        assert!(zero_width_tail.map(f64::NAN).is_finite());
    }

    #[test]
    fn quantiles_interpolate_between_ranks() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        assert_eq!(quantile(&values, 0.5), Some(5.5));
        let q90 = quantile(&values, 0.9).unwrap();
        assert!((q90 - 9.1).abs() < 1e-9);
        assert_eq!(quantile(&[], 0.9), None);
        assert_eq!(quantile(&[3.0], 0.99), Some(3.0));
    }

    #[test]
    fn extent_ignores_non_finite_values() {
        assert_eq!(extent([3.0, f64::NAN, -1.0, 8.0]), Some((-1.0, 8.0)));
        assert_eq!(extent(Vec::<f64>::new()), None);
    }
}
