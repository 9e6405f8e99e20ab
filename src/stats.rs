//! Sample statistics used by the detectors
//!
//! All functions are pure and operate on caller-supplied slices. Undefined
//! results (too few samples, zero spread) are reported as `f64::NAN`, and any
//! comparison against NaN is false, so a detector fed garbage never fires.

/// A numeric sample that can be widened to `f64`
pub trait Sample: Copy {
    fn as_f64(self) -> f64;
}

impl Sample for f64 {
    fn as_f64(self) -> f64 {
        self
    }
}

impl Sample for i64 {
    fn as_f64(self) -> f64 {
        self as f64
    }
}

impl Sample for u64 {
    fn as_f64(self) -> f64 {
        self as f64
    }
}

impl Sample for i32 {
    fn as_f64(self) -> f64 {
        self as f64
    }
}

/// Low and high outliers found by the Tukey fences
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outliers {
    pub low: Vec<f64>,
    pub high: Vec<f64>,
}

/// Arithmetic mean; NaN for empty input
pub fn mean<T: Sample>(samples: &[T]) -> f64 {
    if samples.is_empty() {
        return f64::NAN;
    }
    samples.iter().map(|s| s.as_f64()).sum::<f64>() / samples.len() as f64
}

/// Sum of `(x - mean)^power` over the samples
fn central_sum<T: Sample>(samples: &[T], mean: f64, power: i32) -> f64 {
    samples
        .iter()
        .map(|s| (s.as_f64() - mean).powi(power))
        .sum()
}

/// Unbiased sample variance (divides by n - 1); NaN for n < 2
pub fn variance<T: Sample>(samples: &[T]) -> f64 {
    let n = samples.len();
    if n < 2 {
        return f64::NAN;
    }
    central_sum(samples, mean(samples), 2) / (n - 1) as f64
}

/// Sample standard deviation; NaN for n < 2
pub fn std_dev<T: Sample>(samples: &[T]) -> f64 {
    variance(samples).sqrt()
}

/// Median of a sorted copy; even lengths average the two middle values
pub fn median<T: Sample>(samples: &[T]) -> f64 {
    let mut sorted: Vec<f64> = samples.iter().map(|s| s.as_f64()).collect();
    sorted.sort_by(f64::total_cmp);
    median_of_sorted(&sorted)
}

fn median_of_sorted(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return f64::NAN;
    }
    if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}

/// Adjusted Fisher-Pearson skewness
///
/// NaN for n < 3 or when all samples are equal.
pub fn skewness<T: Sample>(samples: &[T]) -> f64 {
    let n = samples.len();
    if n < 3 {
        return f64::NAN;
    }
    let nf = n as f64;
    let m = mean(samples);
    let m2 = central_sum(samples, m, 2);
    if m2 == 0.0 {
        return f64::NAN;
    }
    let m3 = central_sum(samples, m, 3);
    let s = (m2 / (nf - 1.0)).sqrt();

    (nf * m3) / ((nf - 1.0) * (nf - 2.0) * s.powi(3))
}

/// Small-sample corrected excess kurtosis
///
/// `a * m4 / s^4 - b` with `s^2` the unbiased variance. NaN for n < 4 or
/// when all samples are equal.
pub fn excess_kurtosis<T: Sample>(samples: &[T]) -> f64 {
    let n = samples.len();
    if n < 4 {
        return f64::NAN;
    }
    let nf = n as f64;
    let m = mean(samples);
    let m2 = central_sum(samples, m, 2);
    if m2 == 0.0 {
        return f64::NAN;
    }
    let m4 = central_sum(samples, m, 4);
    let var = m2 / (nf - 1.0);

    let a = (nf * (nf + 1.0)) / ((nf - 1.0) * (nf - 2.0) * (nf - 3.0));
    let b = (3.0 * (nf - 1.0).powi(2)) / ((nf - 2.0) * (nf - 3.0));

    a * (m4 / var.powi(2)) - b
}

/// Kurtosis (excess kurtosis + 3)
pub fn kurtosis<T: Sample>(samples: &[T]) -> f64 {
    excess_kurtosis(samples) + 3.0
}

/// Tukey IQR outliers
///
/// The sorted samples are split around the median (the median itself is
/// left out for odd n), Q1 and Q3 are the medians of the two halves, and
/// values strictly outside `[Q1 - 1.5 IQR, Q3 + 1.5 IQR]` are returned in
/// ascending order. Fewer than four samples yield no outliers.
pub fn tukey_outliers<T: Sample>(samples: &[T]) -> Outliers {
    let n = samples.len();
    if n < 4 {
        return Outliers::default();
    }

    let mut sorted: Vec<f64> = samples.iter().map(|s| s.as_f64()).collect();
    sorted.sort_by(f64::total_cmp);

    let q1 = median_of_sorted(&sorted[..n / 2]);
    let q3 = median_of_sorted(&sorted[(n + 1) / 2..]);
    let iqr = q3 - q1;
    let low_fence = q1 - 1.5 * iqr;
    let high_fence = q3 + 1.5 * iqr;

    let mut outliers = Outliers::default();
    for value in sorted {
        if value < low_fence {
            outliers.low.push(value);
        } else if value > high_fence {
            outliers.high.push(value);
        }
    }
    outliers
}

/// Round to a fixed number of decimal places for presentation
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}
