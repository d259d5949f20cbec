use serde::{
    Deserialize,
    Serialize,
};

/// Gaussian smoothing over a possibly non-uniform RT axis.
///
/// `sigma` and `spacing` are in RT units (seconds).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GaussFilter {
    pub sigma: f32,
    pub spacing: f32,
}

impl Default for GaussFilter {
    fn default() -> Self {
        Self {
            sigma: 6.25,
            spacing: 0.01,
        }
    }
}

/// Tabulated half kernel of a [`GaussFilter`], `coeffs[k]` is the density at
/// `k * spacing`.
#[derive(Debug, Clone)]
pub struct GaussKernel {
    coeffs: Vec<f64>,
    spacing: f64,
    reach: f64,
}

impl GaussFilter {
    pub fn kernel(&self) -> GaussKernel {
        let sigma = self.sigma as f64;
        let spacing = self.spacing as f64;
        if !(sigma > 0.0) || !(spacing > 0.0) {
            return GaussKernel {
                coeffs: vec![1.0],
                spacing: 1.0,
                reach: 0.0,
            };
        }
        let reach = 4.0 * sigma;
        let n = (reach / spacing).ceil() as usize + 1;
        let norm = 1.0 / (sigma * (2.0 * std::f64::consts::PI).sqrt());
        let coeffs = (0..n)
            .map(|k| {
                let x = k as f64 * spacing;
                norm * (-(x * x) / (2.0 * sigma * sigma)).exp()
            })
            .collect();
        GaussKernel {
            coeffs,
            spacing,
            reach,
        }
    }

    /// Convenience wrapper, builds the kernel on every call.
    pub fn smooth(&self, rts: &[f32], intensities: &[f32]) -> Vec<f32> {
        let mut out = Vec::with_capacity(intensities.len());
        self.kernel().smooth_into(rts, intensities, &mut out);
        out
    }
}

impl GaussKernel {
    /// Kernel weight at an RT distance, linearly interpolated from the table.
    #[inline]
    fn weight(&self, distance: f64) -> f64 {
        if distance > self.reach {
            return 0.0;
        }
        let pos = distance / self.spacing;
        let k = pos.floor() as usize;
        match (self.coeffs.get(k), self.coeffs.get(k + 1)) {
            (Some(&left), Some(&right)) => {
                let frac = pos - k as f64;
                left + (right - left) * frac
            }
            (Some(&left), None) => left,
            _ => 0.0,
        }
    }

    /// Smooths `intensities` sampled at `rts` into `out` (same length).
    ///
    /// Each neighbour is weighted by the kernel at its RT distance times the
    /// RT span it covers, then the weights are normalized. A scan with no
    /// neighbour inside the reach keeps its raw value.
    pub fn smooth_into(&self, rts: &[f32], intensities: &[f32], out: &mut Vec<f32>) {
        debug_assert_eq!(rts.len(), intensities.len());
        out.clear();
        let n = rts.len();
        if self.reach == 0.0 || n < 2 {
            out.extend_from_slice(intensities);
            return;
        }
        let span = |j: usize| -> f64 {
            let left = (if j == 0 { rts[0] } else { rts[j - 1] }) as f64;
            let right = (if j + 1 == n { rts[n - 1] } else { rts[j + 1] }) as f64;
            ((right - left) / 2.0).max(f64::EPSILON)
        };

        out.reserve(n);
        for i in 0..n {
            let center = rts[i] as f64;
            let mut sum_w = 0.0;
            let mut sum_wy = 0.0;

            let mut j = i;
            loop {
                let d = center - rts[j] as f64;
                if d > self.reach {
                    break;
                }
                let w = self.weight(d) * span(j);
                sum_w += w;
                sum_wy += w * intensities[j] as f64;
                if j == 0 {
                    break;
                }
                j -= 1;
            }
            for j in (i + 1)..n {
                let d = rts[j] as f64 - center;
                if d > self.reach {
                    break;
                }
                let w = self.weight(d) * span(j);
                sum_w += w;
                sum_wy += w * intensities[j] as f64;
            }

            if sum_w > 0.0 {
                out.push((sum_wy / sum_w) as f32);
            } else {
                out.push(intensities[i]);
            }
        }
    }
}
