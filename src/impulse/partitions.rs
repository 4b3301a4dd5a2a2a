use crate::config::Geometry;
use crate::error::ConfigError;
use crate::transform::Transform;

/// Frequency-domain impulse response split into `P` uniform partitions of
/// `2N` interleaved reals each. Partition 0 is the most recent segment (the
/// first block of the time-domain response), partition `P - 1` the most
/// delayed one.
#[derive(Debug, Clone)]
pub struct PartitionedImpulseResponse {
    spectra: Box<[f32]>,
    partitions: usize,
    spectrum_len: usize,
}

impl PartitionedImpulseResponse {
    /// Wraps precomputed spectra, checking them against the engine geometry.
    pub fn from_spectra<S: AsRef<[f32]>>(
        geometry: &Geometry,
        spectra: &[S],
    ) -> Result<Self, ConfigError> {
        if spectra.len() != geometry.partitions {
            return Err(ConfigError::PartitionCount {
                expected: geometry.partitions,
                found: spectra.len(),
            });
        }

        let spectrum_len = geometry.spectrum_len();
        let mut flat = Vec::with_capacity(spectrum_len * spectra.len());
        for (index, spectrum) in spectra.iter().enumerate() {
            let spectrum = spectrum.as_ref();
            if spectrum.len() != spectrum_len {
                return Err(ConfigError::PartitionLength {
                    index,
                    expected: spectrum_len,
                    found: spectrum.len(),
                });
            }
            flat.extend_from_slice(spectrum);
        }

        Ok(Self {
            spectra: flat.into_boxed_slice(),
            partitions: geometry.partitions,
            spectrum_len,
        })
    }

    /// Partitions a time-domain response into block-sized segments and
    /// transforms each one. A response shorter than `P` blocks leaves the
    /// trailing partitions silent; a longer one is truncated.
    pub fn from_time_domain(
        geometry: &Geometry,
        impulse_response: &[f32],
        transform: &mut dyn Transform,
    ) -> Result<Self, ConfigError> {
        if transform.size() != geometry.transform_size {
            return Err(ConfigError::TransformMismatch {
                expected: geometry.spectrum_len(),
                found: transform.size() * 2,
            });
        }

        let block = geometry.block_samples();
        let capacity = block * geometry.partitions;
        if impulse_response.len() > capacity {
            log::warn!(
                "impulse response truncated from {} to {} samples ({} partitions of {})",
                impulse_response.len(),
                capacity,
                geometry.partitions,
                block
            );
        }

        let spectrum_len = geometry.spectrum_len();
        let mut spectra = vec![0.0; spectrum_len * geometry.partitions];
        let mut segments = impulse_response[..impulse_response.len().min(capacity)].chunks(block);

        for spectrum in spectra.chunks_exact_mut(spectrum_len) {
            if let Some(segment) = segments.next() {
                for (slot, &sample) in spectrum.chunks_exact_mut(2).zip(segment.iter()) {
                    slot[0] = sample;
                }
            }
            transform.forward(spectrum);
        }

        log::debug!(
            "prepared {} impulse-response partitions from {} samples",
            geometry.partitions,
            impulse_response.len()
        );

        Ok(Self {
            spectra: spectra.into_boxed_slice(),
            partitions: geometry.partitions,
            spectrum_len,
        })
    }

    /// A single unit impulse in partition 0: the spectrum of partition 0 is
    /// flat `1 + 0i`, every other partition is silent.
    pub fn unit_impulse(geometry: &Geometry) -> Self {
        let spectrum_len = geometry.spectrum_len();
        let mut spectra = vec![0.0; spectrum_len * geometry.partitions];
        for bin in spectra[..spectrum_len].chunks_exact_mut(2) {
            bin[0] = 1.0;
        }

        Self {
            spectra: spectra.into_boxed_slice(),
            partitions: geometry.partitions,
            spectrum_len,
        }
    }

    pub fn partitions(&self) -> usize {
        self.partitions
    }

    pub fn spectrum_len(&self) -> usize {
        self.spectrum_len
    }

    pub fn partition(&self, index: usize) -> &[f32] {
        let start = index * self.spectrum_len;
        &self.spectra[start..start + self.spectrum_len]
    }

    /// Checks that this response fits an engine built for `geometry`.
    pub fn check(&self, geometry: &Geometry) -> Result<(), ConfigError> {
        if self.partitions != geometry.partitions {
            return Err(ConfigError::PartitionCount {
                expected: geometry.partitions,
                found: self.partitions,
            });
        }
        if self.spectrum_len != geometry.spectrum_len() {
            return Err(ConfigError::PartitionLength {
                index: 0,
                expected: geometry.spectrum_len(),
                found: self.spectrum_len,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::RustFftTransform;

    const EPSILON: f32 = 1e-4;

    #[test]
    fn test_from_spectra_rejects_wrong_count() {
        let geometry = Geometry::new(8, 3).unwrap();
        let spectra = vec![vec![0.0; 16]; 2];

        let result = PartitionedImpulseResponse::from_spectra(&geometry, &spectra);

        assert_eq!(
            result.unwrap_err(),
            ConfigError::PartitionCount {
                expected: 3,
                found: 2
            }
        );
    }

    #[test]
    fn test_from_spectra_rejects_wrong_length() {
        let geometry = Geometry::new(8, 2).unwrap();
        let spectra = vec![vec![0.0; 16], vec![0.0; 15]];

        let result = PartitionedImpulseResponse::from_spectra(&geometry, &spectra);

        assert_eq!(
            result.unwrap_err(),
            ConfigError::PartitionLength {
                index: 1,
                expected: 16,
                found: 15
            }
        );
    }

    #[test]
    fn test_time_domain_partitions_follow_segments() {
        // Block of 4 samples: the impulse at sample 5 lands in partition 1 at lag 1
        let geometry = Geometry::new(8, 3).unwrap();
        let mut transform = RustFftTransform::new(8);
        let mut ir = vec![0.0; 6];
        ir[5] = 1.0;

        let partitioned =
            PartitionedImpulseResponse::from_time_domain(&geometry, &ir, &mut transform).unwrap();

        assert!(partitioned.partition(0).iter().all(|v| v.abs() < EPSILON));
        assert!(partitioned.partition(2).iter().all(|v| v.abs() < EPSILON));

        let mut segment = partitioned.partition(1).to_vec();
        transform.inverse(&mut segment);
        for (i, pair) in segment.chunks_exact(2).enumerate() {
            let expected = if i == 1 { 8.0 } else { 0.0 };
            assert!((pair[0] - expected).abs() < EPSILON);
            assert!(pair[1].abs() < EPSILON);
        }
    }

    #[test]
    fn test_time_domain_truncates_long_response() {
        let geometry = Geometry::new(8, 1).unwrap();
        let mut transform = RustFftTransform::new(8);
        let ir = vec![1.0; 10];

        let partitioned =
            PartitionedImpulseResponse::from_time_domain(&geometry, &ir, &mut transform).unwrap();

        // Only the first four samples survive: DC bin equals their sum
        assert!((partitioned.partition(0)[0] - 4.0).abs() < EPSILON);
    }

    #[test]
    fn test_time_domain_rejects_mismatched_transform() {
        let geometry = Geometry::new(8, 1).unwrap();
        let mut transform = RustFftTransform::new(16);

        let result = PartitionedImpulseResponse::from_time_domain(&geometry, &[1.0], &mut transform);

        assert_eq!(
            result.unwrap_err(),
            ConfigError::TransformMismatch {
                expected: 16,
                found: 32
            }
        );
    }

    #[test]
    fn test_unit_impulse_layout() {
        let geometry = Geometry::new(8, 2).unwrap();
        let unit = PartitionedImpulseResponse::unit_impulse(&geometry);

        assert_eq!(unit.partitions(), 2);
        assert!(unit.partition(0).chunks_exact(2).all(|b| b[0] == 1.0 && b[1] == 0.0));
        assert!(unit.partition(1).iter().all(|&v| v == 0.0));
        assert!(unit.check(&geometry).is_ok());
        assert!(unit.check(&Geometry::new(8, 3).unwrap()).is_err());
    }
}
