use ksplat_decoder::SplatDecoder;
use ksplat_encoder::SplatEncoder;
use ksplat_types::{SplatBuffer, UncompressedSplat};
use ksplat_wire::CompressionLevel;

use crate::config::OptimizeOptions;
use crate::error::OptimizeError;

/// Turns an ordered list of raw splats into a finished buffer.
///
/// Spatial reordering, bucketing and quantization live behind this seam;
/// the loaders only hand over the splats and the options.
pub trait SplatOptimizer: Send + Sync {
    /// # Errors
    ///
    /// Implementation specific; the loader reports it as
    /// [`LoadError::Optimize`](crate::LoadError::Optimize).
    fn optimize(
        &self,
        splats: Vec<UncompressedSplat>,
        options: &OptimizeOptions,
    ) -> Result<SplatBuffer, OptimizeError>;
}

/// Level-0 optimizer: drops faint splats, keeps the input order and cuts
/// the rest into sections of `section_size`.
#[derive(Clone, Copy, Debug, Default)]
pub struct BaselineOptimizer;

impl SplatOptimizer for BaselineOptimizer {
    fn optimize(
        &self,
        splats: Vec<UncompressedSplat>,
        options: &OptimizeOptions,
    ) -> Result<SplatBuffer, OptimizeError> {
        if options.compression_level != CompressionLevel::Uncompressed {
            return Err(OptimizeError::UnsupportedLevel {
                level: options.compression_level.raw(),
            });
        }

        let kept: Vec<UncompressedSplat> = splats
            .into_iter()
            .filter(|s| s.alpha() >= options.minimum_alpha)
            .collect();
        let center = options.scene_center.unwrap_or_else(|| centroid(&kept));

        let mut encoder = SplatEncoder::new(CompressionLevel::Uncompressed);
        encoder.scene_center(center);
        let section_size = if options.section_size == 0 {
            kept.len().max(1)
        } else {
            options.section_size
        };
        if kept.is_empty() {
            encoder.add_splats(&[]);
        }
        for section in kept.chunks(section_size) {
            encoder.add_splats(section);
        }

        Ok(SplatDecoder::decode(encoder.encode()?)?)
    }
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn centroid(splats: &[UncompressedSplat]) -> [f32; 3] {
    if splats.is_empty() {
        return [0.0; 3];
    }
    let mut sum = [0.0f64; 3];
    for s in splats {
        for (acc, v) in sum.iter_mut().zip(s.center) {
            *acc += f64::from(v);
        }
    }
    let n = splats.len() as f64;
    sum.map(|v| (v / n) as f32)
}
