use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument};

use crate::error::{ComposeError, Result};
use crate::raster::{self, Placement};
use crate::segment::Segmenter;
use crate::template::Template;

/// A finished composition.
#[derive(Debug, Clone)]
pub struct Composition {
    /// PNG-encoded result, same pixel size as the template.
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub placement: Placement,
}

/// Runs the full pipeline: decode, remove background, crop, resize, paste, encode.
///
/// Stateless between calls; one `Compositor` is shared by every request.
pub struct Compositor {
    segmenter: Arc<dyn Segmenter>,
    timeout: Duration,
}

impl Compositor {
    pub fn new(segmenter: Arc<dyn Segmenter>, timeout: Duration) -> Self {
        Self { segmenter, timeout }
    }

    #[instrument(skip_all, fields(template = %template.name, max_height = max_height.get()))]
    pub async fn compose(
        &self,
        product: &[u8],
        template: &Template,
        max_height: NonZeroU32,
    ) -> Result<Composition> {
        let product = product.to_vec();
        let product = blocking(move || {
            image::load_from_memory(&product).map_err(|e| ComposeError::Decode(e.to_string()))?;
            Ok(product)
        })
        .await?;

        let cutout = self.remove_background(&product).await?;

        // Pixel work runs on the blocking pool; the template is cloned so the
        // caller's copy is never drawn on.
        let canvas = template.image.clone();
        let (png, placement, width, height) = blocking(move || {
            let cutout = image::load_from_memory(&cutout)
                .map_err(|e| {
                    ComposeError::SegmentationFailed(format!("undecodable cutout: {e}"))
                })?
                .into_rgba8();
            let (out, placement) = raster::compose_onto(canvas, &cutout, max_height.get())?;
            let (width, height) = out.dimensions();
            Ok((raster::encode_png(out)?, placement, width, height))
        })
        .await?;

        info!(
            width,
            height,
            x = placement.x,
            y = placement.y,
            bytes = png.len(),
            "composition finished"
        );

        Ok(Composition {
            png,
            width,
            height,
            placement,
        })
    }

    async fn remove_background(&self, product: &[u8]) -> Result<Vec<u8>> {
        debug!(segmenter = self.segmenter.name(), "removing background");
        match tokio::time::timeout(self.timeout, self.segmenter.remove_background(product)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(ComposeError::SegmentationTimeout {
                ms: self.timeout.as_millis() as u64,
            }),
        }
    }
}

async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ComposeError::Worker(e.to_string()))?
}
