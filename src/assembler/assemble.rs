//! Signed document assembly

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{SignError, SignResult};
use crate::geometry::{box_to_points, PageGeometry, PageSize, Rotation};
use crate::placement::{AssetId, StoreSnapshot};
use crate::render::{RasterBitmap, Rasterizer};

use super::mutator::{ImageFormat, PdfMutator};

/// Raster scale for rotated pages in the mixed path
pub const DEFAULT_ROTATED_PAGE_SCALE: f32 = 2.0;

/// Stamps committed placements into a PDF
///
/// Works on a [`StoreSnapshot`], so the store can keep changing while an
/// assembly runs. Either every placement is applied or an error is returned.
pub struct DocumentAssembler {
    rasterizer: Arc<dyn Rasterizer>,
    rotated_page_scale: f32,
}

impl DocumentAssembler {
    pub fn new(rasterizer: Arc<dyn Rasterizer>, rotated_page_scale: f32) -> Self {
        Self {
            rasterizer,
            rotated_page_scale,
        }
    }

    pub fn rotated_page_scale(&self) -> f32 {
        self.rotated_page_scale
    }

    /// Produce the signed PDF bytes
    ///
    /// Parsing, embedding and serialization run on the blocking pool; only
    /// rasterizing rotated pages is awaited here.
    pub async fn assemble<M: PdfMutator>(
        &self,
        source: Arc<Vec<u8>>,
        snapshot: &StoreSnapshot,
    ) -> SignResult<Vec<u8>> {
        let snapshot = Arc::new(snapshot.clone());

        let prepared = {
            let source = source.clone();
            let snapshot = snapshot.clone();
            blocking(move || prepare::<M>(&source, &snapshot)).await?
        };
        let page_count = prepared.pages.len();
        let rotated = prepared.rotated_count();
        let assets = prepared.images.len();

        let out = if rotated == 0 {
            let snapshot = snapshot.clone();
            blocking(move || {
                let Prepared {
                    mut doc,
                    pages,
                    images,
                } = prepared;
                stamp_in_place(&mut doc, &snapshot, &pages, &images)?;
                doc.save()
            })
            .await?
        } else {
            let rasters = self.render_rotated(source, &prepared.pages).await?;
            let snapshot = snapshot.clone();
            blocking(move || rebuild(prepared, rasters, &snapshot)).await?
        };

        info!(
            pages = page_count,
            rotated_pages = rotated,
            placements = snapshot.placements.len(),
            assets,
            size = out.len(),
            "Document assembled"
        );
        Ok(out)
    }

    /// Rasterize every rotated page upright, indexed by page
    async fn render_rotated(
        &self,
        source: Arc<Vec<u8>>,
        pages: &[(PageGeometry, Rotation)],
    ) -> SignResult<Vec<Option<RasterBitmap>>> {
        let rasterizer = self.rasterizer.clone();
        let raster = blocking(move || rasterizer.open_document(source)).await?;

        let mut rasters = Vec::with_capacity(pages.len());
        for (index, (_, rotation)) in pages.iter().enumerate() {
            if !rotation.is_rotated() {
                rasters.push(None);
                continue;
            }
            let bitmap = raster.render_page(index, self.rotated_page_scale).await?;
            debug!(
                page_index = index,
                rotation = rotation.degrees(),
                width = bitmap.width,
                height = bitmap.height,
                "Rotated page rasterized"
            );
            rasters.push(Some(bitmap));
        }
        Ok(rasters)
    }
}

/// A loaded document with every referenced asset embedded
struct Prepared<M: PdfMutator> {
    doc: M,
    pages: Vec<(PageGeometry, Rotation)>,
    images: HashMap<AssetId, M::Image>,
}

impl<M: PdfMutator> Prepared<M> {
    fn rotated_count(&self) -> usize {
        self.pages.iter().filter(|(_, r)| r.is_rotated()).count()
    }
}

async fn blocking<T, F>(f: F) -> SignResult<T>
where
    F: FnOnce() -> SignResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| SignError::Internal(format!("Task join error: {}", e)))?
}

fn prepare<M: PdfMutator>(source: &[u8], snapshot: &StoreSnapshot) -> SignResult<Prepared<M>> {
    let mut doc = M::load(source)?;
    let page_count = doc.page_count();

    let mut pages = Vec::with_capacity(page_count);
    for index in 0..page_count {
        let geometry = doc.page_geometry(index)?;
        let rotation = geometry.rotation()?;
        pages.push((geometry, rotation));
    }

    let formats = validate(snapshot, page_count)?;
    let images = embed_assets(&mut doc, snapshot, &formats)?;
    Ok(Prepared { doc, pages, images })
}

/// Mixed path: copy upright pages, replace rotated ones with upright rasters
fn rebuild<M: PdfMutator>(
    prepared: Prepared<M>,
    rasters: Vec<Option<RasterBitmap>>,
    snapshot: &StoreSnapshot,
) -> SignResult<Vec<u8>> {
    let Prepared {
        mut doc,
        pages,
        images,
    } = prepared;
    doc.begin_output();

    for (index, ((geometry, _), bitmap)) in pages.iter().zip(rasters).enumerate() {
        match bitmap {
            Some(bitmap) => {
                let format = ImageFormat::detect(&bitmap.data)
                    .map_err(|e| SignError::render_failed(index, e))?;
                let upright = geometry.normalized_size()?;
                let background = doc.embed_image(&bitmap.data, format)?;
                let page = doc.add_image_page(background, upright)?;
                draw_placements(&mut doc, page, index, snapshot, upright, (0.0, 0.0), &images)?;
            }
            None => {
                let page = doc.copy_page(index)?;
                let origin = (geometry.origin_x, geometry.origin_y);
                draw_placements(&mut doc, page, index, snapshot, geometry.size, origin, &images)?;
            }
        }
    }
    doc.save()
}

/// Check everything that can fail before the document is touched
fn validate(
    snapshot: &StoreSnapshot,
    page_count: usize,
) -> SignResult<BTreeMap<AssetId, ImageFormat>> {
    for placement in &snapshot.placements {
        if placement.page_index >= page_count {
            return Err(SignError::PageIndexOutOfRange {
                index: placement.page_index,
                page_count,
            });
        }
        if !placement.rendered.is_valid() {
            return Err(SignError::InvalidGeometry(format!(
                "placement {} has rendered size {}x{}",
                placement.id, placement.rendered.width, placement.rendered.height
            )));
        }
    }

    let mut formats = BTreeMap::new();
    for id in snapshot.unique_asset_ids_in_use() {
        let asset = snapshot.assets.get(&id).ok_or(SignError::AssetNotFound(id))?;
        formats.insert(id, ImageFormat::detect(&asset.image_bytes)?);
    }
    Ok(formats)
}

/// Embed each referenced asset once
fn embed_assets<M: PdfMutator>(
    doc: &mut M,
    snapshot: &StoreSnapshot,
    formats: &BTreeMap<AssetId, ImageFormat>,
) -> SignResult<HashMap<AssetId, M::Image>> {
    let mut images = HashMap::with_capacity(formats.len());
    for (&id, &format) in formats {
        let asset = snapshot.assets.get(&id).ok_or(SignError::AssetNotFound(id))?;
        images.insert(id, doc.embed_image(&asset.image_bytes, format)?);
    }
    Ok(images)
}

/// Fast path: draw straight onto the source pages
fn stamp_in_place<M: PdfMutator>(
    doc: &mut M,
    snapshot: &StoreSnapshot,
    pages: &[(PageGeometry, Rotation)],
    images: &HashMap<AssetId, M::Image>,
) -> SignResult<()> {
    for (index, (geometry, _)) in pages.iter().enumerate() {
        if snapshot.placements_for_page(index).next().is_none() {
            continue;
        }
        let page = doc.source_page(index)?;
        let origin = (geometry.origin_x, geometry.origin_y);
        draw_placements(doc, page, index, snapshot, geometry.size, origin, images)?;
    }
    Ok(())
}

/// Draw every placement of one page, each scaled by its own rendered size
fn draw_placements<M: PdfMutator>(
    doc: &mut M,
    page: M::Page,
    page_index: usize,
    snapshot: &StoreSnapshot,
    size: PageSize,
    origin: (f64, f64),
    images: &HashMap<AssetId, M::Image>,
) -> SignResult<()> {
    for placement in snapshot.placements_for_page(page_index) {
        let image = *images
            .get(&placement.asset_id)
            .ok_or(SignError::AssetNotFound(placement.asset_id))?;
        let rect = box_to_points(placement.pixel_box, placement.rendered, size)
            .translate(origin.0, origin.1);
        debug!(
            placement_id = %placement.id,
            page_index,
            x = rect.x,
            y = rect.y,
            width = rect.width,
            height = rect.height,
            "Drawing signature"
        );
        doc.draw_image(page, image, rect)?;
    }
    Ok(())
}
