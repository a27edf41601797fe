//! Page tree helpers on top of lopdf
//!
//! `MediaBox`, `CropBox`, `Resources` and `Rotate` are inheritable, so every
//! lookup walks up the `Parent` chain.

use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::error::{SignError, SignResult};
use crate::geometry::{PageGeometry, PageSize};

/// Attributes a page may inherit from its ancestors
pub(crate) const INHERITABLE: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// US Letter, used when a page tree carries no MediaBox at all
const FALLBACK_MEDIA_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

/// Page object ids in document order
pub fn page_ids(doc: &Document) -> Vec<ObjectId> {
    doc.get_pages().into_values().collect()
}

pub(crate) fn page_dict(doc: &Document, page_id: ObjectId) -> SignResult<&Dictionary> {
    doc.get_object(page_id)
        .and_then(Object::as_dict)
        .map_err(|e| SignError::InvalidPdf(format!("page {:?} is not a dictionary: {}", page_id, e)))
}

/// Follow a reference, if `obj` is one
pub(crate) fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> SignResult<&'a Object> {
    match obj {
        Object::Reference(id) => doc
            .get_object(*id)
            .map_err(|e| SignError::InvalidPdf(format!("dangling reference {:?}: {}", id, e))),
        other => Ok(other),
    }
}

/// Look up `key` on the page or its nearest ancestor that defines it
pub(crate) fn inherited<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> SignResult<Option<&'a Object>> {
    let mut current = Some(page_id);
    let mut depth = 0;
    while let Some(id) = current {
        // Cyclic Parent chains exist in the wild
        depth += 1;
        if depth > 64 {
            return Err(SignError::InvalidPdf("page tree too deep".to_string()));
        }
        let dict = page_dict(doc, id)?;
        if let Ok(value) = dict.get(key) {
            return Ok(Some(value));
        }
        current = dict.get(b"Parent").and_then(Object::as_reference).ok();
    }
    Ok(None)
}

pub(crate) fn obj_to_f64(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(f) => Some((*f).into()),
        _ => None,
    }
}

fn rect_from(doc: &Document, obj: &Object) -> Option<[f64; 4]> {
    let arr = resolve(doc, obj).ok()?.as_array().ok()?;
    if arr.len() != 4 {
        return None;
    }
    let mut values = [0.0; 4];
    for (slot, item) in values.iter_mut().zip(arr) {
        *slot = obj_to_f64(resolve(doc, item).ok()?)?;
    }
    // Normalize corner order
    let [a, b, c, d] = values;
    Some([a.min(c), b.min(d), a.max(c), b.max(d)])
}

/// Visible box of a page: CropBox intersected with MediaBox, or MediaBox
pub(crate) fn visible_box(doc: &Document, page_id: ObjectId) -> SignResult<[f64; 4]> {
    let media = inherited(doc, page_id, b"MediaBox")?
        .and_then(|o| rect_from(doc, o))
        .unwrap_or(FALLBACK_MEDIA_BOX);

    let crop = inherited(doc, page_id, b"CropBox")?.and_then(|o| rect_from(doc, o));
    let visible = match crop {
        Some(c) => [
            c[0].max(media[0]),
            c[1].max(media[1]),
            c[2].min(media[2]),
            c[3].min(media[3]),
        ],
        None => media,
    };

    if visible[2] - visible[0] <= 0.0 || visible[3] - visible[1] <= 0.0 {
        return Err(SignError::InvalidPdf(format!(
            "page {:?} has an empty page box",
            page_id
        )));
    }
    Ok(visible)
}

/// `/Rotate` is an integer; a fractional real is malformed, not rounded
pub(crate) fn rotation_degrees(doc: &Document, page_id: ObjectId) -> SignResult<i64> {
    let rotate = inherited(doc, page_id, b"Rotate")?
        .and_then(|o| resolve(doc, o).ok())
        .and_then(obj_to_f64);
    match rotate {
        None => Ok(0),
        Some(r) if r.fract() == 0.0 && r.is_finite() => Ok(r as i64),
        Some(r) => Err(SignError::InvalidPdf(format!(
            "page {:?} has a non-integer /Rotate of {}",
            page_id, r
        ))),
    }
}

/// Geometry of one page object
pub fn geometry_of(doc: &Document, page_id: ObjectId) -> SignResult<PageGeometry> {
    let [llx, lly, urx, ury] = visible_box(doc, page_id)?;
    Ok(PageGeometry {
        origin_x: llx,
        origin_y: lly,
        size: PageSize::new(urx - llx, ury - lly),
        rotation_degrees: rotation_degrees(doc, page_id)?,
    })
}

/// Geometry of every page, in order
pub fn read_page_geometry(doc: &Document) -> SignResult<Vec<PageGeometry>> {
    page_ids(doc)
        .into_iter()
        .map(|id| geometry_of(doc, id))
        .collect()
}

/// Parse a PDF from memory
pub fn load_document(bytes: &[u8]) -> SignResult<Document> {
    let doc = Document::load_mem(bytes)?;
    if doc.get_pages().is_empty() {
        return Err(SignError::InvalidPdf("document has no pages".to_string()));
    }
    Ok(doc)
}
