//! lopdf-backed [`PdfMutator`]

use std::collections::BTreeMap;

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use tracing::debug;

use crate::assembler::{ImageFormat, PdfMutator};
use crate::error::{SignError, SignResult};
use crate::geometry::{PageGeometry, PageSize, PointRect};

use super::pages::{self, INHERITABLE};
use super::xobject::{self, ImageRef};

/// Handle to a page object inside a [`LopdfDocument`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRef(ObjectId);

/// A PDF held in memory for stamping
///
/// Image draws are buffered per page and written out on [`save`], where
/// each touched page's original content is wrapped in `q … Q` so a leftover
/// transform in the source cannot displace the signatures.
///
/// [`save`]: PdfMutator::save
pub struct LopdfDocument {
    doc: Document,
    source_pages: Vec<ObjectId>,
    output: Option<Vec<ObjectId>>,
    pending: BTreeMap<ObjectId, Vec<u8>>,
    next_name: usize,
}

impl LopdfDocument {
    fn source_id(&self, index: usize) -> SignResult<ObjectId> {
        self.source_pages
            .get(index)
            .copied()
            .ok_or(SignError::PageIndexOutOfRange {
                index,
                page_count: self.source_pages.len(),
            })
    }

    fn page_dict_mut(&mut self, page_id: ObjectId) -> SignResult<&mut Dictionary> {
        self.doc
            .get_object_mut(page_id)
            .and_then(Object::as_dict_mut)
            .map_err(|e| SignError::InvalidPdf(format!("page {:?}: {}", page_id, e)))
    }

    /// Resources of a page as an owned direct dictionary
    fn effective_resources(&self, page_id: ObjectId) -> SignResult<Dictionary> {
        match pages::inherited(&self.doc, page_id, b"Resources")? {
            Some(obj) => Ok(pages::resolve(&self.doc, obj)?
                .as_dict()
                .cloned()
                .unwrap_or_else(|_| Dictionary::new())),
            None => Ok(Dictionary::new()),
        }
    }

    /// Bind `image` to a name in the page's XObject resources
    fn register_xobject(&mut self, page_id: ObjectId, image: ObjectId) -> SignResult<String> {
        let mut resources = self.effective_resources(page_id)?;
        let mut xobjects = match resources.get(b"XObject") {
            Ok(obj) => pages::resolve(&self.doc, obj)?
                .as_dict()
                .cloned()
                .unwrap_or_else(|_| Dictionary::new()),
            Err(_) => Dictionary::new(),
        };

        let existing = xobjects.iter().find_map(|(name, value)| match value {
            Object::Reference(id) if *id == image => String::from_utf8(name.clone()).ok(),
            _ => None,
        });
        if let Some(name) = existing {
            return Ok(name);
        }

        let name = loop {
            self.next_name += 1;
            let candidate = format!("SigIm{}", self.next_name);
            if !xobjects.has(candidate.as_bytes()) {
                break candidate;
            }
        };
        xobjects.set(name.clone(), Object::Reference(image));
        resources.set("XObject", xobjects);
        self.page_dict_mut(page_id)?.set("Resources", resources);
        Ok(name)
    }

    /// Copy inherited attributes onto the page itself
    fn materialize_inherited(&mut self, page_id: ObjectId) -> SignResult<()> {
        let mut missing = Vec::new();
        {
            let dict = pages::page_dict(&self.doc, page_id)?;
            for key in INHERITABLE {
                if dict.get(key).is_err() {
                    if let Some(value) = pages::inherited(&self.doc, page_id, key)? {
                        missing.push((key.to_vec(), value.clone()));
                    }
                }
            }
        }
        let dict = self.page_dict_mut(page_id)?;
        for (key, value) in missing {
            dict.set(key, value);
        }
        Ok(())
    }

    /// Current content streams of a page as a list of references
    fn content_refs(&mut self, page_id: ObjectId) -> SignResult<Vec<Object>> {
        let contents = pages::page_dict(&self.doc, page_id)?.get(b"Contents").ok().cloned();
        let refs = match contents {
            None => Vec::new(),
            Some(Object::Reference(id)) => match self.doc.get_object(id) {
                Ok(Object::Array(items)) => items.clone(),
                _ => vec![Object::Reference(id)],
            },
            Some(Object::Array(items)) => items,
            Some(Object::Stream(stream)) => vec![Object::Reference(self.doc.add_object(stream))],
            Some(other) => {
                return Err(SignError::InvalidPdf(format!(
                    "page {:?} has invalid Contents {:?}",
                    page_id, other
                )))
            }
        };
        Ok(refs)
    }

    fn flush_pending(&mut self) -> SignResult<()> {
        let pending = std::mem::take(&mut self.pending);
        for (page_id, ops) in pending {
            let existing = self.content_refs(page_id)?;
            let open = self
                .doc
                .add_object(Stream::new(dictionary! {}, b"q\n".to_vec()));
            let mut tail = b"\nQ\n".to_vec();
            tail.extend_from_slice(&ops);
            let close = self.doc.add_object(Stream::new(dictionary! {}, tail));

            let mut contents = Vec::with_capacity(existing.len() + 2);
            contents.push(Object::Reference(open));
            contents.extend(existing);
            contents.push(Object::Reference(close));
            self.page_dict_mut(page_id)?.set("Contents", contents);
        }
        Ok(())
    }

    /// Replace the page tree with the output sequence
    fn install_output(&mut self, output: Vec<ObjectId>) -> SignResult<()> {
        let kids: Vec<Object> = output.iter().map(|id| Object::Reference(*id)).collect();
        let pages_id = self.doc.add_object(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => output.len() as i64,
        });
        for page_id in &output {
            self.page_dict_mut(*page_id)?.set("Parent", pages_id);
        }

        let root = self
            .doc
            .trailer
            .get(b"Root")
            .and_then(Object::as_reference)
            .map_err(|e| SignError::InvalidPdf(format!("missing catalog: {}", e)))?;
        self.doc
            .get_object_mut(root)
            .and_then(Object::as_dict_mut)
            .map_err(|e| SignError::InvalidPdf(format!("invalid catalog: {}", e)))?
            .set("Pages", pages_id);
        Ok(())
    }

    fn output_mut(&mut self) -> &mut Vec<ObjectId> {
        self.output.get_or_insert_with(Vec::new)
    }
}

/// Format a PDF number without trailing zeros
fn num(value: f64) -> String {
    let s = format!("{:.4}", value);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    match s {
        "" | "-" | "-0" => "0".to_string(),
        other => other.to_string(),
    }
}

fn draw_op(name: &str, rect: PointRect) -> String {
    format!(
        "q {} 0 0 {} {} {} cm /{} Do Q\n",
        num(rect.width),
        num(rect.height),
        num(rect.x),
        num(rect.y),
        name
    )
}

impl PdfMutator for LopdfDocument {
    type Image = ImageRef;
    type Page = PageRef;

    fn load(bytes: &[u8]) -> SignResult<Self> {
        let doc = pages::load_document(bytes)?;
        let source_pages = pages::page_ids(&doc);
        Ok(Self {
            doc,
            source_pages,
            output: None,
            pending: BTreeMap::new(),
            next_name: 0,
        })
    }

    fn page_count(&self) -> usize {
        self.source_pages.len()
    }

    fn page_geometry(&self, index: usize) -> SignResult<PageGeometry> {
        pages::geometry_of(&self.doc, self.source_id(index)?)
    }

    fn source_page(&self, index: usize) -> SignResult<PageRef> {
        self.source_id(index).map(PageRef)
    }

    fn embed_image(&mut self, bytes: &[u8], format: ImageFormat) -> SignResult<ImageRef> {
        let image = xobject::embed(&mut self.doc, bytes, format)?;
        debug!(
            width = image.width,
            height = image.height,
            ?format,
            "Embedded image"
        );
        Ok(image)
    }

    fn draw_image(&mut self, page: PageRef, image: ImageRef, rect: PointRect) -> SignResult<()> {
        let name = self.register_xobject(page.0, image.id)?;
        self.pending
            .entry(page.0)
            .or_default()
            .extend_from_slice(draw_op(&name, rect).as_bytes());
        Ok(())
    }

    fn begin_output(&mut self) {
        self.output = Some(Vec::new());
    }

    fn copy_page(&mut self, index: usize) -> SignResult<PageRef> {
        let source = self.source_id(index)?;
        self.materialize_inherited(source)?;

        let already_copied = self.output.as_ref().map_or(false, |o| o.contains(&source));
        let page_id = if already_copied {
            let dict = pages::page_dict(&self.doc, source)?.clone();
            self.doc.add_object(dict)
        } else {
            source
        };
        self.output_mut().push(page_id);
        Ok(PageRef(page_id))
    }

    fn add_image_page(&mut self, image: ImageRef, size: PageSize) -> SignResult<PageRef> {
        let rect = PointRect {
            x: 0.0,
            y: 0.0,
            width: size.width,
            height: size.height,
        };
        let content = self
            .doc
            .add_object(Stream::new(dictionary! {}, draw_op("PageIm", rect).into_bytes()));
        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::from(size.width as f32),
                Object::from(size.height as f32),
            ],
            "Resources" => dictionary! {
                "XObject" => dictionary! { "PageIm" => image.id },
            },
            "Contents" => content,
        });
        self.output_mut().push(page_id);
        Ok(PageRef(page_id))
    }

    fn save(mut self) -> SignResult<Vec<u8>> {
        self.flush_pending()?;
        if let Some(output) = self.output.take() {
            self.install_output(output)?;
        }

        self.doc.prune_objects();
        self.doc.compress();

        let mut out = Vec::new();
        self.doc
            .save_to(&mut out)
            .map_err(|e| SignError::Internal(format!("failed to serialize PDF: {}", e)))?;
        Ok(out)
    }
}
