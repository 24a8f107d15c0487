//! lopdf-based document loading.
//!
//! [`load_document`] opens the file with [lopdf](https://crates.io/crates/lopdf),
//! walks the page tree and resolves everything a page's content stream refers
//! to: decoded content bytes, fonts and form XObjects. Structural problems are
//! fatal here; problems confined to one page's content are recorded on that
//! page and surface when it is interpreted.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use lopdf::{Dictionary, Object, ObjectId, Stream};
use pdfgrid_core::{Ctm, PdfError};

use crate::document::{Content, Document, FormXObject, PageSource, Resources};
use crate::error::BackendError;
use crate::font::FontInfo;
use crate::font_metrics::{dict_array, dict_dict, number, resolve};

/// Deepest form XObject nesting that is resolved.
pub const MAX_FORM_DEPTH: usize = 8;

/// MediaBox used when a page has none (US Letter).
const DEFAULT_MEDIA_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

/// Decodable content filters and their full names.
const SUPPORTED_FILTERS: [(&[u8], &str); 4] = [
    (b"FlateDecode", "FlateDecode"),
    (b"Fl", "FlateDecode"),
    (b"LZWDecode", "LZWDecode"),
    (b"LZW", "LZWDecode"),
];

/// Load a document, resolving at most `max_pages` pages.
///
/// Fails with `PasswordRequired` / `InvalidPassword` for encrypted files,
/// `UnsupportedFilter` when any loaded content stream uses a filter other than
/// Flate or LZW, and `ParseError` for anything structurally broken.
pub fn load_document(
    bytes: &[u8],
    password: Option<&str>,
    max_pages: Option<usize>,
) -> Result<Document, PdfError> {
    let doc = open(bytes, password)?;
    let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
    let page_count = page_ids.len();
    let limit = max_pages.map_or(page_count, |max| max.min(page_count));

    let mut loader = Loader::new(&doc);
    let mut pages = Vec::with_capacity(limit);
    for (index, id) in page_ids.into_iter().take(limit).enumerate() {
        pages.push(loader.page(index, id)?);
    }

    #[cfg(feature = "tracing")]
    tracing::debug!(
        page_count,
        loaded = pages.len(),
        fonts = loader.fonts.len(),
        forms = loader.forms.len(),
        "document loaded"
    );
    Ok(Document { page_count, pages })
}

/// Parse the file, decrypting it if needed.
///
/// Encrypted files are parsed again with the password so lopdf rebuilds the
/// page tree from the decrypted objects.
fn open(bytes: &[u8], password: Option<&str>) -> Result<lopdf::Document, BackendError> {
    let doc = lopdf::Document::load_mem(bytes)
        .map_err(|e| BackendError::Parse(format!("failed to parse PDF: {e}")))?;
    if !doc.is_encrypted() {
        return Ok(doc);
    }
    match password {
        // Files encrypted with an empty user password open without one.
        None => lopdf::Document::load_mem_with_password(bytes, "")
            .map_err(|_| BackendError::Core(PdfError::PasswordRequired)),
        Some(password) => lopdf::Document::load_mem_with_password(bytes, password).map_err(|_e| {
            #[cfg(feature = "tracing")]
            tracing::debug!(error = %_e, "decryption failed");
            BackendError::Core(PdfError::InvalidPassword)
        }),
    }
}

/// Look up a key in the page dictionary, walking up the page tree
/// (via /Parent) if the key is not found on the page itself.
fn resolve_inherited<'a>(
    doc: &'a lopdf::Document,
    page_id: ObjectId,
    key: &[u8],
) -> Result<Option<&'a Object>, BackendError> {
    let mut current_id = page_id;
    // Bounded so a /Parent cycle cannot hang the walk.
    for _ in 0..64 {
        let dict = doc
            .get_object(current_id)
            .and_then(|o| o.as_dict())
            .map_err(|e| BackendError::Parse(format!("failed to get page dictionary: {e}")))?;

        if let Ok(value) = dict.get(key) {
            return Ok(Some(value));
        }

        match dict.get(b"Parent") {
            Ok(parent) => {
                current_id = parent
                    .as_reference()
                    .map_err(|e| BackendError::Parse(format!("invalid /Parent reference: {e}")))?;
            }
            Err(_) => return Ok(None),
        }
    }
    Err(BackendError::Parse("page tree /Parent chain too deep".to_string()))
}

/// Normalised `[x0, y0, x1, y1]`, inherited, Letter when absent.
fn media_box(doc: &lopdf::Document, page_id: ObjectId) -> Result<[f64; 4], BackendError> {
    let Some(obj) = resolve_inherited(doc, page_id, b"MediaBox")? else {
        return Ok(DEFAULT_MEDIA_BOX);
    };
    let values: Option<Vec<f64>> = resolve(doc, obj)
        .as_array()
        .ok()
        .and_then(|arr| arr.iter().map(|o| number(resolve(doc, o))).collect());
    match values.as_deref() {
        Some(&[a, b, c, d]) => Ok([a.min(c), b.min(d), a.max(c), b.max(d)]),
        _ => Err(BackendError::Parse(
            "MediaBox is not an array of four numbers".to_string(),
        )),
    }
}

/// Filter names of a stream, references resolved.
fn filter_names(doc: &lopdf::Document, dict: &Dictionary) -> Vec<Vec<u8>> {
    match dict.get(b"Filter").ok().map(|o| resolve(doc, o)) {
        Some(Object::Name(name)) => vec![name.clone()],
        Some(Object::Array(items)) => items
            .iter()
            .filter_map(|o| resolve(doc, o).as_name().ok())
            .map(<[u8]>::to_vec)
            .collect(),
        _ => Vec::new(),
    }
}

/// Decode a content stream.
///
/// An unsupported filter is an error; a supported filter whose data does not
/// decode yields `Ok(Err(_))` so only the pages using the stream fail.
fn decode_stream(doc: &lopdf::Document, stream: &Stream) -> Result<Content, BackendError> {
    let filters = filter_names(doc, &stream.dict);
    if filters.is_empty() {
        return Ok(Ok(stream.content.clone()));
    }

    let mut canonical = Vec::with_capacity(filters.len());
    for name in &filters {
        let Some((_, full)) = SUPPORTED_FILTERS.iter().find(|(n, _)| *n == name.as_slice()) else {
            return Err(BackendError::UnsupportedFilter(
                String::from_utf8_lossy(name).into_owned(),
            ));
        };
        canonical.push(*full);
    }

    let direct = !matches!(stream.dict.get(b"Filter"), Ok(Object::Reference(_)));
    let abbreviated = canonical
        .iter()
        .zip(&filters)
        .any(|(full, name)| full.as_bytes() != name.as_slice());
    let decoded = if direct && !abbreviated {
        stream.decompressed_content()
    } else {
        let mut expanded = stream.clone();
        expanded.dict.set(
            "Filter",
            Object::Array(canonical.iter().map(|n| Object::Name(n.as_bytes().to_vec())).collect()),
        );
        expanded.decompressed_content()
    };
    Ok(decoded.map_err(|e| format!("failed to decode content stream: {e}")))
}

/// Resolves pages, sharing fonts and forms between them.
struct Loader<'a> {
    doc: &'a lopdf::Document,
    fonts: HashMap<ObjectId, Arc<FontInfo>>,
    forms: HashMap<ObjectId, Arc<FormXObject>>,
    /// Forms whose resources are being resolved; a reference back to one is a
    /// cycle and is dropped.
    resolving: HashSet<ObjectId>,
}

impl<'a> Loader<'a> {
    fn new(doc: &'a lopdf::Document) -> Self {
        Self {
            doc,
            fonts: HashMap::new(),
            forms: HashMap::new(),
            resolving: HashSet::new(),
        }
    }

    fn page(&mut self, index: usize, id: ObjectId) -> Result<PageSource, BackendError> {
        let doc = self.doc;
        let dict = doc
            .get_object(id)
            .and_then(|o| o.as_dict())
            .map_err(|e| BackendError::Parse(format!("failed to get page dictionary: {e}")))?;

        let media_box = media_box(doc, id)?;
        let content = self.page_content(dict)?;
        let resources = match resolve_inherited(doc, id, b"Resources")?.map(|o| resolve(doc, o)) {
            Some(Object::Dictionary(res)) => self.resources(res, 0)?,
            _ => Resources::default(),
        };

        Ok(PageSource {
            index,
            width: media_box[2] - media_box[0],
            height: media_box[3] - media_box[1],
            media_box,
            content,
            resources,
        })
    }

    /// All `/Contents` streams joined with a space.
    fn page_content(&self, page: &Dictionary) -> Result<Content, BackendError> {
        let doc = self.doc;
        let Ok(contents) = page.get(b"Contents") else {
            return Ok(Ok(Vec::new()));
        };
        let items: Vec<&Object> = match resolve(doc, contents) {
            Object::Array(items) => items.iter().collect(),
            other => vec![other],
        };

        let mut content = Vec::new();
        let mut failure = None;
        for item in items {
            match resolve(doc, item) {
                Object::Stream(stream) => match decode_stream(doc, stream)? {
                    Ok(bytes) => {
                        if !content.is_empty() {
                            content.push(b' ');
                        }
                        content.extend_from_slice(&bytes);
                    }
                    Err(message) => {
                        failure.get_or_insert(message);
                    }
                },
                _ => {
                    failure.get_or_insert_with(|| "/Contents entry is not a stream".to_string());
                }
            }
        }
        Ok(match failure {
            Some(message) => Err(message),
            None => Ok(content),
        })
    }

    fn resources(&mut self, dict: &Dictionary, depth: usize) -> Result<Resources, BackendError> {
        let doc = self.doc;
        let mut resources = Resources::default();

        if let Some(fonts) = dict_dict(doc, dict, b"Font") {
            for (name, obj) in fonts.iter() {
                if let Some(font) = self.font(obj) {
                    resources
                        .fonts
                        .insert(String::from_utf8_lossy(name).into_owned(), font);
                }
            }
        }

        if depth < MAX_FORM_DEPTH {
            if let Some(xobjects) = dict_dict(doc, dict, b"XObject") {
                for (name, obj) in xobjects.iter() {
                    if let Some(form) = self.form(obj, depth)? {
                        resources
                            .xobjects
                            .insert(String::from_utf8_lossy(name).into_owned(), form);
                    }
                }
            }
        }
        Ok(resources)
    }

    fn font(&mut self, obj: &Object) -> Option<Arc<FontInfo>> {
        let doc = self.doc;
        let dict = resolve(doc, obj).as_dict().ok()?;
        let font = match obj {
            Object::Reference(id) => Arc::clone(
                self.fonts
                    .entry(*id)
                    .or_insert_with(|| Arc::new(FontInfo::from_dictionary(doc, dict))),
            ),
            _ => Arc::new(FontInfo::from_dictionary(doc, dict)),
        };
        Some(font)
    }

    /// Resolve a form XObject; images and other XObjects yield `None`.
    fn form(&mut self, obj: &Object, depth: usize) -> Result<Option<Arc<FormXObject>>, BackendError> {
        let doc = self.doc;
        let Object::Stream(stream) = resolve(doc, obj) else {
            return Ok(None);
        };
        let is_form = stream
            .dict
            .get(b"Subtype")
            .ok()
            .and_then(|o| resolve(doc, o).as_name().ok())
            .is_some_and(|n| n == b"Form");
        if !is_form {
            return Ok(None);
        }

        let id = match obj {
            Object::Reference(id) => Some(*id),
            _ => None,
        };
        if let Some(id) = id {
            if let Some(form) = self.forms.get(&id) {
                return Ok(Some(Arc::clone(form)));
            }
            if !self.resolving.insert(id) {
                return Ok(None);
            }
        }

        let built = self.build_form(stream, depth);
        if let Some(id) = id {
            self.resolving.remove(&id);
        }
        let form = Arc::new(built?);
        if let Some(id) = id {
            self.forms.insert(id, Arc::clone(&form));
        }
        Ok(Some(form))
    }

    fn build_form(&mut self, stream: &Stream, depth: usize) -> Result<FormXObject, BackendError> {
        let doc = self.doc;
        let matrix = dict_array(doc, &stream.dict, b"Matrix")
            .and_then(|m| m.iter().map(|o| number(resolve(doc, o))).collect::<Option<Vec<f64>>>())
            .and_then(|v| <[f64; 6]>::try_from(v).ok())
            .map_or_else(Ctm::identity, Ctm::from_array);
        let content = decode_stream(doc, stream)?;
        let resources = match dict_dict(doc, &stream.dict, b"Resources") {
            Some(res) => Some(self.resources(res, depth + 1)?),
            None => None,
        };
        Ok(FormXObject {
            matrix,
            content,
            resources,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    /// Build a PDF with one page per content stream.
    fn pdf_with_pages(contents: &[&[u8]], resources: Dictionary) -> Vec<u8> {
        let mut doc = lopdf::Document::with_version("1.5");
        let pages_id: ObjectId = doc.new_object_id();
        let mut kids: Vec<Object> = Vec::new();
        for content in contents {
            let content_id = doc.add_object(Object::Stream(Stream::new(
                dictionary! {},
                content.to_vec(),
            )));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }
        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Resources" => resources,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        let mut buf = Vec::new();
        doc.save_to(&mut buf).expect("failed to save test PDF");
        buf
    }

    /// Save a document whose single page is built by `page`.
    fn pdf_with_page(build: impl FnOnce(&mut lopdf::Document, ObjectId) -> Dictionary) -> Vec<u8> {
        let mut doc = lopdf::Document::with_version("1.5");
        let pages_id: ObjectId = doc.new_object_id();
        let page = build(&mut doc, pages_id);
        let page_id = doc.add_object(page);
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1_i64,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        let mut buf = Vec::new();
        doc.save_to(&mut buf).expect("failed to save test PDF");
        buf
    }

    #[test]
    fn invalid_bytes_are_a_parse_error() {
        let err = load_document(b"not a pdf", None, None).unwrap_err();
        assert!(matches!(err, PdfError::ParseError(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn pages_inherit_media_box_and_resources() {
        let resources = dictionary! {
            "Font" => dictionary! {
                "F1" => dictionary! { "Type" => "Font", "Subtype" => "Type1", "BaseFont" => "Helvetica" },
            },
        };
        let bytes = pdf_with_pages(&[b"BT ET", b"0 0 m 10 10 l S"], resources);
        let doc = load_document(&bytes, None, None).unwrap();
        assert_eq!(doc.page_count, 2);
        assert_eq!(doc.pages.len(), 2);
        let page = &doc.pages[1];
        assert_eq!(page.index, 1);
        assert_eq!((page.width, page.height), (612.0, 792.0));
        assert_eq!(page.content.as_deref(), Ok(&b"0 0 m 10 10 l S"[..]));
        assert_eq!(page.resources.font("F1").map(|f| f.name.as_str()), Some("Helvetica"));
        assert!(doc.skipped_pages().is_empty());
    }

    #[test]
    fn max_pages_leaves_the_rest_unresolved() {
        let bytes = pdf_with_pages(&[b"", b"", b""], Dictionary::new());
        let doc = load_document(&bytes, None, Some(1)).unwrap();
        assert_eq!(doc.page_count, 3);
        assert_eq!(doc.pages.len(), 1);
        assert_eq!(doc.skipped_pages(), vec![1, 2]);

        let doc = load_document(&bytes, None, Some(10)).unwrap();
        assert_eq!(doc.pages.len(), 3);
    }

    #[test]
    fn missing_media_box_defaults_to_letter() {
        let bytes = pdf_with_page(|_, parent| dictionary! { "Type" => "Page", "Parent" => parent });
        let doc = load_document(&bytes, None, None).unwrap();
        assert_eq!(doc.pages[0].media_box, DEFAULT_MEDIA_BOX);
        assert_eq!(doc.pages[0].content.as_deref(), Ok(&b""[..]));
    }

    #[test]
    fn media_box_is_normalised() {
        let bytes = pdf_with_page(|_, parent| {
            dictionary! {
                "Type" => "Page",
                "Parent" => parent,
                "MediaBox" => vec![300.into(), 400.into(), 0.into(), 0.into()],
            }
        });
        let doc = load_document(&bytes, None, None).unwrap();
        assert_eq!(doc.pages[0].media_box, [0.0, 0.0, 300.0, 400.0]);
        assert_eq!(doc.pages[0].height, 400.0);
    }

    #[test]
    fn content_array_is_concatenated() {
        let bytes = pdf_with_page(|doc, parent| {
            let a = doc.add_object(Object::Stream(Stream::new(dictionary! {}, b"q".to_vec())));
            let b = doc.add_object(Object::Stream(Stream::new(dictionary! {}, b"Q".to_vec())));
            dictionary! {
                "Type" => "Page",
                "Parent" => parent,
                "Contents" => vec![a.into(), b.into()],
            }
        });
        let doc = load_document(&bytes, None, None).unwrap();
        assert_eq!(doc.pages[0].content.as_deref(), Ok(&b"q Q"[..]));
    }

    #[test]
    fn unsupported_filter_is_fatal() {
        let bytes = pdf_with_page(|doc, parent| {
            let content = doc.add_object(Object::Stream(Stream::new(
                dictionary! { "Filter" => "JBIG2Decode" },
                vec![0, 1, 2],
            )));
            dictionary! { "Type" => "Page", "Parent" => parent, "Contents" => content }
        });
        let err = load_document(&bytes, None, None).unwrap_err();
        assert_eq!(err, PdfError::UnsupportedFilter("JBIG2Decode".to_string()));
    }

    #[test]
    fn corrupt_flate_data_fails_only_the_page() {
        let bytes = pdf_with_page(|doc, parent| {
            let content = doc.add_object(Object::Stream(Stream::new(
                dictionary! { "Filter" => "FlateDecode" },
                b"this is not zlib data".to_vec(),
            )));
            dictionary! { "Type" => "Page", "Parent" => parent, "Contents" => content }
        });
        let doc = load_document(&bytes, None, None).unwrap();
        let message = doc.pages[0].content.as_ref().unwrap_err();
        assert!(message.contains("failed to decode"));
    }

    #[test]
    fn abbreviated_filter_is_accepted() {
        let bytes = pdf_with_page(|doc, parent| {
            let content = doc.add_object(Object::Stream(Stream::new(
                dictionary! { "Filter" => "Fl" },
                b"garbage".to_vec(),
            )));
            dictionary! { "Type" => "Page", "Parent" => parent, "Contents" => content }
        });
        // Not fatal: the filter is known, only the data is bad.
        let doc = load_document(&bytes, None, None).unwrap();
        assert!(doc.pages[0].content.is_err());
    }

    #[test]
    fn fonts_are_shared_between_pages() {
        let mut doc = lopdf::Document::with_version("1.5");
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "ABCDEF+Courier",
        });
        let pages_id: ObjectId = doc.new_object_id();
        let mut kids: Vec<Object> = Vec::new();
        for _ in 0..2 {
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
            });
            kids.push(page_id.into());
        }
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! { "Type" => "Pages", "Kids" => kids, "Count" => 2_i64 }),
        );
        let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog_id);
        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();

        let loaded = load_document(&buf, None, None).unwrap();
        let a = loaded.pages[0].resources.font("F1").unwrap();
        let b = loaded.pages[1].resources.font("F1").unwrap();
        assert!(Arc::ptr_eq(a, b));
        assert_eq!(a.name, "Courier");
    }

    #[test]
    fn nested_forms_are_resolved_with_matrix() {
        let bytes = pdf_with_page(|doc, parent| {
            let inner = doc.add_object(Object::Stream(Stream::new(
                dictionary! { "Type" => "XObject", "Subtype" => "Form", "BBox" => vec![0.into(), 0.into(), 10.into(), 10.into()] },
                b"0 0 5 5 re f".to_vec(),
            )));
            let outer = doc.add_object(Object::Stream(Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Form",
                    "Matrix" => vec![2.into(), 0.into(), 0.into(), 2.into(), 10.into(), 20.into()],
                    "Resources" => dictionary! { "XObject" => dictionary! { "Inner" => inner } },
                },
                b"/Inner Do".to_vec(),
            )));
            dictionary! {
                "Type" => "Page",
                "Parent" => parent,
                "Resources" => dictionary! { "XObject" => dictionary! { "Outer" => outer } },
            }
        });
        let doc = load_document(&bytes, None, None).unwrap();
        let outer = doc.pages[0].resources.xobject("Outer").unwrap();
        assert_eq!(outer.matrix, Ctm::new(2.0, 0.0, 0.0, 2.0, 10.0, 20.0));
        let inner = outer.resources.as_ref().unwrap().xobject("Inner").unwrap();
        assert_eq!(inner.matrix, Ctm::identity());
        assert!(inner.resources.is_none());
        assert_eq!(inner.content.as_deref(), Ok(&b"0 0 5 5 re f"[..]));
    }

    #[test]
    fn self_referencing_form_terminates() {
        let bytes = pdf_with_page(|doc, parent| {
            let form_id = doc.new_object_id();
            doc.objects.insert(
                form_id,
                Object::Stream(Stream::new(
                    dictionary! {
                        "Type" => "XObject",
                        "Subtype" => "Form",
                        "Resources" => dictionary! { "XObject" => dictionary! { "Me" => form_id } },
                    },
                    b"/Me Do".to_vec(),
                )),
            );
            dictionary! {
                "Type" => "Page",
                "Parent" => parent,
                "Resources" => dictionary! { "XObject" => dictionary! { "Me" => form_id } },
            }
        });
        let doc = load_document(&bytes, None, None).unwrap();
        let form = doc.pages[0].resources.xobject("Me").unwrap();
        assert!(form.resources.as_ref().unwrap().xobjects.is_empty());
    }

    #[test]
    fn image_xobjects_are_ignored() {
        let bytes = pdf_with_page(|doc, parent| {
            let image = doc.add_object(Object::Stream(Stream::new(
                dictionary! { "Type" => "XObject", "Subtype" => "Image", "Width" => 1_i64, "Height" => 1_i64 },
                vec![0],
            )));
            dictionary! {
                "Type" => "Page",
                "Parent" => parent,
                "Resources" => dictionary! { "XObject" => dictionary! { "Im0" => image } },
            }
        });
        let doc = load_document(&bytes, None, None).unwrap();
        assert!(doc.pages[0].resources.xobjects.is_empty());
    }
}
