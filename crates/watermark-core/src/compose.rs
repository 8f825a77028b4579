//! Stamp a rendered watermark onto every page of a document
//!
//! One watermark page is rendered per distinct page size and imported as a
//! Form XObject. Each page keeps its own content, wrapped in `q ... Q` so
//! its graphics state cannot leak, and paints the form on top.

use crate::error::WatermarkError;
use crate::fonts::FontSource;
use crate::import::import_page_as_form;
use crate::options::{DrawingOptions, FilesOptions, Layout};
use crate::render::{draw_watermarks, PreparedWatermark};
use crate::report::WatermarkReport;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Instant;

/// US Letter, used when no MediaBox can be found
const DEFAULT_PAGE_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

/// How far up the page tree inherited attributes are looked for
const MAX_INHERITANCE_DEPTH: usize = 10;

fn pdf_error(e: lopdf::Error) -> WatermarkError {
    WatermarkError::OperationError(e.to_string())
}

/// Watermark PDF bytes and return the new PDF bytes
pub fn add_watermark_to_pdf(
    bytes: &[u8],
    drawing: &DrawingOptions,
    layout: &Layout,
    prepared: &PreparedWatermark,
) -> Result<Vec<u8>, WatermarkError> {
    let mut doc = load_document(bytes)?;
    watermark_document(&mut doc, drawing, layout, prepared)?;
    save_document(doc)
}

/// Watermark one file, writing the result to `output`
pub fn add_watermark_to_file(
    input: &Path,
    output: &Path,
    drawing: &DrawingOptions,
    layout: &Layout,
    prepared: &PreparedWatermark,
) -> Result<WatermarkReport, WatermarkError> {
    let start = Instant::now();

    if !input.is_file() {
        return Err(WatermarkError::InputNotFound(input.display().to_string()));
    }
    let bytes = fs::read(input)?;

    let mut doc = load_document(&bytes)?;
    let page_count = doc.get_pages().len() as u32;
    let rendered_sizes = watermark_document(&mut doc, drawing, layout, prepared)?;
    let watermarked = save_document(doc)?;

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(output, &watermarked)?;

    let report = WatermarkReport {
        input: input.to_path_buf(),
        output: output.to_path_buf(),
        input_size_bytes: bytes.len(),
        output_size_bytes: watermarked.len(),
        page_count,
        rendered_sizes,
        processing_time_ms: start.elapsed().as_millis() as u64,
    };

    tracing::info!(
        "Watermarked {} -> {} ({} pages, {} ms)",
        input.display(),
        output.display(),
        report.page_count,
        report.processing_time_ms
    );

    Ok(report)
}

/// Watermark every input/output pair in order, stopping at the first error
pub fn add_watermark_from_options(
    files: &FilesOptions,
    drawing: &DrawingOptions,
    layout: &Layout,
    fonts: &dyn FontSource,
) -> Result<Vec<WatermarkReport>, WatermarkError> {
    drawing.validate()?;
    layout.validate()?;

    if files.is_empty() {
        tracing::warn!("No PDF files to watermark");
        return Ok(Vec::new());
    }

    let prepared = PreparedWatermark::prepare(drawing, fonts)?;

    files
        .iter()
        .map(|(input, output)| add_watermark_to_file(input, output, drawing, layout, &prepared))
        .collect()
}

fn load_document(bytes: &[u8]) -> Result<Document, WatermarkError> {
    Document::load_mem(bytes).map_err(|e| WatermarkError::ParseError(e.to_string()))
}

fn save_document(mut doc: Document) -> Result<Vec<u8>, WatermarkError> {
    doc.prune_objects();
    doc.compress();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).map_err(|e| {
        WatermarkError::OperationError(format!("Failed to save watermarked PDF: {}", e))
    })?;
    Ok(buffer)
}

/// Stamp all pages in place, returning how many watermark pages were rendered
fn watermark_document(
    doc: &mut Document,
    drawing: &DrawingOptions,
    layout: &Layout,
    prepared: &PreparedWatermark,
) -> Result<usize, WatermarkError> {
    if doc.trailer.get(b"Encrypt").is_ok() {
        return Err(WatermarkError::OperationError(
            "Encrypted PDFs are not supported".into(),
        ));
    }

    let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
    if pages.is_empty() {
        return Err(WatermarkError::OperationError("PDF has no pages".into()));
    }

    let mut forms: BTreeMap<(i64, i64), ObjectId> = BTreeMap::new();

    for page_id in pages {
        let [llx, lly, urx, ury] = page_box(doc, page_id);
        let (width, height) = (urx - llx, ury - lly);
        let key = ((width * 100.0).round() as i64, (height * 100.0).round() as i64);

        let form_id = match forms.get(&key) {
            Some(id) => *id,
            None => {
                let rendered = draw_watermarks(width, height, drawing, layout, prepared)?;
                let source = Document::load_mem(&rendered).map_err(|e| {
                    WatermarkError::OperationError(format!(
                        "Failed to read rendered watermark: {}",
                        e
                    ))
                })?;
                let id = import_page_as_form(doc, source)?;
                tracing::debug!("Rendered watermark for {}x{} pages", width, height);
                forms.insert(key, id);
                id
            }
        };

        stamp_page(doc, page_id, form_id, llx, lly)?;
    }

    Ok(forms.len())
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

fn read_rect(doc: &Document, obj: &Object) -> Option<[f64; 4]> {
    let values = resolve(doc, obj).as_array().ok()?;
    if values.len() != 4 {
        return None;
    }

    let mut rect = [0.0; 4];
    for (slot, value) in rect.iter_mut().zip(values) {
        *slot = f64::from(resolve(doc, value).as_float().ok()?);
    }

    Some([
        rect[0].min(rect[2]),
        rect[1].min(rect[3]),
        rect[0].max(rect[2]),
        rect[1].max(rect[3]),
    ])
}

/// MediaBox of a page as `[llx, lly, urx, ury]`, following inheritance
pub fn page_box(doc: &Document, page_id: ObjectId) -> [f64; 4] {
    let mut current = Some(page_id);
    for _ in 0..MAX_INHERITANCE_DEPTH {
        let Some(id) = current else { break };
        let Ok(dict) = doc.get_dictionary(id) else {
            break;
        };
        if let Some(rect) = dict
            .get(b"MediaBox")
            .ok()
            .and_then(|media_box| read_rect(doc, media_box))
        {
            return rect;
        }
        current = dict.get(b"Parent").and_then(Object::as_reference).ok();
    }
    DEFAULT_PAGE_BOX
}

fn inherited_resources(doc: &Document, page_id: ObjectId) -> Option<Dictionary> {
    let mut current = doc
        .get_dictionary(page_id)
        .ok()?
        .get(b"Parent")
        .and_then(Object::as_reference)
        .ok();

    for _ in 0..MAX_INHERITANCE_DEPTH {
        let dict = doc.get_dictionary(current?).ok()?;
        if let Ok(resources) = dict.get(b"Resources") {
            return resolve(doc, resources).as_dict().ok().cloned();
        }
        current = dict.get(b"Parent").and_then(Object::as_reference).ok();
    }
    None
}

/// Make sure the page carries its own Resources entry
fn ensure_page_resources(doc: &mut Document, page_id: ObjectId) -> Result<(), WatermarkError> {
    if doc.get_dictionary(page_id).map_err(pdf_error)?.has(b"Resources") {
        return Ok(());
    }
    let resources = inherited_resources(doc, page_id).unwrap_or_else(Dictionary::new);
    doc.get_dictionary_mut(page_id)
        .map_err(pdf_error)?
        .set("Resources", Object::Dictionary(resources));
    Ok(())
}

fn page_resources_mut(
    doc: &mut Document,
    page_id: ObjectId,
    resources_ref: Option<ObjectId>,
) -> Result<&mut Dictionary, WatermarkError> {
    match resources_ref {
        Some(id) => doc.get_dictionary_mut(id).map_err(pdf_error),
        None => doc
            .get_dictionary_mut(page_id)
            .and_then(|page| page.get_mut(b"Resources"))
            .and_then(Object::as_dict_mut)
            .map_err(pdf_error),
    }
}

/// Name for `form_id` in the page's XObject resources, adding it if needed
fn register_xobject(
    doc: &mut Document,
    page_id: ObjectId,
    form_id: ObjectId,
) -> Result<Vec<u8>, WatermarkError> {
    ensure_page_resources(doc, page_id)?;

    let resources_ref = doc
        .get_dictionary(page_id)
        .map_err(pdf_error)?
        .get(b"Resources")
        .and_then(Object::as_reference)
        .ok();

    let xobjects_ref = {
        let resources = page_resources_mut(doc, page_id, resources_ref)?;
        if !resources.has(b"XObject") {
            resources.set("XObject", Object::Dictionary(Dictionary::new()));
        }
        resources
            .get(b"XObject")
            .and_then(Object::as_reference)
            .ok()
    };

    let xobjects = match xobjects_ref {
        Some(id) => doc.get_dictionary_mut(id).map_err(pdf_error)?,
        None => page_resources_mut(doc, page_id, resources_ref)?
            .get_mut(b"XObject")
            .and_then(Object::as_dict_mut)
            .map_err(pdf_error)?,
    };

    if let Some((name, _)) = xobjects
        .iter()
        .find(|(_, value)| value.as_reference().ok() == Some(form_id))
    {
        return Ok(name.clone());
    }

    let name = (0..)
        .map(|n| format!("Wm{}", n).into_bytes())
        .find(|candidate| !xobjects.has(candidate))
        .unwrap_or_else(|| b"Wm".to_vec());
    xobjects.set(name.clone(), Object::Reference(form_id));
    Ok(name)
}

/// Paint `form_id` over a page whose MediaBox starts at (`llx`, `lly`)
pub fn stamp_page(
    doc: &mut Document,
    page_id: ObjectId,
    form_id: ObjectId,
    llx: f64,
    lly: f64,
) -> Result<(), WatermarkError> {
    let name = register_xobject(doc, page_id, form_id)?;

    let overlay = Content {
        operations: vec![
            Operation::new("Q", vec![]),
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Integer(1),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(1),
                    Object::Real(llx as f32),
                    Object::Real(lly as f32),
                ],
            ),
            Operation::new("Do", vec![Object::Name(name)]),
            Operation::new("Q", vec![]),
        ],
    };
    let mut overlay_bytes = b"\n".to_vec();
    overlay_bytes.extend(overlay.encode().map_err(pdf_error)?);

    let before_id = doc.add_object(Object::Stream(Stream::new(
        Dictionary::new(),
        b"q\n".to_vec(),
    )));
    let after_id = doc.add_object(Object::Stream(Stream::new(
        Dictionary::new(),
        overlay_bytes,
    )));

    let existing = match doc.get_dictionary(page_id).map_err(pdf_error)?.get(b"Contents") {
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(items)) => items.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Ok(Object::Array(items)) => items.clone(),
        _ => Vec::new(),
    };

    let mut contents = Vec::with_capacity(existing.len() + 2);
    contents.push(Object::Reference(before_id));
    contents.extend(existing);
    contents.push(Object::Reference(after_id));

    doc.get_dictionary_mut(page_id)
        .map_err(pdf_error)?
        .set("Contents", Object::Array(contents));
    Ok(())
}
