//! Bring a rendered watermark page into another document
//!
//! The page's objects are copied with their ids shifted past the
//! destination's `max_id`, then the page itself is rebuilt as a Form
//! XObject so it can be painted onto any number of pages.

use crate::error::WatermarkError;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

/// Import the first page of `source` into `dest` as a Form XObject and
/// return the form's id.
///
/// The form's bounding box is the source page's MediaBox. Objects of the
/// source that the form does not reach stay unreferenced, so callers
/// should prune before saving.
pub fn import_page_as_form(dest: &mut Document, source: Document) -> Result<ObjectId, WatermarkError> {
    let page_id = source
        .get_pages()
        .values()
        .next()
        .copied()
        .ok_or_else(|| WatermarkError::OperationError("Watermark page is missing".into()))?;

    let content = source.get_page_content(page_id).map_err(|e| {
        WatermarkError::OperationError(format!("Failed to read watermark content: {}", e))
    })?;

    let page = source
        .get_dictionary(page_id)
        .map_err(|e| WatermarkError::OperationError(format!("Invalid watermark page: {}", e)))?;

    let bbox = page
        .get(b"MediaBox")
        .map_err(|_| WatermarkError::OperationError("Watermark page has no MediaBox".into()))?
        .clone();

    let resources = page
        .get(b"Resources")
        .cloned()
        .unwrap_or_else(|_| Object::Dictionary(Dictionary::new()));

    let id_offset = dest.max_id;
    let source_max_id = source.max_id;
    let resources = remap_object_refs(resources, id_offset);
    let bbox = remap_object_refs(bbox, id_offset);

    for (old_id, object) in source.objects.into_iter() {
        let new_id = (old_id.0 + id_offset, old_id.1);
        dest.objects.insert(new_id, remap_object_refs(object, id_offset));
    }
    dest.max_id = dest.max_id.max(source_max_id + id_offset);

    let mut form = Dictionary::new();
    form.set("Type", Object::Name(b"XObject".to_vec()));
    form.set("Subtype", Object::Name(b"Form".to_vec()));
    form.set("FormType", Object::Integer(1));
    form.set("BBox", bbox);
    form.set(
        "Matrix",
        Object::Array(vec![
            Object::Integer(1),
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(1),
            Object::Integer(0),
            Object::Integer(0),
        ]),
    );
    form.set("Resources", resources);

    Ok(dest.add_object(Object::Stream(Stream::new(form, content))))
}

/// Recursively shift every object reference by `offset`
fn remap_object_refs(obj: Object, offset: u32) -> Object {
    match obj {
        Object::Reference(id) => Object::Reference((id.0 + offset, id.1)),
        Object::Array(arr) => Object::Array(
            arr.into_iter()
                .map(|o| remap_object_refs(o, offset))
                .collect(),
        ),
        Object::Dictionary(dict) => Object::Dictionary(remap_dictionary(dict, offset)),
        Object::Stream(mut stream) => {
            stream.dict = remap_dictionary(stream.dict, offset);
            Object::Stream(stream)
        }
        other => other,
    }
}

fn remap_dictionary(mut dict: Dictionary, offset: u32) -> Dictionary {
    for (_, value) in dict.iter_mut() {
        let taken = std::mem::replace(value, Object::Null);
        *value = remap_object_refs(taken, offset);
    }
    dict
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};

    /// One-page document whose page draws a referenced image XObject
    fn create_source_page() -> Document {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let image_id = doc.add_object(Object::Stream(Stream::new(
            Dictionary::new(),
            b"pixels".to_vec(),
        )));
        let mut xobjects = Dictionary::new();
        xobjects.set("Im0", Object::Reference(image_id));
        let mut resources = Dictionary::new();
        resources.set("XObject", Object::Dictionary(xobjects));

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_id = doc.add_object(Object::Stream(Stream::new(
            Dictionary::new(),
            content.encode().unwrap(),
        )));

        let mut page = Dictionary::new();
        page.set("Type", Object::Name(b"Page".to_vec()));
        page.set("Parent", Object::Reference(pages_id));
        page.set("Contents", Object::Reference(content_id));
        page.set("Resources", Object::Dictionary(resources));
        page.set(
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(300),
                Object::Integer(400),
            ]),
        );
        let page_id = doc.add_object(Object::Dictionary(page));

        let mut pages = Dictionary::new();
        pages.set("Type", Object::Name(b"Pages".to_vec()));
        pages.set("Kids", Object::Array(vec![Object::Reference(page_id)]));
        pages.set("Count", Object::Integer(1));
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(pages_id));
        let catalog_id = doc.add_object(Object::Dictionary(catalog));
        doc.trailer.set("Root", Object::Reference(catalog_id));
        doc
    }

    #[test]
    fn test_remap_nested_references() {
        let obj = Object::Array(vec![
            Object::Reference((3, 0)),
            Object::Dictionary(Dictionary::from_iter(vec![(
                "Inner",
                Object::Reference((7, 0)),
            )])),
            Object::Integer(5),
        ]);
        let remapped = remap_object_refs(obj, 10);
        let arr = remapped.as_array().unwrap();
        assert_eq!(arr[0].as_reference().unwrap(), (13, 0));
        let inner = arr[1].as_dict().unwrap().get(b"Inner").unwrap();
        assert_eq!(inner.as_reference().unwrap(), (17, 0));
        assert_eq!(arr[2].as_i64().unwrap(), 5);
    }

    #[test]
    fn test_import_builds_form_with_remapped_resources() {
        let mut dest = Document::with_version("1.5");
        for _ in 0..5 {
            dest.add_object(Object::Null);
        }
        let offset = dest.max_id;

        let form_id = import_page_as_form(&mut dest, create_source_page()).unwrap();
        let form = dest.get_object(form_id).unwrap().as_stream().unwrap();

        assert_eq!(form.dict.get(b"Subtype").unwrap().as_name().unwrap(), b"Form");
        let bbox = form.dict.get(b"BBox").unwrap().as_array().unwrap();
        assert_eq!(bbox[3].as_i64().unwrap(), 400);

        let resources = form.dict.get(b"Resources").unwrap().as_dict().unwrap();
        let xobjects = resources.get(b"XObject").unwrap().as_dict().unwrap();
        let image_id = xobjects.get(b"Im0").unwrap().as_reference().unwrap();
        assert!(image_id.0 > offset);
        let image = dest.get_object(image_id).unwrap().as_stream().unwrap();
        assert_eq!(image.content, b"pixels".to_vec());

        let ops = Content::decode(&form.content).unwrap().operations;
        assert_eq!(ops[1].operator, "Do");
    }

    #[test]
    fn test_import_empty_document_fails() {
        let mut dest = Document::with_version("1.5");
        let result = import_page_as_form(&mut dest, Document::with_version("1.5"));
        assert!(result.is_err());
    }
}
