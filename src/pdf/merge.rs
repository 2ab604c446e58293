//! Compositing a staged overlay page onto the template's first page
//!
//! The overlay page is imported as a Form XObject and invoked from a content
//! stream appended after the page's own contents, so it always paints on top.
//! Original content streams are left byte-for-byte intact.

use std::collections::{BTreeMap, BTreeSet};

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use tracing::debug;

use crate::error::Result;
use super::objects::{first_page_id, inherited_attribute, resolve};
use super::overlay::StagedOverlay;

/// Prefix of the XObject resource name used for the overlay
const OVERLAY_XOBJECT_PREFIX: &str = "FormFill";

/// Merge the staged overlay onto `page_id` of `doc`.
///
/// Returns the resource name the overlay was registered under.
pub fn merge_overlay(doc: &mut Document, page_id: ObjectId, overlay: &StagedOverlay) -> Result<String> {
    let overlay_doc = overlay.load()?;
    let overlay_page_id = first_page_id(&overlay_doc)?;

    let (content, resources) = page_content_and_resources(&overlay_doc, overlay_page_id)?;

    // Import only what the overlay page's resources reach, renumbered above
    // the template's highest object id
    let mut reachable = BTreeSet::new();
    collect_references(&overlay_doc, &resources, &mut reachable);

    let id_offset = doc.max_id;
    let id_map: BTreeMap<ObjectId, ObjectId> = reachable
        .iter()
        .map(|&old_id| (old_id, (old_id.0 + id_offset, old_id.1)))
        .collect();

    for (old_id, new_id) in &id_map {
        if let Ok(object) = overlay_doc.get_object(*old_id) {
            doc.objects.insert(*new_id, renumber_object_references(object, &id_map));
        }
    }
    if let Some(highest) = id_map.values().map(|id| id.0).max() {
        doc.max_id = doc.max_id.max(highest);
    }

    let bbox: Vec<Object> = overlay
        .page_box()
        .to_array()
        .iter()
        .map(|&v| Object::Real(v))
        .collect();
    let xobject = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "FormType" => 1,
            "BBox" => bbox,
            "Resources" => renumber_object_references(&resources, &id_map),
        },
        content,
    );
    let xobject_id = doc.add_object(xobject);

    let name = add_xobject_to_page_resources(doc, page_id, xobject_id)?;

    // Bracket the original contents in q/Q so a transform they leave behind
    // cannot displace the overlay
    let save_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let restore_id = doc.add_object(Stream::new(Dictionary::new(), b"Q\n".to_vec()));
    let invoke_id = doc.add_object(Stream::new(
        Dictionary::new(),
        format!("q\n/{} Do\nQ\n", name).into_bytes(),
    ));

    prepend_content_to_page(doc, page_id, save_id)?;
    append_content_to_page(doc, page_id, restore_id)?;
    append_content_to_page(doc, page_id, invoke_id)?;

    debug!(xobject = %name, imported = id_map.len(), "merged overlay onto page");
    Ok(name)
}

/// Concatenated (decoded) content and the resources object of a page
fn page_content_and_resources(doc: &Document, page_id: ObjectId) -> Result<(Vec<u8>, Object)> {
    let page_dict = doc.get_object(page_id)?.as_dict()?;

    let content_ids: Vec<ObjectId> = match page_dict.get(b"Contents") {
        Ok(Object::Reference(id)) => vec![*id],
        Ok(Object::Array(arr)) => arr.iter().filter_map(|obj| obj.as_reference().ok()).collect(),
        _ => vec![],
    };

    let mut content = Vec::new();
    for content_id in content_ids {
        if let Object::Stream(stream) = doc.get_object(content_id)? {
            if stream.dict.has(b"Filter") {
                content.extend(stream.decompressed_content()?);
            } else {
                content.extend_from_slice(&stream.content);
            }
            content.push(b'\n');
        }
    }

    let resources = inherited_attribute(doc, page_id, b"Resources")
        .and_then(|res| resolve(doc, res))
        .cloned()
        .unwrap_or_else(|| Object::Dictionary(Dictionary::new()));

    Ok((content, resources))
}

/// Collect every object id reachable from `object`
fn collect_references(doc: &Document, object: &Object, seen: &mut BTreeSet<ObjectId>) {
    match object {
        Object::Reference(id) => {
            if seen.insert(*id) {
                if let Ok(target) = doc.get_object(*id) {
                    collect_references(doc, target, seen);
                }
            }
        }
        Object::Array(arr) => {
            for item in arr {
                collect_references(doc, item, seen);
            }
        }
        Object::Dictionary(dict) => {
            for (_, value) in dict.iter() {
                collect_references(doc, value, seen);
            }
        }
        Object::Stream(stream) => {
            for (_, value) in stream.dict.iter() {
                collect_references(doc, value, seen);
            }
        }
        _ => {}
    }
}

/// Renumber all object references in an object
fn renumber_object_references(object: &Object, id_map: &BTreeMap<ObjectId, ObjectId>) -> Object {
    match object {
        Object::Reference(old_id) => Object::Reference(*id_map.get(old_id).unwrap_or(old_id)),
        Object::Array(arr) => {
            Object::Array(arr.iter().map(|obj| renumber_object_references(obj, id_map)).collect())
        }
        Object::Dictionary(dict) => Object::Dictionary(renumber_dictionary(dict, id_map)),
        Object::Stream(stream) => {
            let mut renumbered = stream.clone();
            renumbered.dict = renumber_dictionary(&stream.dict, id_map);
            Object::Stream(renumbered)
        }
        _ => object.clone(),
    }
}

fn renumber_dictionary(dict: &Dictionary, id_map: &BTreeMap<ObjectId, ObjectId>) -> Dictionary {
    let mut new_dict = Dictionary::new();
    for (key, value) in dict.iter() {
        new_dict.set(key.clone(), renumber_object_references(value, id_map));
    }
    new_dict
}

/// Register the XObject in the page's own Resources under a free name.
///
/// Inherited or indirect resources are copied onto the page first so nothing
/// the original content relies on is hidden.
fn add_xobject_to_page_resources(doc: &mut Document, page_id: ObjectId, xobject_id: ObjectId) -> Result<String> {
    let mut resources = match inherited_attribute(doc, page_id, b"Resources").and_then(|res| resolve(doc, res)) {
        Some(Object::Dictionary(dict)) => dict.clone(),
        _ => Dictionary::new(),
    };

    let mut xobjects = match resources.get(b"XObject").ok().and_then(|xo| resolve(doc, xo)) {
        Some(Object::Dictionary(dict)) => dict.clone(),
        _ => Dictionary::new(),
    };

    let mut suffix = 0;
    let name = loop {
        let candidate = format!("{}{}", OVERLAY_XOBJECT_PREFIX, suffix);
        if !xobjects.has(candidate.as_bytes()) {
            break candidate;
        }
        suffix += 1;
    };

    xobjects.set(name.clone(), Object::Reference(xobject_id));
    resources.set("XObject", Object::Dictionary(xobjects));

    let page_dict = doc.get_object_mut(page_id)?.as_dict_mut()?;
    page_dict.set("Resources", Object::Dictionary(resources));

    Ok(name)
}

/// Current `/Contents` of a page as a list of entries
fn page_contents(doc: &Document, page_id: ObjectId) -> Result<Vec<Object>> {
    let page_dict = doc.get_object(page_id)?.as_dict()?;
    Ok(match page_dict.get(b"Contents") {
        Ok(Object::Array(arr)) => arr.clone(),
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(arr)) => arr.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Ok(other) => vec![other.clone()],
        Err(_) => vec![],
    })
}

fn prepend_content_to_page(doc: &mut Document, page_id: ObjectId, new_content_id: ObjectId) -> Result<()> {
    let mut contents = page_contents(doc, page_id)?;
    contents.insert(0, Object::Reference(new_content_id));
    doc.get_object_mut(page_id)?
        .as_dict_mut()?
        .set("Contents", Object::Array(contents));
    Ok(())
}

fn append_content_to_page(doc: &mut Document, page_id: ObjectId, new_content_id: ObjectId) -> Result<()> {
    let mut contents = page_contents(doc, page_id)?;
    contents.push(Object::Reference(new_content_id));
    doc.get_object_mut(page_id)?
        .as_dict_mut()?
        .set("Contents", Object::Array(contents));
    Ok(())
}
