//! Binary XML to readable XML text.
//!
//! Binary documents declare namespaces with dedicated chunks ahead of the
//! element they belong to, so declarations seen since the last opening tag
//! are queued and hoisted onto the next element written.

use std::collections::HashMap;

use anyhow::{Context, Result};
use xml::writer::XmlEvent;
use xml::EventWriter;

use crate::{AxmlDocument, Event};

type XmlName<'a> = xml::name::Name<'a>;

/// Iterates `doc` to the end, emitting its content as XML text.
pub fn axml_to_xml<W: std::io::Write>(
    writer: &mut EventWriter<W>,
    doc: &mut AxmlDocument,
) -> Result<()> {
    // (prefix, uri) pairs from StartNamespace chunks since the last opening tag.
    let mut queued_namespaces: Vec<(Option<String>, String)> = Vec::new();
    // The currently available namespace prefixes, keyed by uri.
    let mut current_ns_prefixes: HashMap<String, String> = HashMap::new();

    while doc.has_next() {
        match doc.next_event()? {
            Event::StartNamespace(id) => {
                let ns = doc.namespace(id)?;
                let uri = ns
                    .uri()
                    .context("namespace chunk without a uri")?
                    .to_owned();
                let prefix = ns.prefix().map(str::to_owned);
                if let Some(prefix) = &prefix {
                    current_ns_prefixes.insert(uri.clone(), prefix.clone());
                }
                queued_namespaces.push((prefix, uri));
            }
            Event::EndNamespace(id) => {
                let ns = doc.namespace(id)?;
                if let Some(uri) = ns.uri() {
                    current_ns_prefixes.remove(uri);
                }
            }
            Event::StartElement(id) => {
                let element = doc.element(id)?;
                let pool = doc.string_pool().context("element before string pool")?;
                let name = element.name().context("element without a name")?;

                let mut attr_values = Vec::with_capacity(element.attributes.len());
                for attr in &element.attributes {
                    attr_values.push(attr.typed_value.value(pool)?);
                }

                let mut builder = XmlEvent::start_element(qualify(
                    name,
                    element.namespace(),
                    &current_ns_prefixes,
                ));
                for (attr, value) in element.attributes.iter().zip(attr_values.iter()) {
                    let attr_name = attr.name.value().context("attribute without a name")?;
                    builder = builder.attr(
                        qualify(attr_name, attr.ns.value(), &current_ns_prefixes),
                        value,
                    );
                }
                for (prefix, uri) in &queued_namespaces {
                    builder = match prefix {
                        Some(prefix) => builder.ns(prefix.as_str(), uri.as_str()),
                        None => builder.default_ns(uri.as_str()),
                    };
                }
                writer.write(builder)?;
                queued_namespaces.clear();
            }
            Event::EndElement(id) => {
                let element = doc.end_element(id)?;
                match element.name() {
                    Some(name) => writer.write(XmlEvent::end_element().name(qualify(
                        name,
                        element.namespace(),
                        &current_ns_prefixes,
                    )))?,
                    None => writer.write(XmlEvent::end_element())?,
                }
            }
            Event::Unknown { type_code, .. } => {
                writer.write(XmlEvent::comment(&format!(
                    "unhandled chunk type {type_code:#06x}"
                )))?;
            }
            Event::Document | Event::StringPool | Event::ResourceMap => {}
        }
    }

    Ok(())
}

fn qualify<'a>(
    name: &'a str,
    namespace: Option<&'a str>,
    ns_prefixes: &'a HashMap<String, String>,
) -> XmlName<'a> {
    match namespace {
        Some(uri) => XmlName::qualified(name, uri, ns_prefixes.get(uri).map(String::as_str)),
        None => XmlName::local(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::tests::test_manifest;
    use xml::EmitterConfig;

    #[test]
    fn prints_manifest_with_hoisted_namespaces() -> Result<()> {
        let mut doc = AxmlDocument::new(test_manifest())?;
        let mut out = Vec::new();
        let mut writer = EmitterConfig::new()
            .perform_indent(true)
            .create_writer(&mut out);
        axml_to_xml(&mut writer, &mut doc)?;

        let text = String::from_utf8(out)?;
        assert!(text.contains("<manifest"));
        assert!(text.contains("xmlns:android=\"http://schemas.android.com/apk/res/android\""));
        assert!(text.contains("android:versionCode=\"1\""));
        assert!(text.contains("package=\"com.example.app\""));
        Ok(())
    }
}
