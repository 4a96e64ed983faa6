//! SVG sanitation.
//!
//! Vector images skip the raster pipeline entirely. Each `*.svg` in the
//! source directory is cleaned up and copied to every destination, with no
//! staleness check since the work is trivial.
//!
//! The cleanup keeps the output valid for EPUB readers: editor metadata and
//! `data-*` attributes are dropped, but default attributes and
//! `<style type="text/css">` blocks stay. The document is walked as XML
//! events, so only markup is touched, never text or CDATA content.

use crate::paths::PathSet;
use crate::plan::list_sources;
use crate::process::VariantReport;
use crate::variants::{SVG_DESTINATIONS, VariantName};
use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SvgError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("malformed SVG: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("malformed SVG attribute: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),
}

/// Copy of `tag` without its `data-*` attributes.
fn without_data_attributes(tag: &BytesStart<'_>) -> Result<BytesStart<'static>, SvgError> {
    let mut out = tag.to_owned();
    out.clear_attributes();
    for attr in tag.attributes() {
        let attr = attr?;
        if !attr.key.as_ref().starts_with(b"data-") {
            out.push_attribute(attr);
        }
    }
    Ok(out)
}

fn is_blank(text: &BytesText<'_>) -> bool {
    text.iter().all(u8::is_ascii_whitespace)
}

/// Clean one SVG document.
///
/// Drops the XML declaration, doctype, comments, `<metadata>` subtrees and
/// every `data-*` attribute. Whitespace-only text between elements goes too,
/// except inside `<text>`, where it separates words. CDATA and `<style>`
/// content pass through untouched.
pub fn sanitize_svg(svg: &str) -> Result<String, SvgError> {
    let mut reader = Reader::from_str(svg);
    let mut writer = Writer::new(Vec::new());

    // Depth inside <metadata>; 0 when outside
    let mut skipping = 0usize;
    // Depth of open <text> elements
    let mut in_text = 0usize;
    // Blank text outside <text>, kept only when it borders an entity
    // reference or more text
    let mut pending: Option<BytesText<'static>> = None;
    let mut after_reference = false;

    loop {
        let event = reader.read_event()?;
        if let Event::Eof = event {
            break;
        }

        if skipping > 0 {
            match event {
                Event::Start(_) => skipping += 1,
                Event::End(_) => skipping -= 1,
                _ => {}
            }
            continue;
        }

        let is_reference = matches!(event, Event::GeneralRef(_));
        let joins_text = is_reference || matches!(event, Event::Text(_));
        if let Some(blank) = pending.take() {
            if joins_text {
                writer.write_event(Event::Text(blank))?;
            }
        }

        match event {
            Event::Decl(_) | Event::DocType(_) | Event::Comment(_) => {}
            Event::Start(tag) if tag.local_name().as_ref() == b"metadata" => skipping = 1,
            Event::Empty(tag) if tag.local_name().as_ref() == b"metadata" => {}
            Event::Start(tag) => {
                if tag.local_name().as_ref() == b"text" {
                    in_text += 1;
                }
                writer.write_event(Event::Start(without_data_attributes(&tag)?))?;
            }
            Event::Empty(tag) => {
                writer.write_event(Event::Empty(without_data_attributes(&tag)?))?;
            }
            Event::End(tag) => {
                if tag.local_name().as_ref() == b"text" {
                    in_text = in_text.saturating_sub(1);
                }
                writer.write_event(Event::End(tag))?;
            }
            Event::Text(text) if in_text == 0 && is_blank(&text) => {
                if after_reference {
                    writer.write_event(Event::Text(text))?;
                } else {
                    pending = Some(text.into_owned());
                }
            }
            other => writer.write_event(other)?,
        }
        after_reference = is_reference;
    }

    Ok(String::from_utf8_lossy(&writer.into_inner()).into_owned())
}

/// Sanitise every SVG in the source directory into all destinations.
///
/// Per-file failures are logged and counted. Only a failure to list the
/// source directory is returned.
pub fn run_svg(paths: &PathSet) -> io::Result<VariantReport> {
    let mut report = VariantReport::new(VariantName::Svg);
    let sources = list_sources(&paths.source, &["svg".to_string()])?;
    tracing::info!(variant = "svg", files = sources.len(), "sanitising vector images");

    for source in &sources {
        match sanitize_file(source, paths) {
            Ok(()) => report.processed += 1,
            Err((destination, e)) => {
                tracing::warn!(
                    file = %source.display(),
                    variant = "svg",
                    destination = %destination,
                    error = %e,
                    "failed to sanitise SVG"
                );
                report.failed += 1;
            }
        }
    }
    Ok(report)
}

fn sanitize_file(source: &Path, paths: &PathSet) -> Result<(), (String, SvgError)> {
    let cleaned = fs::read_to_string(source)
        .map_err(SvgError::from)
        .and_then(|content| sanitize_svg(&content))
        .map_err(|e| ("-".to_string(), e))?;
    let Some(file_name) = source.file_name() else {
        return Ok(());
    };
    for dest in SVG_DESTINATIONS {
        let dir = paths.destination(*dest);
        fs::create_dir_all(dir)
            .and_then(|()| fs::write(dir.join(file_name), &cleaned))
            .map_err(|e| (dir.display().to_string(), e.into()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::{Destination, ProjectSelector};
    use tempfile::TempDir;

    const INKSCAPE_SVG: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>
<!-- Created with Inkscape (http://www.inkscape.org/) -->
<!DOCTYPE svg PUBLIC "-//W3C//DTD SVG 1.1//EN" "http://www.w3.org/Graphics/SVG/1.1/DTD/svg11.dtd">
<svg xmlns="http://www.w3.org/2000/svg" width="100" height="50" data-name="Layer 1">
  <metadata>
    <rdf:RDF><cc:Work rdf:about=""/></rdf:RDF>
  </metadata>
  <style type="text/css">.a{fill:#000}</style>
  <rect class="a" x="0" y="0" width="100" height="50" data-id='r1'/>
</svg>
"#;

    #[test]
    fn strips_editor_noise() {
        let out = sanitize_svg(INKSCAPE_SVG).unwrap();
        assert!(!out.contains("<?xml"));
        assert!(!out.contains("<!DOCTYPE"));
        assert!(!out.contains("Inkscape"));
        assert!(!out.contains("metadata"));
        assert!(!out.contains("data-"));
        assert!(!out.contains(">\n"));
    }

    #[test]
    fn keeps_style_and_defaults() {
        let out = sanitize_svg(INKSCAPE_SVG).unwrap();
        assert!(out.contains(r#"<style type="text/css">.a{fill:#000}</style>"#));
        assert!(out.contains(r#"x="0" y="0""#));
        assert!(out.starts_with("<svg"));
        assert!(out.ends_with("</svg>"));
    }

    #[test]
    fn doctype_with_internal_subset() {
        let svg = "<!DOCTYPE svg [\n<!ENTITY ns \"x\">\n]>\n<svg/>";
        assert_eq!(sanitize_svg(svg).unwrap(), "<svg/>");
    }

    #[test]
    fn self_closing_metadata() {
        assert_eq!(
            sanitize_svg("<svg><metadata/><g/></svg>").unwrap(),
            "<svg><g/></svg>"
        );
    }

    #[test]
    fn word_spacing_between_tspans_survives() {
        let svg = "<svg>\n  <text><tspan>Hello</tspan> <tspan>World</tspan></text>\n</svg>";
        assert_eq!(
            sanitize_svg(svg).unwrap(),
            "<svg><text><tspan>Hello</tspan> <tspan>World</tspan></text></svg>"
        );
    }

    #[test]
    fn markup_lookalikes_in_content_are_kept() {
        let svg = concat!(
            "<svg>",
            "<style><![CDATA[/* <!-- keep --> */ [data-x] { fill: red }]]></style>",
            "<text>data-id=\"1\"</text>",
            "<desc>a &amp; b &lt; &gt;</desc>",
            "</svg>"
        );
        assert_eq!(sanitize_svg(svg).unwrap(), svg);
    }

    #[test]
    fn nested_metadata_subtree_is_dropped() {
        let svg = "<svg><metadata><rdf:RDF><cc:Work><dc:title>x</dc:title></cc:Work></rdf:RDF></metadata><g data-layer=\"1\" id=\"g\"/></svg>";
        assert_eq!(sanitize_svg(svg).unwrap(), "<svg><g id=\"g\"/></svg>");
    }

    #[test]
    fn malformed_svg_is_an_error() {
        assert!(sanitize_svg("<svg><g></svg>").is_err());
    }

    #[test]
    fn run_svg_writes_every_destination() {
        let tmp = TempDir::new().unwrap();
        let paths = PathSet::resolve(&ProjectSelector::default()).under(tmp.path());
        fs::create_dir_all(&paths.source).unwrap();
        fs::write(paths.source.join("figure.svg"), INKSCAPE_SVG).unwrap();
        fs::write(paths.source.join("photo.jpg"), "not svg").unwrap();

        let report = run_svg(&paths).unwrap();
        assert_eq!(report.name, VariantName::Svg);
        assert_eq!(report.processed, 1);
        assert_eq!(report.failed, 0);

        for dest in Destination::ALL {
            let dir = paths.destination(dest);
            let written = fs::read_to_string(dir.join("figure.svg")).unwrap();
            assert_eq!(written, sanitize_svg(INKSCAPE_SVG).unwrap());
            assert!(!dir.join("photo.jpg").exists());
        }
    }

    #[test]
    fn run_svg_counts_unreadable_files() {
        let tmp = TempDir::new().unwrap();
        let paths = PathSet::resolve(&ProjectSelector::default()).under(tmp.path());
        fs::create_dir_all(&paths.source).unwrap();
        fs::write(paths.source.join("broken.svg"), [0xff, 0xfe, 0x00]).unwrap();

        let report = run_svg(&paths).unwrap();
        assert_eq!(report.processed, 0);
        assert_eq!(report.failed, 1);
    }

    #[test]
    fn run_svg_counts_malformed_files() {
        let tmp = TempDir::new().unwrap();
        let paths = PathSet::resolve(&ProjectSelector::default()).under(tmp.path());
        fs::create_dir_all(&paths.source).unwrap();
        fs::write(paths.source.join("bad.svg"), "<svg><g></svg>").unwrap();
        fs::write(paths.source.join("good.svg"), "<svg/>").unwrap();

        let report = run_svg(&paths).unwrap();
        assert_eq!((report.processed, report.failed), (1, 1));
        assert!(!paths.web.join("bad.svg").exists());
    }

    #[test]
    fn run_svg_missing_source_dir_is_empty() {
        let tmp = TempDir::new().unwrap();
        let paths = PathSet::resolve(&ProjectSelector::default()).under(tmp.path());
        let report = run_svg(&paths).unwrap();
        assert_eq!(report.processed, 0);
    }
}
