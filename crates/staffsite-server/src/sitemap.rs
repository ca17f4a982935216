//! `sitemap.xml` generation with `quick-xml`'s writer API.

use std::{collections::BTreeMap, io::Cursor};

use chrono::{DateTime, Utc};
use quick_xml::{
  Writer,
  events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
};
use staffsite_core::{AppConfig, section::{Section, SectionRecord}};
use strum::IntoEnumIterator;

use crate::error::Error;

pub const NS_SITEMAP: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

type XmlWriter = Writer<Cursor<Vec<u8>>>;

/// Render the sitemap for every public page. A page's `lastmod` is the most
/// recent update of the sections rendered on it.
pub fn render(config: &AppConfig, records: &[SectionRecord]) -> Result<Vec<u8>, Error> {
  let mut pages: BTreeMap<&'static str, Option<DateTime<Utc>>> = BTreeMap::new();
  pages.insert("/", None);
  for section in Section::iter() {
    pages.entry(section.page_path()).or_insert(None);
  }
  for record in records {
    let slot = pages.entry(record.section.page_path()).or_insert(None);
    if slot.is_none_or(|at| at < record.updated_at) {
      *slot = Some(record.updated_at);
    }
  }

  let mut w = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
  w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
    .map_err(xml_error)?;

  let mut urlset = BytesStart::new("urlset");
  urlset.push_attribute(("xmlns", NS_SITEMAP));
  w.write_event(Event::Start(urlset)).map_err(xml_error)?;

  for (path, lastmod) in pages {
    w.write_event(Event::Start(BytesStart::new("url"))).map_err(xml_error)?;
    write_text_elem(&mut w, "loc", &config.absolute_url(path))?;
    if let Some(at) = lastmod {
      write_text_elem(&mut w, "lastmod", &at.format("%Y-%m-%d").to_string())?;
    }
    w.write_event(Event::End(BytesEnd::new("url"))).map_err(xml_error)?;
  }

  w.write_event(Event::End(BytesEnd::new("urlset"))).map_err(xml_error)?;
  Ok(w.into_inner().into_inner())
}

fn write_text_elem(w: &mut XmlWriter, tag: &str, text: &str) -> Result<(), Error> {
  w.write_event(Event::Start(BytesStart::new(tag))).map_err(xml_error)?;
  w.write_event(Event::Text(BytesText::new(text))).map_err(xml_error)?;
  w.write_event(Event::End(BytesEnd::new(tag))).map_err(xml_error)?;
  Ok(())
}

fn xml_error(e: impl std::fmt::Display) -> Error { Error::Internal(format!("xml error: {e}")) }
