//! Turns an approved record into self-contained document markup.
//!
//! Border artwork and the portrait are embedded as data URIs so the markup
//! renders identically in a browser, in the PDF engine and as a mail
//! attachment.

pub mod assets;

use askama::Template;

use crate::biodata::normalize::normalize_payload;
use crate::biodata::template::Layout;
use crate::biodata::{display_name, section_fields, Field, Section, TemplateChoice, SECTIONS};
use crate::models::Biodata;

pub use assets::AssetLoader;

#[derive(Debug, Clone)]
pub struct SectionView {
    pub heading: &'static str,
    pub left: Vec<Field>,
    pub right: Vec<Field>,
}

impl SectionView {
    pub fn is_empty(&self) -> bool {
        self.left.is_empty() && self.right.is_empty()
    }
}

/// Everything a layout needs, already resolved to display strings.
#[derive(Debug, Clone)]
pub struct DocumentView {
    pub template: TemplateChoice,
    pub name: Option<String>,
    pub sections: Vec<SectionView>,
    pub border_uri: Option<String>,
    pub portrait_uri: Option<String>,
}

impl DocumentView {
    pub fn build(
        record: &Biodata,
        template: TemplateChoice,
        border_uri: Option<String>,
        portrait_uri: Option<String>,
    ) -> Self {
        // Rows not yet repaired still render cleanly.
        let payload = normalize_payload(&record.data);
        let sections = SECTIONS
            .iter()
            .map(|section| section_view(&payload, *section))
            .collect();
        Self {
            template,
            name: display_name(&payload, Some(record.user_name.as_str())),
            sections,
            border_uri,
            portrait_uri,
        }
    }

    pub fn title(&self) -> String {
        match &self.name {
            Some(name) => format!("Biodata - {name}"),
            None => "Biodata".to_string(),
        }
    }
}

fn section_view(payload: &serde_json::Value, section: Section) -> SectionView {
    let (left, right) = split_columns(section_fields(payload, section));
    SectionView {
        heading: section.heading(),
        left,
        right,
    }
}

/// Even positions go left, odd positions go right.
pub fn split_columns(fields: Vec<Field>) -> (Vec<Field>, Vec<Field>) {
    let mut left = Vec::with_capacity(fields.len().div_ceil(2));
    let mut right = Vec::with_capacity(fields.len() / 2);
    for (i, field) in fields.into_iter().enumerate() {
        if i % 2 == 0 {
            left.push(field);
        } else {
            right.push(field);
        }
    }
    (left, right)
}

#[derive(Template)]
#[template(path = "biodata/centered.html")]
struct CenteredTemplate<'a> {
    title: String,
    name: &'a str,
    border_uri: &'a str,
    portrait_uri: &'a str,
    sections: Vec<&'a SectionView>,
}

#[derive(Template)]
#[template(path = "biodata/side_portrait.html")]
struct SidePortraitTemplate<'a> {
    title: String,
    portrait_uri: &'a str,
    sections: &'a [SectionView],
}

/// Render a prepared view with the layout its template selects.
pub fn render_markup(view: &DocumentView) -> Result<String, askama::Error> {
    let portrait_uri = view.portrait_uri.as_deref().unwrap_or_default();
    match view.template.layout() {
        Layout::Centered => CenteredTemplate {
            title: view.title(),
            name: view.name.as_deref().unwrap_or_default(),
            border_uri: view.border_uri.as_deref().unwrap_or_default(),
            portrait_uri,
            sections: view.sections.iter().filter(|s| !s.is_empty()).collect(),
        }
        .render(),
        Layout::SidePortrait => SidePortraitTemplate {
            title: view.title(),
            portrait_uri,
            sections: &view.sections,
        }
        .render(),
    }
}
