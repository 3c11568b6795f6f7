// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! HTML rendering of response documents
//!
//! Pages are built with `maud`; every interpolated value is escaped.

use maud::{DOCTYPE, Markup, html};
use shared_types::{Feature, PropertyValue};

use crate::document::{Document, Link};

fn property_text(value: &PropertyValue) -> String {
    match value {
        PropertyValue::String(s) => s.clone(),
        PropertyValue::Boolean(b) => b.to_string(),
        PropertyValue::Integer(i) => i.to_string(),
        PropertyValue::Float(x) => x.to_string(),
        PropertyValue::Json(v) => v.to_string(),
    }
}

fn link_list<'a>(links: impl IntoIterator<Item = &'a Link>) -> Markup {
    let links: Vec<&Link> = links.into_iter().collect();
    html! {
        @if !links.is_empty() {
            ul.links {
                @for link in links {
                    li {
                        a rel=(link.rel) type=(link.media_type) href=(link.href) {
                            (link.title.as_deref().unwrap_or(&link.rel))
                        }
                    }
                }
            }
        }
    }
}

fn feature_section(feature: &Feature) -> Markup {
    html! {
        section.feature {
            h2 { (feature.collection) " " (feature.id) }
            table {
                @for (key, value) in &feature.properties {
                    tr {
                        th { (key) }
                        td { (property_text(value)) }
                    }
                }
            }
            pre.geometry { (feature.geometry.to_string()) }
        }
    }
}

/// Page title and body of a document
fn content(document: &Document) -> (String, Markup) {
    match document {
        Document::Landing(page) => (
            page.title.clone(),
            html! {
                p { (page.description) }
                (link_list(&page.links))
            },
        ),
        Document::Conformance(decl) => (
            "Conformance".to_string(),
            html! {
                ul {
                    @for class in &decl.conforms_to {
                        li { (class) }
                    }
                }
            },
        ),
        Document::Collections(list) => (
            "Collections".to_string(),
            html! {
                ul.collections {
                    @for collection in &list.collections {
                        li {
                            (collection.title) " "
                            small { "(" (collection.kind) ")" }
                            (link_list(&collection.links))
                        }
                    }
                }
                (link_list(&list.links))
            },
        ),
        Document::Collection(collection) => (
            collection.title.clone(),
            html! {
                p { (collection.kind) " collection" }
                (link_list(&collection.links))
            },
        ),
        Document::Feature(result) => (
            format!("{} {}", result.feature.collection, result.feature.id),
            html! {
                (feature_section(&result.feature))
                (link_list([&result.self_link, &result.collection_link]))
            },
        ),
        Document::FeatureCollection(page) => (
            "Features".to_string(),
            html! {
                p { (page.returned) " of " (page.total_matched) " matching features" }
                @for feature in &page.features {
                    (feature_section(feature))
                }
                (link_list(page.links()))
            },
        ),
        Document::MaterializedSet(set) => (
            set.collection_name.clone(),
            html! {
                p {
                    (set.matched_count) " features stored as "
                    code { (set.collection_name) }
                }
                (link_list(&set.links))
            },
        ),
    }
}

/// Render a document as a standalone HTML page
pub fn render(document: &Document) -> String {
    let (title, body) = content(document);
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                title { (title) }
            }
            body {
                h1 { (title) }
                (body)
            }
        }
    }
    .into_string()
}
