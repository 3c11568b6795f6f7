// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Content fingerprints
//!
//! A fingerprint is a SHA-256 digest over the logical identity of a response:
//! what was asked for, never how it is rendered. It is computed before the
//! response document is built, so conditional and `HEAD` requests can be
//! answered from it alone. Only the collection listing reads the source
//! first, because the set of source collections can change at any time.

use std::fmt;

use sha2::{Digest, Sha256};
use shared_types::Extent;

use crate::{
    PropertyFilter,
    orchestrator::{CollectionInfo, CollectionKind},
};

/// Deterministic digest used as an entity tag
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentFingerprint(String);

impl ContentFingerprint {
    /// Digest of a response kind and its identifying parts
    ///
    /// Every part is length-prefixed, so `["ab", "c"]` and `["a", "bc"]`
    /// never collide.
    pub fn of_parts<I, P>(kind: &str, parts: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        let mut hasher = Sha256::new();
        update_part(&mut hasher, kind);
        for part in parts {
            update_part(&mut hasher, part.as_ref());
        }
        Self(hex::encode(hasher.finalize()))
    }

    /// Fingerprint of a single feature response
    pub fn for_feature(collection: &str, id: u64) -> Self {
        Self::of_parts("feature", [collection, id.to_string().as_str()])
    }

    /// Fingerprint of a collection listing
    pub fn for_listing(collections: &[CollectionInfo]) -> Self {
        Self::of_parts(
            "collections",
            collections.iter().map(|c| {
                let origin = match c.kind {
                    CollectionKind::Source => "source",
                    CollectionKind::Ephemeral => "ephemeral",
                };
                format!("{origin}:{}", c.name)
            }),
        )
    }

    /// Fingerprint of a feature page response
    pub fn for_page(
        collection: &str,
        filter: &PropertyFilter,
        extent: Option<&Extent>,
        start: u64,
        stop: u64,
    ) -> Self {
        let extent = extent.map_or_else(String::new, ToString::to_string);
        Self::of_parts(
            "page",
            [
                collection,
                filter.canonical().as_str(),
                extent.as_str(),
                start.to_string().as_str(),
                stop.to_string().as_str(),
            ],
        )
    }

    /// Hex digest
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Quoted strong entity tag
    pub fn etag(&self) -> String {
        format!("\"{}\"", self.0)
    }

    /// Whether an `If-None-Match` header value covers this fingerprint
    ///
    /// Accepts `*`, comma separated lists and weak tags (`W/"..."`).
    pub fn matches_if_none_match(&self, header: &str) -> bool {
        header.split(',').map(str::trim).any(|tag| {
            tag == "*" || {
                let tag = tag.strip_prefix("W/").unwrap_or(tag);
                tag.strip_prefix('"')
                    .and_then(|t| t.strip_suffix('"'))
                    .is_some_and(|t| t == self.0)
            }
        })
    }
}

fn update_part(hasher: &mut Sha256, part: &str) {
    hasher.update((part.len() as u64).to_be_bytes());
    hasher.update(part.as_bytes());
}

impl fmt::Display for ContentFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn primary() -> PropertyFilter {
        PropertyFilter::new().with_property("highway", "primary")
    }

    #[test]
    fn identical_requests_share_fingerprint() {
        let a = ContentFingerprint::for_page("roads", &primary(), None, 0, 10);
        let b = ContentFingerprint::for_page("roads", &primary(), None, 0, 10);
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
    }

    #[test]
    fn page_number_changes_fingerprint() {
        let first = ContentFingerprint::for_page("roads", &primary(), None, 0, 10);
        let second = ContentFingerprint::for_page("roads", &primary(), None, 10, 20);
        assert_ne!(first, second);
    }

    #[test]
    fn filter_and_extent_change_fingerprint() {
        let base = ContentFingerprint::for_page("roads", &PropertyFilter::new(), None, 0, 10);
        assert_ne!(base, ContentFingerprint::for_page("roads", &primary(), None, 0, 10));
        let extent = Extent::new(0.0, 0.0, 1.0, 1.0).unwrap();
        assert_ne!(
            base,
            ContentFingerprint::for_page("roads", &PropertyFilter::new(), Some(&extent), 0, 10)
        );
    }

    #[test]
    fn listing_tracks_source_and_ephemeral_names() {
        let roads = CollectionInfo {
            name: "roads".to_string(),
            kind: CollectionKind::Source,
        };
        let parks = CollectionInfo {
            name: "parks".to_string(),
            kind: CollectionKind::Source,
        };
        let before = ContentFingerprint::for_listing(std::slice::from_ref(&roads));
        let added = ContentFingerprint::for_listing(&[parks, roads.clone()]);
        assert_ne!(before, added);

        let as_ephemeral = CollectionInfo {
            kind: CollectionKind::Ephemeral,
            ..roads
        };
        assert_ne!(before, ContentFingerprint::for_listing(&[as_ephemeral]));
    }

    #[test]
    fn parts_are_delimited() {
        assert_ne!(
            ContentFingerprint::of_parts("x", ["ab", "c"]),
            ContentFingerprint::of_parts("x", ["a", "bc"])
        );
        assert_ne!(
            ContentFingerprint::for_feature("roads", 1),
            ContentFingerprint::for_feature("roads", 11)
        );
    }

    #[test]
    fn if_none_match_forms() {
        let fp = ContentFingerprint::for_feature("roads", 1);
        assert!(fp.matches_if_none_match(&fp.etag()));
        assert!(fp.matches_if_none_match(&format!("W/{}", fp.etag())));
        assert!(fp.matches_if_none_match(&format!("\"other\", {}", fp.etag())));
        assert!(fp.matches_if_none_match("*"));
        assert!(!fp.matches_if_none_match("\"other\""));
        assert!(!fp.matches_if_none_match(fp.as_str()));
    }
}
