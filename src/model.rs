//! Record model: services, the fixed field schema, and the Video record.
//!
//! A video is identified by its (service, id) pair. Everything else is a
//! nullable display field; a record holding only its identity is a valid
//! (fully partial) record. The merge rule is the load-bearing invariant:
//! a known field value is never replaced by an absent one, so independently
//! fetched partial records for the same identity can be combined in any
//! order.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Supported video-hosting services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Service {
    Youtube,
    Vimeo,
    Dailymotion,
}

impl Service {
    pub fn as_str(self) -> &'static str {
        match self {
            Service::Youtube => "youtube",
            Service::Vimeo => "vimeo",
            Service::Dailymotion => "dailymotion",
        }
    }

    /// Syntactic validation of a raw video id for this service.
    ///
    /// This is a character-class check only; it says nothing about whether
    /// the video exists upstream.
    pub fn valid_id(self, id: &str) -> bool {
        match self {
            // Canonical YouTube ids are exactly 11 URL-safe base64 chars.
            Service::Youtube => {
                id.len() == 11
                    && id
                        .bytes()
                        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
            }
            // Vimeo ids are decimal numbers.
            Service::Vimeo => {
                !id.is_empty() && id.len() <= 19 && id.bytes().all(|b| b.is_ascii_digit())
            }
            // Dailymotion ids are short lowercase-alphanumeric slugs ("x2jvvep");
            // uppercase is accepted since the API is case-preserving.
            Service::Dailymotion => {
                !id.is_empty() && id.len() <= 32 && id.bytes().all(|b| b.is_ascii_alphanumeric())
            }
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for unrecognized service names.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown service: {0}")]
pub struct UnknownService(pub String);

impl FromStr for Service {
    type Err = UnknownService;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "youtube" => Ok(Service::Youtube),
            "vimeo" => Ok(Service::Vimeo),
            "dailymotion" => Ok(Service::Dailymotion),
            other => Err(UnknownService(other.to_string())),
        }
    }
}

/// The fixed metadata field schema.
///
/// `presentFields`-style checks operate over this enumeration instead of
/// inspecting record shape at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Title,
    Description,
    Thumbnail,
    Length,
}

impl Field {
    /// Schema order. Iteration and display follow this order everywhere.
    pub const ALL: [Field; 4] = [
        Field::Title,
        Field::Description,
        Field::Thumbnail,
        Field::Length,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Description => "description",
            Field::Thumbnail => "thumbnail",
            Field::Length => "length",
        }
    }

    fn bit(self) -> u8 {
        match self {
            Field::Title => 1 << 0,
            Field::Description => 1 << 1,
            Field::Thumbnail => 1 << 2,
            Field::Length => 1 << 3,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A set of metadata fields, backed by a bitmask over the fixed schema.
///
/// The mask makes the set a canonical, order-independent map key, so
/// grouping requests by "missing-fields shape" cannot collide the way a
/// stringified field list could.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FieldSet(u8);

impl FieldSet {
    pub const EMPTY: FieldSet = FieldSet(0);
    pub const ALL: FieldSet = FieldSet(0b1111);

    pub fn of(fields: &[Field]) -> Self {
        fields.iter().copied().collect()
    }

    pub fn insert(&mut self, field: Field) {
        self.0 |= field.bit();
    }

    pub fn contains(self, field: Field) -> bool {
        self.0 & field.bit() != 0
    }

    pub fn union(self, other: FieldSet) -> FieldSet {
        FieldSet(self.0 | other.0)
    }

    /// Fields in `self` that are not in `other`.
    pub fn difference(self, other: FieldSet) -> FieldSet {
        FieldSet(self.0 & !other.0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Iterate the contained fields in schema order.
    pub fn iter(self) -> impl Iterator<Item = Field> {
        Field::ALL.into_iter().filter(move |f| self.contains(*f))
    }
}

impl FromIterator<Field> for FieldSet {
    fn from_iter<I: IntoIterator<Item = Field>>(iter: I) -> Self {
        let mut set = FieldSet::EMPTY;
        for field in iter {
            set.insert(field);
        }
        set
    }
}

impl fmt::Display for FieldSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("(none)");
        }
        let mut first = true;
        for field in self.iter() {
            if !first {
                f.write_str("+")?;
            }
            f.write_str(field.name())?;
            first = false;
        }
        Ok(())
    }
}

/// A video metadata record, possibly partial.
///
/// Identity is solely (service, id). Every other field may be absent; a
/// cache hit or provider response is free to populate any subset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Video {
    pub service: Service,
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
    /// Duration in whole seconds.
    pub length: Option<u32>,
}

impl Video {
    /// Identity-only record with every metadata field absent.
    pub fn stub(service: Service, id: impl Into<String>) -> Self {
        Video {
            service,
            id: id.into(),
            title: None,
            description: None,
            thumbnail: None,
            length: None,
        }
    }

    /// The set of fields this record currently carries.
    pub fn present_fields(&self) -> FieldSet {
        let mut set = FieldSet::EMPTY;
        if self.title.is_some() {
            set.insert(Field::Title);
        }
        if self.description.is_some() {
            set.insert(Field::Description);
        }
        if self.thumbnail.is_some() {
            set.insert(Field::Thumbnail);
        }
        if self.length.is_some() {
            set.insert(Field::Length);
        }
        set
    }

    /// Fields of `known` that this record does not carry yet.
    pub fn missing_fields(&self, known: FieldSet) -> FieldSet {
        known.difference(self.present_fields())
    }

    pub fn is_complete(&self, known: FieldSet) -> bool {
        self.missing_fields(known).is_empty()
    }

    /// Field-wise union of two records for the same identity.
    ///
    /// Prefers the patch value when the patch carries one; never discards a
    /// known value for an absent one. Calling this across identities is a
    /// programming error.
    ///
    /// # Panics
    /// Panics if `patch` names a different (service, id).
    pub fn merge(&self, patch: &Video) -> Video {
        assert_eq!(
            (self.service, self.id.as_str()),
            (patch.service, patch.id.as_str()),
            "merge across identities"
        );
        Video {
            service: self.service,
            id: self.id.clone(),
            title: patch.title.clone().or_else(|| self.title.clone()),
            description: patch
                .description
                .clone()
                .or_else(|| self.description.clone()),
            thumbnail: patch.thumbnail.clone().or_else(|| self.thumbnail.clone()),
            length: patch.length.or(self.length),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn full(service: Service, id: &str) -> Video {
        Video {
            service,
            id: id.to_string(),
            title: Some("Title".into()),
            description: Some("Desc".into()),
            thumbnail: Some("https://example.com/t.jpg".into()),
            length: Some(212),
        }
    }

    #[test]
    fn merge_prefers_patch_and_keeps_known_fields() {
        let mut base = Video::stub(Service::Youtube, "dQw4w9WgXcQ");
        base.title = Some("old title".into());
        base.description = Some("old desc".into());

        let mut patch = Video::stub(Service::Youtube, "dQw4w9WgXcQ");
        patch.title = Some("new title".into());
        patch.length = Some(99);

        let merged = base.merge(&patch);
        assert_eq!(merged.title.as_deref(), Some("new title"));
        assert_eq!(merged.description.as_deref(), Some("old desc"));
        assert_eq!(merged.length, Some(99));
        assert_eq!(merged.thumbnail, None);
    }

    #[test]
    fn merge_is_idempotent() {
        let mut a = Video::stub(Service::Vimeo, "123");
        a.title = Some("a".into());
        let mut b = Video::stub(Service::Vimeo, "123");
        b.description = Some("b".into());

        let once = a.merge(&b);
        let twice = once.merge(&b);
        assert_eq!(once, twice);
    }

    #[test]
    fn merge_is_commutative_for_field_presence() {
        let mut a = Video::stub(Service::Dailymotion, "x2jvvep");
        a.title = Some("a".into());
        let mut b = Video::stub(Service::Dailymotion, "x2jvvep");
        b.length = Some(7);

        let ab = a.merge(&b);
        let ba = b.merge(&a);
        assert_eq!(ab.present_fields(), ba.present_fields());
        assert_eq!(ab, ba);
    }

    #[test]
    fn merging_complete_with_partial_yields_complete() {
        let complete = full(Service::Youtube, "dQw4w9WgXcQ");
        let mut partial = Video::stub(Service::Youtube, "dQw4w9WgXcQ");
        partial.length = Some(1);

        let merged = complete.merge(&partial);
        assert!(merged.is_complete(FieldSet::ALL));
        // The patch's present value wins.
        assert_eq!(merged.length, Some(1));
        assert_eq!(merged.title, complete.title);
    }

    #[test]
    #[should_panic(expected = "merge across identities")]
    fn merge_rejects_identity_mismatch() {
        let a = Video::stub(Service::Youtube, "dQw4w9WgXcQ");
        let b = Video::stub(Service::Youtube, "9bZkp7q19f0");
        let _ = a.merge(&b);
    }

    #[test]
    fn present_and_missing_fields() {
        let mut v = Video::stub(Service::Youtube, "dQw4w9WgXcQ");
        assert!(v.present_fields().is_empty());
        assert_eq!(v.missing_fields(FieldSet::ALL), FieldSet::ALL);

        v.title = Some("t".into());
        v.length = Some(3);
        let present = v.present_fields();
        assert!(present.contains(Field::Title));
        assert!(present.contains(Field::Length));
        assert!(!present.contains(Field::Description));
        assert_eq!(
            v.missing_fields(FieldSet::ALL),
            FieldSet::of(&[Field::Description, Field::Thumbnail])
        );
    }

    #[test]
    fn field_set_is_collision_free_as_a_grouping_key() {
        // Every one of the 16 subsets of the schema must map to a distinct
        // key; wrong batching would silently merge unrelated query shapes.
        let mut seen: HashMap<FieldSet, Vec<Field>> = HashMap::new();
        for mask in 0u8..16 {
            let fields: Vec<Field> = Field::ALL
                .into_iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, f)| f)
                .collect();
            let set = FieldSet::of(&fields);
            assert_eq!(set.len(), fields.len());
            assert!(
                seen.insert(set, fields.clone()).is_none(),
                "subset {:?} collided",
                fields
            );
        }
        assert_eq!(seen.len(), 16);
    }

    #[test]
    fn field_set_is_order_independent() {
        let a = FieldSet::of(&[Field::Length, Field::Title]);
        let b = FieldSet::of(&[Field::Title, Field::Length]);
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "title+length");
    }

    #[test]
    fn field_set_display() {
        assert_eq!(FieldSet::EMPTY.to_string(), "(none)");
        assert_eq!(
            FieldSet::ALL.to_string(),
            "title+description+thumbnail+length"
        );
    }

    #[test]
    fn youtube_id_validation() {
        assert!(Service::Youtube.valid_id("dQw4w9WgXcQ"));
        assert!(Service::Youtube.valid_id("a-b_c123XYZ"));
        assert!(!Service::Youtube.valid_id("!!!invalid!!!"));
        assert!(!Service::Youtube.valid_id("tooshort"));
        assert!(!Service::Youtube.valid_id("muchtoolongforanid"));
    }

    #[test]
    fn vimeo_id_validation() {
        assert!(Service::Vimeo.valid_id("76979871"));
        assert!(!Service::Vimeo.valid_id(""));
        assert!(!Service::Vimeo.valid_id("12a4"));
    }

    #[test]
    fn dailymotion_id_validation() {
        assert!(Service::Dailymotion.valid_id("x2jvvep"));
        assert!(!Service::Dailymotion.valid_id("x2j-vep"));
        assert!(!Service::Dailymotion.valid_id(""));
    }

    #[test]
    fn service_round_trips_through_str() {
        for service in [Service::Youtube, Service::Vimeo, Service::Dailymotion] {
            assert_eq!(service.as_str().parse::<Service>().unwrap(), service);
        }
        assert!("myspace".parse::<Service>().is_err());
    }
}
