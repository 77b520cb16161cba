use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Stable 0-based photo identifier, assigned by input order.
pub type PhotoId = usize;

/// Interned tag identifier. Only meaningful within the `PhotoSet` that produced it.
pub type TagId = u32;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown orientation '{value}', expected 'H' or 'V'")]
pub struct OrientationError {
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

impl FromStr for Orientation {
    type Err = OrientationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "H" => Ok(Orientation::Horizontal),
            "V" => Ok(Orientation::Vertical),
            other => Err(OrientationError {
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::Horizontal => write!(f, "H"),
            Orientation::Vertical => write!(f, "V"),
        }
    }
}

/// Sorted, duplicate-free set of interned tags.
///
/// Kept as a flat sorted vector so that set sizes are O(1) and
/// intersections are a single linear merge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TagSet(Vec<TagId>);

impl TagSet {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn from_ids<I: IntoIterator<Item = TagId>>(ids: I) -> Self {
        let mut ids: Vec<TagId> = ids.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();
        Self(ids)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, id: TagId) -> bool {
        self.0.binary_search(&id).is_ok()
    }

    /// Number of tags present in both sets.
    pub fn intersection_len(&self, other: &TagSet) -> usize {
        let (a, b) = (&self.0, &other.0);
        let (mut i, mut j, mut count) = (0, 0, 0);
        while i < a.len() && j < b.len() {
            match a[i].cmp(&b[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    count += 1;
                    i += 1;
                    j += 1;
                }
            }
        }
        count
    }

    pub fn union(&self, other: &TagSet) -> TagSet {
        let (a, b) = (&self.0, &other.0);
        let mut merged = Vec::with_capacity(a.len() + b.len());
        let (mut i, mut j) = (0, 0);
        while i < a.len() && j < b.len() {
            match a[i].cmp(&b[j]) {
                std::cmp::Ordering::Less => {
                    merged.push(a[i]);
                    i += 1;
                }
                std::cmp::Ordering::Greater => {
                    merged.push(b[j]);
                    j += 1;
                }
                std::cmp::Ordering::Equal => {
                    merged.push(a[i]);
                    i += 1;
                    j += 1;
                }
            }
        }
        merged.extend_from_slice(&a[i..]);
        merged.extend_from_slice(&b[j..]);
        TagSet(merged)
    }
}

/// Maps tag strings to dense ids so tag sets can be compared as integers.
#[derive(Debug, Clone, Default)]
pub struct TagInterner {
    ids: HashMap<String, TagId>,
    names: Vec<String>,
}

impl TagInterner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, tag: &str) -> TagId {
        if let Some(&id) = self.ids.get(tag) {
            return id;
        }
        let id = self.names.len() as TagId;
        self.names.push(tag.to_string());
        self.ids.insert(tag.to_string(), id);
        id
    }

    pub fn lookup(&self, tag: &str) -> Option<TagId> {
        self.ids.get(tag).copied()
    }

    pub fn name(&self, id: TagId) -> Option<&str> {
        self.names.get(id as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Photo {
    pub id: PhotoId,
    pub orientation: Orientation,
    pub tags: TagSet,
}

/// Immutable collection of photos for one dataset.
#[derive(Debug, Clone, Default)]
pub struct PhotoSet {
    photos: Vec<Photo>,
    interner: TagInterner,
}

impl PhotoSet {
    pub fn builder() -> PhotoSetBuilder {
        PhotoSetBuilder::default()
    }

    pub fn get(&self, id: PhotoId) -> Option<&Photo> {
        self.photos.get(id)
    }

    pub fn len(&self) -> usize {
        self.photos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Photo> {
        self.photos.iter()
    }

    pub fn horizontals(&self) -> impl Iterator<Item = &Photo> {
        self.photos
            .iter()
            .filter(|p| p.orientation == Orientation::Horizontal)
    }

    /// Vertical photos in input order.
    pub fn verticals(&self) -> impl Iterator<Item = &Photo> {
        self.photos
            .iter()
            .filter(|p| p.orientation == Orientation::Vertical)
    }

    pub fn interner(&self) -> &TagInterner {
        &self.interner
    }

    /// Resolve a list of tag names against this set's interner.
    /// Names never seen in the dataset get fresh ids that match nothing.
    pub fn tag_set<I, S>(&self, tags: I) -> TagSet
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut next_unknown = self.interner.len() as TagId;
        TagSet::from_ids(tags.into_iter().map(|t| {
            self.interner.lookup(t.as_ref()).unwrap_or_else(|| {
                let id = next_unknown;
                next_unknown += 1;
                id
            })
        }))
    }
}

/// Accumulates photos in input order; ids are assigned sequentially.
#[derive(Debug, Default)]
pub struct PhotoSetBuilder {
    photos: Vec<Photo>,
    interner: TagInterner,
}

impl PhotoSetBuilder {
    pub fn push<I, S>(&mut self, orientation: Orientation, tags: I) -> PhotoId
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let id = self.photos.len();
        let interner = &mut self.interner;
        let tags = TagSet::from_ids(tags.into_iter().map(|t| interner.intern(t.as_ref())));
        self.photos.push(Photo {
            id,
            orientation,
            tags,
        });
        id
    }

    pub fn with<I, S>(mut self, orientation: Orientation, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.push(orientation, tags);
        self
    }

    pub fn len(&self) -> usize {
        self.photos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }

    pub fn build(self) -> PhotoSet {
        PhotoSet {
            photos: self.photos,
            interner: self.interner,
        }
    }
}
