use crate::core::photo::{Orientation, Photo, PhotoId, PhotoSet, TagSet};
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default number of upcoming verticals the score-aware pairing compares against.
pub const DEFAULT_PAIRING_WINDOW: usize = 512;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlideError {
    #[error("Photo {photo} does not exist in the dataset")]
    UnknownPhoto { photo: PhotoId },

    #[error("Photo {photo} is not {expected:?}")]
    WrongOrientation {
        photo: PhotoId,
        expected: Orientation,
    },

    #[error("Vertical photo {photo} cannot be paired with itself")]
    SamePhoto { photo: PhotoId },

    #[error("A slide holds one or two photos, got {count}")]
    BadArity { count: usize },
}

/// One renderable slide: a single horizontal photo or two vertical photos.
///
/// The combined tag set is computed once on construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideUnit {
    photos: Vec<PhotoId>,
    tags: TagSet,
}

impl SlideUnit {
    pub fn horizontal(photo: &Photo) -> Result<Self, SlideError> {
        if photo.orientation != Orientation::Horizontal {
            return Err(SlideError::WrongOrientation {
                photo: photo.id,
                expected: Orientation::Horizontal,
            });
        }
        Ok(Self {
            photos: vec![photo.id],
            tags: photo.tags.clone(),
        })
    }

    pub fn vertical_pair(first: &Photo, second: &Photo) -> Result<Self, SlideError> {
        for photo in [first, second] {
            if photo.orientation != Orientation::Vertical {
                return Err(SlideError::WrongOrientation {
                    photo: photo.id,
                    expected: Orientation::Vertical,
                });
            }
        }
        if first.id == second.id {
            return Err(SlideError::SamePhoto { photo: first.id });
        }
        Ok(Self {
            photos: vec![first.id, second.id],
            tags: first.tags.union(&second.tags),
        })
    }

    /// Build a slide from raw photo ids, checking them against `photos`.
    pub fn from_photos(photos: &PhotoSet, ids: &[PhotoId]) -> Result<Self, SlideError> {
        let lookup = |id: PhotoId| photos.get(id).ok_or(SlideError::UnknownPhoto { photo: id });
        match ids {
            [single] => Self::horizontal(lookup(*single)?),
            [first, second] => Self::vertical_pair(lookup(*first)?, lookup(*second)?),
            other => Err(SlideError::BadArity { count: other.len() }),
        }
    }

    pub fn photo_ids(&self) -> &[PhotoId] {
        &self.photos
    }

    pub fn tags(&self) -> &TagSet {
        &self.tags
    }

    pub fn is_vertical_pair(&self) -> bool {
        self.photos.len() == 2
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PairingPolicy {
    /// Take verticals two at a time in input order.
    #[default]
    Sequential,
    /// Pair each vertical with the upcoming vertical it shares the fewest tags with.
    ScoreAware,
}

/// Turns a `PhotoSet` into the candidate slide units for one run.
#[derive(Debug, Clone)]
pub struct SlideBuilder {
    pairing: PairingPolicy,
    pairing_window: Option<usize>,
}

impl Default for SlideBuilder {
    fn default() -> Self {
        Self::new(PairingPolicy::default())
    }
}

impl SlideBuilder {
    pub fn new(pairing: PairingPolicy) -> Self {
        Self {
            pairing,
            pairing_window: Some(DEFAULT_PAIRING_WINDOW),
        }
    }

    /// How many unpaired verticals score-aware pairing examines per photo.
    /// `None` examines every remaining vertical.
    pub fn with_pairing_window(mut self, window: Option<usize>) -> Self {
        self.pairing_window = window;
        self
    }

    /// Horizontal slides come first, in id order, followed by the vertical pairs.
    /// An odd vertical left over after pairing is dropped.
    pub fn build(&self, photos: &PhotoSet) -> Vec<SlideUnit> {
        let mut slides: Vec<SlideUnit> = photos
            .horizontals()
            .map(|p| SlideUnit {
                photos: vec![p.id],
                tags: p.tags.clone(),
            })
            .collect();

        let verticals: Vec<&Photo> = photos.verticals().collect();
        let pairs = match self.pairing {
            PairingPolicy::Sequential => sequential_pairs(&verticals),
            PairingPolicy::ScoreAware => score_aware_pairs(&verticals, self.pairing_window),
        };
        if verticals.len() % 2 == 1 {
            debug!("Dropping one unpaired vertical photo");
        }

        slides.extend(pairs.into_iter().map(|(a, b)| SlideUnit {
            photos: vec![a.id, b.id],
            tags: a.tags.union(&b.tags),
        }));
        slides
    }
}

fn sequential_pairs<'a>(verticals: &[&'a Photo]) -> Vec<(&'a Photo, &'a Photo)> {
    verticals
        .chunks_exact(2)
        .map(|pair| (pair[0], pair[1]))
        .collect()
}

fn score_aware_pairs<'a>(
    verticals: &[&'a Photo],
    window: Option<usize>,
) -> Vec<(&'a Photo, &'a Photo)> {
    let window = window.unwrap_or(usize::MAX).max(1);
    let mut used = vec![false; verticals.len()];
    let mut pairs = Vec::with_capacity(verticals.len() / 2);
    let mut cursor = 0;

    loop {
        while cursor < verticals.len() && used[cursor] {
            cursor += 1;
        }
        if cursor >= verticals.len() {
            break;
        }
        let anchor = verticals[cursor];
        used[cursor] = true;

        // Fewest shared tags wins, then the larger union, then the earlier photo.
        let mut best: Option<(usize, usize, usize)> = None;
        for (idx, candidate) in verticals
            .iter()
            .enumerate()
            .skip(cursor + 1)
            .filter(|(idx, _)| !used[*idx])
            .take(window)
        {
            let shared = anchor.tags.intersection_len(&candidate.tags);
            let union = anchor.tags.len() + candidate.tags.len() - shared;
            let better = match best {
                None => true,
                Some((_, best_shared, best_union)) => {
                    shared < best_shared || (shared == best_shared && union > best_union)
                }
            };
            if better {
                best = Some((idx, shared, union));
            }
        }

        match best {
            Some((idx, _, _)) => {
                used[idx] = true;
                pairs.push((anchor, verticals[idx]));
            }
            None => break,
        }
    }
    pairs
}
