use crate::core::interest::interest_factor;
use crate::core::photo::PhotoId;
use crate::core::slide::SlideUnit;

/// Ordered sequence of slides. No photo appears in more than one slide.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Slideshow {
    slides: Vec<SlideUnit>,
}

impl Slideshow {
    pub fn new(slides: Vec<SlideUnit>) -> Self {
        Self { slides }
    }

    pub fn len(&self) -> usize {
        self.slides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }

    pub fn slides(&self) -> &[SlideUnit] {
        &self.slides
    }

    pub fn iter(&self) -> impl Iterator<Item = &SlideUnit> {
        self.slides.iter()
    }

    /// Every photo id in output order.
    pub fn photo_ids(&self) -> impl Iterator<Item = PhotoId> + '_ {
        self.slides.iter().flat_map(|s| s.photo_ids().iter().copied())
    }
}

/// Scores a finished slideshow in the order given.
pub struct ScoreReporter;

impl ScoreReporter {
    /// Sum of transition scores over consecutive slides.
    pub fn total(slideshow: &Slideshow) -> u64 {
        Self::transitions(slideshow).map(u64::from).sum()
    }

    /// Score of each transition, `len() - 1` values for a non-empty slideshow.
    pub fn transitions(slideshow: &Slideshow) -> impl Iterator<Item = u32> + '_ {
        slideshow
            .slides
            .windows(2)
            .map(|pair| interest_factor(pair[0].tags(), pair[1].tags()))
    }
}
