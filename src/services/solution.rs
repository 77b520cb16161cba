use crate::core::photo::{PhotoId, PhotoSet};
use crate::core::report::Slideshow;
use crate::core::slide::{SlideError, SlideUnit};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SolutionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed solution at line {line}: {message}")]
    Malformed { line: usize, message: String },

    #[error("Invalid slide at line {line}: {source}")]
    InvalidSlide { line: usize, source: SlideError },

    #[error("Photo {photo} is used on lines {first} and {second}")]
    PhotoReused {
        photo: PhotoId,
        first: usize,
        second: usize,
    },
}

/// Serializes a slideshow: slide count, then one line of photo ids per slide.
pub struct SolutionWriter;

impl SolutionWriter {
    pub fn new() -> Self {
        Self
    }

    pub fn write<W: Write>(&self, slideshow: &Slideshow, out: &mut W) -> std::io::Result<()> {
        writeln!(out, "{}", slideshow.len())?;
        for slide in slideshow.iter() {
            let ids: Vec<String> = slide.photo_ids().iter().map(|id| id.to_string()).collect();
            writeln!(out, "{}", ids.join(" "))?;
        }
        Ok(())
    }

    pub fn render(&self, slideshow: &Slideshow) -> String {
        let mut buf = Vec::new();
        // Writing into a Vec cannot fail
        let _ = self.write(slideshow, &mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Write to a temporary sibling, then rename over `path`, so a failed
    /// write never leaves a partial solution behind.
    pub fn write_atomic(&self, slideshow: &Slideshow, path: &Path) -> Result<(), SolutionError> {
        let tmp = temp_path(path);
        let result = (|| -> std::io::Result<()> {
            let mut out = BufWriter::new(File::create(&tmp)?);
            self.write(slideshow, &mut out)?;
            out.into_inner().map_err(|e| e.into_error())?.sync_all()?;
            fs::rename(&tmp, path)
        })();
        if result.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        Ok(result?)
    }
}

impl Default for SolutionWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Reads a solution file back and checks it against the dataset it claims to solve.
pub struct SolutionReader;

impl SolutionReader {
    pub fn new() -> Self {
        Self
    }

    pub fn read_path(&self, path: &Path, photos: &PhotoSet) -> Result<Slideshow, SolutionError> {
        let text = fs::read_to_string(path)?;
        self.parse_str(&text, photos)
    }

    pub fn parse_str(&self, text: &str, photos: &PhotoSet) -> Result<Slideshow, SolutionError> {
        let mut lines = text.lines().enumerate().map(|(i, l)| (i + 1, l.trim()));

        let (_, header) = lines.next().ok_or(SolutionError::Malformed {
            line: 1,
            message: "missing slide count".to_string(),
        })?;
        let count: usize = header.parse().map_err(|_| SolutionError::Malformed {
            line: 1,
            message: format!("invalid slide count '{}'", header),
        })?;

        let mut slides = Vec::new();
        let mut owner: HashMap<PhotoId, usize> = HashMap::new();
        for (line, raw) in lines.by_ref().take(count) {
            let ids = raw
                .split_whitespace()
                .map(|t| t.parse::<PhotoId>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| SolutionError::Malformed {
                    line,
                    message: format!("invalid photo id in '{}'", raw),
                })?;
            let slide = SlideUnit::from_photos(photos, &ids)
                .map_err(|source| SolutionError::InvalidSlide { line, source })?;
            for &photo in slide.photo_ids() {
                if let Some(first) = owner.insert(photo, line) {
                    return Err(SolutionError::PhotoReused {
                        photo,
                        first,
                        second: line,
                    });
                }
            }
            slides.push(slide);
        }

        if slides.len() < count {
            return Err(SolutionError::Malformed {
                line: slides.len() + 2,
                message: format!("declared {} slides, found {}", count, slides.len()),
            });
        }
        if let Some((line, _)) = lines.find(|(_, l)| !l.is_empty()) {
            return Err(SolutionError::Malformed {
                line,
                message: format!("unexpected content after {} slides", count),
            });
        }

        Ok(Slideshow::new(slides))
    }
}

impl Default for SolutionReader {
    fn default() -> Self {
        Self::new()
    }
}
