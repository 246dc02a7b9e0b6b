use image::{ DynamicImage, GenericImageView };
use log::{ debug, error, warn };

use std::fs;
use std::io::Write;
use std::path::{ Path, PathBuf };

use config::DetectorConfig;
use detect::{ BoundingBox, Detection, Detector };
use error::Result;
use ocr::Recognizer;

pub mod config;
pub mod detect;
pub mod error;
pub mod ocr;
pub mod utils;


/// Which detections count as plates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlateFilter {
    pub class_id: u32,
    pub min_confidence: f32,
}

impl PlateFilter {
    pub fn accepts(&self, detection: &Detection) -> bool {
        detection.class_id == self.class_id && detection.score >= self.min_confidence
    }
}

impl From<&DetectorConfig> for PlateFilter {
    fn from(config: &DetectorConfig) -> Self {
        Self { class_id: config.plate_class_id, min_confidence: config.min_confidence }
    }
}

/// A plate that was detected and read.
/// `bbox` is the region actually handed to ocr, i.e. clamped to the image.
#[derive(Debug, Clone, PartialEq)]
pub struct PlateReading {
    pub bbox: BoundingBox,
    pub score: f32,
    pub text: String,
}

/// Everything read from one image file.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageReport {
    pub path: PathBuf,
    pub plates: Vec<PlateReading>,
}

/// Progress of `Lpr::read_dir`.
/// `Started` comes for every listed file, before the detector runs;
/// `Finished` only for files that were read without error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReadEvent<'a> {
    Started(&'a Path),
    Finished(&'a ImageReport),
}

/// Console form of an event, one line per image and two per plate.
pub fn write_event<W: Write>(out: &mut W, event: &ReadEvent) -> Result<()> {
    match event {
        ReadEvent::Started(path) => {
            let name = path.file_name().unwrap_or_else(|| path.as_os_str());
            writeln!(out, "Processing image: {}", name.to_string_lossy())?;
        },
        ReadEvent::Finished(report) => {
            for plate in &report.plates {
                let b = &plate.bbox;
                writeln!(out, "Detected license plate with confidence {:.2} at [{}, {}, {}, {}]",
                    plate.score, b.x1, b.y1, b.x2, b.y2)?;
                writeln!(out, "Detected License Plate Text: {}", plate.text)?;
            }
        },
    }
    Ok(())
}

pub struct Lpr<D, R> {
    detector: D,
    recognizer: R,
    filter: PlateFilter,
}

impl<D: Detector, R: Recognizer> Lpr<D, R> {

    pub fn new(detector: D, recognizer: R, filter: PlateFilter) -> Self {
        Lpr { detector, recognizer, filter }
    }

    /// Give the stages back, mostly useful to inspect test doubles.
    pub fn into_parts(self) -> (D, R) {
        (self.detector, self.recognizer)
    }

    /// Detect plates in one image and read each of them.
    pub fn read_plates(&mut self, img: &DynamicImage) -> Result<Vec<PlateReading>> {
        let (width, height) = img.dimensions();
        let detections = self.detector.detect(img)?;
        debug!("{} detections", detections.len());

        let mut plates = Vec::new();
        for detection in detections {
            if !self.filter.accepts(&detection) {
                debug!("skip detection of class {} with score {:.2}", detection.class_id, detection.score);
                continue;
            }
            let a_box = match utils::clamp_box(&detection.bbox, width, height) {
                Some(a_box) => a_box,
                None => {
                    warn!("plate box {:?} has no area inside {}x{} image, skipped", detection.bbox, width, height);
                    continue;
                }
            };
            if a_box != detection.bbox {
                warn!("plate box {:?} clamped to {:?}", detection.bbox, a_box);
            }
            let plate = utils::crop(img, &a_box);
            let text = self.recognizer.recognize(&plate)?;
            plates.push(PlateReading { bbox: a_box, score: detection.score, text });
        }
        Ok(plates)
    }

    /// Load an image file and read its plates.
    pub fn read_image(&mut self, path: impl AsRef<Path>) -> Result<ImageReport> {
        let path = path.as_ref();
        let plates = load_image(path)
            .and_then(|img| self.read_plates(&img))
            .map_err(|e| e.in_image(path))?;
        Ok(ImageReport { path: path.to_path_buf(), plates })
    }

    /// Read every image of `dir` whose extension is in `extensions`.
    /// `on_event` hears about each file before and after it is read; its errors abort the run.
    /// Returns how many images were read successfully.
    pub fn read_dir<F>(&mut self, dir: impl AsRef<Path>, extensions: &[String], keep_going: bool, mut on_event: F) -> Result<usize>
    where F: FnMut(ReadEvent) -> Result<()>
    {
        let mut success = 0;
        for path in list_images(dir, extensions)? {
            debug!("reading {}", path.display());
            on_event(ReadEvent::Started(&path))?;
            match self.read_image(&path) {
                Ok(report) => {
                    on_event(ReadEvent::Finished(&report))?;
                    success += 1;
                },
                Err(e) if keep_going => error!("{}", e),
                Err(e) => return Err(e),
            }
        }
        Ok(success)
    }
}

/// Decode by content, the file extension is only a hint.
fn load_image(path: &Path) -> Result<DynamicImage> {
    let img = image::io::Reader::open(path)?
        .with_guessed_format()?
        .decode()?;
    Ok(img)
}

/// Regular files of `dir` whose name ends with `.<ext>` for one of `extensions`
/// (case-insensitive), sorted by path. A bare `.png` counts as a png.
pub fn list_images(dir: impl AsRef<Path>, extensions: &[String]) -> Result<Vec<PathBuf>> {
    let suffixes: Vec<String> = extensions.iter()
        .map(|ext| format!(".{}", ext.trim_start_matches('.').to_ascii_lowercase()))
        .collect();
    let mut images = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let accepted = path.file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.to_ascii_lowercase())
            .map(|name| suffixes.iter().any(|suffix| name.ends_with(suffix.as_str())))
            .unwrap_or(false);
        if accepted {
            images.push(path);
        }
    }
    images.sort();
    Ok(images)
}
