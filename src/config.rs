//! Runtime configuration, read from a TOML file.
//!
//! Every field has a default, so an empty file (or no file) is a valid config:
//!
//! ```toml
//! image_dir = "data/test"
//! extensions = ["png"]
//!
//! [detector]
//! model_path = "models/detect.pb"
//! min_confidence = 0.6
//!
//! [ocr]
//! language = "eng"
//! page_seg_mode = 8
//! ```

use serde::Deserialize;

use std::fs;
use std::path::{ Path, PathBuf };

use crate::error::{ LprError, Result };

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    /// Folder scanned for images
    #[serde(default = "default_image_dir")]
    pub image_dir: PathBuf,

    /// Accepted file extensions, compared case-insensitively
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Log a failing image and go on instead of aborting the run
    #[serde(default)]
    pub keep_going: bool,

    #[serde(default)]
    pub detector: DetectorConfig,

    #[serde(default)]
    pub ocr: OcrConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DetectorConfig {
    /// Frozen object detection graph
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    #[serde(default = "default_input_name")]
    pub input_name: String,
    #[serde(default = "default_boxes_name")]
    pub boxes_name: String,
    #[serde(default = "default_scores_name")]
    pub scores_name: String,
    #[serde(default = "default_classes_name")]
    pub classes_name: String,
    #[serde(default = "default_num_detections_name")]
    pub num_detections_name: String,

    /// Class id the model gives to license plates
    #[serde(default = "default_plate_class_id")]
    pub plate_class_id: u32,

    /// Detections scored below this are not read
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OcrConfig {
    /// Directory holding `<language>.traineddata`; tesseract's own default when unset
    #[serde(default)]
    pub tessdata_dir: Option<PathBuf>,

    #[serde(default = "default_language")]
    pub language: String,

    /// Tesseract page segmentation mode, 8 is "single word"
    #[serde(default = "default_page_seg_mode")]
    pub page_seg_mode: u8,

    #[serde(default)]
    pub char_whitelist: Option<String>,

    /// Histogram equalize the gray crop before ocr
    #[serde(default)]
    pub equalize: bool,
}

fn default_image_dir() -> PathBuf {
    PathBuf::from("data/test")
}

fn default_extensions() -> Vec<String> {
    vec!["png".to_string()]
}

fn default_model_path() -> PathBuf {
    PathBuf::from("models/detect.pb")
}

fn default_input_name() -> String {
    "image_tensor".to_string()
}

fn default_boxes_name() -> String {
    "detection_boxes".to_string()
}

fn default_scores_name() -> String {
    "detection_scores".to_string()
}

fn default_classes_name() -> String {
    "detection_classes".to_string()
}

fn default_num_detections_name() -> String {
    "num_detections".to_string()
}

fn default_plate_class_id() -> u32 {
    1
}

fn default_min_confidence() -> f32 {
    0.6
}

fn default_language() -> String {
    "eng".to_string()
}

fn default_page_seg_mode() -> u8 {
    8
}

impl Default for Config {
    fn default() -> Self {
        Self {
            image_dir: default_image_dir(),
            extensions: default_extensions(),
            keep_going: false,
            detector: DetectorConfig::default(),
            ocr: OcrConfig::default(),
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
            input_name: default_input_name(),
            boxes_name: default_boxes_name(),
            scores_name: default_scores_name(),
            classes_name: default_classes_name(),
            num_detections_name: default_num_detections_name(),
            plate_class_id: default_plate_class_id(),
            min_confidence: default_min_confidence(),
        }
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            tessdata_dir: None,
            language: default_language(),
            page_seg_mode: default_page_seg_mode(),
            char_whitelist: None,
            equalize: false,
        }
    }
}

impl Config {

    /// Read and validate a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check ranges and normalize extensions (lower case, no leading dot).
    pub fn validate(&mut self) -> Result<()> {
        if self.extensions.is_empty() {
            return Err(LprError::Config("extensions must not be empty".to_string()));
        }
        for ext in self.extensions.iter_mut() {
            let normalized = ext.trim().trim_start_matches('.').to_lowercase();
            if normalized.is_empty() {
                return Err(LprError::Config(format!("invalid extension {:?}", ext)));
            }
            *ext = normalized;
        }

        let detector = &self.detector;
        if !(0.0..=1.0).contains(&detector.min_confidence) {
            return Err(LprError::Config(format!(
                "detector.min_confidence must be within [0, 1], got {}",
                detector.min_confidence
            )));
        }
        if detector.model_path.as_os_str().is_empty() {
            return Err(LprError::Config("detector.model_path must not be empty".to_string()));
        }
        let names = [
            ("input_name", &detector.input_name),
            ("boxes_name", &detector.boxes_name),
            ("scores_name", &detector.scores_name),
            ("classes_name", &detector.classes_name),
            ("num_detections_name", &detector.num_detections_name),
        ];
        for (field, value) in names.iter() {
            if value.trim().is_empty() {
                return Err(LprError::Config(format!("detector.{} must not be empty", field)));
            }
        }

        if self.ocr.language.trim().is_empty() {
            return Err(LprError::Config("ocr.language must not be empty".to_string()));
        }
        if self.ocr.page_seg_mode > 13 {
            return Err(LprError::Config(format!(
                "ocr.page_seg_mode must be within 0..=13, got {}",
                self.ocr.page_seg_mode
            )));
        }
        Ok(())
    }
}


#[cfg(test)]
mod test {

    use std::error::Error;
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_are_valid() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.extensions, vec!["png"]);
        assert_eq!(config.ocr.page_seg_mode, 8);
        assert_eq!(config.detector.plate_class_id, 1);
    }

    #[test]
    fn empty_file_gives_defaults() -> Result<()> {
        let config = Config::from_toml_str("")?;
        assert_eq!(config, Config::default());
        Ok(())
    }

    #[test]
    fn partial_file_keeps_other_defaults() -> Result<()> {
        let config = Config::from_toml_str(r#"
            image_dir = "shots"
            extensions = [".PNG", "Jpg"]

            [detector]
            min_confidence = 0.25
            plate_class_id = 0

            [ocr]
            char_whitelist = "ABC123"
        "#)?;
        assert_eq!(config.image_dir, PathBuf::from("shots"));
        assert_eq!(config.extensions, vec!["png", "jpg"]);
        assert_eq!(config.detector.plate_class_id, 0);
        assert!((config.detector.min_confidence - 0.25).abs() < 1e-6);
        assert_eq!(config.detector.model_path, PathBuf::from("models/detect.pb"));
        assert_eq!(config.ocr.char_whitelist.as_deref(), Some("ABC123"));
        assert_eq!(config.ocr.language, "eng");
        Ok(())
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let res = Config::from_toml_str("[detector]\nmin_confidence = 1.5\n");
        assert!(matches!(res, Err(LprError::Config(_))));

        let res = Config::from_toml_str("[ocr]\npage_seg_mode = 14\n");
        assert!(matches!(res, Err(LprError::Config(_))));

        let res = Config::from_toml_str("extensions = []\n");
        assert!(matches!(res, Err(LprError::Config(_))));

        let res = Config::from_toml_str("extensions = [\".\"]\n");
        assert!(matches!(res, Err(LprError::Config(_))));

        let res = Config::from_toml_str("[detector]\nboxes_name = \" \"\n");
        assert!(matches!(res, Err(LprError::Config(_))));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let res = Config::from_toml_str("image_dir = ");
        assert!(matches!(res, Err(LprError::ConfigParse(_))));
    }

    #[test]
    fn load_reads_a_file() -> std::result::Result<(), Box<dyn Error>> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "keep_going = true")?;
        let config = Config::load(file.path())?;
        assert!(config.keep_going);
        Ok(())
    }
}
