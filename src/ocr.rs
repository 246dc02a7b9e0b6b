use image::DynamicImage;

use crate::error::Result;

pub trait Recognizer {
    /// Read the text of a cropped plate. Empty when nothing was recognized.
    fn recognize(&mut self, crop: &DynamicImage) -> Result<String>;
}

#[cfg(feature = "leptess")]
pub use self::tesseract::TesseractRecognizer;

#[cfg(feature = "leptess")]
mod tesseract {
    use leptess::tesseract::TessApi;
    use image::DynamicImage;
    use log::debug;

    use std::ffi::CString;

    use super::Recognizer;
    use crate::config::OcrConfig;
    use crate::error::{ LprError, Result };
    use crate::utils;

    pub struct TesseractRecognizer {
        api: TessApi,
        equalize: bool,
    }

    impl TesseractRecognizer {

        pub fn new(config: &OcrConfig) -> Result<Self> {
            let data_path = match &config.tessdata_dir {
                Some(dir) => Some(dir.to_str().ok_or_else(|| {
                    LprError::Config(format!("tessdata_dir is not valid utf-8: {}", dir.display()))
                })?),
                None => None,
            };
            let api = TessApi::new(data_path, &config.language)
                .map_err(|e| LprError::Recognizer(format!("cannot init tesseract ({}): {:?}", config.language, e)))?;
            let mut recognizer = Self { api, equalize: config.equalize };

            recognizer.set_variable("tessedit_pageseg_mode", &config.page_seg_mode.to_string())?;
            if let Some(whitelist) = &config.char_whitelist {
                recognizer.set_variable("tessedit_char_whitelist", whitelist)?;
            }
            Ok(recognizer)
        }

        fn set_variable(&mut self, name: &str, value: &str) -> Result<()> {
            let to_cstring = |s: &str| {
                CString::new(s).map_err(|_| LprError::Config(format!("nul byte in tesseract variable {}", name)))
            };
            let (name_c, value_c) = (to_cstring(name)?, to_cstring(value)?);
            self.api
                .raw
                .set_variable(&name_c, &value_c)
                .map_err(|e| LprError::Recognizer(format!("cannot set {}={}: {:?}", name, value, e)))
        }
    }

    impl Recognizer for TesseractRecognizer {

        fn recognize(&mut self, crop: &DynamicImage) -> Result<String> {
            let gray = utils::ocr_input(crop, self.equalize);
            let (cols, rows) = gray.dimensions();
            self.api
                .raw
                .set_image(gray.as_raw(), cols as i32, rows as i32, 1, cols as i32)
                .map_err(|e| LprError::Recognizer(format!("cannot set image: {:?}", e)))?;
            let text = self.api
                .get_utf8_text()
                .map_err(|e| LprError::Recognizer(e.to_string()))?;
            debug!("tesseract read {:?} from {}x{} crop", text.trim(), cols, rows);
            Ok(text.trim().to_string())
        }
    }
}
