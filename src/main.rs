use clap::{ Arg, App };
use env_logger::Env;
use log::info;

use std::error::Error;
use std::io;

use plate_reader::config::Config;
use plate_reader::detect::TfDetector;
use plate_reader::ocr::TesseractRecognizer;
use plate_reader::{ write_event, Lpr, PlateFilter };


fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let matches = App::new("plate-reader")
                    .version("0.1.0")
                    .author("kingrong")
                    .about("Detect license plates in a folder of images and read them")
                    .arg(Arg::with_name("config")
                        .short("c")
                        .long("config")
                        .value_name("FILE")
                        .help("TOML config file, defaults are used when omitted")
                        .takes_value(true))
                    .arg(Arg::with_name("keep-going")
                        .short("k")
                        .long("keep-going")
                        .help("report failing images and continue"))
                    .arg(Arg::with_name("DIR")
                        .help("folder with images, overrides image_dir")
                        .index(1))
                    .get_matches();

    let mut config = match matches.value_of("config") {
        Some(path) => Config::load(path)?,
        None => {
            let mut config = Config::default();
            config.validate()?;
            config
        }
    };
    if let Some(dir) = matches.value_of("DIR") {
        config.image_dir = dir.into();
    }
    if matches.is_present("keep-going") {
        config.keep_going = true;
    }

    let detector = TfDetector::new(&config.detector)?;
    let recognizer = TesseractRecognizer::new(&config.ocr)?;
    let mut lpr = Lpr::new(detector, recognizer, PlateFilter::from(&config.detector));

    info!("reading images from {}", config.image_dir.display());
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let read = lpr.read_dir(&config.image_dir, &config.extensions, config.keep_going, |event| {
        write_event(&mut out, &event)
    })?;
    info!("{} images read", read);
    Ok(())
}
