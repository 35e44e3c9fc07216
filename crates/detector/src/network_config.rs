use crate::errors::DetectorError;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

const HEIGHT_KEY: &str = "height";
const WIDTH_KEY: &str = "width";

/// Network input size declared in a Darknet `.cfg` file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NetworkGeometry {
    pub input_height: u32,
    pub input_width: u32,
}

impl NetworkGeometry {
    pub fn new(input_height: u32, input_width: u32) -> Self {
        Self {
            input_height,
            input_width,
        }
    }

    /// `(width, height)`, the order image resizers take.
    pub fn input_size(&self) -> (u32, u32) {
        (self.input_width, self.input_height)
    }

    pub fn parse(config_path: &Path) -> Result<Self, DetectorError> {
        let file = File::open(config_path).map_err(|e| DetectorError::io(config_path, e))?;
        parse_geometry(BufReader::new(file), config_path)
    }
}

/// Scan config lines top to bottom for the first `height` and `width`
/// declarations. Matching is by substring; the scan stops once both are known.
pub fn parse_geometry<R: BufRead>(
    reader: R,
    config_path: &Path,
) -> Result<NetworkGeometry, DetectorError> {
    let mut height = None;
    let mut width = None;

    for (line_no, line) in reader.lines().enumerate() {
        if let (Some(input_height), Some(input_width)) = (height, width) {
            return Ok(NetworkGeometry::new(input_height, input_width));
        }

        let line = line.map_err(|e| DetectorError::io(config_path, e))?;

        if height.is_none() && line.contains(HEIGHT_KEY) {
            height = Some(parse_value(&line, HEIGHT_KEY, line_no + 1, config_path)?);
        }
        if width.is_none() && line.contains(WIDTH_KEY) {
            width = Some(parse_value(&line, WIDTH_KEY, line_no + 1, config_path)?);
        }
    }

    match (height, width) {
        (Some(input_height), Some(input_width)) => {
            Ok(NetworkGeometry::new(input_height, input_width))
        }
        (None, _) => Err(DetectorError::MalformedConfig {
            path: config_path.to_path_buf(),
            reason: format!("{HEIGHT_KEY} not declared"),
        }),
        (_, None) => Err(DetectorError::MalformedConfig {
            path: config_path.to_path_buf(),
            reason: format!("{WIDTH_KEY} not declared"),
        }),
    }
}

fn parse_value(
    line: &str,
    key: &str,
    line_no: usize,
    config_path: &Path,
) -> Result<u32, DetectorError> {
    let raw = line.replace('=', "").replace(key, "");
    let raw = raw.trim();

    let malformed = |reason: String| DetectorError::MalformedConfig {
        path: config_path.to_path_buf(),
        reason,
    };

    let value: u32 = raw
        .parse()
        .map_err(|_| malformed(format!("line {line_no}: {key} value {raw:?} is not an integer")))?;

    if value == 0 {
        return Err(malformed(format!("line {line_no}: {key} must be positive")));
    }

    tracing::debug!(key, value, line_no, "Parsed network geometry field");
    Ok(value)
}
