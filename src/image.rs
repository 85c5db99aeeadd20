//! End-to-end parsing of one capture: scan, walk, derive
//! metrics, and optionally copy the embedded JPEGs out as
//! `<identity>.jpg` and `<identity>_real.jpg`.
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::{
    container::{scan_images, select_images, ImageSpan, TagBlock},
    directory::Fields,
    error::Result,
    metrics::{histogram, Spots},
    record::{Annotations, MeasurementRecord},
    temperature::Severity,
};

/// Where extracted images go and what they are called.
#[derive(Debug, Default, Clone)]
pub struct ParseOptions {
    /// Images are written only when this is set.
    pub output_dir: Option<PathBuf>,
    /// Base name for outputs; its extension, if any, is
    /// dropped. Defaults to the input file's stem.
    pub identity: Option<String>,
}

/// A fully parsed capture still borrowing its bytes.
#[derive(Debug)]
pub struct BmtImage<'a> {
    buf: &'a [u8],
    pub spans: Vec<ImageSpan>,
    pub thermal: Option<ImageSpan>,
    pub real: Option<ImageSpan>,
    pub tag: TagBlock,
    pub fields: Fields,
}

impl<'a> BmtImage<'a> {
    /// Scan and walk a whole capture. Fails without
    /// producing anything if the container is malformed.
    pub fn from_bytes(buf: &'a [u8]) -> Result<Self> {
        let tag = TagBlock::locate(buf)?;
        let spans = scan_images(buf, tag.start);
        let (thermal, real) = select_images(&spans);
        debug!("found {} jpeg(s) before tag block", spans.len());

        let segments = tag.segments(buf)?;
        let fields = Fields::walk(&segments)?;

        Ok(BmtImage {
            buf,
            spans,
            thermal,
            real,
            tag,
            fields,
        })
    }

    pub fn thermal_jpeg(&self) -> Option<&'a [u8]> {
        self.thermal.map(|s| s.bytes(self.buf))
    }

    pub fn real_jpeg(&self) -> Option<&'a [u8]> {
        self.real.map(|s| s.bytes(self.buf))
    }

    /// Write `<identity>.jpg` and `<identity>_real.jpg` into
    /// `dir` for the images that exist.
    pub fn write_images(
        &self,
        dir: &Path,
        identity: &str,
    ) -> Result<(Option<PathBuf>, Option<PathBuf>)> {
        let thermal = self
            .thermal_jpeg()
            .map(|b| write_jpeg(&dir.join(format!("{}.jpg", identity)), b))
            .transpose()?;
        let real = self
            .real_jpeg()
            .map(|b| write_jpeg(&dir.join(format!("{}_real.jpg", identity)), b))
            .transpose()?;
        Ok((thermal, real))
    }

    /// Build the record. Raw readings are dropped once the
    /// spots and histogram are computed.
    pub fn into_record(
        self,
        identity: String,
        images: (Option<PathBuf>, Option<PathBuf>),
        fallback_time: Option<DateTime<Utc>>,
    ) -> MeasurementRecord {
        let Fields {
            temp_max,
            temp_min,
            center_temperature,
            reflected_temperature,
            emissivity,
            date_time,
            raw,
        } = self.fields;

        let (spots, histogram) = match raw {
            Some(raw) => (Spots::locate(&raw), histogram(&raw, temp_min, temp_max)),
            None => (None, vec![]),
        };
        let (thermal_image, real_image) = images;

        MeasurementRecord {
            identity,
            captured_at: date_time.or(fallback_time),
            max_temp: temp_max,
            min_temp: temp_min,
            center_temp: center_temperature,
            reflected_temp: reflected_temperature,
            emissivity,
            thermal_image,
            real_image,
            spots,
            histogram,
            severity: Severity::of(temp_max).unwrap_or_default(),
            annotations: Annotations::default(),
        }
    }
}

fn write_jpeg(path: &Path, bytes: &[u8]) -> Result<PathBuf> {
    let mut out = BufWriter::new(File::create(path)?);
    out.write_all(bytes)?;
    out.flush()?;
    debug!("wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(path.to_path_buf())
}

/// Output base name: the stem of `name`.
pub fn identity_of(name: &str) -> String {
    Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string())
}

/// Parse a capture from memory.
pub fn parse_bytes(
    buf: &[u8],
    identity: &str,
    output_dir: Option<&Path>,
) -> Result<MeasurementRecord> {
    let image = BmtImage::from_bytes(buf)?;
    let images = match output_dir {
        Some(dir) => image.write_images(dir, identity)?,
        None => (None, None),
    };
    Ok(image.into_record(identity.to_string(), images, None))
}

/// Parse a capture file. Without a `DateTime` field the
/// file's creation (or else modification) time is used.
pub fn parse_path(path: &Path, options: &ParseOptions) -> Result<MeasurementRecord> {
    let buf = fs::read(path)?;
    let identity = match &options.identity {
        Some(id) => identity_of(id),
        None => identity_of(&path.to_string_lossy()),
    };

    let image = BmtImage::from_bytes(&buf)?;
    let images = match &options.output_dir {
        Some(dir) => image.write_images(dir, &identity)?,
        None => (None, None),
    };

    let meta = fs::metadata(path)?;
    let fallback = meta
        .created()
        .or_else(|_| meta.modified())
        .ok()
        .map(DateTime::<Utc>::from);

    Ok(image.into_record(identity, images, fallback))
}
