//! Locate the pieces of a BMT container.
//!
//! A capture is laid out as
//!
//! - 0x0..: zero or more embedded JPEG streams
//!   (thermal first, then optionally a visible-light photo)
//! - `<ToFo version="...">...</ToFo>`: ASCII tag block
//!   declaring `<xml size="N"` and `<data size="N"`
//! - `\r` / `\n` padding
//! - `xml size` bytes of XML item directory
//! - `data size` bytes of raw field data
//!
//! Nothing here interprets the XML or the data; see
//! [`directory`][crate::directory] for that.
use lazy_static::lazy_static;
use regex::bytes::Regex;
use tracing::debug;

use crate::error::Result;

const SOI: [u8; 2] = [0xFF, 0xD8];
const EOI: [u8; 2] = [0xFF, 0xD9];

pub const TAG_OPEN: &[u8] = b"<ToFo version=\"";
pub const TAG_CLOSE: &[u8] = b"</ToFo>";

/// Upper bound on embedded JPEG streams scanned per file.
pub const MAX_IMAGES: usize = 8;

/// Byte range of one embedded JPEG, both markers included.
/// `end` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSpan {
    pub start: usize,
    pub end: usize,
    pub size: usize,
}

impl ImageSpan {
    fn new(start: usize, end: usize) -> Self {
        ImageSpan {
            start,
            end,
            size: end - start,
        }
    }

    pub fn bytes<'a>(&self, buf: &'a [u8]) -> &'a [u8] {
        &buf[self.start..self.end]
    }
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

/// Collect JPEG spans from `buf[..limit]`, in discovery
/// order. A stream whose end marker is not found before
/// `limit` ends the scan.
pub fn scan_images(buf: &[u8], limit: usize) -> Vec<ImageSpan> {
    let region = &buf[..limit.min(buf.len())];
    let mut spans = vec![];
    let mut pos = 0;

    while spans.len() < MAX_IMAGES {
        let start = match find(region, &SOI, pos) {
            Some(s) => s,
            None => break,
        };
        let end = match find(region, &EOI, start + SOI.len()) {
            Some(e) => e + EOI.len(),
            None => break,
        };
        debug!("jpeg {}: pos {}, size {} bytes", spans.len() + 1, start, end - start);
        spans.push(ImageSpan::new(start, end));
        pos = end;
    }
    spans
}

/// The thermal image and the visible-light image among
/// scanned spans.
///
/// The first span is always the thermal image. The real
/// image is the largest of the others; on equal sizes the
/// earlier one wins.
pub fn select_images(spans: &[ImageSpan]) -> (Option<ImageSpan>, Option<ImageSpan>) {
    let thermal = spans.first().copied();
    let real = spans.iter().skip(1).fold(None, |best: Option<ImageSpan>, s| match best {
        Some(b) if b.size >= s.size => Some(b),
        _ => Some(*s),
    });
    (thermal, real)
}

/// The `<ToFo>` block and the segment sizes it declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagBlock {
    pub start: usize,
    /// One past the closing tag.
    pub end: usize,
    pub xml_size: usize,
    pub data_size: usize,
}

impl TagBlock {
    pub fn locate(buf: &[u8]) -> Result<Self> {
        lazy_static! {
            static ref XML_SIZE: Regex = Regex::new(r#"<xml size="(\d+)""#).unwrap();
            static ref DATA_SIZE: Regex = Regex::new(r#"<data size="(\d+)""#).unwrap();
        }

        let start = match find(buf, TAG_OPEN, 0) {
            Some(s) => s,
            None => format_bail!("missing tag block"),
        };
        let end = match find(buf, TAG_CLOSE, start) {
            Some(e) => e + TAG_CLOSE.len(),
            None => format_bail!("missing tag block"),
        };
        let block = &buf[start..end];

        let xml_size = declared_size(&XML_SIZE, block, "xml")?;
        let data_size = declared_size(&DATA_SIZE, block, "data")?;

        debug!(
            "tag block at {}..{}: xml {} bytes, data {} bytes",
            start, end, xml_size, data_size
        );
        Ok(TagBlock {
            start,
            end,
            xml_size,
            data_size,
        })
    }

    /// Slice out the XML directory and data segments that
    /// follow the block.
    pub fn segments<'a>(&self, buf: &'a [u8]) -> Result<Segments<'a>> {
        let xml_start = buf[self.end..]
            .iter()
            .position(|&b| b != b'\n' && b != b'\r')
            .map_or(buf.len(), |p| self.end + p);

        let data_start = xml_start
            .checked_add(self.xml_size)
            .filter(|&s| s <= buf.len());
        let data_start = match data_start {
            Some(s) => s,
            None => format_bail!(
                "truncated xml segment: declared {} bytes, {} available",
                self.xml_size,
                buf.len() - xml_start
            ),
        };

        let data_end = data_start
            .checked_add(self.data_size)
            .filter(|&e| e <= buf.len());
        let data_end = match data_end {
            Some(e) => e,
            None => format_bail!(
                "truncated data segment: declared {} bytes, {} available",
                self.data_size,
                buf.len() - data_start
            ),
        };

        debug!("xml segment at {}, data segment at {}", xml_start, data_start);
        Ok(Segments {
            xml_start,
            data_start,
            xml: &buf[xml_start..data_start],
            data: &buf[data_start..data_end],
        })
    }
}

fn declared_size(re: &Regex, block: &[u8], what: &str) -> Result<usize> {
    let digits = match re.captures(block).and_then(|c| c.get(1)) {
        Some(m) => m.as_bytes(),
        None => format_bail!("{} size not found in tag block", what),
    };
    match std::str::from_utf8(digits).ok().and_then(|s| s.parse().ok()) {
        Some(n) => Ok(n),
        None => format_bail!("{} size in tag block is not a valid length", what),
    }
}

/// XML directory and raw data, as slices of the capture.
#[derive(Debug)]
pub struct Segments<'a> {
    pub xml_start: usize,
    pub data_start: usize,
    pub xml: &'a [u8],
    pub data: &'a [u8],
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::ErrorKind, fixtures::BmtBuilder};

    #[test]
    fn spans_stop_at_tag_block() -> Result<()> {
        let buf = BmtBuilder::new()
            .image(100)
            .image(300)
            .ir(&[0xD8FFu16 as i16, 0xD9FFu16 as i16])
            .build();
        let tag = TagBlock::locate(&buf)?;
        let spans = scan_images(&buf, tag.start);

        assert_eq!(
            spans,
            vec![ImageSpan::new(0, 100), ImageSpan::new(100, 400)]
        );
        assert_eq!(spans[1].bytes(&buf).len(), 300);
        Ok(())
    }

    #[test]
    fn no_images_is_fine() -> Result<()> {
        let buf = BmtBuilder::new().f32("TempMax", 300.).build();
        let tag = TagBlock::locate(&buf)?;
        assert!(scan_images(&buf, tag.start).is_empty());
        Ok(())
    }

    #[test]
    fn unterminated_jpeg_is_dropped() {
        let mut buf = vec![0xFF, 0xD8, 1, 2, 3, 0xFF, 0xD9];
        buf.extend_from_slice(&[0xFF, 0xD8, 9, 9, 9]);
        assert_eq!(scan_images(&buf, buf.len()), vec![ImageSpan::new(0, 7)]);
    }

    #[test]
    fn scan_is_capped() {
        let one = [0xFF, 0xD8, 0, 0xFF, 0xD9];
        let buf: Vec<u8> = one.iter().cycle().take(one.len() * 20).copied().collect();
        assert_eq!(scan_images(&buf, buf.len()).len(), MAX_IMAGES);
    }

    #[test]
    fn real_image_is_largest_after_first() {
        let spans = [
            ImageSpan::new(0, 500),
            ImageSpan::new(500, 600),
            ImageSpan::new(600, 900),
            ImageSpan::new(900, 1200),
        ];
        let (thermal, real) = select_images(&spans);
        assert_eq!(thermal, Some(spans[0]));
        assert_eq!(real, Some(spans[2]));

        let (thermal, real) = select_images(&spans[..1]);
        assert_eq!(thermal, Some(spans[0]));
        assert_eq!(real, None);

        assert_eq!(select_images(&[]), (None, None));
    }

    #[test]
    fn sizes_and_segments() -> Result<()> {
        let builder = BmtBuilder::new().image(50).f32("TempMax", 300.);
        let xml_len = builder.xml().len();
        let buf = builder.padding(b"\n\r\n").build();

        let tag = TagBlock::locate(&buf)?;
        assert_eq!(tag.start, 50);
        assert_eq!(tag.xml_size, xml_len);
        assert_eq!(tag.data_size, 4);

        let seg = tag.segments(&buf)?;
        assert_eq!(seg.xml_start, tag.end + 3);
        assert!(seg.xml.starts_with(b"<?xml"));
        assert_eq!(seg.data, &300f32.to_le_bytes()[..]);
        Ok(())
    }

    #[test]
    fn missing_tag_block() {
        let err = TagBlock::locate(&[0xFF, 0xD8, 0xFF, 0xD9]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert!(err.to_string().contains("missing tag block"));

        let err = TagBlock::locate(b"<ToFo version=\"1\"><xml size=\"3\"/>").unwrap_err();
        assert!(err.to_string().contains("missing tag block"));
    }

    #[test]
    fn missing_size_declaration() {
        let err = TagBlock::locate(b"<ToFo version=\"1\"><xml size=\"3\"/></ToFo>").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert!(err.to_string().contains("data size"));
    }

    #[test]
    fn oversized_data_declaration() -> Result<()> {
        let buf = BmtBuilder::new()
            .f32("TempMax", 300.)
            .declare_data_size(1 << 20)
            .build();
        let err = TagBlock::locate(&buf)?.segments(&buf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert!(err.to_string().contains("truncated data segment"));
        Ok(())
    }

    #[test]
    fn truncated_xml() -> Result<()> {
        let buf = BmtBuilder::new().f32("TempMax", 300.).build();
        let tag = TagBlock::locate(&buf)?;
        let cut = &buf[..tag.end + 12];
        let err = tag.segments(cut).unwrap_err();
        assert!(err.to_string().contains("truncated xml segment"));
        Ok(())
    }
}
