//! Synthetic BMT captures for tests.

/// One directory entry plus the bytes it occupies in the
/// data segment.
pub(crate) struct Item {
    name: String,
    ty: &'static str,
    size: usize,
    bytes: Vec<u8>,
}

pub(crate) struct BmtBuilder {
    images: Vec<Vec<u8>>,
    items: Vec<Item>,
    padding: &'static [u8],
    data_size: Option<usize>,
    drop_tail: usize,
}

impl BmtBuilder {
    pub fn new() -> Self {
        BmtBuilder {
            images: vec![],
            items: vec![],
            padding: b"\r\n",
            data_size: None,
            drop_tail: 0,
        }
    }

    /// A fake JPEG of exactly `size` bytes, markers included.
    pub fn image(mut self, size: usize) -> Self {
        assert!(size >= 4);
        let mut bytes = vec![0xFF, 0xD8];
        bytes.resize(size - 2, 0x00);
        bytes.extend_from_slice(&[0xFF, 0xD9]);
        self.images.push(bytes);
        self
    }

    pub fn item(mut self, name: &str, ty: &'static str, bytes: Vec<u8>) -> Self {
        self.items.push(Item {
            name: name.into(),
            ty,
            size: bytes.len(),
            bytes,
        });
        self
    }

    pub fn f32(self, name: &str, value: f32) -> Self {
        self.item(name, "float", value.to_le_bytes().to_vec())
    }

    pub fn u32(self, name: &str, value: u32) -> Self {
        self.item(name, "uint", value.to_le_bytes().to_vec())
    }

    /// An `Ir` field: a 24 byte header then the readings.
    pub fn ir(self, readings: &[i16]) -> Self {
        let mut bytes = vec![0x5A; 24];
        for r in readings {
            bytes.extend_from_slice(&r.to_le_bytes());
        }
        self.item("Ir", "cvmat", bytes)
    }

    pub fn padding(mut self, padding: &'static [u8]) -> Self {
        self.padding = padding;
        self
    }

    /// Declare a data size different from the real one.
    pub fn declare_data_size(mut self, size: usize) -> Self {
        self.data_size = Some(size);
        self
    }

    /// Cut `n` bytes off the end of the finished buffer.
    pub fn truncate(mut self, n: usize) -> Self {
        self.drop_tail = n;
        self
    }

    pub fn xml(&self) -> String {
        let mut xml = String::from("<?xml version=\"1.0\"?>\n<data>\n<group name=\"Meta\">\n");
        for it in &self.items {
            xml.push_str(&format!(
                "  <item name=\"{}\" type=\"{}\" size=\"{}\"/>\n",
                it.name, it.ty, it.size
            ));
        }
        xml.push_str("</group>\n</data>\n");
        xml
    }

    pub fn build(self) -> Vec<u8> {
        let xml = self.xml();
        let data: Vec<u8> = self.items.iter().flat_map(|i| i.bytes.clone()).collect();
        let data_size = self.data_size.unwrap_or(data.len());

        let mut out = vec![];
        for img in &self.images {
            out.extend_from_slice(img);
        }
        out.extend_from_slice(
            format!(
                "<ToFo version=\"2.0\"><xml size=\"{}\"/><data size=\"{}\"/></ToFo>",
                xml.len(),
                data_size
            )
            .as_bytes(),
        );
        out.extend_from_slice(self.padding);
        out.extend_from_slice(xml.as_bytes());
        out.extend_from_slice(&data);
        out.truncate(out.len() - self.drop_tail.min(out.len()));
        out
    }
}

/// `count` readings with one hottest and one coldest pixel.
pub(crate) fn readings(count: usize, hot: usize, cold: usize) -> Vec<i16> {
    let mut values: Vec<i16> = (0..count).map(|i| 1000 + (i % 97) as i16).collect();
    values[hot] = 4000;
    values[cold] = -200;
    values
}
