//! MNIST IDX loading and the `(input, target)` sample representation.
use crate::error::{Error, Result};
use byteorder::{BigEndian, ReadBytesExt};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use tracing::{info, warn};

/// One training example: input vector and target vector.
pub type Sample = (Vec<f64>, Vec<f64>);
pub type Dataset = Vec<Sample>;

pub const IMAGE_MAGIC: u32 = 2051;
pub const LABEL_MAGIC: u32 = 2049;
pub const NUM_CLASSES: usize = 10;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// A digit image with pixels scaled to `[0, 1]`, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct MnistImage {
    pub pixels: Vec<f64>,
    pub label: u8,
}

impl MnistImage {
    /// One-hot target vector for this image's label.
    pub fn target(&self, num_classes: usize) -> Vec<f64> {
        one_hot(self.label as usize, num_classes)
    }
}

/// One-hot encode
pub fn one_hot(label: usize, num_classes: usize) -> Vec<f64> {
    let mut v = vec![0.0; num_classes];
    if label < num_classes {
        v[label] = 1.0;
    }
    v
}

/// Pair each image's pixels with its one-hot label.
pub fn to_dataset(images: &[MnistImage], num_classes: usize) -> Dataset {
    images
        .iter()
        .map(|img| (img.pixels.clone(), img.target(num_classes)))
        .collect()
}

/// Load an image file and its label file. Either may be gzip-compressed.
pub fn load_dataset(
    image_path: impl AsRef<Path>,
    label_path: impl AsRef<Path>,
) -> Result<Vec<MnistImage>> {
    let image_path = image_path.as_ref();
    let label_path = label_path.as_ref();
    let images = open_idx(image_path)?;
    let labels = open_idx(label_path)?;
    let dataset = read_dataset(images, labels)?;
    info!(
        images = %image_path.display(),
        labels = %label_path.display(),
        count = dataset.len(),
        "loaded dataset"
    );
    Ok(dataset)
}

/// Open an IDX file, transparently decompressing it when it starts with the
/// gzip magic bytes.
fn open_idx(path: &Path) -> Result<Box<dyn Read>> {
    let file = File::open(path)
        .map_err(|e| Error::io(format!("opening {}", path.display()), e))?;
    let mut reader = BufReader::new(file);
    let is_gzip = reader
        .fill_buf()
        .map_err(|e| Error::io(format!("reading {}", path.display()), e))?
        .starts_with(&GZIP_MAGIC);
    if is_gzip {
        Ok(Box::new(GzDecoder::new(reader)))
    } else {
        Ok(Box::new(reader))
    }
}

fn read_header<R: Read>(r: &mut R, what: &str) -> Result<u32> {
    r.read_u32::<BigEndian>()
        .map_err(|e| Error::io(format!("reading {what}"), e))
}

/// Parse an IDX image stream and an IDX label stream into examples.
///
/// When the two headers disagree on the example count, the shorter count
/// wins and a warning is logged.
pub fn read_dataset<I: Read, L: Read>(mut images: I, mut labels: L) -> Result<Vec<MnistImage>> {
    let magic = read_header(&mut images, "image header")?;
    if magic != IMAGE_MAGIC {
        return Err(Error::InvalidDataset(format!(
            "image magic {magic}, expected {IMAGE_MAGIC}"
        )));
    }
    let num_images = read_header(&mut images, "image header")? as usize;
    let rows = read_header(&mut images, "image header")? as usize;
    let cols = read_header(&mut images, "image header")? as usize;

    let magic = read_header(&mut labels, "label header")?;
    if magic != LABEL_MAGIC {
        return Err(Error::InvalidDataset(format!(
            "label magic {magic}, expected {LABEL_MAGIC}"
        )));
    }
    let num_labels = read_header(&mut labels, "label header")? as usize;

    let count = if num_images == num_labels {
        num_images
    } else {
        warn!(num_images, num_labels, "image and label counts differ");
        num_images.min(num_labels)
    };
    let pixels_per_image = rows
        .checked_mul(cols)
        .ok_or_else(|| Error::InvalidDataset(format!("image size {rows}x{cols} overflows")))?;

    // sized by the bytes actually present, never by the header alone
    let mut buf = Vec::new();
    let mut dataset = Vec::with_capacity(count.min(1 << 16));
    for i in 0..count {
        let label = labels
            .read_u8()
            .map_err(|e| Error::io(format!("reading label {i}"), e))?;
        if label as usize >= NUM_CLASSES {
            return Err(Error::InvalidDataset(format!("label {i} is {label}")));
        }
        buf.clear();
        (&mut images)
            .take(pixels_per_image as u64)
            .read_to_end(&mut buf)
            .map_err(|e| Error::io(format!("reading image {i}"), e))?;
        if buf.len() != pixels_per_image {
            return Err(Error::io(
                format!("reading image {i}"),
                io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("{} of {pixels_per_image} pixel bytes present", buf.len()),
                ),
            ));
        }
        let pixels = buf.iter().map(|&b| b as f64 / 255.0).collect();
        dataset.push(MnistImage { pixels, label });
    }
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build in-memory IDX streams for `images` of `rows x cols` bytes.
    fn idx_bytes(images: &[(Vec<u8>, u8)], rows: u32, cols: u32) -> (Vec<u8>, Vec<u8>) {
        let mut img = Vec::new();
        img.extend_from_slice(&IMAGE_MAGIC.to_be_bytes());
        img.extend_from_slice(&(images.len() as u32).to_be_bytes());
        img.extend_from_slice(&rows.to_be_bytes());
        img.extend_from_slice(&cols.to_be_bytes());
        let mut lbl = Vec::new();
        lbl.extend_from_slice(&LABEL_MAGIC.to_be_bytes());
        lbl.extend_from_slice(&(images.len() as u32).to_be_bytes());
        for (pixels, label) in images {
            img.extend_from_slice(pixels);
            lbl.push(*label);
        }
        (img, lbl)
    }

    #[test]
    fn parses_and_normalizes() {
        let (img, lbl) = idx_bytes(&[(vec![0, 255, 51, 102], 3), (vec![255; 4], 9)], 2, 2);
        let data = read_dataset(img.as_slice(), lbl.as_slice()).unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data[0].label, 3);
        assert_eq!(data[0].pixels, vec![0.0, 1.0, 0.2, 0.4]);
        assert_eq!(data[1].label, 9);
        assert!(data[1].pixels.iter().all(|&p| p == 1.0));
    }

    #[test]
    fn rejects_wrong_magic() {
        let (mut img, lbl) = idx_bytes(&[(vec![0; 4], 1)], 2, 2);
        img[3] = 0x04;
        assert!(matches!(
            read_dataset(img.as_slice(), lbl.as_slice()),
            Err(Error::InvalidDataset(_))
        ));
        let (img, lbl) = idx_bytes(&[(vec![0; 4], 1)], 2, 2);
        assert!(read_dataset(img.as_slice(), img.as_slice()).is_err());
        assert!(read_dataset(lbl.as_slice(), lbl.as_slice()).is_err());
    }

    #[test]
    fn count_mismatch_uses_shorter_stream() {
        let (img, mut lbl) = idx_bytes(&[(vec![1; 4], 1), (vec![2; 4], 2)], 2, 2);
        lbl[7] = 1; // label header now claims a single example
        let data = read_dataset(img.as_slice(), lbl.as_slice()).unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0].label, 1);
    }

    #[test]
    fn truncated_payload_is_an_io_error() {
        let (mut img, lbl) = idx_bytes(&[(vec![1; 4], 1), (vec![2; 4], 2)], 2, 2);
        img.truncate(img.len() - 1);
        assert!(matches!(
            read_dataset(img.as_slice(), lbl.as_slice()),
            Err(Error::Io { .. })
        ));
    }

    #[test]
    fn oversized_image_dimensions_are_an_io_error() {
        let mut img = Vec::new();
        for word in [IMAGE_MAGIC, 1, u32::MAX, u32::MAX] {
            img.extend_from_slice(&word.to_be_bytes());
        }
        img.extend_from_slice(&[7; 16]);
        let (_, lbl) = idx_bytes(&[(vec![], 4)], 0, 0);
        assert!(matches!(
            read_dataset(img.as_slice(), lbl.as_slice()),
            Err(Error::Io { .. } | Error::InvalidDataset(_))
        ));
    }

    #[test]
    fn out_of_range_label_is_rejected() {
        let (img, lbl) = idx_bytes(&[(vec![0; 4], 12)], 2, 2);
        assert!(matches!(
            read_dataset(img.as_slice(), lbl.as_slice()),
            Err(Error::InvalidDataset(_))
        ));
    }

    #[test]
    fn one_hot_targets() {
        assert_eq!(one_hot(2, 4), vec![0.0, 0.0, 1.0, 0.0]);
        assert_eq!(one_hot(7, 3), vec![0.0; 3]);
        let img = MnistImage {
            pixels: vec![0.5],
            label: 1,
        };
        let data = to_dataset(&[img], 3);
        assert_eq!(data, vec![(vec![0.5], vec![0.0, 1.0, 0.0])]);
    }
}
