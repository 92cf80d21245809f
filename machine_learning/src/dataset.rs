use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use ndarray::Array1;

use crate::{MlErr, Result};

/// One sample listed in a manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceDescriptor {
    pub id: usize,
    pub chunk_id: usize,
    pub path: PathBuf,
    pub class_id: usize,
}

impl SequenceDescriptor {
    /// Returns the one-hot label of this sequence.
    ///
    /// # Arguments
    /// * `label_dim` - The amount of classes.
    pub fn label(&self, label_dim: usize) -> Array1<f32> {
        let mut label = Array1::zeros(label_dim);
        if let Some(v) = label.get_mut(self.class_id) {
            *v = 1.;
        }

        label
    }
}

/// Scans a manifest made of `path<TAB>class_id` lines.
///
/// The id and chunk id of every descriptor are its line number, starting at zero.
///
/// # Arguments
/// * `reader` - The source of the manifest.
/// * `label_dim` - The amount of classes, when known class ids are checked against it.
///
/// # Returns
/// The descriptors in file order or the first invalid line found.
pub fn scan_manifest<R: BufRead>(
    reader: R,
    label_dim: Option<usize>,
) -> Result<Vec<SequenceDescriptor>> {
    let mut sequences = Vec::new();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let invalid = |reason: String| MlErr::InvalidManifest {
            line: line_no,
            reason,
        };

        let mut columns = line.split('\t');
        let (Some(path), Some(class_id)) = (columns.next(), columns.next()) else {
            return Err(invalid("expected 2 tab-delimited columns".into()));
        };

        if path.is_empty() {
            return Err(invalid("empty path".into()));
        }

        let class_id: usize = class_id
            .trim()
            .parse()
            .map_err(|_| invalid(format!("invalid class id {class_id:?}")))?;

        if let Some(dim) = label_dim
            && class_id >= dim
        {
            return Err(invalid(format!(
                "class id {class_id} out of range for {dim} classes"
            )));
        }

        sequences.push(SequenceDescriptor {
            id: line_no,
            chunk_id: line_no,
            path: PathBuf::from(path),
            class_id,
        });
    }

    Ok(sequences)
}

/// Opens and scans the manifest at `path`, see `scan_manifest`.
pub fn read_manifest<P: AsRef<Path>>(
    path: P,
    label_dim: Option<usize>,
) -> Result<Vec<SequenceDescriptor>> {
    let file = File::open(path)?;
    scan_manifest(BufReader::new(file), label_dim)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn scans_descriptors_in_order() {
        let manifest = "imgs/a.jpg\t0\nimgs/b.jpg\t2\n";

        let sequences = scan_manifest(Cursor::new(manifest), Some(3)).unwrap();

        assert_eq!(
            sequences,
            vec![
                SequenceDescriptor {
                    id: 0,
                    chunk_id: 0,
                    path: "imgs/a.jpg".into(),
                    class_id: 0,
                },
                SequenceDescriptor {
                    id: 1,
                    chunk_id: 1,
                    path: "imgs/b.jpg".into(),
                    class_id: 2,
                },
            ]
        );
    }

    #[test]
    fn missing_column_is_rejected() {
        let manifest = "imgs/a.jpg\t0\nimgs/b.jpg\n";

        let err = scan_manifest(Cursor::new(manifest), None).unwrap_err();
        assert!(matches!(err, MlErr::InvalidManifest { line: 1, .. }));
    }

    #[test]
    fn non_integer_class_is_rejected() {
        let err = scan_manifest(Cursor::new("a.jpg\tcat\n"), None).unwrap_err();
        assert!(matches!(err, MlErr::InvalidManifest { line: 0, .. }));
    }

    #[test]
    fn class_out_of_range_is_rejected() {
        let err = scan_manifest(Cursor::new("a.jpg\t3\n"), Some(3)).unwrap_err();
        assert!(matches!(err, MlErr::InvalidManifest { line: 0, .. }));
    }

    #[test]
    fn label_is_one_hot() {
        let sequence = SequenceDescriptor {
            id: 0,
            chunk_id: 0,
            path: "a.jpg".into(),
            class_id: 1,
        };

        assert_eq!(sequence.label(3).to_vec(), vec![0., 1., 0.]);
    }
}
