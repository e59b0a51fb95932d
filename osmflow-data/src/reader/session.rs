use std::{
    fmt,
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use log::debug;
use osmflow_core::{Feature, FeatureKinds};
use osmpbf::{Blob, BlobDecode, BlobReader};

use super::{PbfError, convert::convert};

/// One forward pass over a PBF file.
///
/// Blobs are decoded one at a time when the features of the previous blob
/// have been consumed. The file handle is closed at end of stream, after the
/// first error, or when the session is dropped.
pub struct PbfSession {
    path: PathBuf,
    kinds: FeatureKinds,
    blobs: Option<BlobReader<BufReader<File>>>,
    pending: std::vec::IntoIter<Feature>,
    blocks: u64,
}

impl PbfSession {
    pub(super) fn new(path: &Path, kinds: FeatureKinds, blobs: BlobReader<BufReader<File>>) -> Self {
        Self {
            path: path.to_path_buf(),
            kinds,
            // Nothing to yield: release the file straight away.
            blobs: (!kinds.is_empty()).then_some(blobs),
            pending: Vec::new().into_iter(),
            blocks: 0,
        }
    }

    fn decode(&mut self, blob: &Blob) -> Result<Vec<Feature>, osmpbf::Error> {
        match blob.decode()? {
            BlobDecode::OsmData(block) => {
                self.blocks = self.blocks.saturating_add(1);
                Ok(block
                    .elements()
                    .filter_map(|element| convert(element, self.kinds))
                    .collect())
            }
            BlobDecode::OsmHeader(_) => Ok(Vec::new()),
            BlobDecode::Unknown(kind) => {
                debug!("Skipping blob of unknown type {kind:?} in {:?}", self.path);
                Ok(Vec::new())
            }
        }
    }

    fn fail(&mut self, source: osmpbf::Error) -> PbfError {
        self.release();
        PbfError::Decode {
            source,
            path: self.path.clone(),
        }
    }

    fn release(&mut self) {
        if self.blobs.take().is_some() {
            debug!("Closed {:?} after {} data blocks", self.path, self.blocks);
        }
    }
}

impl Iterator for PbfSession {
    type Item = Result<Feature, PbfError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(feature) = self.pending.next() {
                return Some(Ok(feature));
            }
            let next = self.blobs.as_mut()?.next();
            let blob = match next {
                None => {
                    self.release();
                    return None;
                }
                Some(Err(source)) => return Some(Err(self.fail(source))),
                Some(Ok(blob)) => blob,
            };
            match self.decode(&blob) {
                Ok(features) => self.pending = features.into_iter(),
                Err(source) => return Some(Err(self.fail(source))),
            }
        }
    }
}

impl fmt::Debug for PbfSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PbfSession")
            .field("path", &self.path)
            .field("kinds", &self.kinds)
            .field("open", &self.blobs.is_some())
            .field("blocks", &self.blocks)
            .finish_non_exhaustive()
    }
}
