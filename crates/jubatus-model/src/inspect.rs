//! Batch inspection: apply the header decoder to a list of model files.

use std::fs::File;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::reader::decode_header;
use crate::segment::{SegmentDecoder, SegmentDecoders};
use crate::types::*;

//  Options

/// What to do with a header whose magic is not [`JUBATUS_MAGIC`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MagicPolicy {
    /// Reject it with [`ModelError::UnrecognizedFormat`].
    #[default]
    Strict,
    /// Accept any magic.
    Permissive,
}

/// How a batch reacts to a file that cannot be inspected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchMode {
    /// Abort on the first failure and return no results.
    #[default]
    FailFast,
    /// Skip the file, record the failure, keep going.
    BestEffort,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InspectOptions {
    pub magic: MagicPolicy,
    pub batch: BatchMode,
}

//  Results

/// A file skipped in [`BatchMode::BestEffort`].
#[derive(Debug)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: ModelError,
}

/// Outcome of a batch. `failures` is always empty in fail-fast mode.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Descriptors in input order.
    pub models: Vec<ModelDescriptor>,
    pub failures: Vec<FileFailure>,
}

impl BatchReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

//  Inspector

#[derive(Debug, Default)]
pub struct Inspector {
    options: InspectOptions,
    decoders: SegmentDecoders,
}

impl Inspector {
    pub fn new(options: InspectOptions) -> Self {
        Self {
            options,
            decoders: SegmentDecoders::default(),
        }
    }

    pub fn with_system_decoder(
        mut self,
        decoder: impl SegmentDecoder<SystemDataRecord> + 'static,
    ) -> Self {
        self.decoders.set_system(decoder);
        self
    }

    pub fn with_user_decoder(mut self, decoder: impl SegmentDecoder<UserDataRecord> + 'static) -> Self {
        self.decoders.set_user(decoder);
        self
    }

    pub fn options(&self) -> InspectOptions {
        self.options
    }

    /// Inspect a single file.
    ///
    /// The file handle lives only for the duration of this call and is
    /// closed on every return path.
    pub fn inspect_file(&self, path: &Path) -> Result<ModelDescriptor, ModelError> {
        let mut file = File::open(path).map_err(|source| ModelError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;

        let abs_path = resolve(path)?;

        let header = decode_header(&mut file).map_err(|e| e.in_file(path))?;
        self.check_magic(&header).map_err(|e| e.in_file(path))?;
        let (system_data, user_data) = self
            .decoders
            .decode(&mut file, &header)
            .map_err(|e| e.in_file(path))?;

        debug!(
            path = %abs_path.display(),
            jubatus_version = %header.jubatus_version,
            format_version = header.format_version,
            "model header decoded"
        );

        Ok(ModelDescriptor::new(abs_path, header, system_data, user_data))
    }

    /// Inspect `paths` in order, sequentially.
    ///
    /// In [`BatchMode::FailFast`] the first failure is returned and no
    /// descriptors are produced. In [`BatchMode::BestEffort`] failures are
    /// collected in the report instead.
    pub fn inspect<I, P>(&self, paths: I) -> Result<BatchReport, ModelError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut report = BatchReport::default();

        for path in paths {
            let path = path.as_ref();
            match self.inspect_file(path) {
                Ok(model) => report.models.push(model),
                Err(err) => match self.options.batch {
                    BatchMode::FailFast => {
                        debug!(path = %path.display(), error = %err.root(), "aborting batch");
                        return Err(err);
                    }
                    BatchMode::BestEffort => {
                        debug!(path = %path.display(), error = %err.root(), "skipping file");
                        report.failures.push(FileFailure {
                            path: path.to_path_buf(),
                            error: err,
                        });
                    }
                },
            }
        }

        debug!(
            models = report.models.len(),
            failures = report.failures.len(),
            "inspection complete"
        );
        Ok(report)
    }

    fn check_magic(&self, header: &ModelHeader) -> Result<(), ModelError> {
        match self.options.magic {
            MagicPolicy::Permissive => Ok(()),
            MagicPolicy::Strict if header.has_magic(&JUBATUS_MAGIC) => Ok(()),
            MagicPolicy::Strict => Err(ModelError::UnrecognizedFormat {
                magic: header.magic.clone(),
            }),
        }
    }
}

/// Lexical absolute form of `path`, relative to the working directory.
fn resolve(path: &Path) -> Result<PathBuf, ModelError> {
    std::path::absolute(path).map_err(|source| ModelError::PathResolutionFailed {
        path: path.to_path_buf(),
        source,
    })
}

/// Inspect `paths` with default options: strict magic, fail-fast.
pub fn inspect<I, P>(paths: I) -> Result<Vec<ModelDescriptor>, ModelError>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    Inspector::default().inspect(paths).map(|report| report.models)
}
