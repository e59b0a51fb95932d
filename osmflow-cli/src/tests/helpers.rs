//! Test helpers for materialising PBF datasets on disk.

use crate::{
    CliError,
    apply::{ApplyArgs, ApplyConfig},
};
use base64::{Engine as _, engine::general_purpose};
use camino::{Utf8Path, Utf8PathBuf};
use std::{fs, path::PathBuf};
use tempfile::TempDir;

/// A decoded fixture living in its own temporary directory.
#[derive(Debug)]
pub(super) struct Dataset {
    _dir: TempDir,
    root: Utf8PathBuf,
    pbf: Utf8PathBuf,
}

impl Dataset {
    /// Decode `tests/fixtures/<stem>.osm.pbf.b64` into a fresh directory.
    pub(super) fn decode(stem: &str) -> Self {
        let encoded_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures")
            .join(format!("{stem}.osm.pbf.b64"));
        let encoded = fs::read_to_string(&encoded_path).unwrap_or_else(|err| {
            panic!("failed to read base64 fixture {encoded_path:?}: {err}");
        });
        let cleaned: String = encoded
            .chars()
            .filter(|ch| !ch.is_ascii_whitespace())
            .collect();
        let decoded = general_purpose::STANDARD
            .decode(cleaned.as_bytes())
            .unwrap_or_else(|err| panic!("failed to decode fixture {encoded_path:?}: {err}"));
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 tempdir");
        let pbf = root.join(format!("{stem}.osm.pbf"));
        fs::write(&pbf, decoded).expect("write decoded fixture");
        Self {
            _dir: dir,
            root,
            pbf,
        }
    }

    /// The meadow dataset: a unit square of nodes, four ways and three
    /// relations, one of which is an incomplete multipolygon.
    pub(super) fn meadow() -> Self {
        Self::decode("meadow")
    }

    pub(super) fn pbf(&self) -> &Utf8Path {
        &self.pbf
    }

    pub(super) fn root(&self) -> &Utf8Path {
        &self.root
    }
}

/// Values a config file or environment layer contributes in scenarios.
#[derive(Debug, Clone, Default)]
pub(super) struct LayerOverrides {
    pub(super) osm_pbf: Option<Utf8PathBuf>,
    pub(super) callbacks: Option<String>,
}

/// Merge layers in precedence order (CLI, then environment, then file) and
/// resolve the result the way the command does.
pub(super) fn merge_layers(
    mut cli_args: ApplyArgs,
    file_layer: Option<LayerOverrides>,
    env_layer: Option<LayerOverrides>,
) -> Result<ApplyConfig, CliError> {
    merge_field(
        &mut cli_args.osm_pbf,
        extract_field(env_layer.as_ref(), |layer| &layer.osm_pbf),
        extract_field(file_layer.as_ref(), |layer| &layer.osm_pbf),
    );
    merge_field(
        &mut cli_args.callbacks,
        extract_field(env_layer.as_ref(), |layer| &layer.callbacks),
        extract_field(file_layer.as_ref(), |layer| &layer.callbacks),
    );
    let config = ApplyConfig::try_from(cli_args)?;
    config.validate_sources()?;
    Ok(config)
}

fn merge_field<T>(target: &mut Option<T>, env_value: Option<T>, file_value: Option<T>) {
    if target.is_none()
        && let Some(value) = env_value.or(file_value)
    {
        *target = Some(value);
    }
}

fn extract_field<T: Clone>(
    layer: Option<&LayerOverrides>,
    accessor: fn(&LayerOverrides) -> &Option<T>,
) -> Option<T> {
    layer.and_then(|entry| accessor(entry).clone())
}
