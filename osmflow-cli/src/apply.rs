//! `apply` command: stream a PBF file through counting callbacks.

use std::{cell::Cell, io::Write};

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use log::info;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use osmflow_core::{
    ApplyOptions, AuxiliaryStage, Callbacks, DispatchCounts, FeatureKind, FeatureKinds,
    IndexVariant,
};
use serde::{Deserialize, Serialize};

use crate::{ARG_CALLBACKS, ARG_INDEX, ARG_LOCATIONS, ARG_OSM_PBF, CliError, ENV_OSM_PBF, fs};

/// CLI arguments for the `apply` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Read an OpenStreetMap PBF file and dispatch its features to \
                 counting callbacks. Values can come from CLI flags, \
                 configuration files, or environment variables.",
    about = "Dispatch a PBF file to callbacks and summarise the run"
)]
#[ortho_config(prefix = "OSMFLOW")]
pub(crate) struct ApplyArgs {
    /// Path to the OpenStreetMap PBF file.
    #[arg(long = ARG_OSM_PBF, value_name = "path")]
    #[serde(default)]
    pub(crate) osm_pbf: Option<Utf8PathBuf>,
    /// Resolve way node locations before dispatch.
    #[arg(
        long = ARG_LOCATIONS,
        value_name = "bool",
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    #[serde(default)]
    pub(crate) locations: Option<bool>,
    /// Location index implementation (`sparse`).
    #[arg(long = ARG_INDEX, value_name = "name")]
    #[serde(default)]
    pub(crate) index: Option<String>,
    /// Comma-separated callbacks to register: node, way, relation, changeset, area.
    #[arg(long = ARG_CALLBACKS, value_name = "list")]
    #[serde(default)]
    pub(crate) callbacks: Option<String>,
}

impl ApplyArgs {
    pub(crate) fn into_config(self) -> Result<ApplyConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        ApplyConfig::try_from(merged)
    }
}

/// Resolved `apply` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ApplyConfig {
    pub(crate) osm_pbf: Utf8PathBuf,
    pub(crate) locations: bool,
    pub(crate) index: IndexVariant,
    pub(crate) callbacks: FeatureKinds,
}

impl ApplyConfig {
    pub(crate) fn validate_sources(&self) -> Result<(), CliError> {
        require_existing(&self.osm_pbf, ARG_OSM_PBF)
    }

    pub(crate) const fn options(&self) -> ApplyOptions {
        ApplyOptions {
            locations: self.locations,
            index: self.index,
        }
    }
}

fn require_existing(path: &Utf8Path, field: &'static str) -> Result<(), CliError> {
    match fs::file_is_file(path) {
        Ok(true) => Ok(()),
        Ok(false) => Err(CliError::SourcePathNotFile {
            field,
            path: path.to_path_buf(),
        }),
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
            Err(CliError::MissingSourceFile {
                field,
                path: path.to_path_buf(),
            })
        }
        Err(source) => Err(CliError::InspectSourcePath {
            field,
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Callbacks registered when none are configured.
pub(crate) fn default_callbacks() -> FeatureKinds {
    FeatureKind::Node | FeatureKind::Way | FeatureKind::Relation | FeatureKind::Changeset
}

/// Parse a comma-separated callback list. Blank entries are ignored, so an
/// empty list selects no callbacks at all.
pub(crate) fn parse_callbacks(list: &str) -> Result<FeatureKinds, CliError> {
    list.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .try_fold(FeatureKinds::empty(), |kinds, name| {
            FeatureKinds::all()
                .iter()
                .find(|kind| kind.as_str().eq_ignore_ascii_case(name))
                .map(|kind| kinds | kind)
                .ok_or_else(|| CliError::UnknownCallback {
                    name: name.to_owned(),
                })
        })
}

impl TryFrom<ApplyArgs> for ApplyConfig {
    type Error = CliError;

    fn try_from(args: ApplyArgs) -> Result<Self, Self::Error> {
        let osm_pbf = args.osm_pbf.ok_or(CliError::MissingArgument {
            field: ARG_OSM_PBF,
            env: ENV_OSM_PBF,
        })?;
        let index = args
            .index
            .as_deref()
            .map_or(Ok(IndexVariant::default()), str::parse)?;
        let callbacks = args
            .callbacks
            .as_deref()
            .map_or_else(|| Ok(default_callbacks()), parse_callbacks)?;
        Ok(Self {
            osm_pbf,
            locations: args.locations.unwrap_or(false),
            index,
            callbacks,
        })
    }
}

/// JSON summary printed after a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplySummary {
    /// File that was read.
    pub osm_pbf: Utf8PathBuf,
    /// Stage interposed before dispatch.
    pub stage: &'static str,
    /// Callbacks that were registered.
    pub callbacks: Vec<&'static str>,
    /// Sessions opened on the file.
    pub sessions: u32,
    /// Callback invocations per kind.
    pub dispatched: DispatchCounts,
    /// Way node references left without a location.
    pub unresolved_references: u64,
    /// Ways delivered with at least one unresolved node reference. Only
    /// counted when locations were resolved.
    pub partially_located_ways: u64,
    /// Areas assembled and delivered.
    pub areas_emitted: u64,
    /// Relations whose members never all arrived.
    pub areas_abandoned: u64,
}

pub(crate) fn resolve_apply_config(args: ApplyArgs) -> Result<ApplyConfig, CliError> {
    let config = args.into_config()?;
    config.validate_sources()?;
    Ok(config)
}

/// Run the configured callbacks over the file and summarise the outcome.
pub(crate) fn run_apply(config: &ApplyConfig) -> Result<ApplySummary, CliError> {
    let partially_located = Cell::new(0_u64);
    let mut callbacks = Callbacks::new();
    if config.callbacks.contains(FeatureKind::Node) {
        callbacks = callbacks.on_node(|_| Ok(()));
    }
    if config.callbacks.contains(FeatureKind::Way) {
        callbacks = callbacks.on_way(|way| {
            if !way.is_fully_located() {
                partially_located.set(partially_located.get().saturating_add(1));
            }
            Ok(())
        });
    }
    if config.callbacks.contains(FeatureKind::Relation) {
        callbacks = callbacks.on_relation(|_| Ok(()));
    }
    if config.callbacks.contains(FeatureKind::Changeset) {
        callbacks = callbacks.on_changeset(|_| Ok(()));
    }
    if config.callbacks.contains(FeatureKind::Area) {
        callbacks = callbacks.on_area(|_| Ok(()));
    }

    let report = osmflow_data::apply_file(config.osm_pbf.as_std_path(), config.options(), callbacks)?;
    let stage = report.plan.stage();
    info!(
        "Applied {} callbacks to {} in {} session(s)",
        report.dispatched.total(),
        config.osm_pbf,
        report.sessions
    );

    let located = stage != AuxiliaryStage::None;
    let areas = report.areas.unwrap_or_default();
    Ok(ApplySummary {
        osm_pbf: config.osm_pbf.clone(),
        stage: stage.as_str(),
        callbacks: config.callbacks.iter().map(FeatureKind::as_str).collect(),
        sessions: report.sessions,
        dispatched: report.dispatched,
        unresolved_references: report.locations.map_or(0, |stats| stats.unresolved),
        partially_located_ways: if located { partially_located.get() } else { 0 },
        areas_emitted: areas.areas,
        areas_abandoned: areas.abandoned,
    })
}

pub(crate) fn write_summary<W: Write>(summary: &ApplySummary, mut writer: W) -> Result<(), CliError> {
    serde_json::to_writer_pretty(&mut writer, summary).map_err(CliError::SerializeSummary)?;
    writer.write_all(b"\n").map_err(CliError::WriteSummary)
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<ApplyConfig, CliError> {
    let merged = ApplyArgs::merge_from_layers(layers).map_err(CliError::from)?;
    ApplyConfig::try_from(merged)
}
