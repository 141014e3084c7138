//! Rewrites diagnostics that point into the remote tool's incremental mirror.

use camino::Utf8PathBuf;

use crate::project::{Project, join_relative};

const LOCATION_TOKEN: &str = "): col";

/// Outcome of [`remap_line`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticLine {
    /// The mirror marker was replaced with a real source folder.
    Remapped(String),
    /// The line is forwarded as it was read.
    Passthrough(String),
}

impl DiagnosticLine {
    /// Text to forward to the output sink.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Remapped(text) | Self::Passthrough(text) => text,
        }
    }

    /// Whether the line was rewritten.
    #[must_use]
    pub const fn is_remapped(&self) -> bool {
        matches!(self, Self::Remapped(_))
    }
}

/// Marker and the ordered source folders that may replace it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathRemap {
    marker: String,
    folders: Vec<Utf8PathBuf>,
}

impl PathRemap {
    /// Builds a remap from an explicit folder list.
    #[must_use]
    pub fn new(marker: impl Into<String>, folders: Vec<Utf8PathBuf>) -> Self {
        Self {
            marker: marker.into(),
            folders,
        }
    }

    /// Builds a remap from the open project's source folders, if any.
    #[must_use]
    pub fn for_project(marker: &str, project: Option<&Project>) -> Self {
        let folders = project
            .map(Project::absolute_source_folders)
            .unwrap_or_default();
        Self::new(marker, folders)
    }

    fn relative_path<'a>(&self, line: &'a str) -> Option<&'a str> {
        if self.marker.is_empty() {
            return None;
        }
        let located = line.get(..line.find(LOCATION_TOKEN)?)?;
        let file = located.get(..located.rfind('(')?)?;
        let after_marker = file.find(&self.marker)? + self.marker.len();
        let relative = file.get(after_marker + 1..)?;
        (!relative.is_empty()).then_some(relative)
    }

    fn folder_containing(&self, relative: &str) -> Option<&Utf8PathBuf> {
        self.folders
            .iter()
            .find(|folder| join_relative(folder, relative).is_file())
    }
}

/// Remaps one log line. Never fails: anything unexpected passes through.
#[must_use]
pub fn remap_line(line: &str, remap: &PathRemap) -> DiagnosticLine {
    if remap.marker.is_empty() || !line.contains(&remap.marker) {
        return DiagnosticLine::Passthrough(line.to_owned());
    }
    remap
        .relative_path(line)
        .and_then(|relative| remap.folder_containing(relative))
        .map_or_else(
            || DiagnosticLine::Passthrough(line.to_owned()),
            |folder| DiagnosticLine::Remapped(line.replace(&remap.marker, folder.as_str())),
        )
}
