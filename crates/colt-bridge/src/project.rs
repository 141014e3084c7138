//! The IDE project as seen by the bridge.
//!
//! A [`Project`] carries the handful of settings the remote tool needs to
//! compile it. It is usually read from a small JSON file so the command-line
//! front end can stand in for the IDE.

use std::fs;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_PLAYER_VERSION: &str = "11.0";
const SWC_EXTENSION: &str = "swc";
const BUILD_DIR: &str = "obj";
const DEFAULT_SIZE: &str = "-default-size";
const DEFAULT_FRAME_RATE: &str = "-default-frame-rate";
const DEFAULT_BACKGROUND_COLOR: &str = "-default-background-color";

/// Errors raised while reading a project file.
#[derive(Debug, Error)]
pub enum ProjectError {
    /// The project file could not be read.
    #[error("failed to read project file {path}: {source}")]
    Read {
        /// Project file path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The project file was not valid JSON for a [`Project`].
    #[error("failed to parse project file {path}: {source}")]
    Parse {
        /// Project file path.
        path: Utf8PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
    /// The IDE has not written its compiler configuration yet.
    #[error("compiler configuration {path} does not exist; build the project once first")]
    MissingCompilerConfig {
        /// Expected configuration file.
        path: Utf8PathBuf,
    },
    /// The compiler configuration could not be copied.
    #[error("failed to copy compiler configuration to {path}: {source}")]
    CopyCompilerConfig {
        /// File being read or written.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// Stage settings the compiler needs when the project does not set them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct MovieOptions {
    /// Stage width in pixels.
    pub width: u32,
    /// Stage height in pixels.
    pub height: u32,
    /// Frames per second.
    pub frame_rate: u32,
    /// Background colour as a packed RGB integer.
    pub background_color: u32,
}

/// The project currently open in the IDE.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Project {
    /// Directory every relative path is resolved against.
    pub root: Utf8PathBuf,
    /// Display name.
    pub name: String,
    /// Ordered source folders.
    #[serde(default)]
    pub source_folders: Vec<Utf8PathBuf>,
    /// Library paths; only `.swc` entries are passed on.
    #[serde(default)]
    pub libraries: Vec<Utf8PathBuf>,
    /// Asset folders.
    #[serde(default)]
    pub assets: Vec<Utf8PathBuf>,
    /// Main compile target.
    #[serde(default)]
    pub main_class: Option<Utf8PathBuf>,
    /// Output file, optionally with a directory part.
    #[serde(default)]
    pub output_path: String,
    /// SDK location passed through untouched.
    #[serde(default)]
    pub sdk_path: Option<String>,
    /// Player version, for example `11.0`.
    #[serde(default = "default_player_version")]
    pub target_player_version: String,
    /// Extra compiler arguments.
    #[serde(default)]
    pub compiler_options: Vec<String>,
    /// Conditional compilation constants as `NAMESPACE::name,value`.
    #[serde(default)]
    pub compiler_constants: Vec<String>,
    /// Stage size, frame rate and background colour.
    #[serde(default)]
    pub movie: Option<MovieOptions>,
    /// Whether this is a debug build.
    #[serde(default)]
    pub debug: bool,
}

fn default_player_version() -> String {
    DEFAULT_PLAYER_VERSION.to_owned()
}

/// Record sent with `createProject`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDescriptor {
    /// Where the remote tool writes its own project file.
    pub path: Utf8PathBuf,
    /// Project name.
    pub name: String,
    /// Absolute source folders.
    pub sources: Vec<Utf8PathBuf>,
    /// Absolute `.swc` libraries.
    pub libraries: Vec<Utf8PathBuf>,
    /// Absolute asset folders.
    pub assets: Vec<Utf8PathBuf>,
    /// Absolute main class path.
    pub main_class: Option<Utf8PathBuf>,
    /// Output file name without directory.
    pub output_file_name: String,
    /// Absolute output directory, when the output path has one.
    pub output_path: Option<Utf8PathBuf>,
    /// Player version.
    pub target_player_version: String,
    /// Space-separated compiler arguments.
    pub compiler_options: String,
    /// SDK location.
    #[serde(rename = "flexSDKPath")]
    pub flex_sdk_path: Option<String>,
    /// Copy of the IDE's compiler configuration, in full-config mode.
    pub custom_config_path: Option<Utf8PathBuf>,
}

impl Project {
    /// Creates a project rooted at `root` with no folders configured.
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>, name: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            name: name.into(),
            source_folders: Vec::new(),
            libraries: Vec::new(),
            assets: Vec::new(),
            main_class: None,
            output_path: String::new(),
            sdk_path: None,
            target_player_version: default_player_version(),
            compiler_options: Vec::new(),
            compiler_constants: Vec::new(),
            movie: None,
            debug: false,
        }
    }

    /// Reads a project from a JSON file.
    ///
    /// A relative `root` is resolved against the file's directory.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectError`] when the file cannot be read or parsed.
    pub fn load(path: &Utf8Path) -> Result<Self, ProjectError> {
        let text = fs::read_to_string(path).map_err(|source| ProjectError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut project: Self =
            serde_json::from_str(&text).map_err(|source| ProjectError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        if project.root.is_relative() {
            let base = path.parent().unwrap_or_else(|| Utf8Path::new("."));
            project.root = base.join(&project.root);
        }
        Ok(project)
    }

    /// Resolves `path` against the project root.
    ///
    /// Either `\` or `/` separates components of a relative path.
    #[must_use]
    pub fn absolute(&self, path: &Utf8Path) -> Utf8PathBuf {
        if path.is_absolute() {
            return path.to_path_buf();
        }
        join_relative(&self.root, path.as_str())
    }

    /// Source folders resolved against the project root.
    #[must_use]
    pub fn absolute_source_folders(&self) -> Vec<Utf8PathBuf> {
        self.source_folders
            .iter()
            .map(|folder| self.absolute(folder))
            .collect()
    }

    /// Builds the `createProject` record for a remote project file at `path`.
    #[must_use]
    pub fn descriptor(&self, path: Utf8PathBuf) -> ProjectDescriptor {
        let (output_dir, output_file_name) = split_output(&self.output_path);
        ProjectDescriptor {
            path,
            name: self.name.clone(),
            sources: self.absolute_source_folders(),
            libraries: self
                .libraries
                .iter()
                .filter(|library| is_swc(library))
                .map(|library| self.absolute(library))
                .collect(),
            assets: self.assets.iter().map(|asset| self.absolute(asset)).collect(),
            main_class: self.main_class.as_deref().map(|main| self.absolute(main)),
            output_file_name: output_file_name.to_owned(),
            output_path: output_dir.map(|dir| self.absolute(Utf8Path::new(dir))),
            target_player_version: self.target_player_version.clone(),
            compiler_options: self.compiler_arguments(),
            flex_sdk_path: self.sdk_path.clone(),
            custom_config_path: None,
        }
    }

    /// Writes `obj/<Name>ConfigCopy.xml` next to the IDE's generated
    /// compiler configuration, with its `<file-specs>` block commented out,
    /// and returns the copy's path.
    ///
    /// Spaces are dropped from the project name, as the IDE does when it
    /// names the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectError::MissingCompilerConfig`] when the project has
    /// never been built, or [`ProjectError::CopyCompilerConfig`] when the
    /// copy cannot be written.
    pub fn write_config_copy(&self) -> Result<Utf8PathBuf, ProjectError> {
        let stem = self.name.replace(' ', "");
        let build_dir = self.root.join(BUILD_DIR);
        let source = build_dir.join(format!("{stem}Config.xml"));
        if !source.is_file() {
            return Err(ProjectError::MissingCompilerConfig { path: source });
        }
        let text = fs::read_to_string(&source).map_err(|error| ProjectError::CopyCompilerConfig {
            path: source.clone(),
            source: error,
        })?;
        let copy = build_dir.join(format!("{stem}ConfigCopy.xml"));
        let without_files = text
            .replace("<file-specs", "<!-- file-specs")
            .replace("/file-specs>", "/file-specs -->");
        fs::write(&copy, without_files).map_err(|error| ProjectError::CopyCompilerConfig {
            path: copy.clone(),
            source: error,
        })?;
        Ok(copy)
    }

    fn compiler_arguments(&self) -> String {
        let options: Vec<&str> = self
            .compiler_options
            .iter()
            .map(|option| option.trim())
            .filter(|option| !option.is_empty())
            .collect();
        let mut arguments: Vec<String> = options.iter().copied().map(str::to_owned).collect();
        if let Some(movie) = self.movie {
            let stage = [
                (DEFAULT_SIZE, format!("{} {}", movie.width, movie.height)),
                (DEFAULT_FRAME_RATE, movie.frame_rate.to_string()),
                (DEFAULT_BACKGROUND_COLOR, movie.background_color.to_string()),
            ];
            for (key, value) in stage {
                if !options.iter().any(|option| option.contains(key)) {
                    arguments.push(format!("{key} {value}"));
                }
            }
        }
        arguments.push(format!("-define+=CONFIG::debug,{}", self.debug));
        arguments.push(format!("-define+=CONFIG::release,{}", !self.debug));
        arguments.extend(
            self.compiler_constants
                .iter()
                .map(|constant| constant.trim())
                .filter(|constant| constant.contains(','))
                .map(|constant| format!("-define+={constant}")),
        );
        if self.debug {
            arguments.push("-debug".to_owned());
        }
        arguments.join(" ")
    }
}

/// Joins `relative` onto `base`, accepting either separator.
pub(crate) fn join_relative(base: &Utf8Path, relative: &str) -> Utf8PathBuf {
    relative
        .split(['\\', '/'])
        .filter(|part| !part.is_empty() && *part != ".")
        .fold(base.to_path_buf(), |path, part| path.join(part))
}

fn is_swc(library: &Utf8Path) -> bool {
    library
        .extension()
        .is_some_and(|extension| extension.eq_ignore_ascii_case(SWC_EXTENSION))
}

fn split_output(output: &str) -> (Option<&str>, &str) {
    match output.rfind(['\\', '/']) {
        Some(index) => (output.get(..index), output.get(index + 1..).unwrap_or_default()),
        None => (None, output),
    }
}
