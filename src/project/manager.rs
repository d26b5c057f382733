// Project stores - saving and loading sequencer snapshots

use crate::project::serialization::*;
use crate::project::types::*;
use crate::sequencer::error::SequencerError;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use zip::{ZipArchive, ZipWriter};

/// File extension of project archives
pub const PROJECT_EXTENSION: &str = "haos";

const MANIFEST_FILE: &str = "manifest.json";
const PROJECT_FILE: &str = "project.ron";

/// Project error types
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("File system error: {0}")]
    FileSystemError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid project structure: {0}")]
    InvalidStructure(String),

    #[error("Unsupported project format version {0}")]
    InvalidVersion(ProjectVersion),

    #[error("Missing required files in project")]
    MissingFiles,

    #[error("Unknown project: {0}")]
    UnknownProject(ProjectId),

    #[error("Sequencer rejected project: {0}")]
    Sequencer(#[from] SequencerError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Persistence collaborator: opaque ids in, plain project states out
pub trait ProjectStore {
    fn save(&mut self, state: &ProjectState) -> Result<ProjectId, ProjectError>;

    fn load(&self, id: &ProjectId) -> Result<ProjectState, ProjectError>;

    /// Stored ids, sorted
    fn list(&self) -> Result<Vec<ProjectId>, ProjectError>;

    fn delete(&mut self, id: &ProjectId) -> Result<(), ProjectError>;
}

/// In-memory key-value store holding JSON documents
#[derive(Debug, Default)]
pub struct MemoryProjectStore {
    next_id: u64,
    documents: BTreeMap<ProjectId, String>,
}

impl MemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw JSON document, as a web client would store it
    pub fn document(&self, id: &ProjectId) -> Option<&str> {
        self.documents.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl ProjectStore for MemoryProjectStore {
    fn save(&mut self, state: &ProjectState) -> Result<ProjectId, ProjectError> {
        crate::project::validate_project_structure(state)?;
        self.next_id += 1;
        let id = ProjectId::new(format!("project-{}", self.next_id));
        self.documents.insert(id.clone(), serialize_to_json(state)?);
        Ok(id)
    }

    fn load(&self, id: &ProjectId) -> Result<ProjectState, ProjectError> {
        let document = self
            .documents
            .get(id)
            .ok_or_else(|| ProjectError::UnknownProject(id.clone()))?;
        deserialize_from_json(document)
    }

    fn list(&self) -> Result<Vec<ProjectId>, ProjectError> {
        Ok(self.documents.keys().cloned().collect())
    }

    fn delete(&mut self, id: &ProjectId) -> Result<(), ProjectError> {
        self.documents
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| ProjectError::UnknownProject(id.clone()))
    }
}

/// One ZIP archive per project under a root directory
///
/// Each archive holds `manifest.json` (name, format version, timestamps) and
/// `project.ron` (the full state). The id is derived from the project name, so
/// saving under the same name replaces the archive and keeps its creation time.
#[derive(Debug, Clone)]
pub struct ArchiveProjectStore {
    root: PathBuf,
}

impl ArchiveProjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `<data dir>/haos-sequencer/projects`
    pub fn default_location() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join("haos-sequencer").join("projects"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn archive_path(&self, id: &ProjectId) -> PathBuf {
        self.root
            .join(format!("{}.{}", id.as_str(), PROJECT_EXTENSION))
    }

    /// Read only the manifest of a stored project
    pub fn metadata(&self, id: &ProjectId) -> Result<ProjectMetadata, ProjectError> {
        let mut archive = self.open(id)?;
        let manifest = read_entry(&mut archive, MANIFEST_FILE)?;
        deserialize_metadata_from_json(&manifest)
    }

    fn open(&self, id: &ProjectId) -> Result<ZipArchive<File>, ProjectError> {
        let path = self.archive_path(id);
        if !path.exists() {
            return Err(ProjectError::UnknownProject(id.clone()));
        }
        let file = File::open(&path).map_err(|e| {
            ProjectError::FileSystemError(format!("Failed to open {}: {}", path.display(), e))
        })?;
        Ok(ZipArchive::new(file)?)
    }
}

impl ProjectStore for ArchiveProjectStore {
    fn save(&mut self, state: &ProjectState) -> Result<ProjectId, ProjectError> {
        crate::project::validate_project_structure(state)?;
        let id = ProjectId::new(slugify(&state.name));

        std::fs::create_dir_all(&self.root).map_err(|e| {
            ProjectError::FileSystemError(format!("Failed to create project directory: {}", e))
        })?;

        let mut metadata = ProjectMetadata::for_state(state);
        if let Ok(previous) = self.metadata(&id) {
            metadata.created = previous.created;
        }

        let path = self.archive_path(&id);
        let file = File::create(&path).map_err(|e| {
            ProjectError::FileSystemError(format!("Failed to create ZIP file: {}", e))
        })?;
        let mut zip_writer = ZipWriter::new(file);
        let options: zip::write::FileOptions<()> = zip::write::FileOptions::default();

        zip_writer.start_file(MANIFEST_FILE, options)?;
        zip_writer.write_all(serialize_metadata_to_json(&metadata)?.as_bytes())?;
        zip_writer.start_file(PROJECT_FILE, options)?;
        zip_writer.write_all(serialize_to_ron(state)?.as_bytes())?;
        zip_writer.finish()?;

        log::info!(target: "project", "Saved '{}' to {}", state.name, path.display());
        Ok(id)
    }

    fn load(&self, id: &ProjectId) -> Result<ProjectState, ProjectError> {
        let mut archive = self.open(id)?;

        let metadata = deserialize_metadata_from_json(&read_entry(&mut archive, MANIFEST_FILE)?)?;
        if !metadata.version.is_compatible() {
            return Err(ProjectError::InvalidVersion(metadata.version));
        }

        let state = deserialize_from_ron(&read_entry(&mut archive, PROJECT_FILE)?)?;
        crate::project::validate_project_structure(&state)?;
        log::info!(
            target: "project",
            "Loaded '{}' (format {}, created {})",
            metadata.name, metadata.version, metadata.created
        );
        Ok(state)
    }

    fn list(&self) -> Result<Vec<ProjectId>, ProjectError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut ids = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(PROJECT_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                ids.push(ProjectId::new(stem));
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn delete(&mut self, id: &ProjectId) -> Result<(), ProjectError> {
        let path = self.archive_path(id);
        if !path.exists() {
            return Err(ProjectError::UnknownProject(id.clone()));
        }
        std::fs::remove_file(&path)?;
        Ok(())
    }
}

fn read_entry(archive: &mut ZipArchive<File>, name: &str) -> Result<String, ProjectError> {
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Err(ProjectError::MissingFiles),
        Err(e) => return Err(e.into()),
    };
    let mut contents = String::new();
    entry.read_to_string(&mut contents)?;
    Ok(contents)
}

/// File-name-safe id from a project name
fn slugify(name: &str) -> String {
    let slug: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    let slug = slug
        .split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug
    }
}
