use crate::documents::{Document, DocumentTable};
use crate::engine::Recommender;
use crate::error::Result;
use crate::title_index::{CollisionPolicy, TitleIndex};
use crate::vector_space::VectorSpace;
use crate::RowId;
use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub num_terms: u32,
    pub nnz: u64,
    /// Whether rows were L2-normalized at build time, making scores cosine similarities.
    pub l2_normalized: bool,
    pub created_at: String,
    pub version: u32,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    fn documents(&self) -> PathBuf { self.root.join("documents.bin") }
    fn titles(&self) -> PathBuf { self.root.join("titles.bin") }
    fn matrix(&self) -> PathBuf { self.root.join("matrix.bin") }
    fn meta(&self) -> PathBuf { self.root.join("meta.json") }
}

/// Everything the offline build produces.
pub struct Artifacts {
    pub documents: Vec<Document>,
    pub titles: Vec<(String, RowId)>,
    pub space: VectorSpace,
    pub meta: MetaFile,
}

fn write_bin<T: Serialize + ?Sized>(path: PathBuf, value: &T) -> Result<()> {
    let mut f = File::create(path)?;
    let bytes = bincode::serialize(value)?;
    f.write_all(&bytes)?;
    Ok(())
}

fn read_bin<T: for<'de> Deserialize<'de>>(path: PathBuf) -> Result<T> {
    let mut f = File::open(path)?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    Ok(bincode::deserialize(&buf)?)
}

pub fn save_documents(paths: &IndexPaths, docs: &[Document]) -> Result<()> {
    create_dir_all(&paths.root)?;
    write_bin(paths.documents(), docs)
}

pub fn load_documents(paths: &IndexPaths) -> Result<Vec<Document>> {
    read_bin(paths.documents())
}

/// Raw title mapping, kept as an ordered list so build order survives the round trip.
pub fn save_titles(paths: &IndexPaths, titles: &[(String, RowId)]) -> Result<()> {
    create_dir_all(&paths.root)?;
    write_bin(paths.titles(), titles)
}

pub fn load_titles(paths: &IndexPaths) -> Result<Vec<(String, RowId)>> {
    read_bin(paths.titles())
}

pub fn save_matrix(paths: &IndexPaths, space: &VectorSpace) -> Result<()> {
    create_dir_all(&paths.root)?;
    write_bin(paths.matrix(), space)
}

pub fn load_matrix(paths: &IndexPaths) -> Result<VectorSpace> {
    read_bin(paths.matrix())
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.meta())?;
    let json = serde_json::to_string_pretty(meta)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let mut f = File::open(paths.meta())?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    Ok(meta)
}

pub fn save_artifacts(paths: &IndexPaths, artifacts: &Artifacts) -> Result<()> {
    save_documents(paths, &artifacts.documents)?;
    save_titles(paths, &artifacts.titles)?;
    save_matrix(paths, &artifacts.space)?;
    save_meta(paths, &artifacts.meta)?;
    Ok(())
}

/// Loads the three artifacts and binds them into one [`Recommender`].
pub fn load_engine(paths: &IndexPaths, policy: CollisionPolicy) -> Result<Recommender> {
    let documents = DocumentTable::new(load_documents(paths)?)?;
    let titles = TitleIndex::build(load_titles(paths)?, policy)?;
    let space = load_matrix(paths)?;
    match load_meta(paths) {
        Ok(meta) => tracing::info!(
            version = meta.version,
            l2_normalized = meta.l2_normalized,
            created_at = %meta.created_at,
            "artifact meta"
        ),
        Err(e) => tracing::warn!(error = %e, "meta.json unreadable, score normalization unknown"),
    }
    let engine = Recommender::new(documents, titles, space)?;
    tracing::info!(
        docs = engine.documents().len(),
        titles = engine.titles().len(),
        terms = engine.space().column_count(),
        nnz = engine.space().nnz(),
        "recommendation engine loaded"
    );
    Ok(engine)
}
