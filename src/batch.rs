//! Directory scan, page-sequence validation and chunked output.
//!
//! A run is all-or-nothing up to validation: every page in the input directory
//! is mapped and the page range is checked for holes before a single output
//! file is written.

use std::collections::BTreeMap;
use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::{page, rows};

pub const DEFAULT_CHUNK_SIZE: usize = 25;

const HTML_EXTENSION: &str = ".html";

pub fn chunk_file_name(index: usize) -> String {
    format!("combined_chunk_{index}.txt")
}

/// Outcome of mapping a single file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scan {
    Mapped(u32),
    NoPageNumber,
    Duplicate { page: u32, existing: String },
}

/// Page number → file name, first-seen file wins.
#[derive(Debug, Default)]
pub struct PageMap {
    pages: BTreeMap<u32, String>,
}

impl PageMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, page: u32, file_name: String) -> Scan {
        if let Some(existing) = self.pages.get(&page) {
            return Scan::Duplicate {
                page,
                existing: existing.clone(),
            };
        }
        self.pages.insert(page, file_name);
        Scan::Mapped(page)
    }

    pub fn scan_file(&mut self, dir: &Path, file_name: &str) -> Result<Scan> {
        match page::read_page_number(&dir.join(file_name))? {
            Some(page) => Ok(self.insert(page, file_name.to_string())),
            None => Ok(Scan::NoPageNumber),
        }
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    #[allow(dead_code)]
    pub fn get(&self, page: u32) -> Option<&str> {
        self.pages.get(&page).map(String::as_str)
    }

    pub fn first_page(&self) -> Option<u32> {
        self.pages.keys().next().copied()
    }

    pub fn last_page(&self) -> Option<u32> {
        self.pages.keys().next_back().copied()
    }

    /// Pages between the lowest and highest mapped page that no file claimed.
    pub fn missing_pages(&self) -> Vec<u32> {
        let keys: Vec<u32> = self.pages.keys().copied().collect();
        keys.windows(2)
            .flat_map(|pair| pair[0] + 1..pair[1])
            .collect()
    }

    /// Splits the mapping, in page order, into groups of at most `chunk_size`.
    pub fn chunks(&self, chunk_size: usize) -> Result<Vec<Chunk>> {
        if chunk_size == 0 {
            return Err(Error::InvalidChunkSize);
        }
        let sorted: Vec<(u32, String)> = self
            .pages
            .iter()
            .map(|(page, file)| (*page, file.clone()))
            .collect();

        Ok(sorted
            .chunks(chunk_size)
            .enumerate()
            .map(|(i, pages)| Chunk {
                index: i + 1,
                pages: pages.to_vec(),
            })
            .collect())
    }
}

#[derive(Debug, Clone)]
pub struct Chunk {
    /// 1-based position among all chunks of the run.
    pub index: usize,
    pub pages: Vec<(u32, String)>,
}

impl Chunk {
    pub fn first_page(&self) -> u32 {
        self.pages.first().map(|(p, _)| *p).unwrap_or_default()
    }

    pub fn last_page(&self) -> u32 {
        self.pages.last().map(|(p, _)| *p).unwrap_or_default()
    }

    pub fn file_name(&self) -> String {
        chunk_file_name(self.index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkOutcome {
    Written {
        index: usize,
        first_page: u32,
        last_page: u32,
        file_name: String,
    },
    Empty {
        index: usize,
        first_page: u32,
        last_page: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    NoHtmlFiles,
    NoValidFiles,
    MissingPages(Vec<u32>),
    Completed(Vec<ChunkOutcome>),
}

/// Result of the validation half of a run.
#[derive(Debug)]
pub enum Survey {
    Abort(RunOutcome),
    Ready(PageMap),
}

/// `.html` files (any case) directly inside `dir`, sorted by name.
pub fn list_html_files(dir: &Path) -> Result<Vec<String>> {
    let list_err = |source: std::io::Error| Error::ListDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(list_err)? {
        let entry = entry.map_err(list_err)?;
        if !entry.path().is_file() {
            continue;
        }
        let Ok(name) = entry.file_name().into_string() else {
            debug!("Skipping non UTF-8 file name: {:?}", entry.file_name());
            continue;
        };
        if name.to_lowercase().ends_with(HTML_EXTENSION) {
            files.push(name);
        }
    }
    files.sort();
    Ok(files)
}

/// Maps every page in `input_dir` and checks the page range is complete.
pub fn scan_directory(input_dir: &Path) -> Result<Survey> {
    let files = list_html_files(input_dir)?;
    if files.is_empty() {
        return Ok(Survey::Abort(RunOutcome::NoHtmlFiles));
    }
    info!("Scanning {} html files in {:?}", files.len(), input_dir);

    let pb = progress_bar(files.len());
    let mut page_map = PageMap::new();
    for file_name in &files {
        match page_map.scan_file(input_dir, file_name)? {
            Scan::Mapped(page) => debug!(file = %file_name, page, "Mapped page"),
            Scan::NoPageNumber => pb.suspend(|| {
                warn!(file = %file_name, "Could not find page number in {}", file_name)
            }),
            Scan::Duplicate { page, existing } => pb.suspend(|| {
                warn!(
                    file = %file_name,
                    page,
                    existing = %existing,
                    "Duplicate page number {} found in {} (already mapped to {}). Ignoring this file.",
                    page,
                    file_name,
                    existing
                )
            }),
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    if page_map.is_empty() {
        return Ok(Survey::Abort(RunOutcome::NoValidFiles));
    }

    let missing = page_map.missing_pages();
    if !missing.is_empty() {
        return Ok(Survey::Abort(RunOutcome::MissingPages(missing)));
    }

    Ok(Survey::Ready(page_map))
}

/// Concatenates the wrapped rows of every page in `chunk`, each followed by a blank line.
pub fn combine_chunk(input_dir: &Path, chunk: &Chunk) -> Result<String> {
    let mut combined = String::new();
    for (page, file_name) in &chunk.pages {
        let path = input_dir.join(file_name);
        let raw = std::fs::read_to_string(&path).map_err(|source| Error::Read { path, source })?;
        match rows::extract_valid_rows(&raw) {
            Some(trimmed) => {
                combined.push_str(&trimmed);
                combined.push_str("\n\n");
            }
            None => debug!(page, file = %file_name, "No withdrawable rows"),
        }
    }
    Ok(combined)
}

pub fn write_chunk(input_dir: &Path, output_dir: &Path, chunk: &Chunk) -> Result<ChunkOutcome> {
    let combined = combine_chunk(input_dir, chunk)?;
    if combined.trim().is_empty() {
        return Ok(ChunkOutcome::Empty {
            index: chunk.index,
            first_page: chunk.first_page(),
            last_page: chunk.last_page(),
        });
    }

    let file_name = chunk.file_name();
    let path = output_dir.join(&file_name);
    std::fs::write(&path, combined).map_err(|source| Error::Write { path, source })?;
    Ok(ChunkOutcome::Written {
        index: chunk.index,
        first_page: chunk.first_page(),
        last_page: chunk.last_page(),
        file_name,
    })
}

/// Validates the page sequence in `input_dir`, then writes one
/// `combined_chunk_<N>.txt` per group of `chunk_size` pages into `output_dir`.
pub fn combine_html_files_in_chunks(
    input_dir: &Path,
    output_dir: &Path,
    chunk_size: usize,
) -> Result<RunOutcome> {
    if chunk_size == 0 {
        return Err(Error::InvalidChunkSize);
    }
    std::fs::create_dir_all(output_dir).map_err(|source| Error::CreateDir {
        path: output_dir.to_path_buf(),
        source,
    })?;

    let page_map = match scan_directory(input_dir)? {
        Survey::Abort(outcome) => return Ok(outcome),
        Survey::Ready(page_map) => page_map,
    };

    let chunks = page_map.chunks(chunk_size)?;
    info!(
        "Pages {}-{} complete, writing {} chunks",
        page_map.first_page().unwrap_or_default(),
        page_map.last_page().unwrap_or_default(),
        chunks.len()
    );

    let pb = progress_bar(chunks.len());
    let mut outcomes = Vec::with_capacity(chunks.len());
    for chunk in &chunks {
        outcomes.push(write_chunk(input_dir, output_dir, chunk)?);
        pb.inc(1);
    }
    pb.finish_and_clear();

    Ok(RunOutcome::Completed(outcomes))
}

fn progress_bar(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb
}
