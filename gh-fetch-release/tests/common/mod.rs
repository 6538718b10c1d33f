#![allow(dead_code)]

use gh_fetch_release::error::{FetchError, Result};
use gh_fetch_release::extract::Extractor;
use gh_fetch_release::github::{Release, ReleaseAsset, ReleaseSource, RepoId};
use std::cell::Cell;
use std::collections::HashMap;
use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;

/// A file inside a fixture archive.
pub struct Entry<'a> {
    pub path: &'a str,
    pub content: &'a [u8],
    pub mode: u32,
}

pub fn file<'a>(path: &'a str, content: &'a [u8]) -> Entry<'a> {
    Entry {
        path,
        content,
        mode: 0o644,
    }
}

pub fn executable<'a>(path: &'a str, content: &'a [u8]) -> Entry<'a> {
    Entry {
        path,
        content,
        mode: 0o755,
    }
}

pub fn tar(entries: &[Entry]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for entry in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(entry.content.len() as u64);
        header.set_mode(entry.mode);
        header.set_cksum();
        builder
            .append_data(&mut header, entry.path, entry.content)
            .unwrap();
    }
    builder.into_inner().unwrap()
}

pub fn tar_gz(entries: &[Entry]) -> Vec<u8> {
    gzip(&tar(entries))
}

pub fn tar_bz2(entries: &[Entry]) -> Vec<u8> {
    bzip2(&tar(entries))
}

pub fn tar_zst(entries: &[Entry]) -> Vec<u8> {
    zstd(&tar(entries))
}

pub fn bzip2(data: &[u8]) -> Vec<u8> {
    let mut encoder = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

pub fn zstd(data: &[u8]) -> Vec<u8> {
    zstd::encode_all(data, 0).unwrap()
}

pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

pub fn zip(entries: &[Entry]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for entry in entries {
        let options = zip::write::SimpleFileOptions::default().unix_permissions(entry.mode);
        writer.start_file(entry.path, options).unwrap();
        writer.write_all(entry.content).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Whether every tool is available on `PATH`.
pub fn tools_available(tools: &[&str]) -> bool {
    let extractor = Extractor::new();
    let missing: Vec<_> = tools.iter().filter(|t| !extractor.has_tool(t)).collect();
    if !missing.is_empty() {
        eprintln!("Skipping: missing tools {missing:?}");
        return false;
    }
    true
}

/// Serves one release from memory and counts downloads.
pub struct LocalSource {
    release: Option<Release>,
    payloads: HashMap<String, Vec<u8>>,
    downloads: Cell<usize>,
}

impl LocalSource {
    pub fn new(tag: &str) -> Self {
        Self {
            release: Some(Release {
                tag: tag.to_string(),
                assets: Vec::new(),
            }),
            payloads: HashMap::new(),
            downloads: Cell::new(0),
        }
    }

    /// A repository without any release.
    pub fn empty() -> Self {
        Self {
            release: None,
            payloads: HashMap::new(),
            downloads: Cell::new(0),
        }
    }

    pub fn with_asset(mut self, name: &str, payload: Vec<u8>) -> Self {
        if let Some(release) = &mut self.release {
            release.assets.push(ReleaseAsset {
                name: name.to_string(),
                download_url: format!("https://example.invalid/download/{name}"),
            });
        }
        self.payloads.insert(name.to_string(), payload);
        self
    }

    pub fn downloads(&self) -> usize {
        self.downloads.get()
    }
}

impl ReleaseSource for LocalSource {
    async fn latest_release(&self, repo: &RepoId) -> Result<Release> {
        self.release.clone().ok_or_else(|| FetchError::NotFound {
            resource: repo.to_string(),
            message: "no releases".to_string(),
        })
    }

    async fn download(&self, asset: &ReleaseAsset, dest: &Path) -> Result<()> {
        self.downloads.set(self.downloads.get() + 1);
        let payload = self
            .payloads
            .get(&asset.name)
            .ok_or_else(|| FetchError::DownloadFailed {
                asset: asset.name.clone(),
                url: asset.download_url.clone(),
                status: 404,
                message: "Not Found".to_string(),
            })?;
        fs::write(dest, payload)?;
        Ok(())
    }
}
