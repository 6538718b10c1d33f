//! # gh-fetch-release
//!
//! Fetch files from the latest GitHub release of a repository and install
//! them into a local directory.
//!
//! ## Overview
//!
//! One run looks up the latest release of a repository, picks exactly one
//! asset whose name matches a regular expression, downloads and extracts it,
//! selects files inside the extracted tree with a glob, and copies them into
//! an output directory, optionally renamed and marked executable.
//!
//! Extraction is done by external tools (`tar`, `unzip`, `gzip`, `bzip2`,
//! `xz`, `zstd`). The tools an archive needs are looked up before anything is
//! run, so an unsupported archive fails without side effects.
//!
//! ## Usage
//!
//! ```bash
//! gh-fetch-release --repo BurntSushi/ripgrep \
//!     --pattern 'x86_64-unknown-linux-musl\.tar\.gz$' \
//!     --binfiles 'ripgrep-*/rg' \
//!     --outdir ~/.local/bin --setexec
//! ```
//!
//! `GITHUB_TOKEN` is used for API requests and downloads when set.

/// Command-line interface definitions and argument parsing
pub mod cli;

/// Run configuration built from the command line
pub mod config;

/// Error types and the pipeline stage they are reported at
pub mod error;

/// Archive format detection and extraction through external tools
pub mod extract;

/// GitHub API client for release metadata and asset downloads
pub mod github;

/// Copying resolved files into the output directory
pub mod installer;

/// Sequencing of one run, including cleanup of temporary directories
pub mod orchestrator;

/// Glob resolution against the extracted tree
pub mod resolver;

/// Network retry logic with exponential backoff
pub mod retry;

/// Asset selection by regular expression
pub mod selector;

/// Path expansion and permission helpers
pub mod utils;
