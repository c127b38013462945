//! Workspace backup: a zip bundle holding `manifest.json` plus the database,
//! or a bare copy of the database file on import.

use anyhow::{bail, ensure, Context};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Seek, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const WORKSPACE_DB_FILE: &str = "gradebook.sqlite3";
pub const BUNDLE_FORMAT_V1: &str = "gradebook-workspace-v1";
pub const RAW_SQLITE_FORMAT: &str = "raw-sqlite3";

const MANIFEST_NAME: &str = "manifest.json";
const DB_NAME_IN_BUNDLE: &str = "db/gradebook.sqlite3";
const SQLITE_HEADER: &[u8; 16] = b"SQLite format 3\0";
const ZIP_LOCAL_HEADER: &[u8; 4] = b"PK\x03\x04";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Manifest {
    format: String,
    #[serde(default)]
    version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    app_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exported_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    db_sha256: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub bundle_format: String,
    pub entry_count: usize,
    pub db_sha256: String,
}

#[derive(Debug, Clone)]
pub struct ImportSummary {
    pub bundle_format_detected: String,
}

enum SourceKind {
    Bundle,
    RawSqlite,
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

fn sniff(path: &Path) -> anyhow::Result<SourceKind> {
    let mut head = Vec::with_capacity(SQLITE_HEADER.len());
    File::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?
        .take(SQLITE_HEADER.len() as u64)
        .read_to_end(&mut head)
        .with_context(|| format!("failed to read {}", path.display()))?;

    if head.starts_with(ZIP_LOCAL_HEADER) {
        Ok(SourceKind::Bundle)
    } else if head.as_slice() == SQLITE_HEADER {
        Ok(SourceKind::RawSqlite)
    } else {
        bail!(
            "{} is neither a workspace bundle nor a SQLite database",
            path.display()
        )
    }
}

fn write_bundle<W: Write + Seek>(sink: W, manifest: &Manifest, db: &[u8]) -> anyhow::Result<()> {
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(sink);

    let manifest_json = serde_json::to_vec_pretty(manifest).context("encode manifest")?;
    zip.start_file(MANIFEST_NAME, opts)?;
    zip.write_all(&manifest_json).context("write manifest")?;

    zip.start_file(DB_NAME_IN_BUNDLE, opts)?;
    zip.write_all(db).context("write database into bundle")?;

    zip.finish().context("finish bundle")?;
    Ok(())
}

fn read_bundle<R: Read + Seek>(source: R) -> anyhow::Result<Vec<u8>> {
    let mut archive = ZipArchive::new(source).context("not a readable zip archive")?;

    let manifest: Manifest = {
        let entry = archive
            .by_name(MANIFEST_NAME)
            .with_context(|| format!("bundle has no {}", MANIFEST_NAME))?;
        serde_json::from_reader(entry).context("manifest.json is not a valid manifest")?
    };
    ensure!(
        manifest.format == BUNDLE_FORMAT_V1,
        "unsupported bundle format: {}",
        manifest.format
    );

    let mut db = Vec::new();
    archive
        .by_name(DB_NAME_IN_BUNDLE)
        .with_context(|| format!("bundle has no {}", DB_NAME_IN_BUNDLE))?
        .read_to_end(&mut db)
        .context("extract database from bundle")?;

    if let Some(expected) = manifest.db_sha256.as_deref() {
        let actual = sha256_hex(&db);
        ensure!(
            actual.eq_ignore_ascii_case(expected),
            "database checksum mismatch: manifest={} actual={}",
            expected,
            actual
        );
    }
    Ok(db)
}

/// Bundles the workspace database at `out_path`, creating parent directories.
pub fn export_workspace_bundle(
    workspace_path: &Path,
    out_path: &Path,
) -> anyhow::Result<ExportSummary> {
    let db_path = workspace_path.join(WORKSPACE_DB_FILE);
    ensure!(
        db_path.is_file(),
        "workspace database not found: {}",
        db_path.display()
    );
    let db = std::fs::read(&db_path)
        .with_context(|| format!("failed to read database {}", db_path.display()))?;
    let digest = sha256_hex(&db);

    if let Some(dir) = out_path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create directory {}", dir.display()))?;
    }
    let manifest = Manifest {
        format: BUNDLE_FORMAT_V1.to_string(),
        version: 1,
        app_version: Some(env!("CARGO_PKG_VERSION").to_string()),
        exported_at: Some(chrono::Utc::now().to_rfc3339()),
        db_sha256: Some(digest.clone()),
    };
    let sink = File::create(out_path)
        .with_context(|| format!("failed to create {}", out_path.display()))?;
    write_bundle(sink, &manifest, &db)?;

    tracing::info!(out = %out_path.display(), sha256 = %digest, "workspace exported");
    Ok(ExportSummary {
        bundle_format: BUNDLE_FORMAT_V1.to_string(),
        entry_count: 2,
        db_sha256: digest,
    })
}

/// Replaces the workspace database with the one in `in_path`. The caller
/// must not hold a connection to the workspace database while this runs.
pub fn import_workspace_bundle(
    in_path: &Path,
    workspace_path: &Path,
) -> anyhow::Result<ImportSummary> {
    let (db, detected) = match sniff(in_path)? {
        SourceKind::Bundle => {
            let source = File::open(in_path)
                .with_context(|| format!("failed to open {}", in_path.display()))?;
            (read_bundle(source)?, BUNDLE_FORMAT_V1)
        }
        SourceKind::RawSqlite => (
            std::fs::read(in_path)
                .with_context(|| format!("failed to read {}", in_path.display()))?,
            RAW_SQLITE_FORMAT,
        ),
    };

    std::fs::create_dir_all(workspace_path)
        .with_context(|| format!("failed to create workspace {}", workspace_path.display()))?;
    let target = workspace_path.join(WORKSPACE_DB_FILE);
    let staging = workspace_path.join(format!("{}.importing", WORKSPACE_DB_FILE));
    std::fs::write(&staging, &db)
        .with_context(|| format!("failed to stage {}", staging.display()))?;
    std::fs::rename(&staging, &target)
        .with_context(|| format!("failed to replace {}", target.display()))?;

    tracing::info!(format = detected, workspace = %workspace_path.display(), "workspace restored");
    Ok(ImportSummary {
        bundle_format_detected: detected.to_string(),
    })
}
