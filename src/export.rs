use std::fs;
use std::path::{Path, PathBuf};

use crate::Artifacts;
use crate::codec::save_png;
use crate::error::LinelessResult;

/// First path in `name.ext`, `name_1.ext`, `name_2.ext`, ... that does not exist yet.
pub fn unique_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path.extension().map(|e| e.to_string_lossy().into_owned());
    let mut counter = 1u32;
    loop {
        let name = match &ext {
            Some(ext) => format!("{stem}_{counter}.{ext}"),
            None => format!("{stem}_{counter}"),
        };
        let candidate = path.with_file_name(name);
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

/// Where one run writes its three PNGs.
#[derive(Clone, Debug)]
pub struct ExportPlan {
    pub out_dir: PathBuf,
    pub prefix: String,
}

impl Default for ExportPlan {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("export"),
            prefix: "export".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WrittenArtifacts {
    pub stroke: PathBuf,
    pub fill: PathBuf,
    pub lineless: PathBuf,
}

impl ExportPlan {
    /// Write stroke, fill and lineless PNGs, never replacing existing files.
    pub fn write(&self, artifacts: &Artifacts) -> LinelessResult<WrittenArtifacts> {
        fs::create_dir_all(&self.out_dir)?;
        let prefix = &self.prefix;

        let stroke = unique_path(&self.out_dir.join(format!("{prefix}ST.png")));
        save_png(&stroke, &artifacts.stroke)?;
        let fill = unique_path(&self.out_dir.join(format!("{prefix}FC.png")));
        save_png(&fill, &artifacts.fill)?;
        let lineless = unique_path(&self.out_dir.join(format!("{prefix}.png")));
        save_png(&lineless, &artifacts.lineless)?;

        tracing::info!(
            stroke = %stroke.display(),
            fill = %fill.display(),
            lineless = %lineless.display(),
            "wrote artifacts"
        );
        Ok(WrittenArtifacts {
            stroke,
            fill,
            lineless,
        })
    }
}
