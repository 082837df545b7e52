//! EasyEDA import pipeline
//!
//! Fetches a part by number, converts it to a tscircuit component and writes it
//! to `<output_dir>/<part_name>.tsx`.

use crate::{
    converters::{component::TsxComponentWriter, ComponentConverter},
    easyeda::{HttpPartFetcher, PartFetcher},
    error::{FabError, Result, ResultExt},
    output::{Artifact, ArtifactKind},
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

const SOURCE_EXT: &str = "tsx";

pub struct EasyEdaImporter {
    fetcher: Box<dyn PartFetcher>,
    converter: Box<dyn ComponentConverter>,
}

impl EasyEdaImporter {
    pub fn new(fetcher: Box<dyn PartFetcher>, converter: Box<dyn ComponentConverter>) -> Self {
        Self { fetcher, converter }
    }

    /// Importer talking to the EasyEDA API at `api_url`
    pub fn http(api_url: &str) -> Result<Self> {
        Ok(Self::new(
            Box::new(HttpPartFetcher::new(api_url)?),
            Box::new(TsxComponentWriter),
        ))
    }

    /// Fetch the part and return its file name and component source
    pub fn fetch_and_convert(&self, part_number: &str) -> Result<(String, String)> {
        let record = self.fetcher.fetch(part_number)?;
        info!("Fetched part '{}' ({})", record.title(), part_number);

        let source = self
            .converter
            .source(&record)
            .with_artifact_context("component source")?;
        Ok((record.name(), source))
    }

    /// Import the part into `output_dir`, creating it if needed
    pub fn import(&self, part_number: &str, output_dir: &Path) -> Result<PathBuf> {
        let (name, source) = self.fetch_and_convert(part_number)?;
        let artifact = Artifact::new(name, ArtifactKind::Source(SOURCE_EXT.to_string()), source);

        fs::create_dir_all(output_dir).map_err(|e| FabError::io(output_dir, e))?;
        let path = output_dir.join(artifact.file_name());
        fs::write(&path, &artifact.content).map_err(|e| FabError::io(&path, e))?;

        println!("Component written to {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::easyeda::PartRecord;
    use crate::error::classify;
    use serde_json::json;
    use tempfile::TempDir;

    struct StaticFetcher;
    impl PartFetcher for StaticFetcher {
        fn fetch(&self, part_number: &str) -> Result<PartRecord> {
            match part_number {
                "C1234" => PartRecord::new(json!({ "title": "ABC-123-XY" })),
                _ => Err(FabError::PartNotFound {
                    part: part_number.to_string(),
                }
                .into()),
            }
        }
    }

    fn importer() -> EasyEdaImporter {
        EasyEdaImporter::new(Box::new(StaticFetcher), Box::new(TsxComponentWriter))
    }

    #[test]
    fn test_fetch_and_convert_names_part() {
        let (name, source) = importer().fetch_and_convert("C1234").unwrap();

        assert_eq!(name, "ABC_123_XY");
        assert!(source.contains("export const ABC_123_XY"));
    }

    #[test]
    fn test_import_creates_output_dir() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("parts");

        let path = importer().import("C1234", &out).unwrap();

        assert_eq!(path, out.join("ABC_123_XY.tsx"));
        assert!(path.exists());
    }

    #[test]
    fn test_unknown_part_writes_nothing() {
        let dir = TempDir::new().unwrap();

        let err = importer().import("C0", dir.path()).unwrap_err();

        assert!(matches!(classify(&err), Some(FabError::PartNotFound { .. })));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
