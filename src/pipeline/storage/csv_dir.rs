use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::TableSink;
use crate::error::Result;
use crate::pipeline::ingestion::CsvLoader;

/// Writes `<dir>/<name>.csv` per table.
pub struct CsvDirSink {
    dir: PathBuf,
}

impl CsvDirSink {
    pub fn create<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", name))
    }
}

impl TableSink for CsvDirSink {
    fn replace_table(&self, name: &str, df: &DataFrame) -> Result<()> {
        let path = self.path_for(name);
        let mut file = File::create(&path)?;
        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(&mut df.clone())?;

        debug!("Wrote {} rows to {}", df.height(), path.display());
        Ok(())
    }

    fn read_head(&self, name: &str, limit: usize) -> Result<DataFrame> {
        let bytes = std::fs::read(self.path_for(name))?;
        Ok(CsvLoader::new().parse_bytes(&bytes)?.head(Some(limit)))
    }

    fn describe(&self) -> String {
        format!("csv:{}", self.dir.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvDirSink::create(dir.path()).unwrap();
        let df = df!(
            "CommunityID" => [1i64, 2],
            "School" => [Some(true), None],
        )
        .unwrap();

        sink.replace_table("communitydimension", &df).unwrap();
        assert!(sink.path_for("communitydimension").exists());

        let back = sink.read_head("communitydimension", 5).unwrap();
        let ids: Vec<Option<i64>> = back.column("CommunityID").unwrap().i64().unwrap().into_iter().collect();
        assert_eq!(ids, vec![Some(1), Some(2)]);
        let school: Vec<Option<bool>> = back.column("School").unwrap().bool().unwrap().into_iter().collect();
        assert_eq!(school, vec![Some(true), None]);
    }
}
