use std::collections::HashSet;
use std::path::Path;

use anyhow::{Result, anyhow};
use log::debug;
use walkdir::WalkDir;

use crate::extractor::output_dir_for;
use crate::types::SaveIdentity;
use crate::utils::modified_millis;

/// Name of a save file, without `.xml` or `.xml.gz`
pub fn save_name(path: &Path) -> Option<String> {
    let file_name = path.file_name()?.to_str()?;
    let lower = file_name.to_ascii_lowercase();
    let stem_len = if lower.ends_with(".xml.gz") {
        file_name.len() - ".xml.gz".len()
    } else if lower.ends_with(".xml") {
        file_name.len() - ".xml".len()
    } else {
        return None;
    };

    let name = &file_name[..stem_len];
    if name.is_empty() { None } else { Some(name.to_string()) }
}

/// Collect the saves directly inside `save_dir`, newest first
pub fn collect_saves(save_dir: &Path, output_root: &Path) -> Result<Vec<SaveIdentity>> {
    if !save_dir.is_dir() {
        return Err(anyhow!("Save directory not found: {}", save_dir.display()));
    }

    let mut saves = Vec::new();
    let walker = WalkDir::new(save_dir).min_depth(1).max_depth(1);

    for entry in walker.into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        if !entry.file_type().is_file() {
            continue;
        }

        let Some(name) = save_name(path) else {
            continue;
        };

        // a save can vanish between listing and stat while the game rewrites it
        let modified_ms = match modified_millis(path) {
            Ok(ms) => ms,
            Err(e) => {
                debug!("Skipping {}: {:#}", path.display(), e);
                continue;
            }
        };

        saves.push(SaveIdentity {
            output_dir: output_dir_for(output_root, &name),
            name,
            source: path.to_path_buf(),
            modified_ms,
        });
    }

    saves.sort_by(|a, b| b.modified_ms.cmp(&a.modified_ms).then_with(|| a.name.cmp(&b.name)));

    // `x.xml` and `x.xml.gz` share an output directory; the newer one wins
    let mut seen_names = HashSet::new();
    saves.retain(|save| seen_names.insert(save.name.clone()));

    debug!("Found {} saves in {}", saves.len(), save_dir.display());
    Ok(saves)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::path::PathBuf;
    use std::time::{Duration, SystemTime};
    use tempfile::tempdir;

    fn touch(path: &Path, age_secs: u64) -> Result<()> {
        let file = File::create(path)?;
        file.set_modified(SystemTime::now() - Duration::from_secs(age_secs))?;
        Ok(())
    }

    #[test]
    fn test_save_name() {
        assert_eq!(save_name(Path::new("save/quicksave.xml.gz")), Some("quicksave".to_string()));
        assert_eq!(save_name(Path::new("save/save_001.XML")), Some("save_001".to_string()));
        assert_eq!(save_name(Path::new("save/notes.txt")), None);
        assert_eq!(save_name(Path::new("save/.xml")), None);
    }

    #[test]
    fn test_collect_saves_newest_first() -> Result<()> {
        let dir = tempdir()?;
        touch(&dir.path().join("save_001.xml.gz"), 300)?;
        touch(&dir.path().join("quicksave.xml"), 10)?;
        touch(&dir.path().join("autosave_01.xml.gz"), 100)?;
        touch(&dir.path().join("readme.txt"), 0)?;
        std::fs::create_dir(dir.path().join("nested.xml"))?;

        let output_root = PathBuf::from("/tmp/out");
        let saves = collect_saves(dir.path(), &output_root)?;

        let names: Vec<&str> = saves.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["quicksave", "autosave_01", "save_001"]);
        assert_eq!(saves[0].output_dir, output_root.join("quicksave"));
        assert!(saves[0].modified_ms > saves[1].modified_ms);
        Ok(())
    }

    #[test]
    fn test_compressed_and_plain_copies_collapse_to_newest() -> Result<()> {
        let dir = tempdir()?;
        touch(&dir.path().join("quicksave.xml"), 500)?;
        touch(&dir.path().join("quicksave.xml.gz"), 5)?;

        let saves = collect_saves(dir.path(), dir.path())?;
        assert_eq!(saves.len(), 1);
        assert_eq!(saves[0].source, dir.path().join("quicksave.xml.gz"));
        Ok(())
    }

    #[test]
    fn test_missing_save_dir_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(collect_saves(&dir.path().join("missing"), dir.path()).is_err());
    }
}
