use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Resolves command-line paths into the files named `name`.
///
/// Directories are searched recursively; other paths are taken as given.
/// No paths means the current directory. With `match_dir`, only files whose
/// parent directory has that name are kept. Results are absolute where
/// possible, sorted and free of duplicates.
pub fn find_files(paths: &[PathBuf], name: &str, match_dir: Option<&str>) -> Vec<PathBuf> {
    let roots: Vec<PathBuf> = if paths.is_empty() {
        vec![PathBuf::from(".")]
    } else {
        paths.to_vec()
    };

    let mut found = Vec::new();
    for root in &roots {
        if root.is_dir() {
            if let Err(e) = walk(root, name, &mut found) {
                warn!("Could not search {}: {}", root.display(), e);
            }
        } else {
            found.push(root.clone());
        }
    }

    if let Some(dir) = match_dir {
        found.retain(|p| parent_name(p) == Some(dir));
    }

    let mut found: Vec<PathBuf> = found
        .into_iter()
        .map(|p| fs::canonicalize(&p).unwrap_or(p))
        .collect();
    found.sort();
    found.dedup();

    let subdir = match_dir.unwrap_or("any");
    println!("{} files named {} (subdir: {}) found.", found.len(), name, subdir);
    found
}

fn parent_name(path: &Path) -> Option<&str> {
    path.parent()?.file_name()?.to_str()
}

fn walk(dir: &Path, name: &str, found: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            if let Err(e) = walk(&path, name, found) {
                debug!("Skipping {}: {}", path.display(), e);
            }
        } else if entry.file_name() == name {
            found.push(path);
        }
    }
    Ok(())
}

/// Every file in `dir` whose name ends with `suffix`, sorted.
pub fn files_with_suffix(dir: &Path, suffix: &str) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file()
            && entry.file_name().to_string_lossy().ends_with(suffix)
        {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn directories_are_searched_recursively_and_sorted() {
        let tmp = tempdir().unwrap();
        let root = tmp.path();
        touch(&root.join("exp_002/SMV/CORRECT.LP"));
        touch(&root.join("exp_001/SMV/CORRECT.LP"));
        touch(&root.join("exp_001/SMV/XDS.INP"));
        touch(&root.join("exp_003/CORRECT.LP"));

        let found = find_files(&[root.to_path_buf()], "CORRECT.LP", None);
        assert_eq!(found.len(), 3);
        assert!(found.windows(2).all(|w| w[0] < w[1]));
        assert!(found.iter().all(|p| p.ends_with("CORRECT.LP")));
        assert!(found.iter().all(|p| p.is_absolute()));
    }

    #[test]
    fn match_keeps_only_files_in_named_directories() {
        let tmp = tempdir().unwrap();
        let root = tmp.path();
        touch(&root.join("exp_001/SMV_reprocessed/CORRECT.LP"));
        touch(&root.join("exp_001/SMV/CORRECT.LP"));
        touch(&root.join("exp_002/SMV_reprocessed/CORRECT.LP"));

        let found = find_files(&[root.to_path_buf()], "CORRECT.LP", Some("SMV_reprocessed"));
        assert_eq!(found.len(), 2);
        assert!(
            found
                .iter()
                .all(|p| parent_name(p) == Some("SMV_reprocessed"))
        );
    }

    #[test]
    fn explicit_files_are_kept_once() {
        let tmp = tempdir().unwrap();
        let file = tmp.path().join("a/XDS.INP");
        touch(&file);

        let found = find_files(&[file.clone(), file.clone()], "XDS.INP", None);
        assert_eq!(found, vec![fs::canonicalize(&file).unwrap()]);
    }

    #[test]
    fn suffix_listing_ignores_other_files() {
        let tmp = tempdir().unwrap();
        touch(&tmp.path().join("02_XDS_ASCII.HKL"));
        touch(&tmp.path().join("01_XDS_ASCII.HKL"));
        touch(&tmp.path().join("XSCALE.INP"));

        let files = files_with_suffix(tmp.path(), "XDS_ASCII.HKL").unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["01_XDS_ASCII.HKL", "02_XDS_ASCII.HKL"]);
    }
}
